use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use fedistats::handlers::{CrawlArgs, handle_crawl, init_tracing};
use indicatif::MultiProgress;
use std::path::PathBuf;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let matches = cmd.get_matches();
    let args = crawl_args(&matches);

    let progress = MultiProgress::new();
    init_tracing(args.verbose, args.quiet, &progress);

    if let Err(e) = handle_crawl(args, progress).await {
        eprintln!("{} {:#}", "✗".red(), e);
        std::process::exit(1);
    }
}

fn crawl_args(matches: &ArgMatches) -> CrawlArgs {
    let defaults = CrawlArgs::default();
    let string = |id: &str| matches.get_one::<String>(id).cloned();

    CrawlArgs {
        hosts: matches
            .get_many::<String>("HOST")
            .map(|hosts| hosts.cloned().collect())
            .unwrap_or_default(),
        hosts_file: matches.get_one::<PathBuf>("hosts-file").cloned(),
        result_file: string("result-file").unwrap_or(defaults.result_file),
        queue_file: string("queue-file"),
        checked_file: string("checked-file"),
        ng_list_file: string("ng-list-file"),
        fetch_timeout_sec: matches
            .get_one::<u64>("fetch-timeout-sec")
            .copied()
            .unwrap_or(defaults.fetch_timeout_sec),
        fetch_limit: matches.get_one::<usize>("fetch-limit").copied(),
        quiet: matches.get_flag("quiet"),
        verbose: matches.get_flag("verbose"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
