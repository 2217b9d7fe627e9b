use crate::CLAP_STYLING;
use clap::arg;
use std::path::PathBuf;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("fedistats")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("fedistats")
        .styles(CLAP_STYLING)
        .about(
            "Crawl the Fediverse from a few seed hosts, recording NodeInfo statistics for every \
        reachable instance. Interrupted runs resume from the files they left behind.",
        )
        .arg(
            arg!([HOST] ...)
                .help("Seed hosts to start crawling from, e.g. mastodon.social")
                .required_unless_present("hosts-file"),
        )
        .arg(
            arg!(-H --"hosts-file" <PATH>)
                .required(false)
                .help("Path to a newline-delimited file of seed hosts")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"result-file" <PATH>)
                .required(false)
                .help("Where instance statistics are appended")
                .default_value("fediverse-stats.txt"),
        )
        .arg(
            arg!(--"queue-file" <PATH>)
                .required(false)
                .help("Pending targets (default: <result-file>.queue)"),
        )
        .arg(
            arg!(--"checked-file" <PATH>)
                .required(false)
                .help("Finished targets (default: <result-file>.checked)"),
        )
        .arg(
            arg!(--"ng-list-file" <PATH>)
                .required(false)
                .help("Exclusion rules (default: <result-file>.ng-list)"),
        )
        .arg(
            arg!(--"fetch-timeout-sec" <SECONDS>)
                .required(false)
                .help("Timeout for each HTTP request")
                .value_parser(clap::value_parser!(u64))
                .default_value("3"),
        )
        .arg(
            arg!(--"fetch-limit" <COUNT>)
                .required(false)
                .help("Stop after fetching this many targets (default: until the queue drains)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(arg!(-q --"quiet" "Suppress the progress spinner and summary").required(false))
        .arg(
            arg!(-v --"verbose" "Log every protocol step")
                .required(false)
                .conflicts_with("quiet"),
        )
}
