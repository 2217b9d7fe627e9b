// File capabilities the frontier relies on

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub trait Storage {
    fn exists(&self, path: &Path) -> io::Result<bool>;

    fn create_empty(&self, path: &Path) -> io::Result<()>;

    /// Append each line followed by a newline. No-op for an empty slice.
    fn append_lines(&self, path: &Path, lines: &[String]) -> io::Result<()>;

    /// All lines of the file, without terminators. A final line lacking a
    /// newline is still returned.
    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Replace the whole file so readers see either the old or the new
    /// contents.
    fn replace(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Move `from` over `to` in one step.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// `path` with `suffix` appended to its file name, e.g. `queue.txt.backup`.
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Local filesystem storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl Storage for FsStorage {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        path.try_exists()
    }

    fn create_empty(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, "")
    }

    fn append_lines(&self, path: &Path, lines: &[String]) -> io::Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        let mut contents = lines.join("\n");
        contents.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(contents.as_bytes())?;
        file.flush()
    }

    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>> {
        let contents = fs::read_to_string(path)?;
        Ok(contents.lines().map(str::to_string).collect())
    }

    fn replace(&self, path: &Path, contents: &str) -> io::Result<()> {
        let tmp = sibling_path(path, ".tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}
