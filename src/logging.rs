//! Log output.
//!
//! * [`init_tracing`] installs a `tracing` subscriber for library events
//!   (filter with `RUST_LOG`, default `info`).
//! * [`LogErr`] appends one timestamped line per call to a plain log file
//!   and mirrors it to stdout.  Safe to use from many worker processes or
//!   threads that each write their own suffixed file.
//!
//! ```no_run
//! use cmlload::LogErr;
//!
//! let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
//! LogErr::new()
//!     .arg("R1001P")
//!     .err(&err)
//!     .kv("session", 2)
//!     .suffix("R1001P")     // → logfile_R1001P.txt
//!     .write()
//!     .unwrap();
//! ```
use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::error::Result;

/// Install the global `tracing` subscriber.  Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Timestamp layout at the start of every line.
pub const TIMESTAMP_FORMAT: &str = "%F_%H-%M-%S";

/// Builder for one log line.
#[derive(Debug, Clone)]
pub struct LogErr {
    args: Vec<String>,
    kwargs: Vec<(String, String)>,
    traces: Vec<String>,
    sep: String,
    logfile: PathBuf,
    suffix: String,
}

impl Default for LogErr {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            kwargs: Vec::new(),
            traces: Vec::new(),
            sep: ", ".into(),
            logfile: PathBuf::from("logfile.txt"),
            suffix: String::new(),
        }
    }
}

impl LogErr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, a: impl Display) -> Self {
        self.args.push(a.to_string());
        self
    }

    /// Named value, printed as `key=value` after the positional args.
    pub fn kv(mut self, key: &str, value: impl Display) -> Self {
        self.kwargs.push((key.to_string(), value.to_string()));
        self
    }

    /// An error: its message goes on the main line in argument order and its
    /// source chain is appended on the following lines.
    pub fn err(mut self, e: &(dyn std::error::Error + 'static)) -> Self {
        self.args.push(e.to_string());
        self.traces.push(error_trace(e));
        self
    }

    pub fn sep(mut self, sep: &str) -> Self {
        self.sep = sep.to_string();
        self
    }

    pub fn logfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.logfile = path.into();
        self
    }

    /// `logfile.txt` becomes `logfile_<suffix>.txt`.
    pub fn suffix(mut self, suffix: impl Display) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    /// File the line is appended to.
    pub fn log_path(&self) -> PathBuf {
        if self.suffix.is_empty() {
            return self.logfile.clone();
        }
        let stem = self.logfile.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let name = match self.logfile.extension() {
            Some(ext) => format!("{stem}_{}.{}", self.suffix, ext.to_string_lossy()),
            None => format!("{stem}_{}", self.suffix),
        };
        self.logfile.with_file_name(name)
    }

    /// Full entry text for a given timestamp, without trailing newline.
    pub fn format_with_stamp(&self, stamp: &str) -> String {
        let fields: Vec<String> = self
            .args
            .iter()
            .cloned()
            .chain(self.kwargs.iter().map(|(k, v)| format!("{k}={v}")))
            .collect();
        let mut s = format!("{stamp}: {}", fields.join(&self.sep));
        for t in &self.traces {
            s.push('\n');
            s.push_str(t);
        }
        s
    }

    /// Print the entry and append it to [`LogErr::log_path`].
    pub fn write(self) -> Result<()> {
        let stamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let line = self.format_with_stamp(&stamp);
        append_line(&self.log_path(), &line)?;
        println!("{line}");
        Ok(())
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(f, "{line}")?;
    Ok(())
}

/// `Error: msg` followed by a numbered `Caused by:` list.
fn error_trace(e: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("Error: {e}");
    let mut source = e.source();
    let mut i = 0;
    while let Some(cause) = source {
        if i == 0 {
            s.push_str("\nCaused by:");
        }
        s.push_str(&format!("\n    {i}: {cause}"));
        source = cause.source();
        i += 1;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("job 3 failed")]
    struct JobError(#[source] std::io::Error);

    #[test]
    fn line_layout() {
        let line = LogErr::new()
            .arg("R1001P")
            .arg(7)
            .kv("sess", 2)
            .format_with_stamp("2024-01-02_03-04-05");
        assert_eq!(line, "2024-01-02_03-04-05: R1001P, 7, sess=2");
    }

    #[test]
    fn errors_inline_then_trace() {
        let e = JobError(std::io::Error::new(std::io::ErrorKind::NotFound, "eeg.st missing"));
        let line = LogErr::new().arg("a").err(&e).sep(" | ").format_with_stamp("T");
        assert_eq!(
            line,
            "T: a | job 3 failed\nError: job 3 failed\nCaused by:\n    0: eeg.st missing"
        );
    }

    #[test]
    fn suffix_goes_before_extension() {
        let l = LogErr::new().logfile("/tmp/logs/run.log").suffix(12);
        assert_eq!(l.log_path(), PathBuf::from("/tmp/logs/run_12.log"));
        assert_eq!(LogErr::new().log_path(), PathBuf::from("logfile.txt"));
        assert_eq!(LogErr::new().logfile("out").suffix("x").log_path(), PathBuf::from("out_x"));
    }

    #[test]
    fn write_appends() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("logfile.txt");
        LogErr::new().logfile(&base).suffix("s1").arg("first").write().unwrap();
        LogErr::new().logfile(&base).suffix("s1").arg("second").write().unwrap();

        let text = std::fs::read_to_string(dir.path().join("logfile_s1.txt")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(": first"));
        assert!(lines[1].ends_with(": second"));
    }
}
