//! Loader and epoch-window configuration.
//!
//! [`LoaderConfig`] says where the exported data lives and whether loads are
//! strict by default.  [`EpochWindow`] describes how continuous EEG is cut
//! around events; its default is "no segmentation".
use std::path::PathBuf;

/// Configuration for a [`CmlLoad`](crate::CmlLoad) instance.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use cmlload::LoaderConfig;
///
/// let cfg = LoaderConfig {
///     data_dir: "/data/eeg/scalp".into(),
///     strict:   true,
///     ..LoaderConfig::default()
/// };
/// assert_eq!(cfg.index_file, "index.json");
/// ```
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Root of the exported data directory.  Every `<key>_file` entry in
    /// the index is resolved relative to this path.
    ///
    /// Default: `"."`.
    pub data_dir: PathBuf,

    /// Instance-wide default for strict NaN checking.
    ///
    /// A per-call `Some(true)` / `Some(false)` overrides this; `None`
    /// defers to it.
    ///
    /// Default: `false`.
    pub strict: bool,

    /// Name of the session index inside `data_dir`.
    ///
    /// Default: `"index.json"`.
    pub index_file: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            strict: false,
            index_file: "index.json".into(),
        }
    }
}

impl LoaderConfig {
    /// Configuration rooted at `data_dir` with every other field defaulted.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), ..Self::default() }
    }

    /// Resolve a tri-state per-call flag against the instance default.
    pub fn resolve_strict(&self, strict: Option<bool>) -> bool {
        strict.unwrap_or(self.strict)
    }
}

/// Event window, in milliseconds relative to each event's `eegoffset`.
///
/// ```
/// use cmlload::EpochWindow;
///
/// // 200 ms window starting 100 ms before each event, 50 ms buffers.
/// let w = EpochWindow::new(-100.0, 200.0).with_buffer(50.0);
/// assert_eq!(w.effective_start_ms(), -150.0);
/// assert_eq!(w.effective_len_ms(), Some(300.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EpochWindow {
    /// Offset from the event sample to the window start.  May be negative.
    pub start_ms: f64,
    /// Window length.  `None` returns the continuous recording unsegmented.
    pub len_ms: Option<f64>,
    /// Extra time added to both ends of each window.
    pub buf_ms: Option<f64>,
}

impl EpochWindow {
    /// Continuous (unsegmented) loading.
    pub fn continuous() -> Self {
        Self::default()
    }

    pub fn new(start_ms: f64, len_ms: f64) -> Self {
        Self { start_ms, len_ms: Some(len_ms), buf_ms: None }
    }

    pub fn with_buffer(mut self, buf_ms: f64) -> Self {
        self.buf_ms = Some(buf_ms);
        self
    }

    pub fn is_segmented(&self) -> bool {
        self.len_ms.is_some()
    }

    /// Window start with the leading buffer applied.
    pub fn effective_start_ms(&self) -> f64 {
        self.start_ms - self.buf_ms.unwrap_or(0.0)
    }

    /// Window length with both buffers applied.
    pub fn effective_len_ms(&self) -> Option<f64> {
        self.len_ms.map(|len| len + 2.0 * self.buf_ms.unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_tri_state() {
        let cfg = LoaderConfig { strict: true, ..LoaderConfig::default() };
        assert!(cfg.resolve_strict(None));
        assert!(!cfg.resolve_strict(Some(false)));
        assert!(LoaderConfig::default().resolve_strict(Some(true)));
    }

    #[test]
    fn continuous_window_has_no_length() {
        let w = EpochWindow::continuous();
        assert!(!w.is_segmented());
        assert_eq!(w.effective_len_ms(), None);
        assert_eq!(w.effective_start_ms(), 0.0);
    }
}
