//! [`CmlLoad`]: session-level loading on top of the index, tables and
//! signal files.
//!
//! # Order of work in [`CmlLoad::load_eeg`]
//! 1. Open the signal header (sampling rate, shape).
//! 2. Convert the window to samples and validate it.
//! 3. Read the channels table; check it against the channel axis.
//! 4. Read the events table and its `eegoffset` column (segmented loads only).
//! 5. Read the samples, segment, then run the strict NaN check.
//!
//! Every failure before step 5 leaves the sample data unread.
use ndarray::Array3;
use std::path::PathBuf;
use tracing::debug;

use crate::config::{EpochWindow, LoaderConfig};
use crate::epoch::{check_finite, extract_epochs, WindowSamples};
use crate::error::{CmlError, Result};
use crate::io::SignalFile;
use crate::session::{Row, SessionIndex};
use crate::table::Table;
use crate::timeseries::{MneData, TimeSeries};

/// Output of [`CmlLoad::load_eeg`].
#[derive(Debug, Clone)]
pub struct EegData {
    /// `[S, C, T]` when continuous, `[E, C, W]` when segmented.
    pub data: Array3<f64>,
    /// Sampling rate in Hz.
    pub sfreq: f64,
    pub channels: Table,
    /// Events table, present only for segmented loads.
    pub events: Option<Table>,
    /// Window the data was cut with.
    pub window: EpochWindow,
}

impl EegData {
    pub fn is_segmented(&self) -> bool {
        self.events.is_some()
    }

    pub fn channel_labels(&self) -> Result<Vec<String>> {
        self.channels.labels()
    }
}

/// Loader for one exported data directory.
#[derive(Debug, Clone)]
pub struct CmlLoad {
    cfg: LoaderConfig,
}

impl CmlLoad {
    pub fn new(cfg: LoaderConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.cfg
    }

    /// All available sessions.
    pub fn index(&self) -> Result<SessionIndex> {
        SessionIndex::load(self.cfg.data_dir.join(&self.cfg.index_file))
    }

    /// Absolute path of the file stored under `<key>_file` in `row`.
    pub fn filename(&self, row: &Row, key: &str) -> Result<PathBuf> {
        Ok(self.cfg.data_dir.join(row.file_key(key)?))
    }

    /// Tabular data such as `"events"` or `"channels"`.
    pub fn load(&self, row: &Row, key: &str) -> Result<Table> {
        Table::read_csv(self.filename(row, key)?)
    }

    /// Load a session's EEG, optionally cut into event windows.
    ///
    /// # Arguments
    ///
    /// * `row`    – a session row from [`CmlLoad::index`].
    /// * `window` – [`EpochWindow::continuous`] for the whole recording, or
    ///   an event window with optional buffers.
    /// * `strict` – `Some(true)` fails on any NaN in the output, `Some(false)`
    ///   never does, `None` uses [`LoaderConfig::strict`].
    ///
    /// # Errors
    ///
    /// * [`CmlError::NotFound`] – a data file is missing.
    /// * [`CmlError::Validation`] – the window yields no samples beyond its
    ///   buffers; raised before any sample data is read.
    /// * [`CmlError::Format`] – malformed file, channel count mismatch, or
    ///   events without an integer `eegoffset`.
    /// * [`CmlError::DataQuality`] – strict mode and NaN in the output.
    pub fn load_eeg(
        &self,
        row: &Row,
        window: &EpochWindow,
        strict: Option<bool>,
    ) -> Result<EegData> {
        let strict = self.cfg.resolve_strict(strict);
        let signal = SignalFile::open(self.filename(row, "eeg")?)?;
        let samples = WindowSamples::from_window(window, signal.sfreq)?;

        let channels = self.load(row, "channels")?;
        if channels.len() != signal.n_channels() {
            return Err(CmlError::Format(format!(
                "{}: {} channel rows for {} signal channels",
                row.label(),
                channels.len(),
                signal.n_channels()
            )));
        }

        let events = match samples {
            Some(_) => {
                let table = self.load(row, "events")?;
                let offsets = table.eegoffsets()?;
                Some((table, offsets))
            }
            None => None,
        };

        let raw = signal.read_data()?;
        let (data, events) = match (samples, events) {
            (Some(w), Some((table, offsets))) => (extract_epochs(&raw, &offsets, &w), Some(table)),
            _ => (raw, None),
        };
        debug!(session = %row.label(), shape = ?data.dim(), sfreq = signal.sfreq, "loaded eeg");

        if strict {
            check_finite(&data, &row.label())?;
        }

        Ok(EegData { data, sfreq: signal.sfreq, channels, events, window: *window })
    }

    /// [`CmlLoad::load_eeg`] wrapped as a labelled [`TimeSeries`].
    pub fn load_timeseries(
        &self,
        row: &Row,
        window: &EpochWindow,
        strict: Option<bool>,
    ) -> Result<TimeSeries> {
        TimeSeries::from_eeg(self.load_eeg(row, window, strict)?)
    }

    /// [`CmlLoad::load_eeg`] wrapped as a raw (continuous) or epochs container.
    pub fn load_mne(
        &self,
        row: &Row,
        window: &EpochWindow,
        strict: Option<bool>,
    ) -> Result<MneData> {
        MneData::from_eeg(self.load_eeg(row, window, strict)?)
    }
}
