//! # cmlload — EEG session loading, event epoching and parallel dispatch
//!
//! `cmlload` reads EEG recordings exported into a fixed directory layout,
//! cuts them into event-aligned epochs and fans analysis functions out over
//! a worker pool.
//!
//! ## Data layout
//!
//! ```text
//! data_dir/
//!   index.json                     one row per session
//!   R1001P/FR1/0/eeg.safetensors   "data" [S, C, T] + samplerate metadata
//!   R1001P/FR1/0/channels.csv      one row per channel, `label` column
//!   R1001P/FR1/0/events.csv        one row per event, `eegoffset` column
//! ```
//!
//! Each index row names its files through `<key>_file` columns
//! (`eeg_file`, `channels_file`, `events_file`) relative to `data_dir`.
//!
//! ## Quick start
//!
//! ```no_run
//! use cmlload::{CmlLoad, EpochWindow, LoaderConfig};
//!
//! let cml   = CmlLoad::new(LoaderConfig::new("/data/eeg/scalp"));
//! let index = cml.index().unwrap();
//! let row   = index.find("R1001P", "FR1", "0").unwrap();
//!
//! // Whole recording: [1, C, T]
//! let raw = cml.load_eeg(row, &EpochWindow::continuous(), None).unwrap();
//!
//! // 1.6 s windows starting 200 ms before each event, 500 ms buffers: [E, C, W]
//! let window = EpochWindow::new(-200.0, 1600.0).with_buffer(500.0);
//! let eeg    = cml.load_eeg(row, &window, Some(true)).unwrap();
//! println!("{:?} @ {} Hz", eeg.data.dim(), eeg.sfreq);
//! ```
//!
//! ## Epoching rules
//!
//! * Window edges are converted to samples with round-half-to-even.
//! * A window that extends past either end of the recording is returned as
//!   a row of NaN; windows are never clipped or partially filled.
//! * Buffers are *not* trimmed from the output; use
//!   [`epoch::strip_buffer`] to recover the unbuffered window.
//! * Strict mode turns any NaN in the output into
//!   [`CmlError::DataQuality`].
//!
//! ## Parallel dispatch
//!
//! ```
//! use cmlload::{cluster_checked, ClusterConfig};
//!
//! let subjects = ["R1001P", "R1002P", "R1003P"];
//! cluster_checked(|s: &&str| !s.is_empty(), &subjects, &ClusterConfig::default()).unwrap();
//! ```

pub mod cluster;
pub mod config;
pub mod epoch;
pub mod error;
pub mod io;
pub mod loader;
pub mod logging;
pub mod session;
pub mod settings;
pub mod table;
pub mod timeseries;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{EpochWindow, LoaderConfig};

// epoch
pub use epoch::{check_finite, extract_epochs, segment, strip_buffer, WindowSamples};

// error
pub use error::{CmlError, Result};

// io — signal files
pub use io::{write_signal, SignalFile, StWriter};

// loader
pub use loader::{CmlLoad, EegData};

// session index / tables
pub use session::{Row, SessionIndex};
pub use table::Table;

// format adapters
pub use timeseries::{EpochsArray, Info, MneData, RawArray, TimeSeries};

// dispatch, settings, logging
pub use cluster::{cluster_checked, cluster_run, ClusterConfig, JobOutcome};
pub use logging::{init_tracing, LogErr};
pub use settings::Settings;
