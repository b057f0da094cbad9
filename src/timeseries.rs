//! Labelled containers for downstream analysis.
//!
//! * [`TimeSeries`] — data plus `event` / `channel` / `time` coordinates,
//!   time in milliseconds relative to the event.
//! * [`MneData`] — a continuous [`RawArray`] (`[C, T]`, first segment) or an
//!   [`EpochsArray`] (`[E, C, W]` with `tmin` in seconds), both carrying an
//!   [`Info`] block with channel names and sampling rate.
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};

use crate::error::{CmlError, Result};
use crate::loader::EegData;
use crate::session::Row;

fn check_channels(labels: &[String], n_ch: usize) -> Result<()> {
    if labels.len() != n_ch {
        return Err(CmlError::Format(format!(
            "{} channel labels for {n_ch} data channels",
            labels.len()
        )));
    }
    Ok(())
}

/// `n` evenly spaced sample times in ms starting at `start_ms`.
pub fn sample_times_ms(start_ms: f64, n: usize, sfreq: f64) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let end_ms = start_ms + (n as f64 - 1.0) * 1000.0 / sfreq;
    Array1::linspace(start_ms, end_ms, n).to_vec()
}

// ── TimeSeries ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub data: Array3<f64>,
    pub sfreq: f64,
    pub dims: [&'static str; 3],
    pub channel: Vec<String>,
    /// Sample times in ms; 0 at the first sample for continuous data.
    pub time: Vec<f64>,
    /// Event rows, one per epoch, for segmented data.
    pub event: Option<Vec<Row>>,
}

impl TimeSeries {
    pub fn from_eeg(eeg: EegData) -> Result<Self> {
        let channel = eeg.channel_labels()?;
        let (_, n_ch, n_t) = eeg.data.dim();
        check_channels(&channel, n_ch)?;

        let start_ms = if eeg.is_segmented() { eeg.window.effective_start_ms() } else { 0.0 };
        Ok(Self {
            time: sample_times_ms(start_ms, n_t, eeg.sfreq),
            event: eeg.events.map(|t| t.rows().to_vec()),
            data: eeg.data,
            sfreq: eeg.sfreq,
            dims: ["event", "channel", "time"],
            channel,
        })
    }

    pub fn channel_index(&self, label: &str) -> Option<usize> {
        self.channel.iter().position(|c| c == label)
    }

    /// `[E, T]` for one channel.
    pub fn sel_channel(&self, label: &str) -> Option<ArrayView2<'_, f64>> {
        self.channel_index(label).map(|c| self.data.index_axis(Axis(1), c))
    }
}

// ── Raw / Epochs containers ──────────────────────────────────────────────────

/// Measurement info shared by [`RawArray`] and [`EpochsArray`].
#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    pub ch_names: Vec<String>,
    pub sfreq: f64,
    /// Always `"eeg"` for this data.
    pub ch_types: Vec<&'static str>,
}

impl Info {
    pub fn eeg(ch_names: Vec<String>, sfreq: f64) -> Self {
        let ch_types = vec!["eeg"; ch_names.len()];
        Self { ch_names, sfreq, ch_types }
    }

    pub fn n_chan(&self) -> usize {
        self.ch_names.len()
    }
}

/// Continuous recording, `[C, T]`.
#[derive(Debug, Clone)]
pub struct RawArray {
    pub data: Array2<f64>,
    pub info: Info,
    pub first_samp: usize,
}

impl RawArray {
    pub fn n_times(&self) -> usize {
        self.data.ncols()
    }

    /// Sample times in seconds.
    pub fn times(&self) -> Vec<f64> {
        sample_times_ms(0.0, self.n_times(), self.info.sfreq)
            .into_iter()
            .map(|t| t / 1000.0)
            .collect()
    }
}

/// Event windows, `[E, C, W]`.
#[derive(Debug, Clone)]
pub struct EpochsArray {
    pub data: Array3<f64>,
    pub info: Info,
    /// Time of the first window sample relative to the event, in seconds.
    pub tmin: f64,
}

impl EpochsArray {
    pub fn n_epochs(&self) -> usize {
        self.data.dim().0
    }

    /// Window sample times in seconds.
    pub fn times(&self) -> Vec<f64> {
        sample_times_ms(self.tmin * 1000.0, self.data.dim().2, self.info.sfreq)
            .into_iter()
            .map(|t| t / 1000.0)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub enum MneData {
    Raw(RawArray),
    Epochs(EpochsArray),
}

impl MneData {
    pub fn from_eeg(eeg: EegData) -> Result<Self> {
        let labels = eeg.channel_labels()?;
        check_channels(&labels, eeg.data.dim().1)?;
        let info = Info::eeg(labels, eeg.sfreq);

        if eeg.is_segmented() {
            let tmin = eeg.window.effective_start_ms() / 1000.0;
            return Ok(MneData::Epochs(EpochsArray { data: eeg.data, info, tmin }));
        }
        if eeg.data.dim().0 == 0 {
            return Err(CmlError::Format("continuous recording has no segments".into()));
        }
        let data = eeg.data.index_axis(Axis(0), 0).to_owned();
        Ok(MneData::Raw(RawArray { data, info, first_samp: 0 }))
    }

    pub fn info(&self) -> &Info {
        match self {
            MneData::Raw(r) => &r.info,
            MneData::Epochs(e) => &e.info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EpochWindow;
    use crate::table::Table;

    fn eeg(window: EpochWindow, segmented: bool) -> EegData {
        let channels = Table::from_reader("label\nFz\nCz\n".as_bytes()).unwrap();
        let events = segmented
            .then(|| Table::from_reader("eegoffset\n100\n200\n".as_bytes()).unwrap());
        let shape = if segmented { (2, 2, 5) } else { (1, 2, 5) };
        EegData {
            data: Array3::from_shape_fn(shape, |(e, c, t)| (e * 100 + c * 10 + t) as f64),
            sfreq: 500.0,
            channels,
            events,
            window,
        }
    }

    #[test]
    fn continuous_time_axis_starts_at_zero() {
        let ts = TimeSeries::from_eeg(eeg(EpochWindow::continuous(), false)).unwrap();
        assert_eq!(ts.time, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert!(ts.event.is_none());
        assert_eq!(ts.sel_channel("Cz").unwrap()[[0, 1]], 11.0);
    }

    #[test]
    fn segmented_time_axis_includes_buffer() {
        let w = EpochWindow::new(-4.0, 4.0).with_buffer(2.0);
        let ts = TimeSeries::from_eeg(eeg(w, true)).unwrap();
        assert_eq!(ts.time, vec![-6.0, -4.0, -2.0, 0.0, 2.0]);
        assert_eq!(ts.event.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn raw_and_epochs_containers() {
        match MneData::from_eeg(eeg(EpochWindow::continuous(), false)).unwrap() {
            MneData::Raw(raw) => {
                assert_eq!(raw.data.dim(), (2, 5));
                assert_eq!(raw.info.ch_types, ["eeg", "eeg"]);
                approx::assert_abs_diff_eq!(raw.times()[4], 0.008, epsilon = 1e-12);
            }
            other => panic!("expected raw, got {other:?}"),
        }

        let w = EpochWindow::new(-100.0, 200.0).with_buffer(50.0);
        match MneData::from_eeg(eeg(w, true)).unwrap() {
            MneData::Epochs(ep) => {
                assert_eq!(ep.n_epochs(), 2);
                approx::assert_abs_diff_eq!(ep.tmin, -0.15, epsilon = 1e-12);
            }
            other => panic!("expected epochs, got {other:?}"),
        }
    }

    #[test]
    fn label_count_mismatch_rejected() {
        let mut e = eeg(EpochWindow::continuous(), false);
        e.channels = Table::from_reader("label\nFz\n".as_bytes()).unwrap();
        assert!(matches!(TimeSeries::from_eeg(e).unwrap_err(), CmlError::Format(_)));
    }
}
