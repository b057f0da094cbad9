//! Event-aligned epoching.
//!
//! Cuts a continuous `[S, C, T]` recording (segment, channel, sample) into an
//! `[E, C, W]` tensor with one window per event.  Only segment 0 is read.
//!
//! ```text
//! eegoffset ─────────────┐
//!                        ▼
//!   ... ──┬──────┬───────┼─────────────┬──────┬── ... samples
//!         │ buf  │ start │   len       │ buf  │
//!         st ◄────────────────────────────────► en   (W = en − st)
//! ```
//!
//! A window that runs past either end of the recording, even by one sample,
//! comes back as a row of NaN.  Rows are never partially filled.
use ndarray::{s, Array3, ArrayBase, Data, Dimension};
use tracing::{debug, warn};

use crate::config::EpochWindow;
use crate::error::{CmlError, Result};

/// Convert a millisecond span to a sample count, rounding half to even.
#[inline]
pub fn ms_to_samples(ms: f64, sfreq: f64) -> i64 {
    (ms * sfreq / 1000.0).round_ties_even() as i64
}

/// An [`EpochWindow`] converted to sample units at one sampling rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSamples {
    /// Window start relative to `eegoffset`, buffer included.
    pub start: i64,
    /// Window length, both buffers included.
    pub len: usize,
    /// Buffer length on each side.
    pub buf: usize,
}

impl WindowSamples {
    /// Returns `Ok(None)` for a continuous window.
    ///
    /// # Errors
    ///
    /// [`CmlError::Validation`] if `sfreq` is not positive, the buffer is
    /// negative, or the window yields no samples beyond its two buffers.
    pub fn from_window(window: &EpochWindow, sfreq: f64) -> Result<Option<Self>> {
        let Some(len_ms) = window.effective_len_ms() else {
            return Ok(None);
        };
        if !(sfreq > 0.0) {
            return Err(CmlError::Validation(format!("sample rate must be positive, got {sfreq}")));
        }
        let buf = match window.buf_ms {
            Some(b) if b < 0.0 => {
                return Err(CmlError::Validation(format!(
                    "buffer must be non-negative, got {b} ms"
                )));
            }
            Some(b) => ms_to_samples(b, sfreq),
            None => 0,
        };
        let start = ms_to_samples(window.effective_start_ms(), sfreq);
        let len = ms_to_samples(len_ms, sfreq);
        if len <= 2 * buf {
            return Err(CmlError::Validation(format!(
                "event length of {} ms yields 0 or fewer samples",
                window.len_ms.unwrap_or(len_ms)
            )));
        }
        Ok(Some(Self { start, len: len as usize, buf: buf as usize }))
    }

    /// Absolute `[st, en)` sample range for an event at `eegoffset`.
    ///
    /// `None` when the range is not representable as `i64`; such a window
    /// lies outside any recording.
    #[inline]
    pub fn bounds(&self, eegoffset: i64) -> Option<(i64, i64)> {
        let st = eegoffset.checked_add(self.start)?;
        let en = st.checked_add(i64::try_from(self.len).ok()?)?;
        Some((st, en))
    }
}

/// Cut one window per event out of `data` (`[S, C, T]`) into `[E, C, W]`.
///
/// Rows whose window does not lie entirely inside `[0, T]` stay NaN.
pub fn extract_epochs(data: &Array3<f64>, eegoffsets: &[i64], w: &WindowSamples) -> Array3<f64> {
    let (n_seg, n_ch, n_t) = data.dim();
    let mut out = Array3::from_elem((eegoffsets.len(), n_ch, w.len), f64::NAN);

    let mut dropped = 0usize;
    for (i, &off) in eegoffsets.iter().enumerate() {
        match w.bounds(off) {
            Some((st, en)) if n_seg > 0 && st >= 0 && en <= n_t as i64 => {
                out.slice_mut(s![i, .., ..])
                    .assign(&data.slice(s![0, .., st as usize..en as usize]));
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(dropped, total = eegoffsets.len(), "event windows outside recording left as NaN");
    }
    out
}

/// Segment a continuous recording around events.
///
/// A continuous `window` hands `data` back untouched.  Otherwise the window
/// is validated before anything is allocated and [`extract_epochs`] runs.
pub fn segment(
    data: Array3<f64>,
    sfreq: f64,
    eegoffsets: &[i64],
    window: &EpochWindow,
) -> Result<Array3<f64>> {
    match WindowSamples::from_window(window, sfreq)? {
        None => Ok(data),
        Some(w) => {
            debug!(events = eegoffsets.len(), start = w.start, len = w.len, "segmenting");
            Ok(extract_epochs(&data, eegoffsets, &w))
        }
    }
}

/// Strict-mode check: fail if any element is NaN.
///
/// `label` names the session in the error.
pub fn check_finite<S, D>(data: &ArrayBase<S, D>, label: &str) -> Result<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if data.iter().any(|v| v.is_nan()) {
        return Err(CmlError::DataQuality(label.to_string()));
    }
    Ok(())
}

/// Discard `n` samples from both ends of every epoch.
///
/// Pairs with [`WindowSamples::buf`] to recover the unbuffered window.
/// `n` is clamped to half the window, so an oversized buffer yields an
/// empty (or single-sample) core.
pub fn strip_buffer(epochs: &Array3<f64>, n: usize) -> Array3<f64> {
    let w = epochs.dim().2;
    let n = n.min(w / 2);
    epochs.slice(s![.., .., n..w - n]).to_owned()
}
