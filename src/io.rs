//! Safetensors I/O for continuous signal files.
//!
//! A signal file holds one dataset named `data`, shape `[S, C, T]`
//! (segment, channel, sample), dtype `F32` or `F64`, and the sampling rate
//! as a string in the header's `__metadata__` block:
//!
//! ```text
//! { "__metadata__": { "samplerate": "500" },
//!   "data": { "dtype": "F64", "shape": [1, 64, 1800000], "data_offsets": [0, …] } }
//! ```
//!
//! [`SignalFile::open`] reads the header only, so window parameters can be
//! validated against the sampling rate before the bulk read.
use ndarray::Array3;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CmlError, Result};

/// Dataset name inside every signal file.
pub const DATASET: &str = "data";
/// Metadata key carrying the sampling rate.
pub const SAMPLERATE_KEY: &str = "samplerate";

// ── Header parsing ───────────────────────────────────────────────────────────

type Header = serde_json::Map<String, serde_json::Value>;

/// `file_len` bounds the declared header length before anything is allocated.
fn read_header<R: Read>(r: &mut R, file_len: u64) -> Result<(Header, u64)> {
    let mut len = [0u8; 8];
    r.read_exact(&mut len)
        .map_err(|e| CmlError::Format(format!("safetensors file too small: {e}")))?;
    let n = u64::from_le_bytes(len);
    if n > file_len.saturating_sub(8) {
        return Err(CmlError::Format(format!("header length {n} exceeds file size {file_len}")));
    }
    let mut buf = vec![0u8; n as usize];
    r.read_exact(&mut buf)
        .map_err(|e| CmlError::Format(format!("truncated safetensors header: {e}")))?;
    let header: Header = serde_json::from_slice(&buf)?;
    Ok((header, 8 + n))
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .ok_or_else(|| CmlError::Format("tensor entry has no shape".into()))?
        .iter()
        .map(|v| {
            v.as_u64()
                .map(|d| d as usize)
                .ok_or_else(|| CmlError::Format(format!("bad shape dimension {v}")))
        })
        .collect()
}

fn offsets_of(entry: &serde_json::Value) -> Result<(u64, u64)> {
    let offsets = entry["data_offsets"]
        .as_array()
        .ok_or_else(|| CmlError::Format("tensor entry has no data_offsets".into()))?;
    match (offsets.first().and_then(|v| v.as_u64()), offsets.get(1).and_then(|v| v.as_u64())) {
        (Some(s), Some(e)) if e >= s => Ok((s, e)),
        _ => Err(CmlError::Format(format!("bad data_offsets {offsets:?}"))),
    }
}

// ── SignalFile ───────────────────────────────────────────────────────────────

/// Element type of the stored dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    F32,
    F64,
}

impl Dtype {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "F32" => Ok(Dtype::F32),
            "F64" => Ok(Dtype::F64),
            other => Err(CmlError::Format(format!("unsupported signal dtype {other}"))),
        }
    }

    fn size(self) -> usize {
        match self {
            Dtype::F32 => 4,
            Dtype::F64 => 8,
        }
    }
}

/// An opened signal file: header parsed, samples not yet read.
#[derive(Debug, Clone)]
pub struct SignalFile {
    pub path: PathBuf,
    /// Sampling rate in Hz.
    pub sfreq: f64,
    /// `(segments, channels, samples)`.
    pub shape: (usize, usize, usize),
    pub dtype: Dtype,
    /// Absolute byte range of the dataset.
    range: (u64, u64),
}

impl SignalFile {
    /// Parse the header of the signal file at `path`.
    ///
    /// # Errors
    ///
    /// [`CmlError::NotFound`] when the file cannot be opened;
    /// [`CmlError::Format`] for a malformed header, a missing dataset or a
    /// missing / non-numeric sampling rate.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| CmlError::NotFound(format!("{}: {e}", path.display())))?;
        let file_len = file
            .metadata()
            .map_err(|e| CmlError::NotFound(format!("{}: {e}", path.display())))?
            .len();
        let (header, data_start) = read_header(&mut BufReader::new(file), file_len)?;

        let entry = header
            .get(DATASET)
            .ok_or_else(|| CmlError::Format(format!("missing '{DATASET}' dataset")))?;
        let dtype = Dtype::parse(entry["dtype"].as_str().unwrap_or_default())?;
        let dims = shape_of(entry)?;
        let shape = match dims[..] {
            [s, c, t] => (s, c, t),
            ref other => {
                return Err(CmlError::Format(format!(
                    "'{DATASET}' must be 3-D, got shape {other:?}"
                )));
            }
        };
        let (s, e) = offsets_of(entry)?;
        let n_bytes = shape
            .0
            .checked_mul(shape.1)
            .and_then(|n| n.checked_mul(shape.2))
            .and_then(|n| n.checked_mul(dtype.size()))
            .ok_or_else(|| CmlError::Format(format!("'{DATASET}' shape {shape:?} overflows")))?;
        if e - s != n_bytes as u64 {
            return Err(CmlError::Format(format!(
                "'{DATASET}' byte length {} does not match shape {shape:?}",
                e - s
            )));
        }
        let range = match (data_start.checked_add(s), data_start.checked_add(e)) {
            (Some(st), Some(en)) => (st, en),
            _ => return Err(CmlError::Format(format!("'{DATASET}' offsets [{s}, {e}) overflow"))),
        };

        let sfreq = header
            .get("__metadata__")
            .and_then(|m| m.get(SAMPLERATE_KEY))
            .and_then(|v| match v {
                serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
                other => other.as_f64(),
            })
            .ok_or_else(|| CmlError::Format(format!("missing '{SAMPLERATE_KEY}' attribute")))?;

        debug!(path = %path.display(), ?shape, sfreq, "opened signal file");
        Ok(Self {
            path: path.to_path_buf(),
            sfreq,
            shape,
            dtype,
            range,
        })
    }

    pub fn n_channels(&self) -> usize {
        self.shape.1
    }

    pub fn n_samples(&self) -> usize {
        self.shape.2
    }

    /// Read the whole dataset as `[S, C, T]` `f64`.
    ///
    /// # Errors
    ///
    /// [`CmlError::NotFound`] when the file can no longer be opened or its
    /// sample bytes cannot be read (e.g. the file was truncated after
    /// [`open`](Self::open)).
    pub fn read_data(&self) -> Result<Array3<f64>> {
        let unreadable =
            |e: std::io::Error| CmlError::NotFound(format!("{}: {e}", self.path.display()));
        let mut f = File::open(&self.path).map_err(unreadable)?;
        let file_len = f.metadata().map_err(unreadable)?.len();
        if self.range.1 > file_len {
            return Err(CmlError::NotFound(format!(
                "{}: samples end at byte {} but the file holds {file_len}",
                self.path.display(),
                self.range.1
            )));
        }
        f.seek(SeekFrom::Start(self.range.0)).map_err(unreadable)?;
        let mut raw = vec![0u8; (self.range.1 - self.range.0) as usize];
        f.read_exact(&mut raw).map_err(unreadable)?;

        let values: Vec<f64> = match self.dtype {
            Dtype::F32 => raw
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
                .collect(),
            Dtype::F64 => raw
                .chunks_exact(8)
                .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                .collect(),
        };
        Ok(Array3::from_shape_vec(self.shape, values)?)
    }
}

// ── Generic safetensors builder ──────────────────────────────────────────────

/// Simple safetensors writer for F32, F64 and I64 tensors plus string metadata.
///
/// ```rust,no_run
/// use cmlload::io::StWriter;
/// use ndarray::Array3;
/// use std::path::Path;
///
/// let mut w = StWriter::new();
/// w.add_f64_arr3("data", &Array3::zeros((1, 4, 1000)));
/// w.set_metadata("samplerate", "500");
/// w.write(Path::new("/tmp/eeg.safetensors")).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
    metadata: BTreeMap<String, String>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_f64_arr3(&mut self, name: &str, arr: &Array3<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, arr.shape());
    }

    pub fn add_i64(&mut self, name: &str, data: &[i64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I64", shape.to_vec()));
    }

    pub fn set_metadata(&mut self, key: &str, value: impl ToString) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut header_map = serde_json::Map::new();
        if !self.metadata.is_empty() {
            header_map.insert("__metadata__".into(), serde_json::json!(self.metadata));
        }
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes.into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();
        let mut f = File::create(path)?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

/// Write a continuous recording in the layout [`SignalFile::open`] reads.
pub fn write_signal(path: &Path, data: &Array3<f64>, sfreq: f64) -> Result<()> {
    let mut w = StWriter::new();
    w.add_f64_arr3(DATASET, data);
    w.set_metadata(SAMPLERATE_KEY, sfreq);
    w.write(path)
}
