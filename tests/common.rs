/// Shared helpers: build an exported data directory on disk.
use cmlload::{write_signal, CmlLoad, LoaderConfig, Row};
use ndarray::Array3;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

#[allow(unused)]
/// `[1, C, T]` with a distinct value at every (channel, sample).
pub fn ramp_signal(n_ch: usize, n_t: usize) -> Array3<f64> {
    Array3::from_shape_fn((1, n_ch, n_t), |(_, c, t)| c as f64 * 1.0e5 + t as f64)
}

#[allow(unused)]
/// Write one session's files under `root` and return its index record.
pub fn write_session(
    root: &Path,
    (subject, experiment, session): (&str, &str, i64),
    data: &Array3<f64>,
    sfreq: f64,
    eegoffsets: &[i64],
) -> serde_json::Value {
    let rel = format!("{subject}/{experiment}/{session}");
    let dir = root.join(&rel);
    std::fs::create_dir_all(&dir).unwrap();

    write_signal(&dir.join("eeg.safetensors"), data, sfreq).unwrap();

    let mut channels = String::from("contact,label,type\n");
    for c in 0..data.dim().1 {
        channels.push_str(&format!("{},E{},EEG\n", c + 1, c + 1));
    }
    std::fs::write(dir.join("channels.csv"), channels).unwrap();

    let mut events = String::from("eegoffset,type,item\n");
    for (i, off) in eegoffsets.iter().enumerate() {
        events.push_str(&format!("{off},WORD,W{i}\n"));
    }
    std::fs::write(dir.join("events.csv"), events).unwrap();

    json!({
        "subject": subject,
        "experiment": experiment,
        "session": session,
        "eeg_file": format!("{rel}/eeg.safetensors"),
        "channels_file": format!("{rel}/channels.csv"),
        "events_file": format!("{rel}/events.csv"),
    })
}

#[allow(unused)]
/// Write `index.json` in the records layout.
pub fn write_index(root: &Path, records: &[serde_json::Value]) {
    std::fs::write(root.join("index.json"), serde_json::to_string(records).unwrap()).unwrap();
}

#[allow(unused)]
/// A data directory holding one session; returns the loader and its row.
pub fn single_session(
    data: &Array3<f64>,
    sfreq: f64,
    eegoffsets: &[i64],
) -> (TempDir, CmlLoad, Row) {
    let dir = tempfile::tempdir().unwrap();
    let record = write_session(dir.path(), ("R1001P", "FR1", 0), data, sfreq, eegoffsets);
    write_index(dir.path(), &[record]);

    let cml = CmlLoad::new(LoaderConfig::new(dir.path()));
    let row = cml.index().unwrap().get(0).unwrap().clone();
    (dir, cml, row)
}
