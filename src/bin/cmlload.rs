use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use cmlload::{init_tracing, CmlLoad, EpochWindow, LoaderConfig, LogErr, StWriter};

#[derive(Parser)]
#[command(name = "cmlload", about = "Inspect exported EEG sessions and cut event epochs")]
struct Args {
    /// Exported data directory (holds index.json)
    #[arg(long, env = "CMLLOAD_DATA_DIR")]
    data_dir: PathBuf,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List sessions in the index
    Index {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        experiment: Option<String>,
    },
    /// Load one session and write its (epoched) EEG to a safetensors file
    Epochs {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        experiment: String,
        #[arg(long)]
        session: String,

        /// Window start relative to each event (ms)
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        start: f64,

        /// Window length (ms); omit for the continuous recording
        #[arg(long)]
        len: Option<f64>,

        /// Buffer added to both ends of each window (ms)
        #[arg(long)]
        buf: Option<f64>,

        /// Fail on NaN in the output
        #[arg(long)]
        strict: bool,

        /// Output safetensors path
        #[arg(long)]
        output: PathBuf,

        /// Failures are also appended to logfile_<suffix>.txt
        #[arg(long, default_value = "")]
        log_suffix: String,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cml = CmlLoad::new(LoaderConfig::new(&args.data_dir));

    match args.cmd {
        Cmd::Index { subject, experiment } => {
            let index = cml.index()?;
            let rows = index.select(subject.as_deref(), experiment.as_deref());
            for row in &rows {
                println!("{}", row.dfr_label());
            }
            println!("{} of {} sessions", rows.len(), index.len());
        }
        Cmd::Epochs {
            subject,
            experiment,
            session,
            start,
            len,
            buf,
            strict,
            output,
            log_suffix,
        } => {
            let index = cml.index()?;
            let row = index
                .find(&subject, &experiment, &session)
                .with_context(|| format!("no session {subject} {experiment} {session} in index"))?;
            let window = EpochWindow { start_ms: start, len_ms: len, buf_ms: buf };

            let eeg = match cml.load_eeg(row, &window, Some(strict)) {
                Ok(eeg) => eeg,
                Err(e) => {
                    LogErr::new().arg(row.dfr_label()).err(&e).suffix(&log_suffix).write()?;
                    return Err(e.into());
                }
            };
            info!(shape = ?eeg.data.dim(), sfreq = eeg.sfreq, "loaded {}", row.label());

            let mut w = StWriter::new();
            w.add_f64_arr3("data", &eeg.data);
            w.set_metadata("samplerate", eeg.sfreq);
            w.set_metadata("session", row.label());
            if let Some(events) = &eeg.events {
                let offsets = events.eegoffsets()?;
                w.add_i64("eegoffset", &offsets, &[offsets.len()]);
            }
            w.write(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Written → {}", output.display());
        }
    }
    Ok(())
}
