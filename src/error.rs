//! Error taxonomy shared by every loader, extractor and dispatch call.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmlError {
    /// A data file is missing or cannot be opened.
    #[error("file not found: {0}")]
    NotFound(String),

    /// Parameters are internally inconsistent (e.g. a window that is too
    /// short for its padding).  Raised before any work is done.
    #[error("invalid parameters: {0}")]
    Validation(String),

    /// Strict mode found NaN in the output.
    #[error("nans in eeg data for {0}")]
    DataQuality(String),

    /// A file was readable but its contents did not have the expected shape.
    #[error("invalid format: {0}")]
    Format(String),

    /// One or more dispatched jobs reported failure.
    #[error("{}", jobs_failed_message(.failed, .total))]
    JobsFailed {
        failed: usize,
        total: usize,
        /// `Display` rendering of each failing parameter, in input order.
        params: Vec<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

fn jobs_failed_message(failed: &usize, total: &usize) -> String {
    if failed == total {
        format!("All {total} jobs failed!")
    } else {
        format!("{failed} of {total} jobs failed!")
    }
}

pub type Result<T> = std::result::Result<T, CmlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_failed_wording() {
        let all = CmlError::JobsFailed { failed: 3, total: 3, params: vec![] };
        assert_eq!(all.to_string(), "All 3 jobs failed!");
        let some = CmlError::JobsFailed { failed: 2, total: 5, params: vec![] };
        assert_eq!(some.to_string(), "2 of 5 jobs failed!");
    }

    #[test]
    fn data_quality_names_session() {
        let e = CmlError::DataQuality("R1001P FR1 0".into());
        assert_eq!(e.to_string(), "nans in eeg data for R1001P FR1 0");
    }
}
