//! Blocking parallel map over a list of job parameters.
//!
//! [`cluster_run`] starts a worker pool of `min(jobs, max_cores)` threads,
//! runs `f` once per parameter and returns the results in parameter order.
//! [`cluster_checked`] additionally treats each result as a success flag
//! (see [`JobOutcome`]) and turns any failure into
//! [`CmlError::JobsFailed`] after every job has finished.
//!
//! ```
//! use cmlload::cluster::{cluster_checked, cluster_run, ClusterConfig};
//!
//! let cfg = ClusterConfig::default();
//! let squares = cluster_run(|x: &u32| x * x, &[1, 2, 3], &cfg).unwrap();
//! assert_eq!(squares, vec![1, 4, 9]);
//!
//! let err = cluster_checked(|x: &u32| x % 2 == 1, &[1, 2, 3], &cfg).unwrap_err();
//! assert_eq!(err.to_string(), "1 of 3 jobs failed!");
//! ```
use rayon::prelude::*;
use std::fmt::Display;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{info, warn};

use crate::error::{CmlError, Result};

/// Worker pool limits.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Upper bound on concurrently running jobs.
    ///
    /// Default: `100`.
    pub max_cores: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self { max_cores: 100 }
    }
}

/// Success flag of a finished job.
pub trait JobOutcome {
    fn succeeded(&self) -> bool;
}

impl JobOutcome for bool {
    fn succeeded(&self) -> bool {
        *self
    }
}

impl<T> JobOutcome for Option<T> {
    fn succeeded(&self) -> bool {
        self.is_some()
    }
}

impl<T, E> JobOutcome for std::result::Result<T, E> {
    fn succeeded(&self) -> bool {
        self.is_ok()
    }
}

/// Run `f` on every parameter and block until all results are in.
///
/// Results are in the order of `params`; execution order is unspecified.
/// A panicking job propagates its panic to the caller once the pool
/// unwinds.
pub fn cluster_run<P, R, F>(f: F, params: &[P], cfg: &ClusterConfig) -> Result<Vec<R>>
where
    P: Sync,
    R: Send,
    F: Fn(&P) -> R + Sync + Send,
{
    if params.is_empty() {
        return Ok(Vec::new());
    }
    let workers = params.len().min(cfg.max_cores.max(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("cluster-{i}"))
        .build()?;
    info!(jobs = params.len(), workers, "dispatching jobs");
    Ok(pool.install(|| params.par_iter().map(&f).collect()))
}

/// [`cluster_run`], then fail if any job reported failure.
///
/// A job fails when its result is falsy or it panics.  All jobs run to
/// completion first.  When only some fail, their parameters are printed in
/// `Display` form before the error is returned; the error carries them as
/// well.
pub fn cluster_checked<P, R, F>(f: F, params: &[P], cfg: &ClusterConfig) -> Result<()>
where
    P: Sync + Display,
    R: JobOutcome + Send,
    F: Fn(&P) -> R + Sync + Send,
{
    let outcomes = cluster_run(
        |p: &P| match catch_unwind(AssertUnwindSafe(|| f(p))) {
            Ok(r) => r.succeeded(),
            Err(_) => {
                warn!(param = %p, "job panicked");
                false
            }
        },
        params,
        cfg,
    )?;

    let total = outcomes.len();
    let failed: Vec<String> = params
        .iter()
        .zip(&outcomes)
        .filter(|(_, ok)| !**ok)
        .map(|(p, _)| p.to_string())
        .collect();

    if failed.is_empty() {
        println!("All {total} jobs successful.");
        return Ok(());
    }
    if failed.len() < total {
        println!("Error on job parameters:\n  {}", failed.join("\n  "));
    }
    warn!(failed = failed.len(), total, "jobs failed");
    Err(CmlError::JobsFailed { failed: failed.len(), total, params: failed })
}
