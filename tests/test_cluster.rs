use cmlload::{cluster_checked, cluster_run, ClusterConfig, CmlError};
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn checked_reports_exactly_the_failing_parameters() {
    let ran = AtomicUsize::new(0);
    let params = [10, 20, 30, 40, 50];
    let err = cluster_checked(
        |p: &i32| {
            ran.fetch_add(1, Ordering::SeqCst);
            *p != 20 && *p != 40
        },
        &params,
        &ClusterConfig::default(),
    )
    .unwrap_err();

    assert_eq!(ran.load(Ordering::SeqCst), 5);
    match err {
        CmlError::JobsFailed { failed, total, params } => {
            assert_eq!((failed, total), (2, 5));
            assert_eq!(params, ["20", "40"]);
        }
        other => panic!("expected JobsFailed, got {other:?}"),
    }
}

#[test]
fn all_failed() {
    let err =
        cluster_checked(|_: &u8| false, &[1, 2, 3], &ClusterConfig { max_cores: 2 }).unwrap_err();
    assert_eq!(err.to_string(), "All 3 jobs failed!");
}

#[test]
fn all_succeeded() {
    let r = cluster_checked(|s: &&str| Some(s.len()), &["a", "bb"], &ClusterConfig::default());
    assert!(r.is_ok());
}

#[test]
fn panicking_job_counts_as_failure_and_others_finish() {
    let ran = AtomicUsize::new(0);
    let err = cluster_checked(
        |p: &u32| -> Result<(), String> {
            ran.fetch_add(1, Ordering::SeqCst);
            if *p == 3 {
                panic!("job {p} exploded");
            }
            Ok(())
        },
        &[1, 2, 3, 4],
        &ClusterConfig { max_cores: 4 },
    )
    .unwrap_err();
    assert_eq!(ran.load(Ordering::SeqCst), 4);
    assert_eq!(err.to_string(), "1 of 4 jobs failed!");
}

#[test]
fn run_preserves_order_with_one_worker() {
    let params: Vec<String> = (0..20).map(|i| format!("s{i}")).collect();
    let out =
        cluster_run(|s: &String| s.to_uppercase(), &params, &ClusterConfig { max_cores: 1 })
            .unwrap();
    assert_eq!(out[0], "S0");
    assert_eq!(out[19], "S19");
}
