use seedforge_core::stats::{spawn_stats, StatEvent, StatRequest};
use seedforge_core::GenerationOptions;
use std::time::Duration;

#[test]
fn background_run_reports_progress_then_completes() {
    let handle = spawn_stats(StatRequest {
        options: GenerationOptions::default(),
        base_seed: 500,
        count: 3,
    });

    let mut progress = Vec::new();
    let message = loop {
        match handle.events().recv_timeout(Duration::from_secs(60)) {
            Ok(StatEvent::Progress { current, total }) => progress.push((current, total)),
            Ok(StatEvent::Completed { message }) => break message,
            Err(err) => panic!("stat worker went quiet: {err}"),
        }
    };

    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    assert!(message.contains("3 of 3"));
    let report = handle.join().unwrap();
    assert!(!report.cancelled);
    assert_eq!(report.successes + report.failures, 3);
}

#[test]
fn cancel_stops_between_seeds() {
    let handle = spawn_stats(StatRequest {
        options: GenerationOptions::default(),
        base_seed: 0,
        count: 10_000,
    });
    handle.cancel();

    let report = handle.join().unwrap();
    assert!(report.cancelled);
    assert!(report.generated < 10_000);
    assert!(report.summary().ends_with("[cancelled]"));
}
