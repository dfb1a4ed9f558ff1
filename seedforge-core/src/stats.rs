//! Batch generation for measuring seed characteristics.
//!
//! Runs on a worker thread and reports over a channel so a front end can
//! show progress and cancel between seeds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::generator::{GenerationOptions, Generator};
use crate::layout::StandardLayout;
use crate::world::Layout;
use crate::SeedError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRequest {
    /// Everything except the seed, which runs from `base_seed` upward.
    pub options: GenerationOptions,
    pub base_seed: u64,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatEvent {
    Progress { current: usize, total: usize },
    Completed { message: String },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatReport {
    pub requested: usize,
    pub generated: usize,
    pub successes: usize,
    pub failures: usize,
    pub cancelled: bool,
    /// Fill attempts summed over successful seeds.
    pub total_attempts: usize,
    pub min_spheres: Option<usize>,
    pub max_spheres: Option<usize>,
    pub mean_spheres: f64,
    /// How often each location held a progression item, keyed by
    /// `"<player>: <location>"`.
    pub progression_by_location: BTreeMap<String, usize>,
}

impl StatReport {
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} of {} seed(s) generated: {} succeeded, {} failed",
            self.generated, self.requested, self.successes, self.failures
        );
        if let (Some(min), Some(max)) = (self.min_spheres, self.max_spheres) {
            text.push_str(&format!(
                ", spheres {min}..={max} (mean {:.1})",
                self.mean_spheres
            ));
        }
        if self.cancelled {
            text.push_str(" [cancelled]");
        }
        text
    }
}

/// Generates `request.count` seeds on the calling thread. `cancel` is
/// checked before each seed; `on_event` sees progress after each one and a
/// final `Completed`.
pub fn run_stats<F>(
    layout: &dyn Layout,
    request: &StatRequest,
    cancel: &AtomicBool,
    mut on_event: F,
) -> StatReport
where
    F: FnMut(StatEvent),
{
    let mut report = StatReport {
        requested: request.count,
        ..StatReport::default()
    };
    let mut sphere_total = 0usize;
    let mut generator = Generator::new(layout);

    for i in 0..request.count {
        if cancel.load(Ordering::Relaxed) {
            report.cancelled = true;
            break;
        }

        let options = GenerationOptions {
            seed: Some(request.base_seed.wrapping_add(i as u64)),
            ..request.options.clone()
        };
        let mut stop = false;
        match generator.generate_seed(&options) {
            Ok(data) => {
                report.successes += 1;
                report.total_attempts += data.attempts;
                let spheres = data.playthrough.len();
                sphere_total += spheres;
                report.min_spheres = Some(report.min_spheres.map_or(spheres, |m| m.min(spheres)));
                report.max_spheres = Some(report.max_spheres.map_or(spheres, |m| m.max(spheres)));
                for world in &data.worlds {
                    for placed in world.locations.iter().filter(|p| p.item.is_progression()) {
                        *report
                            .progression_by_location
                            .entry(format!("{}: {}", world.player + 1, placed.location))
                            .or_insert(0) += 1;
                    }
                }
            }
            Err(SeedError::Validation(msg)) => {
                // Every seed would fail the same way.
                log::warn!("stat run stopped: {msg}");
                report.failures += 1;
                stop = true;
            }
            Err(err) => {
                log::debug!("stat seed {} failed: {err}", i);
                report.failures += 1;
            }
        }
        report.generated += 1;
        on_event(StatEvent::Progress {
            current: report.generated,
            total: request.count,
        });
        if stop {
            break;
        }
    }

    if report.successes > 0 {
        report.mean_spheres = sphere_total as f64 / report.successes as f64;
    }
    on_event(StatEvent::Completed {
        message: report.summary(),
    });
    report
}

/// Background stat run.
pub struct StatHandle {
    events: Receiver<StatEvent>,
    cancel: Arc<AtomicBool>,
    worker: JoinHandle<StatReport>,
}

impl StatHandle {
    pub fn events(&self) -> &Receiver<StatEvent> {
        &self.events
    }

    /// Stops the run before its next seed.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    pub fn join(self) -> thread::Result<StatReport> {
        self.worker.join()
    }
}

/// Starts a stat run over the standard layout on its own thread.
pub fn spawn_stats(request: StatRequest) -> StatHandle {
    let (tx, rx) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    let worker = thread::spawn(move || {
        run_stats(&StandardLayout, &request, &flag, |event| {
            // Receiver may be gone if the caller stopped listening.
            let _ = tx.send(event);
        })
    });

    StatHandle {
        events: rx,
        cancel,
        worker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn request(count: usize) -> StatRequest {
        StatRequest {
            options: GenerationOptions::default(),
            base_seed: 100,
            count,
        }
    }

    #[test]
    fn counts_every_seed() {
        let cancel = AtomicBool::new(false);
        let mut events = Vec::new();
        let report = run_stats(&StandardLayout, &request(3), &cancel, |e| events.push(e));
        assert_eq!(report.generated, 3);
        assert_eq!(report.successes + report.failures, 3);
        assert_eq!(events.len(), 4);
        assert_eq!(events[2], StatEvent::Progress { current: 3, total: 3 });
        assert!(matches!(events[3], StatEvent::Completed { .. }));
        assert!(report.successes > 0);
        assert!(report.min_spheres <= report.max_spheres);
        assert!(!report.progression_by_location.is_empty());
    }

    #[test]
    fn cancelled_before_start_generates_nothing() {
        let cancel = AtomicBool::new(true);
        let mut events = Vec::new();
        let report = run_stats(&StandardLayout, &request(5), &cancel, |e| events.push(e));
        assert!(report.cancelled);
        assert_eq!(report.generated, 0);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn invalid_options_stop_early() {
        let cancel = AtomicBool::new(false);
        let req = StatRequest {
            options: GenerationOptions {
                configs: vec![Config {
                    crystals_required: 9,
                    ..Config::default()
                }],
                ..GenerationOptions::default()
            },
            base_seed: 0,
            count: 10,
        };
        let mut events = Vec::new();
        let report = run_stats(&StandardLayout, &req, &cancel, |e| events.push(e));
        assert_eq!(report.generated, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StatEvent::Progress { current: 1, total: 10 });
        assert!(matches!(&events[1], StatEvent::Completed { message } if message.contains("1 of 10")));
    }
}
