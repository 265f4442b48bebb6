// Periodic automation trigger. Sweeps every due draft on a fixed period so
// deadlines lapse even when no client is connected.

use std::time::Duration;

use draftday_core::clock::Clock;
use draftday_core::engine::Engine;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Run automation every `period` until `shutdown` flips to `true` or its
/// sender is dropped. The first sweep runs immediately so a restart catches
/// up on anything that lapsed while the process was down.
///
/// Returns the number of sweeps performed.
pub async fn run_ticker<C: Clock>(
    engine: &Engine<C>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0u64;

    info!("Ticker started, sweeping every {:?}", period);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                ticks += 1;
                match engine.process_due_drafts(None) {
                    Ok(report) if report.is_empty() => {}
                    Ok(report) => info!(
                        "Sweep {}: started={} auto_picks={} completed={} failed={}",
                        ticks,
                        report.started_drafts,
                        report.auto_picks,
                        report.completed_drafts,
                        report.failed_drafts
                    ),
                    Err(e) => error!("Sweep {} failed: {}", ticks, e),
                }
            }

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Ticker stopped after {} sweeps", ticks);
    ticks
}
