//! Scheduler: one independent collection loop per target.

use crate::collector::TargetCollector;
use crate::config::Target;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Owns one timer task per target. Targets never share collection state, so
/// a hung probe on one target cannot delay another's ticks.
pub struct Scheduler {
    collector: Arc<TargetCollector>,
    interval: Duration,
    stop_chans: Arc<RwLock<HashMap<String, tokio::sync::broadcast::Sender<()>>>>,
}

impl Scheduler {
    pub fn new(collector: Arc<TargetCollector>, interval: Duration) -> Self {
        Self {
            collector,
            interval,
            stop_chans: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a collection loop for every target.
    pub async fn start(&self, targets: Vec<Target>) {
        tracing::info!("Starting scheduler with {} targets", targets.len());
        for target in targets {
            self.add_target(target).await;
        }
    }

    /// Start the collection loop for one target. Target names are unique; a
    /// second add for the same name is a no-op.
    pub async fn add_target(&self, target: Target) {
        let mut stop_chans = self.stop_chans.write().await;

        if stop_chans.contains_key(&target.name) {
            return; // Already running
        }

        let (stop_tx, _) = tokio::sync::broadcast::channel(1);
        stop_chans.insert(target.name.clone(), stop_tx.clone());
        drop(stop_chans);

        tracing::info!("Scheduler: Adding target {}", target.name);

        let collector = self.collector.clone();
        let interval = self.interval;
        let stop_chans = self.stop_chans.clone();
        let name = target.name.clone();

        tokio::spawn(async move {
            run_collect_loop(target, collector, interval, stop_tx.subscribe()).await;

            // Clean up when done
            let mut chans = stop_chans.write().await;
            chans.remove(&name);
        });
    }

    /// Stop issuing ticks for every target. In-flight collections run to
    /// completion.
    pub async fn stop_all(&self) {
        let stop_chans = self.stop_chans.read().await;
        for (name, stop_tx) in stop_chans.iter() {
            if stop_tx.send(()).is_ok() {
                tracing::info!("Scheduler: Stopped target {}", name);
            }
        }
    }
}

/// Run the collection loop for a single target until stopped.
///
/// The collection is awaited inline, so at most one is in flight per target;
/// an overlong tick delays the next one rather than running alongside it.
async fn run_collect_loop(
    target: Target,
    collector: Arc<TargetCollector>,
    interval: Duration,
    mut stop_rx: tokio::sync::broadcast::Receiver<()>,
) {
    // Stagger loop starts so all targets don't fork subprocesses at once
    let jitter = rand::random::<u64>() % 1000;
    tokio::time::sleep(Duration::from_millis(jitter)).await;

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                break;
            }
            _ = ticker.tick() => {
                collector.collect(&target).await;
            }
        }
    }
}
