//! Synthetic log and metric fabrication. Stateless from the orchestrator's
//! view apart from the capped log buffer, the last-batch metric snapshot, and
//! the injected cumulative counters.

mod metrics;
mod templates;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::info;

use super::models::{LogEntry, Metric};

/// The buffer keeps only the most recent entries.
const LOG_BUFFER_CAP: usize = 50_000;

#[derive(Default, Clone, Copy)]
struct Totals {
    logs: u64,
    metrics: u64,
}

/// Process-wide cumulative counters, injected into the generator at boot.
/// Updates are monotonic under a single lock.
#[derive(Default)]
pub struct GeneratorStats {
    totals: Mutex<Totals>,
}

impl GeneratorStats {
    fn bump_logs(&self, n: u64) -> Totals {
        let mut totals = self.totals.lock().expect("stats lock poisoned");
        totals.logs += n;
        *totals
    }

    fn bump_metrics(&self, n: u64) {
        let mut totals = self.totals.lock().expect("stats lock poisoned");
        totals.metrics += n;
    }

    #[cfg(test)]
    pub(crate) fn generated_logs_total(&self) -> u64 {
        self.totals.lock().expect("stats lock poisoned").logs
    }
}

pub struct Generator {
    logs: RwLock<Vec<LogEntry>>,
    metrics: RwLock<Vec<Metric>>,
    stats: Arc<GeneratorStats>,
}

impl Generator {
    pub fn new(stats: Arc<GeneratorStats>) -> Self {
        Self {
            logs: RwLock::new(Vec::new()),
            metrics: RwLock::new(Vec::new()),
            stats,
        }
    }

    /// Fabricates `count` log entries shaped by `scenario`, appends them to
    /// the buffer, and recomputes the metric snapshot from the batch.
    pub async fn generate(&self, count: usize, scenario: &str) -> Vec<LogEntry> {
        let mut batch = Vec::with_capacity(count);
        for _ in 0..count {
            batch.push(templates::fabricate_log(scenario));
            let pause = pacing_delay();
            tokio::time::sleep(pause).await;
        }

        let total_logs = {
            let mut logs = self.logs.write().await;
            logs.extend(batch.iter().cloned());
            if logs.len() > LOG_BUFFER_CAP {
                let overflow = logs.len() - LOG_BUFFER_CAP;
                logs.drain(..overflow);
            }
            logs.len()
        };

        let totals = self.stats.bump_logs(batch.len() as u64);
        let snapshot = metrics::snapshot_from_batch(&batch, totals.logs, totals.metrics);
        self.stats.bump_metrics(snapshot.len() as u64);

        let metrics_now = snapshot.len();
        *self.metrics.write().await = snapshot;

        info!(
            generated = batch.len(),
            scenario, total_logs, metrics_now, "batch generated"
        );

        batch
    }

    /// The most recent `limit` entries matching the filters, in chronological
    /// order.
    pub async fn logs(
        &self,
        limit: usize,
        service: Option<&str>,
        level: Option<&str>,
    ) -> Vec<LogEntry> {
        let logs = self.logs.read().await;
        let mut selected: Vec<LogEntry> = logs
            .iter()
            .rev()
            .filter(|entry| service.is_none_or(|s| entry.service == s))
            .filter(|entry| level.is_none_or(|l| entry.level == l))
            .take(limit)
            .cloned()
            .collect();
        selected.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        selected
    }

    pub async fn metrics(&self) -> Vec<Metric> {
        self.metrics.read().await.clone()
    }

    pub async fn prometheus_text(&self) -> String {
        metrics::encode_prometheus(&self.metrics.read().await)
    }

    /// Counts by service, level, and status over the whole buffer.
    pub async fn statistics(&self) -> serde_json::Value {
        let logs = self.logs.read().await;
        let mut services: HashMap<String, usize> = HashMap::new();
        let mut levels: HashMap<String, usize> = HashMap::new();
        let mut statuses: HashMap<String, usize> = HashMap::new();

        for entry in logs.iter() {
            *services.entry(entry.service.clone()).or_default() += 1;
            *levels.entry(entry.level.clone()).or_default() += 1;
            *statuses.entry(entry.status.to_string()).or_default() += 1;
        }

        json!({
            "total_logs": logs.len(),
            "services": services,
            "levels": levels,
            "statuses": statuses,
        })
    }

    pub fn format_text(logs: &[LogEntry]) -> String {
        let mut out = String::new();
        for entry in logs {
            out.push_str(&format!(
                "{} [{}] {}: {} {} {} {}ms\n",
                entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                entry.level,
                entry.service,
                entry.method,
                entry.path,
                entry.status,
                entry.duration_ms,
            ));
        }
        out
    }
}

fn pacing_delay() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(10..60))
}
