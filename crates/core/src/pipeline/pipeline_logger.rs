use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for transcription runs.
///
/// Lets the orchestrator report stage boundaries, durations and counts
/// without knowing whether they end up in a terminal, a log file or
/// nowhere.
pub trait PipelineLogger: Send {
    /// A named stage is about to start.
    fn stage_started(&mut self, stage: &str);

    /// Record how long a named stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time count (e.g. segments, speaker turns).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    fn warn(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Logger that discards all events. Used by tests and embedding hosts.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn stage_started(&mut self, _stage: &str) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
    fn warn(&mut self, _message: &str) {}
}

/// Logger that forwards events to the `log` facade and keeps per-stage
/// durations and metrics for a summary at the end of the run.
pub struct LogPipelineLogger {
    timings: BTreeMap<String, f64>,
    stage_order: Vec<String>,
    metrics: BTreeMap<String, f64>,
    warnings: usize,
    start_time: Instant,
}

impl LogPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: BTreeMap::new(),
            stage_order: Vec::new(),
            metrics: BTreeMap::new(),
            warnings: 0,
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Transcription summary ({:.1}s total):",
            elapsed_ms / 1000.0
        )];

        for stage in &self.stage_order {
            let Some(total_ms) = self.timings.get(stage) else {
                continue;
            };
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("  {stage:14}: {total_ms:8.0}ms  ({pct:4.1}%)"));
        }

        for (name, value) in &self.metrics {
            lines.push(format!("  {name}: {value}"));
        }

        if self.warnings > 0 {
            lines.push(format!("  warnings: {}", self.warnings));
        }

        Some(lines.join("\n"))
    }

    /// Accumulated duration of a stage in milliseconds.
    pub fn timing_for(&self, stage: &str) -> Option<f64> {
        self.timings.get(stage).copied()
    }

    /// Last recorded value of a metric.
    pub fn metric_for(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn stage_started(&mut self, stage: &str) {
        log::info!("Stage: {stage}");
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        if !self.timings.contains_key(stage) {
            self.stage_order.push(stage.to_string());
        }
        *self.timings.entry(stage.to_string()).or_default() += duration_ms;
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.insert(name.to_string(), value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn warn(&mut self, message: &str) {
        self.warnings += 1;
        log::warn!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
