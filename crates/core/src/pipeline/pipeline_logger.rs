use std::collections::HashMap;
use std::time::Instant;

use super::pipeline_coordinator::PipelineStats;

/// Cross-cutting logger for live pipeline events.
///
/// Decouples the redraw path from specific output mechanisms so hosts and
/// tests can observe stage timings without changing the orchestration code.
pub trait PipelineLogger: Send {
    /// Record how long a named stage took for one redraw.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric.
    fn metric(&mut self, name: &str, value: f64);

    /// Called after each presented frame with the coordinator's counters.
    fn frame_presented(&mut self, stats: &PipelineStats);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit a final summary when the pipeline stops. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn frame_presented(&mut self, _stats: &PipelineStats) {}
    fn info(&mut self, _message: &str) {}
}

/// Logger backed by the `log` crate.
///
/// Accumulates stage timings over a window of `every_frames` presented
/// frames, then emits one `debug!` summary and starts a new window. The
/// final summary on stop covers the whole run.
pub struct LogPipelineLogger {
    every_frames: u64,
    window: HashMap<String, Vec<f64>>,
    totals: HashMap<String, (f64, usize)>,
    metrics: HashMap<String, Vec<f64>>,
    window_start: Instant,
    start_time: Instant,
    window_first: PipelineStats,
    last: PipelineStats,
}

impl LogPipelineLogger {
    pub fn new(every_frames: u64) -> Self {
        let now = Instant::now();
        Self {
            every_frames: every_frames.max(1),
            window: HashMap::new(),
            totals: HashMap::new(),
            metrics: HashMap::new(),
            window_start: now,
            start_time: now,
            window_first: PipelineStats::default(),
            last: PipelineStats::default(),
        }
    }

    /// Formats the current window, or `None` if nothing was presented in it.
    pub fn window_string(&self) -> Option<String> {
        let presented = self.last.presented - self.window_first.presented;
        if presented == 0 {
            return None;
        }
        let elapsed = self.window_start.elapsed().as_secs_f64();
        let dropped = self.last.dropped - self.window_first.dropped;

        let mut parts = Vec::new();
        let mut stages: Vec<_> = self.window.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.window[stage];
            let avg = durations.iter().sum::<f64>() / durations.len().max(1) as f64;
            parts.push(format!("{stage} {avg:.1}ms"));
        }
        let fps = if elapsed > 0.0 {
            presented as f64 / elapsed
        } else {
            0.0
        };
        parts.push(format!("{dropped} dropped"));
        parts.push(format!("{fps:.1} fps"));
        Some(format!("{presented} frames: {}", parts.join(", ")))
    }

    /// Formats the whole-run summary, or `None` if no data was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.totals.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Pipeline summary ({} captured, {} presented, {} dropped, {:.1}s):",
            self.last.captured,
            self.last.presented,
            self.last.dropped,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.totals.keys().collect();
        stages.sort();
        for stage in stages {
            let (total_ms, count) = self.totals[stage];
            let avg_ms = total_ms / count.max(1) as f64;
            lines.push(format!("  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &self.metrics[name];
            let avg = values.iter().sum::<f64>() / values.len().max(1) as f64;
            lines.push(format!("  {name}: avg {avg:.1}"));
        }

        if self.last.presented > 0 && elapsed_ms > 0.0 {
            let fps = self.last.presented as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Presented: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn totals_for(&self, stage: &str) -> Option<(f64, usize)> {
        self.totals.get(stage).copied()
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(120)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.window
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
        let total = self.totals.entry(stage.to_string()).or_default();
        total.0 += duration_ms;
        total.1 += 1;
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn frame_presented(&mut self, stats: &PipelineStats) {
        self.last = *stats;
        if stats.presented - self.window_first.presented >= self.every_frames {
            if let Some(text) = self.window_string() {
                log::debug!("{text}");
            }
            self.window.clear();
            self.window_start = Instant::now();
            self.window_first = *stats;
        }
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
