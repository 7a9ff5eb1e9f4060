//! The pipeline loop: tail, derive, accumulate, score at the batch
//! threshold, append.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::batch::BatchAccumulator;
use crate::config::TailerConfig;
use crate::error::Result;
use crate::features::{DropReason, FeatureDeriver};
use crate::model::FlowClassifier;
use crate::sink::PredictionSink;
use crate::tailer::{EveTailer, FlowEvent};

/// Counters for one engine run. The pipeline is single-threaded, so plain
/// integers suffice.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PipelineStats {
    pub lines: u64,
    pub parse_errors: u64,
    pub filtered: u64,
    pub missing_src_ip: u64,
    pub unknown_service: u64,
    pub batches: u64,
    pub batches_failed: u64,
    pub predictions: u64,
    pub items_dropped_in_model: u64,
}

/// The assembled pipeline. Generic over the classifier so tests can run the
/// full loop without model artifacts.
pub struct Engine<C: FlowClassifier> {
    deriver: FeatureDeriver,
    accumulator: BatchAccumulator,
    classifier: C,
    sink: PredictionSink,
    stats: PipelineStats,
    stats_every_lines: u64,
}

impl<C: FlowClassifier> Engine<C> {
    pub fn new(
        deriver: FeatureDeriver,
        batch_size: usize,
        classifier: C,
        sink: PredictionSink,
        stats_every_lines: u64,
    ) -> Self {
        Self {
            deriver,
            accumulator: BatchAccumulator::with_capacity(batch_size),
            classifier,
            sink,
            stats: PipelineStats::default(),
            stats_every_lines: stats_every_lines.max(1),
        }
    }

    /// Feed one raw log line: parse, derive, accumulate, dispatch at the
    /// threshold. A malformed line is counted and skipped; only sink
    /// failures surface as errors.
    pub fn process_line(&mut self, line: &str) -> Result<()> {
        self.stats.lines += 1;
        match FlowEvent::parse(line) {
            Ok(event) => self.process_event(&event)?,
            Err(e) => {
                self.stats.parse_errors += 1;
                warn!(error = %e, "skipping malformed line");
            }
        }
        if self.stats.lines % self.stats_every_lines == 0 {
            self.log_stats();
        }
        Ok(())
    }

    /// Feed one already-decoded event.
    pub fn process_event(&mut self, event: &FlowEvent) -> Result<()> {
        match self.deriver.derive(event) {
            Ok(item) => {
                self.accumulator.add(item);
                if self.accumulator.is_full() {
                    self.dispatch()?;
                }
            }
            Err(DropReason::FilteredEventType(event_type)) => {
                self.stats.filtered += 1;
                debug!(event_type = %event_type, "event type filtered");
            }
            Err(DropReason::MissingSrcIp) => {
                self.stats.missing_src_ip += 1;
                debug!("skipping event without src_ip");
            }
            Err(DropReason::UnknownService(service)) => {
                self.stats.unknown_service += 1;
                warn!(service = %service, "unknown service, dropping event");
            }
        }
        Ok(())
    }

    /// Score everything accumulated and append the results. An inference
    /// failure drops the batch and the loop continues; a sink failure is
    /// fatal.
    fn dispatch(&mut self) -> Result<()> {
        let batch = self.accumulator.drain();
        if batch.is_empty() {
            return Ok(());
        }
        let size = batch.len();
        self.stats.batches += 1;
        let started = Instant::now();
        match self.classifier.predict(batch) {
            Ok(records) => {
                self.stats.items_dropped_in_model += (size - records.len()) as u64;
                for record in &records {
                    self.sink.append(record)?;
                }
                self.sink.flush()?;
                self.stats.predictions += records.len() as u64;
                info!(
                    size,
                    scored = records.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "batch dispatched"
                );
            }
            Err(e) => {
                self.stats.batches_failed += 1;
                error!(size, error = %e, "inference failed, dropping batch");
            }
        }
        Ok(())
    }

    /// Score and append whatever is accumulated, full batch or not. This is
    /// the shutdown path; the steady-state loop only dispatches full batches.
    pub fn drain_pending(&mut self) -> Result<()> {
        self.dispatch()
    }

    /// Tail the log until `stop` is raised, backing off exponentially while
    /// idle, then drain the final partial batch.
    pub fn run(
        &mut self,
        tailer: &mut EveTailer,
        stop: &AtomicBool,
        tailer_config: &TailerConfig,
    ) -> Result<()> {
        let min_wait = Duration::from_millis(tailer_config.poll_min_ms.max(1));
        let max_wait = min_wait.max(Duration::from_millis(tailer_config.poll_max_ms));
        let mut wait = min_wait;
        info!(path = %tailer.path().display(), "tailing started");
        while !stop.load(Ordering::Relaxed) {
            match tailer.poll_line()? {
                Some(line) => {
                    wait = min_wait;
                    self.process_line(&line)?;
                }
                None => {
                    std::thread::sleep(wait);
                    wait = (wait * 2).min(max_wait);
                }
            }
        }
        info!("stop requested, draining pending items");
        self.drain_pending()?;
        self.log_stats();
        Ok(())
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Items accumulated but not yet dispatched.
    pub fn pending(&self) -> usize {
        self.accumulator.len()
    }

    pub fn deriver(&self) -> &FeatureDeriver {
        &self.deriver
    }

    fn log_stats(&self) {
        info!(
            lines = self.stats.lines,
            parse_errors = self.stats.parse_errors,
            filtered = self.stats.filtered,
            missing_src_ip = self.stats.missing_src_ip,
            unknown_service = self.stats.unknown_service,
            flag_fallbacks = self.deriver.flag_fallbacks(),
            batches = self.stats.batches,
            batches_failed = self.stats.batches_failed,
            predictions = self.stats.predictions,
            items_dropped_in_model = self.stats.items_dropped_in_model,
            "pipeline counters"
        );
    }
}
