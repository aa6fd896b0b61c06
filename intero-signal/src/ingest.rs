use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use intero_core::Sample;
use intero_timing::Clock;
use log::{debug, info, warn};

use crate::buffer::SharedEcgBuffer;
use crate::error::SignalError;
use crate::source::SensorStream;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestStats {
    pub total_samples: u64,
    pub drains: u64,
    /// Largest number of samples moved by a single drain.
    pub peak_backlog: usize,
    pub interruptions: u64,
}

/// Why and how the ingest loop finished.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub stats: IngestStats,
    /// `None` when stopped on request.
    pub error: Option<SignalError>,
}

/// Moves every queued sensor sample into the shared ring buffer.
pub struct SampleIngestor<S: SensorStream> {
    stream: S,
    buffer: SharedEcgBuffer,
    stats: IngestStats,
    batch: Vec<Sample>,
}

impl<S: SensorStream> SampleIngestor<S> {
    pub fn new(stream: S, buffer: SharedEcgBuffer) -> Self {
        Self {
            stream,
            buffer,
            stats: IngestStats::default(),
            batch: Vec::with_capacity(256),
        }
    }

    pub fn start(&mut self) -> Result<(), SignalError> {
        self.stream.start()
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Drains the whole queue, not just one sample, so a slow tick cannot build a backlog.
    ///
    /// Samples read before an error are still pushed; a fault never leaves the
    /// buffer partially updated.
    pub fn drain(&mut self) -> Result<usize, SignalError> {
        self.batch.clear();
        let mut outcome = Ok(());
        while !self.stream.is_empty() {
            match self.stream.dequeue() {
                Ok(Some(sample)) => self.batch.push(sample),
                Ok(None) => break,
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        if outcome.is_ok() && self.stream.is_closed() {
            outcome = Err(SignalError::StreamEnded);
        }

        let drained = self.batch.len();
        self.buffer.extend(&self.batch);
        self.stats.total_samples += drained as u64;
        self.stats.drains += 1;
        self.stats.peak_backlog = self.stats.peak_backlog.max(drained);

        outcome.map(|_| drained)
    }

    /// Polls until `stop` is set or the stream fails for good.
    pub fn run<C: Clock>(mut self, clock: &C, poll: Duration, stop: &AtomicBool) -> IngestReport {
        if let Err(e) = self.start() {
            warn!("sensor stream failed to start: {e}");
            return IngestReport {
                stats: self.stats,
                error: Some(e),
            };
        }
        info!("sensor stream started");

        let mut error = None;
        while !stop.load(Ordering::Acquire) {
            match self.drain() {
                Ok(n) if n > 0 => debug!("ingested {n} samples"),
                Ok(_) => {}
                Err(e) if e.is_transient() => {
                    self.stats.interruptions += 1;
                    warn!("{e}; retrying");
                }
                Err(e) => {
                    warn!("ingestion stopped: {e}");
                    error = Some(e);
                    break;
                }
            }
            clock.sleep(poll);
        }

        info!(
            "ingestion finished after {} samples in {} drains",
            self.stats.total_samples, self.stats.drains
        );
        IngestReport {
            stats: self.stats,
            error,
        }
    }
}

impl<S: SensorStream + 'static> SampleIngestor<S> {
    /// Runs the ingest loop on its own thread.
    pub fn spawn<C: Clock + 'static>(self, clock: C, poll: Duration) -> IngestHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let join = {
            let stop = Arc::clone(&stop);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("ecg-ingest".into())
                .spawn(move || {
                    let report = self.run(&clock, poll, &stop);
                    running.store(false, Ordering::Release);
                    report
                })
        };
        IngestHandle {
            stop,
            running,
            join: join.ok(),
        }
    }
}

/// Controller-side handle on the ingest thread.
pub struct IngestHandle {
    stop: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<IngestReport>>,
}

impl IngestHandle {
    pub fn is_running(&self) -> bool {
        self.join.is_some() && self.running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Stops the loop and waits for its report.
    pub fn join(mut self) -> Result<IngestReport, SignalError> {
        self.stop();
        match self.join.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| SignalError::StreamFault("ingest thread panicked".into())),
            None => Err(SignalError::StreamFault(
                "ingest thread could not be spawned".into(),
            )),
        }
    }
}

impl Drop for IngestHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChannelStream, ManualStream};
    use intero_timing::ManualClock;

    fn samples(range: std::ops::Range<usize>) -> Vec<Sample> {
        range.map(|i| Sample::new(i as f64, i as f64)).collect()
    }

    #[test]
    fn drain_empties_the_whole_queue() {
        let buffer = SharedEcgBuffer::with_capacity(100).unwrap();
        let mut ingestor = SampleIngestor::new(ManualStream::new(samples(0..37)), buffer.clone());
        ingestor.start().unwrap();
        assert_eq!(ingestor.drain().unwrap(), 37);
        assert_eq!(buffer.len(), 37);
        assert_eq!(ingestor.drain().unwrap(), 0);
        assert_eq!(ingestor.stats().peak_backlog, 37);
        assert_eq!(ingestor.stats().drains, 2);
    }

    #[test]
    fn fault_keeps_samples_read_before_it() {
        let buffer = SharedEcgBuffer::with_capacity(10).unwrap();
        let mut stream = ManualStream::new(samples(0..3));
        stream.push_error(SignalError::StreamFault("gone".into()));
        stream.push(Sample::new(99.0, 99.0));
        let mut ingestor = SampleIngestor::new(stream, buffer.clone());
        ingestor.start().unwrap();
        assert_eq!(
            ingestor.drain(),
            Err(SignalError::StreamFault("gone".into()))
        );
        let snap = buffer.snapshot();
        assert_eq!(snap.times, vec![0.0, 1.0, 2.0]);
        assert_eq!(snap.times.len(), snap.values.len());
    }

    #[test]
    fn ended_stream_is_reported_after_drain() {
        let buffer = SharedEcgBuffer::with_capacity(10).unwrap();
        let mut stream = ManualStream::new(samples(0..2));
        stream.end();
        let mut ingestor = SampleIngestor::new(stream, buffer.clone());
        ingestor.start().unwrap();
        assert_eq!(ingestor.drain(), Err(SignalError::StreamEnded));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn run_retries_interruptions_and_stops_on_end() {
        let buffer = SharedEcgBuffer::with_capacity(10).unwrap();
        let mut stream = ManualStream::new(samples(0..2));
        stream.push_error(SignalError::Interrupted("blip".into()));
        stream.push(Sample::new(2.0, 2.0));
        stream.end();
        let ingestor = SampleIngestor::new(stream, buffer.clone());
        let clock = ManualClock::new(0.0);
        let stop = AtomicBool::new(false);
        let report = ingestor.run(&clock, Duration::from_millis(5), &stop);
        assert_eq!(report.error, Some(SignalError::StreamEnded));
        assert_eq!(report.stats.interruptions, 1);
        assert_eq!(report.stats.total_samples, 3);
        assert_eq!(buffer.len(), 3);
        assert!(clock.now() > 0.0);
    }

    #[test]
    fn spawned_ingestor_follows_channel_feed() {
        let buffer = SharedEcgBuffer::with_capacity(1000).unwrap();
        let (feed, stream) = ChannelStream::pair();
        let handle = SampleIngestor::new(stream, buffer.clone())
            .spawn(intero_timing::SystemClock::new(), Duration::from_millis(1));
        while !feed.is_streaming() {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(feed.push_batch(samples(0..500)));
        drop(feed);
        while handle.is_running() {
            thread::sleep(Duration::from_millis(1));
        }
        let report = handle.join().unwrap();
        assert_eq!(report.error, Some(SignalError::StreamEnded));
        assert_eq!(report.stats.total_samples, 500);
        assert_eq!(buffer.len(), 500);
    }
}
