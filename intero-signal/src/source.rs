use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{Receiver, Sender, TryRecvError, unbounded};
use intero_core::Sample;

use crate::error::SignalError;

/// Queue of timestamped samples filled by an external sensor driver.
///
/// The ingestor only needs a non-blocking emptiness check and a dequeue.
pub trait SensorStream: Send {
    fn start(&mut self) -> Result<(), SignalError>;

    fn is_empty(&self) -> bool;

    /// `Ok(None)` when nothing is queued right now.
    fn dequeue(&mut self) -> Result<Option<Sample>, SignalError>;

    /// True once the producer is gone and everything it sent has been dequeued.
    fn is_closed(&self) -> bool {
        false
    }
}

#[derive(Debug)]
enum FeedItem {
    Sample(Sample),
    Interrupted(String),
    Fault(String),
}

/// Driver-side handle of a [`ChannelStream`]. Dropping it ends the stream.
#[derive(Debug)]
pub struct SensorFeed {
    tx: Sender<FeedItem>,
    streaming: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl SensorFeed {
    /// Set once the consumer has called `start` on the stream.
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    /// Returns false when the consumer side has been dropped.
    pub fn push(&self, t: f64, value: f64) -> bool {
        self.tx.send(FeedItem::Sample(Sample::new(t, value))).is_ok()
    }

    pub fn push_batch(&self, samples: impl IntoIterator<Item = Sample>) -> bool {
        samples
            .into_iter()
            .all(|s| self.tx.send(FeedItem::Sample(s)).is_ok())
    }

    /// Reports a recoverable hiccup (e.g. a dropped packet).
    pub fn interrupt(&self, reason: impl Into<String>) {
        let _ = self.tx.send(FeedItem::Interrupted(reason.into()));
    }

    /// Reports an unrecoverable error; the ingestor stops after reading it.
    pub fn fault(&self, reason: impl Into<String>) {
        let _ = self.tx.send(FeedItem::Fault(reason.into()));
    }
}

impl Drop for SensorFeed {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Stream backed by an unbounded channel that a driver thread pushes into.
#[derive(Debug)]
pub struct ChannelStream {
    rx: Receiver<FeedItem>,
    streaming: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl ChannelStream {
    pub fn pair() -> (SensorFeed, ChannelStream) {
        let (tx, rx) = unbounded();
        let streaming = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));
        (
            SensorFeed {
                tx,
                streaming: Arc::clone(&streaming),
                closed: Arc::clone(&closed),
            },
            ChannelStream {
                rx,
                streaming,
                closed,
            },
        )
    }

    pub fn queued(&self) -> usize {
        self.rx.len()
    }
}

impl SensorStream for ChannelStream {
    fn start(&mut self) -> Result<(), SignalError> {
        if self.closed.load(Ordering::Acquire) && self.rx.is_empty() {
            return Err(SignalError::StreamEnded);
        }
        self.streaming.store(true, Ordering::Release);
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    fn dequeue(&mut self) -> Result<Option<Sample>, SignalError> {
        if !self.streaming.load(Ordering::Acquire) {
            return Err(SignalError::NotStarted);
        }
        match self.rx.try_recv() {
            Ok(FeedItem::Sample(sample)) => Ok(Some(sample)),
            Ok(FeedItem::Interrupted(reason)) => Err(SignalError::Interrupted(reason)),
            Ok(FeedItem::Fault(reason)) => Err(SignalError::StreamFault(reason)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SignalError::StreamEnded),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) && self.rx.is_empty()
    }
}

/// In-memory stream for tests and deterministic playback.
#[derive(Debug, Default)]
pub struct ManualStream {
    queue: VecDeque<Result<Sample, SignalError>>,
    started: bool,
    ended: bool,
}

impl ManualStream {
    pub fn new(samples: impl IntoIterator<Item = Sample>) -> Self {
        Self {
            queue: samples.into_iter().map(Ok).collect(),
            started: false,
            ended: false,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.queue.push_back(Ok(sample));
    }

    pub fn push_error(&mut self, error: SignalError) {
        self.queue.push_back(Err(error));
    }

    /// Marks the producer as gone once the queue drains.
    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl SensorStream for ManualStream {
    fn start(&mut self) -> Result<(), SignalError> {
        self.started = true;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn dequeue(&mut self) -> Result<Option<Sample>, SignalError> {
        if !self.started {
            return Err(SignalError::NotStarted);
        }
        self.queue.pop_front().transpose()
    }

    fn is_closed(&self) -> bool {
        self.ended && self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_stream_delivers_in_order() {
        let (feed, mut stream) = ChannelStream::pair();
        assert!(!feed.is_streaming());
        stream.start().unwrap();
        assert!(feed.is_streaming());
        assert!(feed.push(0.0, 1.0));
        assert!(feed.push(0.5, 2.0));
        assert_eq!(stream.queued(), 2);
        assert_eq!(stream.dequeue().unwrap(), Some(Sample::new(0.0, 1.0)));
        assert_eq!(stream.dequeue().unwrap(), Some(Sample::new(0.5, 2.0)));
        assert_eq!(stream.dequeue().unwrap(), None);
        assert!(stream.is_empty());
    }

    #[test]
    fn dequeue_before_start_is_rejected() {
        let (_feed, mut stream) = ChannelStream::pair();
        assert_eq!(stream.dequeue(), Err(SignalError::NotStarted));
    }

    #[test]
    fn dropped_feed_closes_after_drain() {
        let (feed, mut stream) = ChannelStream::pair();
        stream.start().unwrap();
        feed.push(1.0, 1.0);
        drop(feed);
        assert!(!stream.is_closed());
        assert_eq!(stream.dequeue().unwrap(), Some(Sample::new(1.0, 1.0)));
        assert!(stream.is_closed());
        assert_eq!(stream.dequeue(), Err(SignalError::StreamEnded));
    }

    #[test]
    fn feed_errors_surface_as_signal_errors() {
        let (feed, mut stream) = ChannelStream::pair();
        stream.start().unwrap();
        feed.interrupt("packet lost");
        feed.fault("link dropped");
        let first = stream.dequeue().unwrap_err();
        assert!(first.is_transient());
        let second = stream.dequeue().unwrap_err();
        assert_eq!(second, SignalError::StreamFault("link dropped".into()));
        assert!(!second.is_transient());
    }

    #[test]
    fn manual_stream_replays_queue() {
        let mut stream = ManualStream::new([Sample::new(0.0, 0.0)]);
        stream.push_error(SignalError::Interrupted("x".into()));
        stream.start().unwrap();
        assert!(stream.dequeue().unwrap().is_some());
        assert!(stream.dequeue().is_err());
        assert_eq!(stream.dequeue().unwrap(), None);
        stream.end();
        assert!(stream.is_closed());
    }
}
