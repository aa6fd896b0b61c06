pub mod beats;
pub mod buffer;
pub mod error;
pub mod ingest;
pub mod peaks;
pub mod simulate;
pub mod source;
pub mod window;

pub use beats::{BeatCount, BeatCounter};
pub use buffer::{BufferSnapshot, EcgRingBuffer, SharedEcgBuffer};
pub use error::SignalError;
pub use ingest::{IngestHandle, IngestReport, IngestStats, SampleIngestor};
pub use peaks::{PeakDetector, ThresholdPeakDetector};
pub use simulate::{SimulatedEcg, SimulationConfig};
pub use source::{ChannelStream, ManualStream, SensorFeed, SensorStream};
pub use window::EcgWindow;
