pub mod chords;
pub mod engine;
pub mod forwarder;
pub mod matcher;
pub mod rtl;
pub mod sender;

pub use crate::domain::model::{ChordsRecord, Measurement, RtlReading};
pub use crate::domain::ports::{ConfigProvider, Submitter};
pub use crate::utils::error::Result;
