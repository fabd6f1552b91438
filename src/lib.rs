pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::StationConfig;
pub use crate::core::{
    engine::BridgeEngine,
    forwarder::{ForwardStats, Forwarder},
    sender::{ChordsSender, DryRunSubmitter, SenderSettings},
};
pub use utils::error::{BridgeError, Result};
