//! AMS reader to Tibber Pulse bridge
//!
//! Converts the JSON readings an AMS reader publishes into the HDLC/DLMS push
//! frames a Kamstrup meter sends, so they can be handed to Tibber as if a
//! Pulse had read them.

pub mod hdlc;
pub mod obis_utils;
pub mod status;
pub mod config;
pub mod bridge;
#[cfg(feature = "bridge")]
pub mod mqtt;

// Re-export common types for easier access
pub use hdlc::{EncodeError, HdlcEncoder, MeterIdentity, PackedDatetime, Stream};
pub use config::Config;
pub use bridge::Bridge;
