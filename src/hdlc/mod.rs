use log::{debug, info};
use thiserror::Error;

pub mod crc;
pub mod fields;
pub mod datetime;
pub mod frame;
pub mod dedup;
pub mod snapshot;

pub use datetime::{PackedDatetime, Rounding};
pub use dedup::{DuplicateFilter, Stream};
pub use fields::{DataType, EntryValue, ObisEntry};
pub use frame::{FrameBuilder, MeterIdentity};
pub use snapshot::Readings;

use crate::obis_utils;

/// Everything that can make an encode call fail, no frame is produced in that case
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("Reading {0} missing")]
    MissingField(String),
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("Frame too large ({0})")]
    FrameTooLarge(usize),
}

/// Per encoder state that survives between messages
#[derive(Debug, Clone, Default)]
pub struct StreamState {
    pub last_power: Vec<ObisEntry>,
    pub filter: DuplicateFilter,
}

/// Turns AMS reader messages into Kamstrup style HDLC frames
pub struct HdlcEncoder {
    builder: FrameBuilder,
    state: StreamState,
}

impl HdlcEncoder {
    pub fn new(identity: MeterIdentity) -> Self {
        info!("HDLC encoder for {identity}");
        return HdlcEncoder {
            builder: FrameBuilder::new(identity),
            state: StreamState::default(),
        };
    }

    pub fn identity(&self) -> &MeterIdentity {
        self.builder.identity()
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Encodes `readings` stamped with the current local time
    pub fn encode(&mut self, stream: Stream, readings: &Readings) -> Result<Option<Vec<u8>>, EncodeError> {
        let datetime = PackedDatetime::now(stream.rounding());
        return self.encode_at(stream, readings, datetime);
    }

    /// Encodes `readings` with an already packed datetime.
    ///
    /// Returns `Ok(None)` if a frame with the same datetime was already sent on
    /// this stream. State is only touched once the frame is complete.
    pub fn encode_at(&mut self, stream: Stream, readings: &Readings, datetime: PackedDatetime) -> Result<Option<Vec<u8>>, EncodeError> {
        if self.state.filter.is_duplicate(stream, &datetime) {
            debug!("{stream}: duplicate time {datetime}, skipping");
            return Ok(None);
        }

        let entries = match stream {
            Stream::Power => snapshot::power_snapshot(self.builder.identity(), readings)?,
            Stream::Energy => snapshot::energy_snapshot(&self.state.last_power, readings, &datetime)?,
        };

        if log::log_enabled!(log::Level::Debug) {
            for pair in entries.windows(2) {
                if let (DataType::OctetString, EntryValue::Text(hex_code)) = (&pair[0].data_type, &pair[0].value) {
                    if obis_utils::get_obis_description(hex_code).is_some() {
                        debug!("{stream}: {} = {}", obis_utils::describe(hex_code), pair[1].value);
                    }
                }
            }
        }

        let frame = self.builder.build(&entries, &datetime)?;

        if !self.state.filter.should_emit(stream, &datetime) {
            return Ok(None);
        }
        if stream == Stream::Power {
            self.state.last_power = entries;
        }

        return Ok(Some(frame));
    }
}
