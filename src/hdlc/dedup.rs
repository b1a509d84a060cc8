use super::datetime::{PackedDatetime, Rounding};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The two reading categories pushed by the AMS reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Power,
    Energy,
}

impl Stream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Power => "power",
            Stream::Energy => "energy",
        }
    }

    pub fn rounding(&self) -> Rounding {
        Rounding::for_stream(self.as_str())
    }
}

impl FromStr for Stream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "power" => Ok(Stream::Power),
            "energy" => Ok(Stream::Energy),
            _ => Err(format!("unknown stream {s}")),
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remembers the last datetime sent per stream.
///
/// Rounded datetimes collapse several readings into one bucket, only the
/// first reading of a bucket gets through.
#[derive(Debug, Clone)]
pub struct DuplicateFilter {
    last_seen: HashMap<Stream, Option<PackedDatetime>>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        let mut last_seen = HashMap::new();
        last_seen.insert(Stream::Power, None);
        last_seen.insert(Stream::Energy, None);
        return DuplicateFilter { last_seen };
    }

    /// True if `datetime` was already the last one sent on `stream`
    pub fn is_duplicate(&self, stream: Stream, datetime: &PackedDatetime) -> bool {
        matches!(self.last_seen.get(&stream), Some(Some(prev)) if prev == datetime)
    }

    /// Check and update in one step, false means the frame must not be sent
    pub fn should_emit(&mut self, stream: Stream, datetime: &PackedDatetime) -> bool {
        if self.is_duplicate(stream, datetime) {
            return false;
        }

        self.last_seen.insert(stream, Some(*datetime));
        return true;
    }

    pub fn last_seen(&self, stream: Stream) -> Option<PackedDatetime> {
        self.last_seen.get(&stream).copied().flatten()
    }
}

impl Default for DuplicateFilter {
    fn default() -> Self {
        Self::new()
    }
}
