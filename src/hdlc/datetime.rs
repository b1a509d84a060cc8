use super::EncodeError;
use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use std::fmt;

/* hundredths not specified, deviation 0x8000 (not specified), clock status 0 */
const DATETIME_SUFFIX: [u8; 4] = [0xFF, 0x80, 0x00, 0x00];

pub const PACKED_DATETIME_LEN: usize = 12;

/// How a timestamp is adjusted before packing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Seconds rounded down to the full ten
    Power,
    /// Minute 00, second 55 of the current hour
    Hourly,
    /// Taken as is
    Exact,
}

impl Rounding {
    /// Power stream rounds to ten seconds, every other stream uses the hourly mark
    pub fn for_stream(stream: &str) -> Self {
        match stream {
            "power" => Rounding::Power,
            _ => Rounding::Hourly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Components {
    year: u16,
    month: u8,
    day: u8,
    weekday: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl Components {
    fn round(mut self, rounding: Rounding) -> Self {
        match rounding {
            Rounding::Power => { self.second -= self.second % 10; },
            Rounding::Hourly => {
                self.minute = 0;
                self.second = 55;
            },
            Rounding::Exact => {},
        }
        self
    }
}

/// DLMS date-time octet string, 12 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackedDatetime([u8; PACKED_DATETIME_LEN]);

impl PackedDatetime {
    /// Packs the current local time
    pub fn now(rounding: Rounding) -> Self {
        return Self::from_naive(&Local::now().naive_local(), rounding);
    }

    pub fn from_naive(dt: &NaiveDateTime, rounding: Rounding) -> Self {
        let c = Components {
            /* chrono years beyond u16 are not something a meter will report */
            year: dt.year().clamp(0, u16::MAX as i32) as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
            weekday: dt.weekday().num_days_from_sunday() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
        };
        return Self::pack(c.round(rounding));
    }

    /// Parses `YYYY-MM-DD-W-hh-mm-ss` where W is the weekday with Sunday as 0
    pub fn parse(date: &str, rounding: Rounding) -> Result<Self, EncodeError> {
        let parts: Vec<&str> = date.trim().split('-').collect();
        if parts.len() != 7 {
            return Err(EncodeError::InvalidTimestamp(format!(
                "{date:?} has {} components, expected 7", parts.len())));
        }

        let year = parts[0].trim().parse::<u16>()
            .map_err(|e| EncodeError::InvalidTimestamp(format!("year {:?} in {date:?}: {e}", parts[0])))?;

        let mut rest = [0u8; 6];
        for (i, part) in parts[1..].iter().enumerate() {
            rest[i] = part.trim().parse::<u8>()
                .map_err(|e| EncodeError::InvalidTimestamp(format!("component {part:?} in {date:?}: {e}")))?;
        }

        let c = Components {
            year,
            month: rest[0],
            day: rest[1],
            weekday: rest[2],
            hour: rest[3],
            minute: rest[4],
            second: rest[5],
        };
        return Ok(Self::pack(c.round(rounding)));
    }

    fn pack(c: Components) -> Self {
        let mut ret = [0u8; PACKED_DATETIME_LEN];
        ret[0..2].copy_from_slice(&c.year.to_be_bytes());
        ret[2] = c.month;
        ret[3] = c.day;
        ret[4] = c.weekday;
        ret[5] = c.hour;
        ret[6] = c.minute;
        ret[7] = c.second;
        ret[8..].copy_from_slice(&DATETIME_SUFFIX);
        return PackedDatetime(ret);
    }

    pub fn as_bytes(&self) -> &[u8; PACKED_DATETIME_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn minute(&self) -> u8 {
        self.0[6]
    }

    pub fn second(&self) -> u8 {
        self.0[7]
    }
}

impl fmt::Display for PackedDatetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = u16::from_be_bytes([self.0[0], self.0[1]]);
        write!(f, "{:04}-{:02}-{:02} {:02}:{:02}:{:02}", year, self.0[2], self.0[3], self.0[5], self.0[6], self.0[7])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_exact() {
        let d = PackedDatetime::parse("2024-03-15-5-14-27-37", Rounding::Exact).unwrap();
        assert_eq!(d.as_bytes(), &[0x07, 0xE8, 3, 15, 5, 14, 27, 37, 0xFF, 0x80, 0x00, 0x00]);
        assert_eq!(d.to_string(), "2024-03-15 14:27:37");
    }

    #[test]
    fn test_power_rounding() {
        let d = PackedDatetime::parse("2024-03-15-5-14-27-37", Rounding::Power).unwrap();
        assert_eq!(d.minute(), 27);
        assert_eq!(d.second(), 30);

        let d = PackedDatetime::parse("2024-03-15-5-14-27-09", Rounding::Power).unwrap();
        assert_eq!(d.second(), 0);
    }

    #[test]
    fn test_hourly_rounding() {
        for stream in ["energy", "anything"] {
            let d = PackedDatetime::parse("2024-03-15-5-14-27-37", Rounding::for_stream(stream)).unwrap();
            assert_eq!(d.minute(), 0);
            assert_eq!(d.second(), 55);
            assert_eq!(d.as_bytes()[5], 14);
        }
    }

    #[test]
    fn test_from_naive() {
        /* 2024-03-17 was a Sunday */
        let dt = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap().and_hms_opt(8, 5, 59).unwrap();
        let d = PackedDatetime::from_naive(&dt, Rounding::Power);
        assert_eq!(d.as_bytes(), &[0x07, 0xE8, 3, 17, 0, 8, 5, 50, 0xFF, 0x80, 0x00, 0x00]);
        assert_eq!(d, PackedDatetime::parse("2024-03-17-0-08-05-59", Rounding::Power).unwrap());
    }

    #[test]
    fn test_now_has_suffix() {
        let d = PackedDatetime::now(Rounding::Hourly);
        assert_eq!(&d.as_bytes()[8..], &DATETIME_SUFFIX);
        assert_eq!(d.second(), 55);
    }

    #[test]
    fn test_invalid_timestamps() {
        for bad in ["", "2024-03-15", "2024-03-15-5-14-27", "2024-03-15-5-14-27-37-1", "2024-xx-15-5-14-27-37", "2024-03-15-5-14-27-300", "70000-03-15-5-14-27-37"] {
            assert!(matches!(PackedDatetime::parse(bad, Rounding::Exact), Err(EncodeError::InvalidTimestamp(_))), "{bad}");
        }
    }
}
