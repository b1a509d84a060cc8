use super::EncodeError;
use std::fmt;

/// DLMS data type tags used inside the push structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    DoubleLongUnsigned,
    OctetString,
    VisibleString,
    LongUnsigned,
}

impl DataType {
    pub fn tag(&self) -> u8 {
        match self {
            DataType::DoubleLongUnsigned => 0x06,
            DataType::OctetString => 0x09,
            DataType::VisibleString => 0x0A,
            DataType::LongUnsigned => 0x12,
        }
    }
}

impl TryFrom<u8> for DataType {
    type Error = EncodeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0x06 => Ok(DataType::DoubleLongUnsigned),
            0x09 => Ok(DataType::OctetString),
            0x0A => Ok(DataType::VisibleString),
            0x12 => Ok(DataType::LongUnsigned),
            _ => Err(EncodeError::InvalidEntry(format!("unknown data type tag {tag:#04x}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    /* ASCII text, or hex digits for octet strings */
    Text(String),
    Number(i64),
}

impl fmt::Display for EntryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryValue::Text(t) => write!(f, "{t}"),
            EntryValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// One element of the OBIS push structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObisEntry {
    pub data_type: DataType,
    pub value: EntryValue,
}

impl ObisEntry {
    /// Builds an entry from a raw tag, failing for tags we can not encode
    pub fn from_raw(tag: u8, value: EntryValue) -> Result<Self, EncodeError> {
        return Ok(ObisEntry { data_type: DataType::try_from(tag)?, value });
    }

    pub fn visible(text: &str) -> Self {
        return ObisEntry { data_type: DataType::VisibleString, value: EntryValue::Text(text.to_string()) };
    }

    pub fn octets(hex_digits: &str) -> Self {
        return ObisEntry { data_type: DataType::OctetString, value: EntryValue::Text(hex_digits.to_string()) };
    }

    pub fn double_long_unsigned(value: i64) -> Self {
        return ObisEntry { data_type: DataType::DoubleLongUnsigned, value: EntryValue::Number(value) };
    }

    pub fn long_unsigned(value: i64) -> Self {
        return ObisEntry { data_type: DataType::LongUnsigned, value: EntryValue::Number(value) };
    }

    /// Appends `[tag] (+ [len] for strings) + payload` to `out`.
    ///
    /// Nothing is written when the entry can not be encoded.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let payload: Vec<u8> = match (&self.data_type, &self.value) {
            (DataType::DoubleLongUnsigned, EntryValue::Number(n)) => {
                let v = u32::try_from(*n)
                    .map_err(|_| EncodeError::InvalidEntry(format!("{n} does not fit into double-long-unsigned")))?;
                v.to_be_bytes().to_vec()
            },
            (DataType::LongUnsigned, EntryValue::Number(n)) => {
                let v = u16::try_from(*n)
                    .map_err(|_| EncodeError::InvalidEntry(format!("{n} does not fit into long-unsigned")))?;
                v.to_be_bytes().to_vec()
            },
            (DataType::VisibleString, EntryValue::Text(t)) => {
                length_prefixed(t.as_bytes())?
            },
            (DataType::OctetString, EntryValue::Text(t)) => {
                let raw = hex::decode(t)
                    .map_err(|e| EncodeError::InvalidEntry(format!("octet string {t:?} is not hex: {e}")))?;
                length_prefixed(&raw)?
            },
            (dt, v) => {
                return Err(EncodeError::InvalidEntry(format!("value {v:?} does not match data type {dt:?}")));
            }
        };

        out.push(self.data_type.tag());
        out.extend_from_slice(&payload);
        return Ok(());
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        return Ok(out);
    }
}

fn length_prefixed(data: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let len = u8::try_from(data.len())
        .map_err(|_| EncodeError::InvalidEntry(format!("string of {} bytes is too long", data.len())))?;
    let mut ret = Vec::with_capacity(data.len() + 1);
    ret.push(len);
    ret.extend_from_slice(data);
    return Ok(ret);
}
