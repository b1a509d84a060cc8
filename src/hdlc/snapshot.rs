use super::datetime::PackedDatetime;
use super::fields::ObisEntry;
use super::frame::MeterIdentity;
use super::EncodeError;
use crate::obis_utils::*;
use serde_json::Value;

/// Decoded AMS reader message, reading name to value
pub type Readings = serde_json::Map<String, Value>;

fn get<'a>(readings: &'a Readings, key: &str) -> Result<&'a Value, EncodeError> {
    readings.get(key).ok_or_else(|| EncodeError::MissingField(key.to_string()))
}

/* Raw counters must be whole numbers, 1500.0 is fine, 1500.5 is not */
fn whole(readings: &Readings, key: &str) -> Result<i64, EncodeError> {
    let v = get(readings, key)?;
    if let Some(i) = v.as_i64() {
        return Ok(i);
    }

    match v.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => Ok(f as i64),
        _ => Err(EncodeError::InvalidEntry(format!("{key}={v} is not a whole number"))),
    }
}

/* Scaled and truncated towards zero */
fn scaled(readings: &Readings, key: &str, factor: f64) -> Result<i64, EncodeError> {
    let v = get(readings, key)?;
    let f = v.as_f64()
        .ok_or_else(|| EncodeError::InvalidEntry(format!("{key}={v} is not a number")))?;

    let s = (f * factor).trunc();
    if !s.is_finite() || s < i64::MIN as f64 || s > i64::MAX as f64 {
        return Err(EncodeError::InvalidEntry(format!("{key}={v} is out of range")));
    }
    return Ok(s as i64);
}

/// Ordered push list for the power stream
pub fn power_snapshot(identity: &MeterIdentity, readings: &Readings) -> Result<Vec<ObisEntry>, EncodeError> {
    let entries = vec![
        ObisEntry::visible(&identity.meter_list),
        ObisEntry::octets(METER_ID), ObisEntry::visible(&identity.meter_id),
        ObisEntry::octets(METER_TYPE), ObisEntry::visible(&identity.meter_type),
        ObisEntry::octets(ACTIVE_POWER_IMPORT), ObisEntry::double_long_unsigned(whole(readings, "P")?),
        ObisEntry::octets(ACTIVE_POWER_EXPORT), ObisEntry::double_long_unsigned(whole(readings, "PO")?),
        ObisEntry::octets(REACTIVE_POWER_IMPORT), ObisEntry::double_long_unsigned(whole(readings, "Q")?),
        ObisEntry::octets(REACTIVE_POWER_EXPORT), ObisEntry::double_long_unsigned(whole(readings, "QO")?),
        ObisEntry::octets(CURRENT_L1), ObisEntry::double_long_unsigned(scaled(readings, "I1", 100.0)?),
        ObisEntry::octets(CURRENT_L2), ObisEntry::double_long_unsigned(scaled(readings, "I2", 100.0)?),
        ObisEntry::octets(CURRENT_L3), ObisEntry::double_long_unsigned(scaled(readings, "I3", 100.0)?),
        ObisEntry::octets(VOLTAGE_L1), ObisEntry::long_unsigned(scaled(readings, "U1", 1.0)?),
        ObisEntry::octets(VOLTAGE_L2), ObisEntry::long_unsigned(scaled(readings, "U2", 1.0)?),
        ObisEntry::octets(VOLTAGE_L3), ObisEntry::long_unsigned(scaled(readings, "U3", 1.0)?),
    ];
    return Ok(entries);
}

/// Ordered push list for the energy stream.
///
/// Starts with a copy of `power` followed by the clock echo and the totals.
pub fn energy_snapshot(power: &[ObisEntry], readings: &Readings, datetime: &PackedDatetime) -> Result<Vec<ObisEntry>, EncodeError> {
    let totals = [
        ObisEntry::octets(CLOCK), ObisEntry::octets(&datetime.to_hex()),
        ObisEntry::octets(ACTIVE_ENERGY_IMPORT), ObisEntry::double_long_unsigned(scaled(readings, "tPI", 1000.0)?),
        ObisEntry::octets(ACTIVE_ENERGY_EXPORT), ObisEntry::double_long_unsigned(scaled(readings, "tPO", 1000.0)?),
        ObisEntry::octets(REACTIVE_ENERGY_IMPORT), ObisEntry::double_long_unsigned(scaled(readings, "tQI", 1000.0)?),
        ObisEntry::octets(REACTIVE_ENERGY_EXPORT), ObisEntry::double_long_unsigned(scaled(readings, "tQO", 1000.0)?),
    ];

    let mut entries = power.to_vec();
    entries.extend(totals);
    return Ok(entries);
}
