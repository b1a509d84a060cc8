use std::collections::HashMap;

/* Identification */
pub const METER_ID: &str = "0101000005FF";
pub const METER_TYPE: &str = "0101600101FF";
pub const CLOCK: &str = "0001010000FF";

/* Instantaneous power */
pub const ACTIVE_POWER_IMPORT: &str = "0101010700FF";
pub const ACTIVE_POWER_EXPORT: &str = "0101020700FF";
pub const REACTIVE_POWER_IMPORT: &str = "0101030700FF";
pub const REACTIVE_POWER_EXPORT: &str = "0101040700FF";

/* Currents in 1/100 A */
pub const CURRENT_L1: &str = "01011F0700FF";
pub const CURRENT_L2: &str = "0101330700FF";
pub const CURRENT_L3: &str = "0101470700FF";

/* Voltages in V */
pub const VOLTAGE_L1: &str = "0101200700FF";
pub const VOLTAGE_L2: &str = "0101340700FF";
pub const VOLTAGE_L3: &str = "0101480700FF";

/* Energy totals in Wh */
pub const ACTIVE_ENERGY_IMPORT: &str = "0101010800FF";
pub const ACTIVE_ENERGY_EXPORT: &str = "0101020800FF";
pub const REACTIVE_ENERGY_IMPORT: &str = "0101030800FF";
pub const REACTIVE_ENERGY_EXPORT: &str = "0101040800FF";

pub fn get_obis_description(obis_code: &str) -> Option<&'static str> {
    let descriptions = get_standard_obis_descriptions();
    descriptions.get(obis_code.to_uppercase().as_str()).copied()
}

pub fn get_standard_obis_descriptions() -> HashMap<&'static str, &'static str> {
    let mut map = HashMap::new();

    map.insert(METER_ID, "Meter ID");
    map.insert(METER_TYPE, "Meter type");
    map.insert(CLOCK, "Date and time");

    map.insert(ACTIVE_POWER_IMPORT, "Active power + (total)");
    map.insert(ACTIVE_POWER_EXPORT, "Active power - (total)");
    map.insert(REACTIVE_POWER_IMPORT, "Reactive power + (total)");
    map.insert(REACTIVE_POWER_EXPORT, "Reactive power - (total)");

    map.insert(CURRENT_L1, "Current (L1)");
    map.insert(CURRENT_L2, "Current (L2)");
    map.insert(CURRENT_L3, "Current (L3)");

    map.insert(VOLTAGE_L1, "Voltage (L1)");
    map.insert(VOLTAGE_L2, "Voltage (L2)");
    map.insert(VOLTAGE_L3, "Voltage (L3)");

    map.insert(ACTIVE_ENERGY_IMPORT, "Active energy + (total)");
    map.insert(ACTIVE_ENERGY_EXPORT, "Active energy - (total)");
    map.insert(REACTIVE_ENERGY_IMPORT, "Reactive energy + (total)");
    map.insert(REACTIVE_ENERGY_EXPORT, "Reactive energy - (total)");

    map
}

/// Formats the six OBIS value groups as `A-B:C.D.E*F`
pub fn format_obis_code(obis_bytes: &[u8]) -> Option<String> {
    if obis_bytes.len() != 6 {
        return None;
    }

    let b = obis_bytes;
    Some(format!("{}-{}:{}.{}.{}*{}", b[0], b[1], b[2], b[3], b[4], b[5]))
}

/// Human readable form of a hex encoded OBIS code for logging
pub fn describe(obis_hex: &str) -> String {
    let formatted = hex::decode(obis_hex)
        .ok()
        .and_then(|b| format_obis_code(&b))
        .unwrap_or_else(|| obis_hex.to_string());

    match get_obis_description(obis_hex) {
        Some(d) => format!("{formatted} ({d})"),
        None => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_obis_code() {
        assert_eq!(format_obis_code(&[1, 1, 1, 7, 0, 255]), Some("1-1:1.7.0*255".to_string()));
        assert_eq!(format_obis_code(&[1, 1, 31, 7, 0, 255]), Some("1-1:31.7.0*255".to_string()));
        assert_eq!(format_obis_code(&[1, 1]), None);
    }

    #[test]
    fn test_get_obis_description() {
        assert_eq!(get_obis_description("0101010800FF"), Some("Active energy + (total)"));
        assert_eq!(get_obis_description("01011f0700ff"), Some("Current (L1)"));
        assert_eq!(get_obis_description("nonexistent"), None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe("0101200700FF"), "1-1:32.7.0*255 (Voltage (L1))");
        assert_eq!(describe("0102030405FF"), "1-2:3.4.5*255");
        assert_eq!(describe("zz"), "zz");
    }

    #[test]
    fn test_codes_are_six_bytes() {
        for code in get_standard_obis_descriptions().keys() {
            assert_eq!(hex::decode(code).unwrap().len(), 6, "{code}");
        }
    }
}
