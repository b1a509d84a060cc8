use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::config::PulseConfig;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatusError {
    #[error("Status field {0} missing")]
    MissingField(String),
}

fn field(status: &Map<String, Value>, key: &str) -> Result<Value, StatusError> {
    status.get(key).cloned().ok_or_else(|| StatusError::MissingField(key.to_string()))
}

/// Rewrites an AMS reader state message into the Pulse status document.
///
/// Only `rssi` and `up` are taken over, the remaining fields mimic what a
/// healthy Pulse on a Kamstrup meter reports.
pub fn format_status(pulse: &PulseConfig, status: &Map<String, Value>) -> Result<Value, StatusError> {
    let rssi = field(status, "rssi")?;
    let uptime = field(status, "up")?;

    let state = json!({
        "rssi": rssi,
        "ch": 1,
        "ssid": "IOT",
        "usbV": "0.36", "Vin": "23.88", "Vcap": "4.27", "Vbck": "4.65",
        "Build": "1.2.5",
        "Hw": "F",
        "bssid": "cafedeadbeef",
        "ID": pulse.id,
        "IP": pulse.ip,
        "Uptime": uptime,
        "mqttcon": 0, "pubcnt": 4, "rxcnt": 4,
        "wificon": 1, "wififail": 0,
        "bits": 71, "cSet": 34, "Ic": 4.12, "crcerr": 0, "cAx": 1.277701, "cB": 14,
        "heap": 223244,
        "baud": 2400,
        "meter": "Kamstrup",
        "ntc": -3.87,
        "s/w": 18.010,
        "ct": 706, "dtims": 25, "mdb": 0, "mdb_cnt": 0, "bdtl": 0
    });

    return Ok(json!({ "status": state }));
}
