use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_yml;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::hdlc::frame::{MeterIdentity, DEFAULT_SOURCE_ADDRESS, DEFAULT_TARGET_ADDRESS};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/ams2tibber/config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read config {0}: {1}")]
    Io(String, std::io::Error),
    #[error("Unable to parse config: {0}")]
    Parse(#[from] serde_yml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

fn mqtt_port_default() -> u16 { return 1883 }
fn mqtt_client_name_default() -> String { return "ams2tibber".to_string() }
fn mqtt_credential_default() -> String { return "".to_string() }
fn mqtt_ams_sub_default() -> String { return "ams".to_string() }
fn mqtt_message_expiry_default() -> u32 { return 30 }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default="mqtt_port_default")]
    pub port: u16,
    #[serde(default="mqtt_credential_default")]
    pub user: String,
    #[serde(default="mqtt_credential_default")]
    pub pass: String,
    #[serde(default="mqtt_client_name_default")]
    pub client_name: String,
    /* "<ams_sub>/#" is subscribed */
    #[serde(default="mqtt_ams_sub_default")]
    pub ams_sub: String,
    pub tibber_sub: Option<String>,
    /* "{}" is replaced with the topic name */
    pub tibber_pub: String,
    /// Seconds a published frame stays deliverable on the broker
    #[serde(default="mqtt_message_expiry_default")]
    pub message_expiry: u32,
}

fn hdlc_target_address_default() -> u8 { return DEFAULT_TARGET_ADDRESS }
fn hdlc_source_address_default() -> u8 { return DEFAULT_SOURCE_ADDRESS }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct HdlcConfig {
    #[serde(default="hdlc_target_address_default")]
    pub target_address: u8,
    #[serde(default="hdlc_source_address_default")]
    pub source_address: u8,
    pub meter_list: String,
    pub meter_id: String,
    pub meter_type: String,
}

impl HdlcConfig {
    pub fn identity(&self) -> MeterIdentity {
        MeterIdentity::new(self.target_address, self.source_address, &self.meter_list, &self.meter_id, &self.meter_type)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PulseConfig {
    pub id: String,
    pub ip: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub hdlc: HdlcConfig,
    pub pulse: PulseConfig,
}

/// Flat single level layout of older `config.json` files
#[derive(Deserialize, Clone, Debug)]
struct LegacyConfig {
    mqtt_broker: String,
    #[serde(default="mqtt_port_default")]
    mqtt_port: u16,
    #[serde(default="mqtt_credential_default")]
    mqtt_username: String,
    #[serde(default="mqtt_credential_default")]
    mqtt_password: String,
    #[serde(default="mqtt_ams_sub_default")]
    mqtt_ams_sub: String,
    mqtt_tibber_sub: Option<String>,
    mqtt_tibber_pub: String,
    #[serde(default="hdlc_target_address_default")]
    hdlc_target_address: u8,
    #[serde(default="hdlc_source_address_default")]
    hdlc_source_address: u8,
    hdlc_meter_list: String,
    hdlc_meter_id: String,
    hdlc_meter_type: String,
    pulse_ip: String,
    pulse_id: String,
}

impl From<LegacyConfig> for Config {
    fn from(l: LegacyConfig) -> Self {
        Config {
            mqtt: MqttConfig {
                host: l.mqtt_broker,
                port: l.mqtt_port,
                user: l.mqtt_username,
                pass: l.mqtt_password,
                client_name: mqtt_client_name_default(),
                ams_sub: l.mqtt_ams_sub,
                tibber_sub: l.mqtt_tibber_sub.filter(|s| !s.is_empty()),
                tibber_pub: l.mqtt_tibber_pub,
                message_expiry: mqtt_message_expiry_default(),
            },
            hdlc: HdlcConfig {
                target_address: l.hdlc_target_address,
                source_address: l.hdlc_source_address,
                meter_list: l.hdlc_meter_list,
                meter_id: l.hdlc_meter_id,
                meter_type: l.hdlc_meter_type,
            },
            pulse: PulseConfig { id: l.pulse_id, ip: l.pulse_ip },
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Opening config file {}", path.display());
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
        return Self::from_str(&contents);
    }

    /// Parses YAML, plain JSON configs work as well.
    ///
    /// Files with a top level `mqtt_broker` key use the flat legacy layout
    /// and are mapped onto the sectioned one.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let value: serde_yml::Value = serde_yml::from_str(contents)?;
        let c: Config = if value.get("mqtt_broker").is_some() {
            info!("Flat legacy config layout detected");
            serde_yml::from_value::<LegacyConfig>(value)?.into()
        } else {
            serde_yml::from_value(value)?
        };
        c.validate()?;
        debug!("Config loaded for meter {}", c.hdlc.meter_id);
        return Ok(c);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        /* HDLC addresses are 7 bit, the lowest bit of the byte marks the end */
        if self.hdlc.target_address > 0x7F {
            return Err(ConfigError::Invalid(format!("hdlc target_address {} is above 127", self.hdlc.target_address)));
        }
        if self.hdlc.source_address > 0x7F {
            return Err(ConfigError::Invalid(format!("hdlc source_address {} is above 127", self.hdlc.source_address)));
        }
        if self.hdlc.meter_list.len() > 255 || self.hdlc.meter_id.len() > 255 || self.hdlc.meter_type.len() > 255 {
            return Err(ConfigError::Invalid("hdlc meter strings must be shorter than 256 bytes".to_string()));
        }
        if self.mqtt.tibber_pub.trim().is_empty() {
            return Err(ConfigError::Invalid("mqtt tibber_pub must not be empty".to_string()));
        }
        Ok(())
    }

    /// Publish topic for a given source topic name
    pub fn publish_topic(&self, topic: &str) -> String {
        self.mqtt.tibber_pub.replace("{}", topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
mqtt:
  host: broker.local
  tibber_pub: tibber/publish/{}
hdlc:
  meter_list: Kamstrup_V0001
  meter_id: "5706567000000000"
  meter_type: 6841131BN243101040
pulse:
  id: cafedeadbeef
  ip: 192.168.1.2
"#;

    #[test]
    fn test_defaults() {
        let c = Config::from_str(YAML).unwrap();
        assert_eq!(c.mqtt.port, 1883);
        assert_eq!(c.mqtt.client_name, "ams2tibber");
        assert_eq!(c.mqtt.ams_sub, "ams");
        assert_eq!(c.mqtt.user, "");
        assert_eq!(c.mqtt.tibber_sub, None);
        assert_eq!(c.mqtt.message_expiry, 30);
        assert_eq!(c.hdlc.target_address, 21);
        assert_eq!(c.hdlc.source_address, 16);
        assert_eq!(c.hdlc.meter_id, "5706567000000000");
        assert_eq!(c.hdlc.identity().address(), 0x2B21);
        assert_eq!(c.publish_topic("power"), "tibber/publish/power");
    }

    #[test]
    fn test_json_config() {
        let json = r#"{
            "mqtt": {"host": "10.0.0.1", "port": 8883, "user": "u", "pass": "p", "tibber_pub": "t/{}", "tibber_sub": "tibber/#"},
            "hdlc": {"target_address": 1, "source_address": 2, "meter_list": "L", "meter_id": "I", "meter_type": "T"},
            "pulse": {"id": "x", "ip": "y"}
        }"#;
        let c = Config::from_str(json).unwrap();
        assert_eq!(c.mqtt.port, 8883);
        assert_eq!(c.mqtt.tibber_sub, Some("tibber/#".to_string()));
        assert_eq!(c.hdlc.identity().address(), 0x0305);
    }

    #[test]
    fn test_legacy_flat_json() {
        let json = r#"{
            "mqtt_broker": "192.168.1.10",
            "mqtt_port": 1883,
            "mqtt_username": "ams",
            "mqtt_password": "secret",
            "mqtt_ams_sub": "amsleser",
            "mqtt_tibber_sub": "tibber/#",
            "mqtt_tibber_pub": "tibber/publish/{}",
            "hdlc_target_address": 21,
            "hdlc_source_address": 16,
            "hdlc_meter_list": "Kamstrup_V0001",
            "hdlc_meter_id": "5706567000000000",
            "hdlc_meter_type": "6841131BN243101040",
            "pulse_ip": "192.168.1.20",
            "pulse_id": "cafedeadbeef"
        }"#;
        let c = Config::from_str(json).unwrap();
        assert_eq!(c.mqtt.host, "192.168.1.10");
        assert_eq!(c.mqtt.user, "ams");
        assert_eq!(c.mqtt.pass, "secret");
        assert_eq!(c.mqtt.ams_sub, "amsleser");
        assert_eq!(c.mqtt.tibber_sub, Some("tibber/#".to_string()));
        assert_eq!(c.mqtt.message_expiry, 30);
        assert_eq!(c.publish_topic("energy"), "tibber/publish/energy");
        assert_eq!(c.hdlc.identity().address(), 0x2B21);
        assert_eq!(c.hdlc.meter_type, "6841131BN243101040");
        assert_eq!(c.pulse.ip, "192.168.1.20");
        assert_eq!(c.pulse.id, "cafedeadbeef");
    }

    #[test]
    fn test_legacy_defaults_and_validation() {
        let json = r#"{"mqtt_broker": "b", "mqtt_tibber_pub": "t/{}", "hdlc_meter_list": "L",
            "hdlc_meter_id": "I", "hdlc_meter_type": "T", "pulse_ip": "ip", "pulse_id": "id"}"#;
        let c = Config::from_str(json).unwrap();
        assert_eq!(c.mqtt.port, 1883);
        assert_eq!(c.hdlc.target_address, 21);
        assert_eq!(c.hdlc.source_address, 16);

        let bad = json.replace(r#""mqtt_broker": "b","#, r#""mqtt_broker": "b", "hdlc_source_address": 130,"#);
        assert!(matches!(Config::from_str(&bad), Err(ConfigError::Invalid(_))));

        let missing = json.replace(r#""pulse_id": "id""#, r#""pulse_x": "id""#);
        assert!(matches!(Config::from_str(&missing), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_default_path_is_json() {
        assert_eq!(DEFAULT_CONFIG_PATH, "/etc/ams2tibber/config.json");
    }

    #[test]
    fn test_invalid_address() {
        let bad = YAML.replace("hdlc:\n", "hdlc:\n  target_address: 200\n");
        assert!(matches!(Config::from_str(&bad), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_section() {
        let bad = YAML.replace("pulse:\n  id: cafedeadbeef\n  ip: 192.168.1.2\n", "");
        assert!(matches!(Config::from_str(&bad), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(YAML.as_bytes()).unwrap();
        let c = Config::load(f.path()).unwrap();
        assert_eq!(c.pulse.id, "cafedeadbeef");

        assert!(matches!(Config::load("/nonexistent/ams2tibber.yaml"), Err(ConfigError::Io(_, _))));
    }
}
