use log::{debug, info};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::Config;
use crate::hdlc::{EncodeError, HdlcEncoder, Stream};
use crate::status::{format_status, StatusError};

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Payload is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("Payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Payload is not a JSON object")]
    NotAnObject,
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Status(#[from] StatusError),
}

/// Something to publish towards Tibber
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Maps AMS reader topics onto Pulse publications
pub struct Bridge {
    encoder: HdlcEncoder,
    config: Config,
}

fn parse_object(payload: &[u8]) -> Result<Map<String, Value>, BridgeError> {
    let text = std::str::from_utf8(payload)?;
    match serde_json::from_str::<Value>(text)? {
        Value::Object(m) => Ok(m),
        _ => Err(BridgeError::NotAnObject),
    }
}

impl Bridge {
    pub fn new(config: &Config) -> Self {
        return Bridge {
            encoder: HdlcEncoder::new(config.hdlc.identity()),
            config: config.clone(),
        };
    }

    pub fn encoder(&self) -> &HdlcEncoder {
        &self.encoder
    }

    /// Handles one incoming message, the last topic segment decides what happens
    pub fn route(&mut self, topic: &str, payload: &[u8]) -> Result<Option<Outgoing>, BridgeError> {
        let name = topic.rsplit('/').next().unwrap_or(topic);

        match name {
            "power" | "energy" => {
                let stream = if name == "power" { Stream::Power } else { Stream::Energy };
                let readings = parse_object(payload)?;
                match self.encoder.encode(stream, &readings)? {
                    Some(frame) => {
                        debug!("{stream}: {}", hex::encode_upper(&frame));
                        Ok(Some(Outgoing { topic: self.config.publish_topic(name), payload: frame }))
                    },
                    None => Ok(None),
                }
            },
            "state" => {
                let state = parse_object(payload)?;
                let status = format_status(&self.config.pulse, &state)?;
                Ok(Some(Outgoing { topic: self.config.publish_topic(name), payload: status.to_string().into_bytes() }))
            },
            "realtime" | "prices" => Ok(None),
            "status" => {
                info!("status : `{}`", String::from_utf8_lossy(payload));
                Ok(None)
            },
            _ => {
                debug!("`{}` from `{topic}` topic", String::from_utf8_lossy(payload));
                Ok(None)
            }
        }
    }
}
