use super::crc::patch_crc16;
use super::datetime::{PackedDatetime, PACKED_DATETIME_LEN};
use super::fields::ObisEntry;
use super::EncodeError;
use log::debug;

const HDLC_FLAG: u8 = 0x7E;
/* frame format type 3 (0xA), segmentation off, length in the low 11 bits */
const FRAME_FORMAT: u16 = 0xA000;
const MAX_FRAME_LENGTH: usize = 0x7FF;
/* UI frame with poll/final bit set */
const CONTROL_FIELD: u8 = 0x13;
/* LLC header E6 E7 00 followed by data-notification 0F */
const PROTOCOL_MARKER: [u8; 4] = [0xE6, 0xE7, 0x00, 0x0F];
const INVOKE_ID: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
const STRUCTURE_TAG: u8 = 0x02;

const HCS_POS: usize = 6;

pub const DEFAULT_TARGET_ADDRESS: u8 = 21;
pub const DEFAULT_SOURCE_ADDRESS: u8 = 16;

/// The meter we pretend to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterIdentity {
    address: u16,
    pub meter_list: String,
    pub meter_id: String,
    pub meter_type: String,
}

impl MeterIdentity {
    /// Addresses are 7 bit HDLC addresses, anything above 127 gets its top bit dropped
    pub fn new(target_address: u8, source_address: u8, meter_list: &str, meter_id: &str, meter_type: &str) -> Self {
        let target = ((target_address as u16) << 1 | 1) & 0xFF;
        let source = ((source_address as u16) << 1 | 1) & 0xFF;
        return MeterIdentity {
            address: target << 8 | source,
            meter_list: meter_list.to_string(),
            meter_id: meter_id.to_string(),
            meter_type: meter_type.to_string(),
        };
    }

    pub fn address(&self) -> u16 {
        self.address
    }
}

impl std::fmt::Display for MeterIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, ID:{}, TYPE:{}, ADDRESS:{:#06x}", self.meter_list, self.meter_id, self.meter_type, self.address)
    }
}

/// Assembles HDLC frames carrying a DLMS data-notification
pub struct FrameBuilder {
    identity: MeterIdentity,
}

impl FrameBuilder {
    pub fn new(identity: MeterIdentity) -> Self {
        return FrameBuilder { identity };
    }

    pub fn identity(&self) -> &MeterIdentity {
        &self.identity
    }

    pub fn build(&self, entries: &[ObisEntry], datetime: &PackedDatetime) -> Result<Vec<u8>, EncodeError> {
        let count = u8::try_from(entries.len()).map_err(|_| EncodeError::FrameTooLarge(entries.len()))?;

        /* Flag and the two byte format / length placeholder */
        let mut frame: Vec<u8> = vec![HDLC_FLAG, 0, 0];
        frame.extend_from_slice(&self.identity.address.to_be_bytes());
        frame.push(CONTROL_FIELD);
        /* HCS placeholder */
        frame.extend_from_slice(&[0, 0]);
        frame.extend_from_slice(&PROTOCOL_MARKER);
        frame.extend_from_slice(&INVOKE_ID);
        frame.push(PACKED_DATETIME_LEN as u8);
        frame.extend_from_slice(datetime.as_bytes());

        frame.extend_from_slice(&[STRUCTURE_TAG, count]);
        for entry in entries {
            entry.encode_into(&mut frame)?;
        }

        /* FCS placeholder and closing flag */
        frame.extend_from_slice(&[0, 0, HDLC_FLAG]);

        let len = frame.len() - 2;
        if len > MAX_FRAME_LENGTH {
            return Err(EncodeError::FrameTooLarge(frame.len()));
        }
        frame[1..3].copy_from_slice(&(FRAME_FORMAT + len as u16).to_be_bytes());

        patch_crc16(&mut frame, 1..HCS_POS, HCS_POS);
        let fcs_pos = frame.len() - 3;
        patch_crc16(&mut frame, 1..fcs_pos, fcs_pos);

        debug!("Built frame with {} entries, {} bytes", count, frame.len());
        return Ok(frame);
    }
}
