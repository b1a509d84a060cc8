/* CRC-16/X-25 as used for the HCS and FCS fields of the HDLC envelope */
use ::crc16::{State, X_25};

/// Computes the HDLC checksum over `data`.
///
/// X-25 is reflected, so the low byte goes out first; the result is byte
/// swapped so `crc16(..).to_be_bytes()` is exactly what goes on the wire.
pub fn crc16(data: &[u8]) -> u16 {
    return State::<X_25>::calculate(data).swap_bytes();
}

/// Writes the checksum of `frame[range]` big endian into `frame[at..at + 2]`
pub fn patch_crc16(frame: &mut [u8], range: std::ops::Range<usize>, at: usize) {
    let crc = crc16(&frame[range]).to_be_bytes();
    frame[at..at + 2].copy_from_slice(&crc);
}

#[cfg(test)]
mod tests {
    use super::*;

    /* Bit by bit: poly 0x8408, seed 0xFFFF, LSB first, complement, swap */
    fn bitwise_crc16(data: &[u8]) -> u16 {
        let mut crc: u16 = 0xFFFF;
        for b in data {
            let mut cur_byte = *b;
            for _ in 0..8 {
                if (crc & 0x0001) ^ (cur_byte as u16 & 0x0001) != 0 {
                    crc = (crc >> 1) ^ 0x8408;
                } else {
                    crc >>= 1;
                }
                cur_byte >>= 1;
            }
        }
        (!crc).swap_bytes()
    }

    #[test]
    fn test_check_value() {
        /* Published check value for CRC-16/X-25 is 0x906E, low byte first on the line */
        assert_eq!(State::<X_25>::calculate(b"123456789"), 0x906E);
        assert_eq!(crc16(b"123456789"), 0x6E90);
        assert_eq!(crc16(b"123456789").to_be_bytes(), [0x6E, 0x90]);
    }

    #[test]
    fn test_matches_bitwise_register() {
        let samples: [&[u8]; 5] = [
            b"",
            b"\x7e",
            b"\xa0\x7b\x2b\x21\x13",
            b"123456789",
            b"The quick brown fox jumps over the lazy dog",
        ];

        for sample in samples {
            assert_eq!(crc16(sample), bitwise_crc16(sample), "sample {:02x?}", sample);
        }
    }

    #[test]
    fn test_deterministic() {
        let data = [0xA0u8, 0x2A, 0x2B, 0x21, 0x13];
        assert_eq!(crc16(&data), crc16(&data));
        assert_ne!(crc16(&data), crc16(&data[1..]));
    }

    #[test]
    fn test_patch_crc16() {
        let mut frame = vec![0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x00, 0x00];
        patch_crc16(&mut frame, 0..9, 9);
        assert_eq!(&frame[9..], &[0x6E, 0x90]);
    }
}
