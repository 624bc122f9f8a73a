use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Initial `(sum_a, sum_b)`; the hub rejects unseeded checksums.
pub const CHECKSUM_SEED: [u8; 2] = [0x0D, 0x60];

/// Checksum trailer length.
pub const CHECKSUM_LEN: usize = 2;

/// Smallest valid packet: one code byte plus the trailer.
pub const MIN_PACKET_LEN: usize = 1 + CHECKSUM_LEN;

/// Seeded Fletcher-16 over `data`, returned as `[sum_a, sum_b]`.
pub fn fletcher16(data: &[u8]) -> [u8; 2] {
    let mut sum_a = u16::from(CHECKSUM_SEED[0]);
    let mut sum_b = u16::from(CHECKSUM_SEED[1]);
    for &byte in data {
        sum_a = (sum_a + u16::from(byte)) % 255;
        sum_b = (sum_b + sum_a) % 255;
    }
    [sum_a as u8, sum_b as u8]
}

/// Copy `body` and append its checksum trailer.
pub fn append_checksum(body: &[u8]) -> Bytes {
    let mut packet = BytesMut::with_capacity(body.len() + CHECKSUM_LEN);
    packet.put_slice(body);
    packet.put_slice(&fletcher16(body));
    packet.freeze()
}

/// Check the trailer of a deframed packet and return the body without it.
pub fn verify(packet: &[u8]) -> Result<&[u8]> {
    if packet.len() < MIN_PACKET_LEN {
        return Err(FrameError::ShortFrame { len: packet.len() });
    }

    let (body, trailer) = packet.split_at(packet.len() - CHECKSUM_LEN);
    let computed = fletcher16(body);
    let received = [trailer[0], trailer[1]];
    if computed != received {
        return Err(FrameError::ChecksumMismatch { received, computed });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_seed() {
        assert_eq!(fletcher16(&[]), [0x0D, 0x60]);
    }

    #[test]
    fn single_byte() {
        // a = 0x0D + 0x01 = 0x0E, b = 0x60 + 0x0E = 0x6E
        assert_eq!(fletcher16(&[0x01]), [0x0E, 0x6E]);
    }

    #[test]
    fn sums_wrap_mod_255() {
        // a = (0x0D + 0xFF) % 255 = 0x0D, b = (0x60 + 0x0D) % 255 = 0x6D
        assert_eq!(fletcher16(&[0xFF]), [0x0D, 0x6D]);
        // a = (0x0D + 0xF2) % 255 = 0, b = 0x60
        assert_eq!(fletcher16(&[0xF2]), [0x00, 0x60]);
    }

    #[test]
    fn order_sensitive() {
        assert_ne!(fletcher16(&[1, 2]), fletcher16(&[2, 1]));
    }

    #[test]
    fn verify_accepts_appended_trailer() {
        let packet = append_checksum(&[0x42, 0, 0, 0, 0]);
        assert_eq!(packet.len(), 7);
        let body = verify(&packet).unwrap();
        assert_eq!(body, &[0x42, 0, 0, 0, 0]);
    }

    #[test]
    fn verify_rejects_corruption() {
        let mut packet = append_checksum(&[0x14, 0x01]).to_vec();
        packet[1] ^= 0x10;
        let err = verify(&packet).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
    }

    #[test]
    fn verify_rejects_short_packets() {
        assert!(matches!(
            verify(&[0x0D, 0x60]),
            Err(FrameError::ShortFrame { len: 2 })
        ));
        assert!(matches!(verify(&[]), Err(FrameError::ShortFrame { len: 0 })));
    }
}
