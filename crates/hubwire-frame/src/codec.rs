use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Begins a frame. Always wins: a partial frame in progress is dropped.
pub const START: u8 = 0x83;

/// Ends a frame.
pub const STOP: u8 = 0x87;

/// Prefixes an escaped byte, which follows as `byte ^ 0xFF`.
pub const ESCAPE: u8 = 0x88;

/// Default maximum unescaped frame size. The largest hub packet is 14 bytes.
pub const DEFAULT_MAX_FRAME: usize = 256;

/// Returns true if `byte` must be escaped inside a frame.
pub fn is_reserved(byte: u8) -> bool {
    matches!(byte, START | STOP | ESCAPE)
}

/// Append `payload` to `dst`, escaping reserved bytes.
pub fn escape_into(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(payload.len());
    for &byte in payload {
        if is_reserved(byte) {
            dst.put_u8(ESCAPE);
            dst.put_u8(byte ^ 0xFF);
        } else {
            dst.put_u8(byte);
        }
    }
}

/// Reverse [`escape_into`] for a complete escaped sequence.
pub fn unescape(escaped: &[u8]) -> Result<Bytes> {
    let mut out = BytesMut::with_capacity(escaped.len());
    let mut escaping = false;
    for &byte in escaped {
        if escaping {
            out.put_u8(byte ^ 0xFF);
            escaping = false;
        } else if byte == ESCAPE {
            escaping = true;
        } else {
            out.put_u8(byte);
        }
    }
    if escaping {
        return Err(FrameError::DanglingEscape);
    }
    Ok(out.freeze())
}

/// Encode a packet into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────┬───────────────────────────────┬──────┐
/// │ 0x83  │ packet, 0x83/0x87/0x88 → 0x88, │ 0x87 │
/// │ Start │ byte ^ 0xFF                   │ Stop │
/// └───────┴───────────────────────────────┴──────┘
/// ```
///
/// An empty packet encodes to `83 87`, which the hub treats as a stream
/// reset.
pub fn encode_frame(packet: &[u8], dst: &mut BytesMut) {
    dst.reserve(packet.len() + 2);
    dst.put_u8(START);
    escape_into(packet, dst);
    dst.put_u8(STOP);
}

/// Configuration for frame reading.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum unescaped frame size in bytes. Default: 256.
    pub max_frame_size: usize,
    /// Read timeout for blocking operations. Readers report idle on expiry.
    pub read_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
            read_timeout: None,
        }
    }
}

/// Incremental deframer fed one raw byte at a time.
///
/// State survives across reads: a frame may be split across any number
/// of `push` calls, including between an escape byte and its successor.
#[derive(Debug)]
pub struct Deframer {
    buf: BytesMut,
    escaping: bool,
    overflow: Option<usize>,
    max_frame_size: usize,
}

impl Default for Deframer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME)
    }
}

impl Deframer {
    /// Create a deframer that discards frames larger than `max_frame_size`.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(max_frame_size.min(DEFAULT_MAX_FRAME)),
            escaping: false,
            overflow: None,
            max_frame_size,
        }
    }

    /// Feed one raw byte. Returns the accumulated packet when `byte` is Stop.
    pub fn push(&mut self, byte: u8) -> Option<Result<Bytes>> {
        match byte {
            START => {
                self.buf.clear();
                self.escaping = false;
                self.overflow = None;
                None
            }
            STOP => {
                self.escaping = false;
                let packet = self.buf.split().freeze();
                if let Some(size) = self.overflow.take() {
                    return Some(Err(FrameError::PayloadTooLarge {
                        size,
                        max: self.max_frame_size,
                    }));
                }
                Some(Ok(packet))
            }
            ESCAPE => {
                self.escaping = true;
                None
            }
            _ => {
                let value = if self.escaping { byte ^ 0xFF } else { byte };
                self.escaping = false;
                if let Some(size) = self.overflow.as_mut() {
                    *size += 1;
                } else if self.buf.len() >= self.max_frame_size {
                    self.overflow = Some(self.buf.len() + 1);
                    self.buf.clear();
                } else {
                    self.buf.put_u8(value);
                }
                None
            }
        }
    }

    /// Feed a run of raw bytes, collecting every packet they complete.
    pub fn feed(&mut self, raw: &[u8]) -> Vec<Result<Bytes>> {
        raw.iter().filter_map(|&byte| self.push(byte)).collect()
    }

    /// True if the last byte seen was an unconsumed escape.
    pub fn is_escaping(&self) -> bool {
        self.escaping
    }

    /// Bytes accumulated for the frame in progress.
    pub fn partial_len(&self) -> usize {
        self.buf.len()
    }
}

/// `tokio-util` codec over the same wire format.
///
/// Decoding yields checksum-verified packet bodies (trailer stripped);
/// corrupt frames are logged and skipped. Encoding takes a body, appends
/// its checksum and frames it.
#[cfg(feature = "async")]
#[derive(Debug, Default)]
pub struct HubCodec {
    deframer: Deframer,
}

#[cfg(feature = "async")]
impl HubCodec {
    /// Create a codec with an explicit maximum frame size.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            deframer: Deframer::new(max_frame_size),
        }
    }
}

#[cfg(feature = "async")]
impl tokio_util::codec::Decoder for HubCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        use bytes::Buf;

        while src.has_remaining() {
            let byte = src.get_u8();
            let Some(packet) = self.deframer.push(byte) else {
                continue;
            };
            match packet.and_then(|packet| {
                crate::checksum::verify(&packet).map(|body| packet.slice(..body.len()))
            }) {
                Ok(body) => return Ok(Some(body)),
                Err(err) => tracing::warn!(%err, "dropping corrupt frame"),
            }
        }
        Ok(None)
    }
}

#[cfg(feature = "async")]
impl tokio_util::codec::Encoder<Bytes> for HubCodec {
    type Error = FrameError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<()> {
        let packet = crate::checksum::append_checksum(&body);
        encode_frame(&packet, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::append_checksum;

    fn escaped(payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        escape_into(payload, &mut buf);
        buf
    }

    #[test]
    fn escapes_reserved_bytes() {
        let out = escaped(&[0x01, START, STOP, ESCAPE, 0x02]);
        assert_eq!(
            out.as_ref(),
            &[0x01, ESCAPE, 0x7C, ESCAPE, 0x78, ESCAPE, 0x77, 0x02]
        );
    }

    #[test]
    fn escape_unescape_roundtrip() {
        let inputs: [&[u8]; 4] = [
            &[],
            &[0x00, 0x7C, 0xFF],
            &[START, START, STOP, ESCAPE, ESCAPE],
            &[0x51, 0x01, 0x00, 0x00, 0x00, 0x83, 0x87, 0x88, 0x10],
        ];
        for input in inputs {
            let wire = escaped(input);
            assert_eq!(unescape(&wire).unwrap().as_ref(), input);
        }
    }

    #[test]
    fn escaped_output_has_no_delimiters() {
        let all: Vec<u8> = (0..=255).collect();
        let wire = escaped(&all);
        assert!(!wire.iter().any(|&b| b == START || b == STOP));
        assert_eq!(unescape(&wire).unwrap().as_ref(), all.as_slice());
    }

    #[test]
    fn unescape_rejects_dangling_escape() {
        assert!(matches!(
            unescape(&[0x01, ESCAPE]),
            Err(FrameError::DanglingEscape)
        ));
    }

    #[test]
    fn encode_empty_frame_is_reset() {
        let mut buf = BytesMut::new();
        encode_frame(&[], &mut buf);
        assert_eq!(buf.as_ref(), &[START, STOP]);
    }

    #[test]
    fn deframes_encoded_packet() {
        let packet = append_checksum(&[0x51, 0x83, 0x00, 0x00, 0x00, 0x05]);
        let mut wire = BytesMut::new();
        encode_frame(&packet, &mut wire);

        let mut deframer = Deframer::default();
        let frames = deframer.feed(&wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap(), &packet);
    }

    #[test]
    fn start_discards_partial_frame() {
        let good = append_checksum(&[0x14, 0x42]);
        let mut wire = BytesMut::new();
        wire.put_slice(&[START, 0x31, 0x0B, 0x01]);
        encode_frame(&good, &mut wire);

        let mut deframer = Deframer::default();
        let frames = deframer.feed(&wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap(), &good);
    }

    #[test]
    fn escape_state_spans_feeds() {
        let mut deframer = Deframer::default();
        assert!(deframer.feed(&[START, 0x10, ESCAPE]).is_empty());
        assert!(deframer.is_escaping());

        let frames = deframer.feed(&[0x7C, STOP]);
        assert!(!deframer.is_escaping());
        assert_eq!(frames[0].as_ref().unwrap().as_ref(), &[0x10, START]);
    }

    #[test]
    fn start_clears_pending_escape() {
        let mut deframer = Deframer::default();
        deframer.feed(&[START, ESCAPE]);
        let frames = deframer.feed(&[START, 0x01, STOP]);
        assert_eq!(frames[0].as_ref().unwrap().as_ref(), &[0x01]);
    }

    #[test]
    fn oversized_frame_reported_then_recovers() {
        let mut deframer = Deframer::new(4);
        let frames = deframer.feed(&[START, 1, 2, 3, 4, 5, 6, STOP, START, 9, STOP]);
        assert_eq!(frames.len(), 2);
        assert!(matches!(
            frames[0],
            Err(FrameError::PayloadTooLarge { size: 6, max: 4 })
        ));
        assert_eq!(frames[1].as_ref().unwrap().as_ref(), &[9]);
    }

    #[test]
    fn buffer_cleared_after_stop() {
        let mut deframer = Deframer::default();
        deframer.feed(&[START, 1, 2, STOP]);
        assert_eq!(deframer.partial_len(), 0);
    }

    #[cfg(feature = "async")]
    #[test]
    fn tokio_codec_skips_corrupt_frames() {
        use tokio_util::codec::{Decoder, Encoder};

        let mut codec = HubCodec::default();
        let mut wire = BytesMut::new();
        wire.put_slice(&[START, 0x14, 0x01, 0x00, 0x00, STOP]);
        codec
            .encode(Bytes::from_static(&[0x31, 0x0B, 0x0B, 0x1A]), &mut wire)
            .unwrap();

        let body = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(body.as_ref(), &[0x31, 0x0B, 0x0B, 0x1A]);
        assert!(codec.decode(&mut wire).unwrap().is_none());
    }
}
