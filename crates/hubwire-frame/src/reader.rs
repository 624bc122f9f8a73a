use std::io::{ErrorKind, Read};

use bytes::{BufMut, Bytes, BytesMut};
use hubwire_transport::{HubStream, Pending};
use tracing::debug;

use crate::codec::{Deframer, FrameConfig};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Everything one read cycle produced.
#[derive(Debug)]
pub struct ReadBatch {
    /// Raw bytes as they came off the link.
    pub raw: Bytes,
    /// Packets completed by these bytes, in order. Not yet checksum-verified.
    pub frames: Vec<Result<Bytes>>,
    /// The batch ended between an escape byte and its successor.
    pub dangling_escape: bool,
}

/// Reads deframed packets from any `Read` stream.
///
/// Each call blocks for at least one byte, then drains whatever the
/// transport already has buffered, so a burst costs one or two reads
/// instead of one per byte. Deframing state carries over between calls.
pub struct FrameReader<T> {
    inner: T,
    deframer: Deframer,
}

impl<T: Read + Pending> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            deframer: Deframer::new(config.max_frame_size),
        }
    }

    /// Run one read cycle.
    ///
    /// Returns `Ok(None)` when the read timed out with nothing received and
    /// `Err(FrameError::ConnectionClosed)` at EOF.
    pub fn read_batch(&mut self) -> Result<Option<ReadBatch>> {
        let mut first = [0u8; 1];
        let read = loop {
            match self.inner.read(&mut first) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => return Ok(None),
                Err(err) => return Err(FrameError::Io(err)),
            }
        };

        let pending = match self.inner.bytes_pending() {
            Ok(n) => n.min(READ_CHUNK_SIZE),
            Err(err) => {
                debug!(%err, "pending byte query failed; reading one byte only");
                0
            }
        };

        let mut raw = BytesMut::with_capacity(read + pending);
        raw.put_slice(&first[..read]);

        if pending > 0 {
            let mut chunk = vec![0u8; pending];
            loop {
                match self.inner.read(&mut chunk) {
                    Ok(n) => {
                        raw.put_slice(&chunk[..n]);
                        break;
                    }
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) if is_timeout(&err) => break,
                    Err(err) => return Err(FrameError::Io(err)),
                }
            }
        }

        let raw = raw.freeze();
        let frames = self.deframer.feed(&raw);
        Ok(Some(ReadBatch {
            raw,
            frames,
            dangling_escape: self.deframer.is_escaping(),
        }))
    }
}

impl FrameReader<HubStream> {
    /// Reader over a hub link. `config.read_timeout` is applied to the stream
    /// first, so an idle link yields `Ok(None)` instead of blocking.
    pub fn with_config_hub(mut inner: HubStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn transport_to_frame_error(err: hubwire_transport::TransportError) -> FrameError {
    match err {
        hubwire_transport::TransportError::Io(io) => FrameError::Io(io),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::checksum::append_checksum;
    use crate::codec::{encode_frame, ESCAPE, START, STOP};

    fn wire_for(bodies: &[&[u8]]) -> Vec<u8> {
        let mut wire = BytesMut::new();
        for body in bodies {
            encode_frame(&append_checksum(body), &mut wire);
        }
        wire.to_vec()
    }

    #[test]
    fn drains_buffered_bytes_in_one_batch() {
        let wire = wire_for(&[&[0x14, 0x42], &[0x31, 0x0B, 0x0B, 0x1A]]);
        let mut reader = FrameReader::new(Cursor::new(wire.clone()));

        let batch = reader.read_batch().unwrap().unwrap();
        assert_eq!(batch.raw.as_ref(), wire.as_slice());
        assert_eq!(batch.frames.len(), 2);
        assert!(!batch.dangling_escape);
    }

    #[test]
    fn frame_split_across_reads() {
        let wire = wire_for(&[&[0x42, 0x01, 0x00, 0x00, 0x00]]);
        let mut reader = FrameReader::new(ByteByByteReader {
            bytes: wire.clone(),
            pos: 0,
        });

        let mut frames = Vec::new();
        for _ in 0..wire.len() {
            let batch = reader.read_batch().unwrap().unwrap();
            assert_eq!(batch.raw.len(), 1);
            frames.extend(batch.frames);
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].as_ref().unwrap(),
            &append_checksum(&[0x42, 0x01, 0x00, 0x00, 0x00])
        );
    }

    #[test]
    fn reports_dangling_escape_between_reads() {
        let mut reader = FrameReader::new(ByteByByteReader {
            bytes: vec![START, 0x51, ESCAPE, 0x7C, STOP],
            pos: 0,
        });

        reader.read_batch().unwrap();
        reader.read_batch().unwrap();
        let batch = reader.read_batch().unwrap().unwrap();
        assert!(batch.dangling_escape);

        let batch = reader.read_batch().unwrap().unwrap();
        assert!(!batch.dangling_escape);
        let batch = reader.read_batch().unwrap().unwrap();
        assert_eq!(batch.frames[0].as_ref().unwrap().as_ref(), &[0x51, START]);
    }

    #[test]
    fn connection_closed_at_eof() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_batch().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn timeout_is_idle_not_error() {
        let mut reader = FrameReader::new(TimedOutReader);
        assert!(reader.read_batch().unwrap().is_none());
    }

    #[test]
    fn interrupted_read_retries() {
        let wire = wire_for(&[&[0x14, 0x03]]);
        let mut reader = FrameReader::new(InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(wire),
        });
        let batch = reader.read_batch().unwrap().unwrap();
        assert_eq!(batch.frames.len(), 1);
    }

    #[test]
    #[cfg(unix)]
    fn reads_from_hub_stream_pair() {
        use std::io::Write;

        let (mut hub, host) = HubStream::pair().unwrap();
        let cfg = FrameConfig {
            read_timeout: Some(std::time::Duration::from_millis(20)),
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config_hub(host, cfg).unwrap();
        assert!(reader.read_batch().unwrap().is_none());

        hub.write_all(&wire_for(&[&[0x02]])).unwrap();
        let batch = reader.read_batch().unwrap().unwrap();
        assert_eq!(batch.frames.len(), 1);
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    impl Pending for ByteByByteReader {
        fn bytes_pending(&self) -> std::io::Result<usize> {
            Ok(0)
        }
    }

    struct TimedOutReader;

    impl Read for TimedOutReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::TimedOut))
        }
    }

    impl Pending for TimedOutReader {
        fn bytes_pending(&self) -> std::io::Result<usize> {
            Ok(0)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    impl Pending for InterruptedThenData {
        fn bytes_pending(&self) -> std::io::Result<usize> {
            self.inner.bytes_pending()
        }
    }
}
