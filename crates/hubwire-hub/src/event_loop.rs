use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use bytes::Bytes;
use hubwire_frame::{verify, FrameError, FrameReader, Hex};
use hubwire_proto::{classify, Event, ProtoError};
use hubwire_transport::Pending;
use tracing::{debug, info, trace, warn};

use crate::activity::ActivityLog;
use crate::devices::ObservedDevices;
use crate::error::Result;
use crate::status::SharedStatus;

/// Reads the hub's output, keeps shared state current and forwards
/// solicited events to the command loop.
///
/// Runs until the stop flag is observed (checked after every read, so at
/// least once per read timeout) or the link closes.
pub struct EventLoop<R> {
    reader: FrameReader<R>,
    solicited: Sender<Bytes>,
    activity: ActivityLog,
    devices: ObservedDevices,
    status: SharedStatus,
    stop: Arc<AtomicBool>,
}

impl<R: Read + Pending> EventLoop<R> {
    pub fn new(
        reader: FrameReader<R>,
        solicited: Sender<Bytes>,
        activity: ActivityLog,
        devices: ObservedDevices,
        status: SharedStatus,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            reader,
            solicited,
            activity,
            devices,
            status,
            stop,
        }
    }

    pub fn run(mut self) -> Result<()> {
        while !self.stop.load(Ordering::Acquire) {
            let batch = match self.reader.read_batch() {
                Ok(Some(batch)) => batch,
                Ok(None) => continue,
                Err(FrameError::ConnectionClosed) => {
                    info!("hub link closed");
                    self.activity.push("link closed");
                    return Ok(());
                }
                Err(err) => {
                    warn!(%err, "event loop read failed");
                    return Err(err.into());
                }
            };

            trace!(raw = %Hex(&batch.raw), "received");
            for frame in batch.frames {
                match frame {
                    Ok(packet) => self.handle_packet(&packet),
                    Err(err) => {
                        warn!(%err, "dropping frame");
                        self.activity.push(format!("dropped frame: {err}"));
                    }
                }
            }
            if batch.dangling_escape {
                debug!("read ended inside an escape sequence");
                self.activity
                    .push("read ended inside an escape sequence; frame continues");
            }
        }
        debug!("event loop stopping");
        Ok(())
    }

    fn handle_packet(&self, packet: &[u8]) {
        if packet.is_empty() {
            // Stream reset.
            return;
        }
        let body = match verify(packet) {
            Ok(body) => body,
            Err(err) => {
                warn!(%err, packet = %Hex(packet), "dropping frame");
                self.activity.push(format!("dropped frame: {err}"));
                return;
            }
        };
        self.dispatch(body);
    }

    /// Handle a verified body (code byte first, checksum removed).
    fn dispatch(&self, body: &[u8]) {
        let Some(&code) = body.first() else {
            return;
        };

        match Event::parse(body) {
            Ok(event) => {
                debug!(code, %event, "event");
                self.apply(&event);
                self.activity.push(format!("<< {event}"));
            }
            Err(ProtoError::UnknownEvent(_)) => {
                info!(code, body = %Hex(body), "unknown event");
                self.activity
                    .push(format!("<< unknown event 0x{code:02X} [{}]", Hex(body)));
            }
            Err(err) => {
                warn!(%err, body = %Hex(body), "undecodable event");
                self.activity.push(format!("<< {err} [{}]", Hex(body)));
            }
        }

        if classify(code).is_solicited()
            && self.solicited.send(Bytes::copy_from_slice(body)).is_err()
        {
            debug!(code, "command loop gone; solicited event dropped");
        }
    }

    fn apply(&self, event: &Event) {
        match event {
            Event::Vitals(vitals) => {
                if self.devices.insert(vitals.device) {
                    info!(device = %vitals.device, "new device");
                }
            }
            Event::NetId(id) => self.status.update(|s| {
                s.net_id = Some(*id);
                s.long_range = id.is_long_range();
            }),
            Event::Versions(versions) => self.status.update(|s| {
                s.versions = Some(versions.clone());
            }),
            Event::Channel(info) => self.status.update(|s| s.channel = Some(*info)),
            Event::PairingPattern(pattern) => {
                self.status.update(|s| s.pairing_pattern = Some(*pattern))
            }
            _ => {}
        }
    }
}
