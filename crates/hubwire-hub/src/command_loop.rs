use std::io::Write;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Instant;

use bytes::Bytes;
use hubwire_frame::{FrameWriter, Hex};
use hubwire_proto::{classify, validate, CommandCode, EventClass, Verdict};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::activity::ActivityLog;
use crate::config::HubConfig;
use crate::error::{HubError, Result};

/// Work item for the command loop.
#[derive(Debug)]
pub enum Outbound {
    /// Checksummed packets, sent back to back with nothing interleaved.
    /// Their outcomes go to `receipt` once the last one settles.
    Commands {
        packets: Vec<Bytes>,
        receipt: Option<Sender<Vec<Outcome>>>,
    },
    /// Finish everything queued before this, then stop.
    Shutdown,
}

/// How a command left the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A response passed the command's validator.
    Resolved,
    /// Some response arrived and the command has no validator.
    Unverified,
    /// Nothing acceptable arrived in time.
    TimedOut,
    /// Every resend was answered with a transmission error.
    RetriesExhausted,
    /// The hub refused the command's parameters.
    Rejected,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Resolved | Outcome::Unverified)
    }
}

/// Sends queued commands one at a time and waits for each to resolve.
pub struct CommandLoop<W> {
    writer: FrameWriter<W>,
    commands: Receiver<Outbound>,
    solicited: Receiver<Bytes>,
    activity: ActivityLog,
    config: HubConfig,
}

impl<W: Write> CommandLoop<W> {
    pub fn new(
        writer: FrameWriter<W>,
        commands: Receiver<Outbound>,
        solicited: Receiver<Bytes>,
        activity: ActivityLog,
        config: HubConfig,
    ) -> Self {
        Self {
            writer,
            commands,
            solicited,
            activity,
            config,
        }
    }

    /// Reset the stream, then serve the queue until `Shutdown` or until
    /// every sender is gone.
    ///
    /// Returns early only if the link fails or the event loop disappears.
    pub fn run(mut self) -> Result<()> {
        self.reset_stream()?;

        while let Ok(item) = self.commands.recv() {
            match item {
                Outbound::Commands { packets, receipt } => {
                    let mut outcomes = Vec::with_capacity(packets.len());
                    for packet in &packets {
                        outcomes.push(self.dispatch(packet)?);
                    }
                    if let Some(receipt) = receipt {
                        // The submitter may have stopped waiting.
                        let _ = receipt.send(outcomes);
                    }
                }
                Outbound::Shutdown => break,
            }
        }
        debug!("command loop stopping");
        Ok(())
    }

    /// Empty frames, spaced out, so the hub drops any partial frame.
    pub fn reset_stream(&mut self) -> Result<()> {
        for _ in 0..self.config.reset_frames {
            self.writer.send_reset()?;
            thread::sleep(self.config.reset_spacing);
        }
        Ok(())
    }

    /// Transmit one packet and drive it to an outcome.
    pub fn dispatch(&mut self, packet: &[u8]) -> Result<Outcome> {
        let label = describe(packet);
        self.drain_stale();
        self.transmit(packet, &label, 0)?;

        let mut retries = 0u8;
        let mut sent_at = Instant::now();
        let mut deadline = sent_at + self.config.response_timeout;

        let outcome = loop {
            let wait = deadline.saturating_duration_since(Instant::now());
            let event = match self.solicited.recv_timeout(wait) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => break Outcome::TimedOut,
                Err(RecvTimeoutError::Disconnected) => return Err(HubError::EventLoopStopped),
            };
            let Some(&code) = event.first() else {
                continue;
            };

            match classify(code) {
                EventClass::TransmissionError => {
                    if retries >= self.config.max_retries {
                        break Outcome::RetriesExhausted;
                    }
                    retries += 1;
                    warn!(command = %label, code, attempt = retries, "transmission error; resending");
                    thread::sleep(self.config.retry_backoff);
                    self.drain_stale();
                    self.transmit(packet, &label, retries)?;
                    sent_at = Instant::now();
                    deadline = sent_at + self.config.response_timeout;
                }
                EventClass::ProtocolError => break Outcome::Rejected,
                EventClass::Response | EventClass::Asynchronous => {
                    match validate(packet, &event) {
                        Verdict::Accepted => break Outcome::Resolved,
                        Verdict::Unverified => {
                            debug!(command = %label, "no validator; accepting response");
                            break Outcome::Unverified;
                        }
                        Verdict::Mismatch => {
                            debug!(command = %label, event = %Hex(&event), "response does not match; waiting");
                            self.activity.push(format!(
                                "ignored response [{}] to {label}",
                                Hex(&event)
                            ));
                            deadline = sent_at + self.config.validation_window;
                        }
                    }
                }
            }
        };

        self.record(&label, outcome, retries);
        Ok(outcome)
    }

    /// Send `packet`; `retry` is 0 for the first transmission.
    fn transmit(&mut self, packet: &[u8], label: &str, retry: u8) -> Result<()> {
        debug!(command = %label, wire = %Hex(packet), retry, "sending");
        self.writer.send_packet(packet)?;
        trace!(raw = %Hex(self.writer.last_wire()), "sent");
        if retry == 0 {
            self.activity.push(format!(">> {label} [{}]", Hex(packet)));
        } else {
            self.activity.push(format!(
                ">> {label} [{}] retry {retry}/{}",
                Hex(packet),
                self.config.max_retries
            ));
        }
        Ok(())
    }

    /// Discard responses that arrived while nothing was waiting for them.
    fn drain_stale(&mut self) {
        let stale = self.solicited.try_iter().count();
        if stale > 0 {
            debug!(stale, "discarded stale responses");
        }
    }

    fn record(&self, label: &str, outcome: Outcome, retries: u8) {
        match outcome {
            Outcome::Resolved => {
                debug!(command = %label, retries, "resolved");
                self.activity.push(format!("{label} resolved"));
            }
            Outcome::Unverified => {
                debug!(command = %label, retries, "resolved without validation");
                self.activity.push(format!("{label} resolved (no validator)"));
            }
            Outcome::TimedOut => {
                warn!(command = %label, timeout = ?self.config.response_timeout, "no response");
                self.activity.push(format!("{label} timed out"));
            }
            Outcome::RetriesExhausted => {
                warn!(command = %label, retries, "giving up after repeated transmission errors");
                self.activity
                    .push(format!("{label} abandoned after {retries} retries"));
            }
            Outcome::Rejected => {
                info!(command = %label, "hub rejected command");
                self.activity.push(format!("{label} rejected by hub"));
            }
        }
    }
}

fn describe(packet: &[u8]) -> String {
    match packet.first() {
        Some(&code) => CommandCode::from_u8(code)
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| format!("command 0x{code:02X}")),
        None => "empty command".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use hubwire_frame::{verify, Deframer};
    use hubwire_proto::{Command, ValveBitmask};

    use super::*;

    /// Stands in for the hub: each transmitted command pops one scripted
    /// reply list and pushes it straight onto the solicited queue.
    struct ScriptedHub {
        pending: Vec<u8>,
        script: VecDeque<Vec<Vec<u8>>>,
        replies: Sender<Bytes>,
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        resets: Arc<Mutex<usize>>,
    }

    impl Write for ScriptedHub {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.pending.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            let wire = std::mem::take(&mut self.pending);
            for frame in Deframer::default().feed(&wire) {
                let packet = frame.expect("host frames are well formed");
                if packet.is_empty() {
                    *self.resets.lock().unwrap() += 1;
                    continue;
                }
                let body = verify(&packet).expect("host checksums are valid").to_vec();
                self.sent.lock().unwrap().push(body);
                for reply in self.script.pop_front().unwrap_or_default() {
                    let _ = self.replies.send(Bytes::from(reply));
                }
            }
            Ok(())
        }
    }

    struct Fixture {
        command_loop: CommandLoop<ScriptedHub>,
        commands: Sender<Outbound>,
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        resets: Arc<Mutex<usize>>,
        stale: Sender<Bytes>,
        activity: ActivityLog,
    }

    fn fixture(script: Vec<Vec<Vec<u8>>>) -> Fixture {
        let (events_tx, events_rx) = mpsc::channel();
        let (commands_tx, commands_rx) = mpsc::channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let resets = Arc::new(Mutex::new(0));
        let activity = ActivityLog::new(20);
        let hub = ScriptedHub {
            pending: Vec::new(),
            script: script.into(),
            replies: events_tx.clone(),
            sent: Arc::clone(&sent),
            resets: Arc::clone(&resets),
        };
        let config = HubConfig {
            response_timeout: Duration::from_millis(60),
            retry_backoff: Duration::from_millis(1),
            validation_window: Duration::from_millis(150),
            reset_spacing: Duration::from_millis(1),
            ..HubConfig::default()
        };
        Fixture {
            command_loop: CommandLoop::new(
                FrameWriter::new(hub),
                commands_rx,
                events_rx,
                activity.clone(),
                config,
            ),
            commands: commands_tx,
            sent,
            resets,
            stale: events_tx,
            activity,
        }
    }

    fn valves_report(device: u32) -> Vec<u8> {
        let mut body = vec![0x52];
        body.extend_from_slice(&device.to_le_bytes());
        body.push(0x01);
        body
    }

    const CHECKSUM_ERROR: [u8; 6] = [0x51, 0x42, 0x00, 0x00, 0x00, 0x00];

    #[test]
    fn resolves_on_expected_code() {
        let mut f = fixture(vec![vec![vec![0x14, 0x42]]]);
        let outcome = f
            .command_loop
            .dispatch(&Command::vitals_get(0).to_packet())
            .unwrap();
        assert_eq!(outcome, Outcome::Resolved);
        assert_eq!(f.sent.lock().unwrap().len(), 1);

        let log: Vec<String> = f.activity.snapshot().into_iter().map(|e| e.message).collect();
        assert_eq!(log.len(), 2);
        assert!(log[0].starts_with(">> vitals_get [42 00 00 00 00 "));
        assert_eq!(log[1], "vitals_get resolved");
    }

    #[test]
    fn retries_three_times_then_moves_on() {
        let mut f = fixture(vec![
            vec![CHECKSUM_ERROR.to_vec()],
            vec![CHECKSUM_ERROR.to_vec()],
            vec![CHECKSUM_ERROR.to_vec()],
            vec![CHECKSUM_ERROR.to_vec()],
            vec![vec![0xA1, 1, 2, b'b', b'u', b'i', b'l', b'd', 0, 0, 0]],
        ]);
        let vitals = Command::vitals_get(0).to_packet();
        let outcome = f.command_loop.dispatch(&vitals).unwrap();
        assert_eq!(outcome, Outcome::RetriesExhausted);

        {
            let sent = f.sent.lock().unwrap();
            assert_eq!(sent.len(), 4);
            assert!(sent.iter().all(|body| body == &sent[0]));
        }

        let outcome = f
            .command_loop
            .dispatch(&Command::versions_get().to_packet())
            .unwrap();
        assert_eq!(outcome, Outcome::Resolved);
        assert_eq!(f.sent.lock().unwrap().len(), 5);
        assert!(f
            .activity
            .snapshot()
            .iter()
            .any(|e| e.message == "vitals_get abandoned after 3 retries"));
    }

    #[test]
    fn retry_then_success() {
        let mut f = fixture(vec![
            vec![vec![0x22, 0x42, 0x03]],
            vec![vec![0x14, 0x42]],
        ]);
        let outcome = f
            .command_loop
            .dispatch(&Command::vitals_get(0).to_packet())
            .unwrap();
        assert_eq!(outcome, Outcome::Resolved);
        assert_eq!(f.sent.lock().unwrap().len(), 2);

        let log: Vec<String> = f.activity.snapshot().into_iter().map(|e| e.message).collect();
        assert_eq!(log.len(), 3);
        assert!(log[0].starts_with(">> vitals_get ["));
        assert!(!log[0].contains("retry"));
        assert!(log[1].starts_with(">> vitals_get ["));
        assert!(log[1].ends_with("] retry 1/3"));
        assert_eq!(log[2], "vitals_get resolved");
    }

    #[test]
    fn mismatched_echo_does_not_resolve() {
        let put = Command::valves_put(1u32, ValveBitmask::from_bits(0x01)).to_packet();

        let mut f = fixture(vec![vec![valves_report(2)]]);
        assert_eq!(f.command_loop.dispatch(&put).unwrap(), Outcome::TimedOut);

        let mut f = fixture(vec![vec![valves_report(2), valves_report(1)]]);
        assert_eq!(f.command_loop.dispatch(&put).unwrap(), Outcome::Resolved);
        assert_eq!(f.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn mismatch_wait_is_bounded_by_validation_window() {
        let mut f = fixture(vec![vec![vec![0x14, 0x07]]]);
        let started = Instant::now();
        let outcome = f
            .command_loop
            .dispatch(&Command::pairing_pattern_get().to_packet())
            .unwrap();
        assert_eq!(outcome, Outcome::TimedOut);
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn silence_times_out() {
        let mut f = fixture(vec![]);
        let outcome = f
            .command_loop
            .dispatch(&Command::net_id_get().to_packet())
            .unwrap();
        assert_eq!(outcome, Outcome::TimedOut);
        let log = f.activity.snapshot();
        assert!(log[0].message.starts_with(">> net_id_get ["));
        assert_eq!(log[1].message, "net_id_get timed out");
    }

    #[test]
    fn illegal_parameter_abandons_without_retry() {
        let mut f = fixture(vec![vec![vec![0x13, 0x11]]]);
        let outcome = f
            .command_loop
            .dispatch(&Command::channel(200).to_packet())
            .unwrap();
        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(f.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn unknown_command_accepts_any_response() {
        let packet = hubwire_frame::append_checksum(&[0x09]);
        let mut f = fixture(vec![vec![vec![0x14, 0x09]]]);
        assert_eq!(
            f.command_loop.dispatch(&packet).unwrap(),
            Outcome::Unverified
        );
        let log = f.activity.snapshot();
        assert!(log[0].message.starts_with(">> command 0x09 [09 "));
        assert_eq!(log[1].message, "command 0x09 resolved (no validator)");
    }

    #[test]
    fn stale_responses_are_discarded_before_sending() {
        let mut f = fixture(vec![vec![]]);
        f.stale.send(Bytes::from_static(&[0x14, 0x42])).unwrap();
        let outcome = f
            .command_loop
            .dispatch(&Command::vitals_get(0).to_packet())
            .unwrap();
        assert_eq!(outcome, Outcome::TimedOut);
    }

    #[test]
    fn run_resets_then_serves_queue_in_order() {
        let f = fixture(vec![
            vec![vec![0x42, 0x01, 0x00, 0x00, 0x00]],
            vec![vec![0x14, 0x02]],
            vec![valves_report(5)],
            vec![vec![0x14, 0x04]],
        ]);
        f.commands
            .send(Outbound::Commands {
                packets: vec![Command::net_id_get().to_packet()],
                receipt: None,
            })
            .unwrap();
        let (receipt_tx, receipt_rx) = mpsc::channel();
        let packets = hubwire_proto::valve_transaction(5u32, ValveBitmask::from_bits(0x02))
            .iter()
            .map(Command::to_packet)
            .collect();
        f.commands
            .send(Outbound::Commands {
                packets,
                receipt: Some(receipt_tx),
            })
            .unwrap();
        f.commands.send(Outbound::Shutdown).unwrap();
        f.commands
            .send(Outbound::Commands {
                packets: vec![Command::versions_get().to_packet()],
                receipt: None,
            })
            .unwrap();

        f.command_loop.run().unwrap();

        let codes: Vec<u8> = f.sent.lock().unwrap().iter().map(|b| b[0]).collect();
        assert_eq!(codes, vec![0x03, 0x02, 0x51, 0x04]);
        assert_eq!(*f.resets.lock().unwrap(), 3);
        assert_eq!(
            receipt_rx.try_recv().unwrap(),
            vec![Outcome::Resolved, Outcome::Resolved, Outcome::Resolved]
        );
    }

    #[test]
    fn missing_event_loop_is_an_error() {
        let (commands_tx, commands_rx) = mpsc::channel::<Outbound>();
        let (events_tx, events_rx) = mpsc::channel::<Bytes>();
        drop(events_tx);
        let mut command_loop = CommandLoop::new(
            FrameWriter::new(std::io::sink()),
            commands_rx,
            events_rx,
            ActivityLog::new(4),
            HubConfig::default(),
        );
        let err = command_loop
            .dispatch(&Command::net_id_get().to_packet())
            .unwrap_err();
        assert!(matches!(err, HubError::EventLoopStopped));
        drop(commands_tx);
    }
}
