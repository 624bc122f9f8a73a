use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;

use hubwire_frame::{append_checksum, FrameReader, FrameWriter};
use hubwire_proto::{bootstrap_sequence, valve_transaction, Command, DeviceId, ValveBitmask};
use hubwire_transport::{HubStream, SerialConfig};
use tracing::{debug, info, warn};

use crate::activity::ActivityLog;
use crate::command_loop::{CommandLoop, Outbound, Outcome};
use crate::config::HubConfig;
use crate::devices::ObservedDevices;
use crate::error::{HubError, Result};
use crate::event_loop::EventLoop;
use crate::status::{HubStatus, SharedStatus};

/// Outcomes of one submission, delivered when its last command settles.
///
/// Dropping a receipt does not cancel anything.
#[derive(Debug)]
pub struct Receipt {
    outcomes: Receiver<Vec<Outcome>>,
}

impl Receipt {
    /// Block until the submission settles. `None` if it did not settle
    /// within `timeout` or the command loop stopped first.
    pub fn wait(&self, timeout: Duration) -> Option<Vec<Outcome>> {
        self.outcomes.recv_timeout(timeout).ok()
    }

    /// Outcomes, if they are already in.
    pub fn try_outcomes(&self) -> Option<Vec<Outcome>> {
        self.outcomes.try_recv().ok()
    }
}

/// Cloneable handle for queueing commands from any thread.
#[derive(Debug, Clone)]
pub struct Commander {
    queue: Sender<Outbound>,
}

impl Commander {
    pub fn submit(&self, command: &Command) -> Result<Receipt> {
        debug!(%command, "queueing command");
        self.enqueue(vec![command.to_packet()])
    }

    /// Queue a raw command (code byte and body); the checksum is added here.
    pub fn submit_raw(&self, raw: &[u8]) -> Result<Receipt> {
        if raw.is_empty() {
            return Err(hubwire_proto::ProtoError::Empty.into());
        }
        self.enqueue(vec![append_checksum(raw)])
    }

    /// Queue begin, put and commit with nothing in between.
    pub fn actuate_valves(
        &self,
        device: impl Into<DeviceId>,
        mask: ValveBitmask,
    ) -> Result<Receipt> {
        let device = device.into();
        debug!(%device, %mask, "queueing valve transaction");
        let packets = valve_transaction(device, mask)
            .iter()
            .map(Command::to_packet)
            .collect();
        self.enqueue(packets)
    }

    fn enqueue(&self, packets: Vec<Bytes>) -> Result<Receipt> {
        let (tx, rx) = mpsc::channel();
        self.queue
            .send(Outbound::Commands {
                packets,
                receipt: Some(tx),
            })
            .map_err(|_| HubError::Closed)?;
        Ok(Receipt { outcomes: rx })
    }
}

/// A running hub: both loops started on one link.
pub struct Hub {
    commander: Commander,
    activity: ActivityLog,
    devices: ObservedDevices,
    status: SharedStatus,
    stop: Arc<AtomicBool>,
    command_worker: Option<JoinHandle<Result<()>>>,
    event_worker: Option<JoinHandle<Result<()>>>,
}

impl Hub {
    /// Open the serial port and start.
    pub fn open(serial: &SerialConfig, config: HubConfig) -> Result<Self> {
        let stream = hubwire_transport::open(serial)?;
        Self::start(stream, config)
    }

    /// Start both loops on an already-open link.
    ///
    /// With `config.bootstrap` set, the startup queries are queued before
    /// this returns, so they precede any caller command.
    pub fn start(stream: HubStream, config: HubConfig) -> Result<Self> {
        let transport = stream.transport_name();
        let read_half = stream.try_clone()?;
        let reader = FrameReader::with_config_hub(read_half, config.reader_frame_config())?;
        let writer = FrameWriter::with_config(stream, config.writer_frame_config());

        let (queue_tx, queue_rx) = mpsc::channel();
        let (solicited_tx, solicited_rx) = mpsc::channel();
        let activity = ActivityLog::new(config.activity_capacity);
        let devices = ObservedDevices::new();
        let status = SharedStatus::new();
        let stop = Arc::new(AtomicBool::new(false));

        let commander = Commander { queue: queue_tx };
        if config.bootstrap {
            // Receipts dropped: the loop records outcomes itself.
            for command in bootstrap_sequence() {
                commander.submit(&command)?;
            }
        }

        let event_loop = EventLoop::new(
            reader,
            solicited_tx,
            activity.clone(),
            devices.clone(),
            status.clone(),
            Arc::clone(&stop),
        );
        let event_worker = spawn("hubwire-events", move || event_loop.run())?;

        let command_loop = CommandLoop::new(writer, queue_rx, solicited_rx, activity.clone(), config);
        let command_worker = match spawn("hubwire-commands", move || command_loop.run()) {
            Ok(handle) => handle,
            Err(err) => {
                stop.store(true, Ordering::Release);
                let _ = event_worker.join();
                return Err(err);
            }
        };

        info!(transport, "hub started");
        Ok(Self {
            commander,
            activity,
            devices,
            status,
            stop,
            command_worker: Some(command_worker),
            event_worker: Some(event_worker),
        })
    }

    pub fn commander(&self) -> Commander {
        self.commander.clone()
    }

    pub fn submit(&self, command: &Command) -> Result<Receipt> {
        self.commander.submit(command)
    }

    pub fn submit_raw(&self, raw: &[u8]) -> Result<Receipt> {
        self.commander.submit_raw(raw)
    }

    pub fn actuate_valves(
        &self,
        device: impl Into<DeviceId>,
        mask: ValveBitmask,
    ) -> Result<Receipt> {
        self.commander.actuate_valves(device, mask)
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn observed_devices(&self) -> &ObservedDevices {
        &self.devices
    }

    pub fn status(&self) -> HubStatus {
        self.status.snapshot()
    }

    /// True once the hub reported a long-range network id.
    pub fn is_long_range(&self) -> bool {
        self.status.is_long_range()
    }

    /// Finish queued commands, stop the event loop and join both workers.
    ///
    /// The command loop's error, if any, takes precedence.
    pub fn shutdown(mut self) -> Result<()> {
        // Fails only if the command loop already exited.
        let _ = self.commander.queue.send(Outbound::Shutdown);
        let commands = join(self.command_worker.take(), "command");

        self.stop.store(true, Ordering::Release);
        let events = join(self.event_worker.take(), "event");

        info!("hub stopped");
        commands.and(events)
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        if self.command_worker.is_some() || self.event_worker.is_some() {
            warn!("hub dropped without shutdown; workers detached");
            let _ = self.commander.queue.send(Outbound::Shutdown);
            self.stop.store(true, Ordering::Release);
        }
    }
}

fn spawn<F>(name: &'static str, f: F) -> Result<JoinHandle<Result<()>>>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|source| HubError::Spawn { name, source })
}

fn join(handle: Option<JoinHandle<Result<()>>>, name: &'static str) -> Result<()> {
    match handle {
        Some(handle) => handle.join().map_err(|_| HubError::WorkerPanicked(name))?,
        None => Ok(()),
    }
}
