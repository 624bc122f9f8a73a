/// Errors that can occur while running a hub.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] hubwire_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] hubwire_frame::FrameError),

    /// A command could not be built.
    #[error("protocol error: {0}")]
    Proto(#[from] hubwire_proto::ProtoError),

    /// A worker thread could not be started.
    #[error("failed to spawn {name} worker: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked.
    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),

    /// The event loop stopped while a command was waiting on it.
    #[error("event loop stopped")]
    EventLoopStopped,

    /// The hub has shut down and no longer accepts commands.
    #[error("hub is shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, HubError>;
