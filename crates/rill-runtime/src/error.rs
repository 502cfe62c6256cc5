use rill_protocol::CodecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("No subscribers available for topic: {topic}")]
    NoSubscribers { topic: String },

    #[error("Channel is closed (receiver dropped): {topic}")]
    ChannelClosed { topic: String },

    #[error("Channel is full (backpressure applied): {topic}")]
    ChannelFull { topic: String },

    #[error("Request carries no reply destination")]
    NoReplyDestination,

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Handler failed: {0}")]
    Handler(#[source] anyhow::Error),

    #[error("Sink failed: {0}")]
    Sink(#[source] anyhow::Error),
}

impl RuntimeError {
    /// Wrap an arbitrary error raised by a user-supplied handler
    pub fn handler(err: impl Into<anyhow::Error>) -> Self {
        Self::Handler(err.into())
    }

    /// Wrap an arbitrary error raised by a sink
    pub fn sink(err: impl Into<anyhow::Error>) -> Self {
        Self::Sink(err.into())
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
