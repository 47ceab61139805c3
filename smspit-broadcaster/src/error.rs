use thiserror::Error;

#[derive(Error, Debug)]
pub enum BroadcasterError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Broadcaster shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, BroadcasterError>;
