use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Message id already stored: {0}")]
    DuplicateId(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
