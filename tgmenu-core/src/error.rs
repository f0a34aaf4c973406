use thiserror::Error;

#[derive(Error, Debug)]
pub enum MenuError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid callback data: {0}")]
    InvalidCallbackData(String),

    #[error("Menu stack is empty")]
    EmptyMenuStack,

    #[error("Message '{0}' has not been sent")]
    NotSent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MenuError>;
