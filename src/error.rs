use std::result;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Bad Qop option: {0}")]
    BadQop(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = result::Result<T, Error>;
