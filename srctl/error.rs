use serde_json::Error as JsonError;
use std::io::Error as IoError;
use thiserror::Error;
use zbus::Error as ZbusError;

#[derive(Error, Debug)]
pub enum App {
    #[error("I/O operation failed")]
    Io(#[from] IoError),
    #[error("Data parsing error: {0}")]
    DataParsing(#[from] JsonError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Zbus error")]
    Zbus(#[from] ZbusError),
}
