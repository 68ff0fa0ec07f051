use std::path::PathBuf;
use thiserror::Error;

use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Payload of {given} bytes is too short for a {kind}; expected at least {expected}")]
    Truncated {
        kind: &'static str,
        given: usize,
        expected: usize,
    },
    #[error("Payload of {given} bytes does not match the size declared by its {kind} header ({expected})")]
    SizeMismatch {
        kind: &'static str,
        given: usize,
        expected: usize,
    },
    #[error("Negative element count {0} found in discrete record")]
    BadElementCount(i16),
    #[error("Discrete record name is not valid UTF-8")]
    BadName,
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Could not open stream because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Stream failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Stream ended inside a {0} header")]
    TruncatedHeader(&'static str),
    #[error("Stream fragment declares {0} payload bytes but only {1} remain")]
    TruncatedPayload(usize, usize),
    #[error("Unknown transition kind {0} found in stream")]
    BadTransition(u32),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config has invalid fit settings: {0}")]
    InvalidSettings(String),
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Summary failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Summary failed to convert to yaml: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Stream error: {0}")]
    StreamError(#[from] StreamError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Summary error: {0}")]
    SummaryError(#[from] SummaryError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
}
