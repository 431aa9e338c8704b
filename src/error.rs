use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chain operation an error or report refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Upload,
    Instantiate,
    Execute,
    Query,
    Balance,
    Send,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Upload => "upload",
            Operation::Instantiate => "instantiate",
            Operation::Execute => "execute",
            Operation::Query => "query",
            Operation::Balance => "balance",
            Operation::Send => "send",
        };
        f.write_str(name)
    }
}

/// Driver error type
#[derive(Error, Debug)]
pub enum Error {
    /// Mnemonic failed checksum or word-list validation
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Wallet key handling error
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Endpoint unreachable or misconfigured
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    /// Code upload rejected by the chain
    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    /// Contract init entry point returned an error
    #[error("Instantiate rejected: {0}")]
    InstantiateRejected(String),

    /// Execute rejected; carries the chain log unmodified
    #[error("Execute rejected: {0}")]
    ExecuteRejected(String),

    /// Malformed query or unknown contract/method
    #[error("Query rejected: {0}")]
    QueryRejected(String),

    /// Execute or query against a role no instantiate produced in this run
    #[error("Contract `{0}` has not been instantiated in this run")]
    NotInstantiated(String),

    /// Operation exceeded its local deadline
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout { operation: Operation, after: Duration },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Wasm artifact could not be read
    #[error("Failed to read artifact {}: {source}", .path.display())]
    Artifact {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Scenario query result did not match the expected value
    #[error("Expectation failed: {0}")]
    ExpectationFailed(String),

    /// A scenario run ended with failures; `kind` is the first one's
    #[error("{failed} of {total} scenarios did not succeed")]
    RunFailed {
        kind: ErrorKind,
        failed: usize,
        total: usize,
    },

    /// Error when interacting with CosmRS
    #[error("CosmRS error: {0}")]
    CosmRs(#[from] cosmrs::Error),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error taxonomy reported by the runner and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidMnemonic,
    ConnectionFailure,
    UploadRejected,
    InstantiateRejected,
    ExecuteRejected,
    QueryRejected,
    Timeout,
    ConfigError,
    ExpectationFailed,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidMnemonic => "INVALID_MNEMONIC",
            ErrorKind::ConnectionFailure => "CONNECTION_FAILURE",
            ErrorKind::UploadRejected => "UPLOAD_REJECTED",
            ErrorKind::InstantiateRejected => "INSTANTIATE_REJECTED",
            ErrorKind::ExecuteRejected => "EXECUTE_REJECTED",
            ErrorKind::QueryRejected => "QUERY_REJECTED",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::ConfigError => "CONFIG_ERROR",
            ErrorKind::ExpectationFailed => "EXPECTATION_FAILED",
        }
    }

    /// Process exit code for the CLI; 0 is reserved for success
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorKind::ConfigError => 2,
            ErrorKind::InvalidMnemonic => 3,
            ErrorKind::ConnectionFailure => 4,
            ErrorKind::Timeout => 5,
            ErrorKind::UploadRejected => 10,
            ErrorKind::InstantiateRejected => 11,
            ErrorKind::ExecuteRejected => 12,
            ErrorKind::QueryRejected => 13,
            ErrorKind::ExpectationFailed => 20,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Error {
    /// Rejection error for a transaction or query the chain refused
    pub fn rejected(operation: Operation, log: impl Into<String>) -> Self {
        let log = log.into();
        match operation {
            Operation::Upload => Error::UploadRejected(log),
            Operation::Instantiate => Error::InstantiateRejected(log),
            Operation::Execute | Operation::Send => Error::ExecuteRejected(log),
            Operation::Query | Operation::Balance => Error::QueryRejected(log),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidMnemonic(_) => ErrorKind::InvalidMnemonic,
            Error::ConnectionFailure(_) => ErrorKind::ConnectionFailure,
            Error::UploadRejected(_) => ErrorKind::UploadRejected,
            Error::InstantiateRejected(_) | Error::NotInstantiated(_) => {
                ErrorKind::InstantiateRejected
            }
            Error::ExecuteRejected(_) => ErrorKind::ExecuteRejected,
            Error::QueryRejected(_) => ErrorKind::QueryRejected,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::ExpectationFailed(_) => ErrorKind::ExpectationFailed,
            Error::RunFailed { kind, .. } => *kind,
            Error::Wallet(_)
            | Error::Config(_)
            | Error::Artifact { .. }
            | Error::CosmRs(_)
            | Error::Serialization(_)
            | Error::Io(_) => ErrorKind::ConfigError,
        }
    }

    /// Message without the kind prefix; chain logs come back verbatim
    pub fn detail(&self) -> String {
        match self {
            Error::InvalidMnemonic(message)
            | Error::Wallet(message)
            | Error::ConnectionFailure(message)
            | Error::UploadRejected(message)
            | Error::InstantiateRejected(message)
            | Error::ExecuteRejected(message)
            | Error::QueryRejected(message)
            | Error::Config(message)
            | Error::ExpectationFailed(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Only transient transport failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Timeout | ErrorKind::ConnectionFailure
        )
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
