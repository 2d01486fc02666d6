use thiserror::Error;

/// Errors aborting a whole extraction pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("document has no `data` object")]
    MissingData,
    #[error("unknown topology: `data` carries neither `parallel` nor `quota`")]
    UnknownTopology,
    #[error("unknown variant: {0}")]
    UnknownVariant(String),
    #[error("invalid variant schema {0}: {1}")]
    InvalidSchema(String, String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error("I/O error: {0}")]
    Io(String),
}

/// Problems recovered locally during extraction. The offending report, sensor or
/// sub-device is skipped and the pass continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error("{serial}: report {report} not found")]
    ReportMissing { serial: String, report: String },
    #[error("{serial}: report {report} is empty")]
    ReportEmpty { serial: String, report: String },
    #[error("{report}: payload under `{key}` is not embedded JSON")]
    UndecodablePayload { report: String, key: String },
    #[error("{report}: payload under `{key}` matches no known sub-device")]
    UnknownBox { report: String, key: String },
    #[error("{report}: {model} under `{key}` has no usable serial number")]
    BoxWithoutSerial {
        report: String,
        key: String,
        model: String,
    },
    #[error("{report}: field path `{field}` matched nothing")]
    NoMatches { report: String, field: String },
    #[error("parallel entry `{serial}` is not an object")]
    InvalidTree { serial: String },
}
