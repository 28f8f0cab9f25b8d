//! Error types for ND2 SDK operations.

use crate::records::LimResult;
use lib_frames::FramesError;
use std::fmt;
use thiserror::Error;

/// Status codes returned by the SDK's `LIMRESULT` entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimStatus {
    Ok,
    Unexpected,
    NotImplemented,
    OutOfMemory,
    InvalidArg,
    NoInterface,
    Pointer,
    Handle,
    Abort,
    Fail,
    AccessDenied,
    OsFail,
    NotInitialized,
    NotFound,
    ImplFailed,
    DialogCanceled,
    DbProcFailed,
    OutOfRange,
    Privileges,
    Version,
    Unknown(i32),
}

impl LimStatus {
    pub fn from_code(code: LimResult) -> Self {
        match code {
            0 => Self::Ok,
            -1 => Self::Unexpected,
            -2 => Self::NotImplemented,
            -3 => Self::OutOfMemory,
            -4 => Self::InvalidArg,
            -5 => Self::NoInterface,
            -6 => Self::Pointer,
            -7 => Self::Handle,
            -8 => Self::Abort,
            -9 => Self::Fail,
            -10 => Self::AccessDenied,
            -11 => Self::OsFail,
            -12 => Self::NotInitialized,
            -13 => Self::NotFound,
            -14 => Self::ImplFailed,
            -15 => Self::DialogCanceled,
            -16 => Self::DbProcFailed,
            -17 => Self::OutOfRange,
            -18 => Self::Privileges,
            -19 => Self::Version,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> LimResult {
        match self {
            Self::Ok => 0,
            Self::Unexpected => -1,
            Self::NotImplemented => -2,
            Self::OutOfMemory => -3,
            Self::InvalidArg => -4,
            Self::NoInterface => -5,
            Self::Pointer => -6,
            Self::Handle => -7,
            Self::Abort => -8,
            Self::Fail => -9,
            Self::AccessDenied => -10,
            Self::OsFail => -11,
            Self::NotInitialized => -12,
            Self::NotFound => -13,
            Self::ImplFailed => -14,
            Self::DialogCanceled => -15,
            Self::DbProcFailed => -16,
            Self::OutOfRange => -17,
            Self::Privileges => -18,
            Self::Version => -19,
            Self::Unknown(code) => code,
        }
    }

    /// Name of the matching `LIM_*` constant.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ok => "LIM_OK",
            Self::Unexpected => "LIM_ERR_UNEXPECTED",
            Self::NotImplemented => "LIM_ERR_NOTIMPL",
            Self::OutOfMemory => "LIM_ERR_OUTOFMEMORY",
            Self::InvalidArg => "LIM_ERR_INVALIDARG",
            Self::NoInterface => "LIM_ERR_NOINTERFACE",
            Self::Pointer => "LIM_ERR_POINTER",
            Self::Handle => "LIM_ERR_HANDLE",
            Self::Abort => "LIM_ERR_ABORT",
            Self::Fail => "LIM_ERR_FAIL",
            Self::AccessDenied => "LIM_ERR_ACCESSDENIED",
            Self::OsFail => "LIM_ERR_OS_FAIL",
            Self::NotInitialized => "LIM_ERR_NOTINITIALIZED",
            Self::NotFound => "LIM_ERR_NOTFOUND",
            Self::ImplFailed => "LIM_ERR_IMPL_FAILED",
            Self::DialogCanceled => "LIM_ERR_DLG_CANCELED",
            Self::DbProcFailed => "LIM_ERR_DB_PROC_FAILED",
            Self::OutOfRange => "LIM_ERR_OUTOFRANGE",
            Self::Privileges => "LIM_ERR_PRIVILEGES",
            Self::Version => "LIM_ERR_VERSION",
            Self::Unknown(_) => "LIM_ERR_UNKNOWN",
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for LimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Errors that can occur while loading the SDK or reading a file.
#[derive(Debug, Error)]
pub enum Nd2Error {
    /// Failed to load the SDK shared library.
    #[error("Failed to load library '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: libloading::Error,
    },

    /// Required symbol not found in the SDK.
    #[error("Symbol '{symbol}' not found in library")]
    SymbolNotFound { symbol: String },

    /// The loaded SDK lacks an optional entry point.
    #[error("Operation '{operation}' not supported by the loaded SDK")]
    NotSupported { operation: String },

    /// The file does not exist or is not an ND2 file.
    #[error("File not found or not an ND2 file: {0}")]
    FileNotFound(String),

    /// An SDK entry point returned a failure status.
    #[error("{function} failed: {status}")]
    ForeignCall {
        function: &'static str,
        status: LimStatus,
    },

    /// Pixels are not square.
    #[error("Unsupported geometry: pixel aspect ratio {aspect} (only 1.0 is supported)")]
    UnsupportedGeometry { aspect: f64 },

    /// Bits per component other than 8, 16 or 32.
    #[error("Unsupported pixel depth: {0} bits per component")]
    UnsupportedPixelDepth(u32),

    /// The SDK returned a record that cannot be interpreted.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Coordinate outside the size of its axis.
    #[error("Coordinate {index} out of range for axis '{axis}' of size {size}")]
    InvalidCoordinate {
        axis: char,
        index: usize,
        size: usize,
    },

    /// Invalid parameter.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The reader has been closed.
    #[error("Reader is closed")]
    Closed,

    /// Frame sequence error.
    #[error(transparent)]
    Frames(#[from] FramesError),
}

impl Nd2Error {
    /// Create a load error.
    pub fn load_error(path: impl Into<String>, source: libloading::Error) -> Self {
        Self::LoadError {
            path: path.into(),
            source,
        }
    }

    /// Create a symbol not found error.
    pub fn symbol_not_found(symbol: impl Into<String>) -> Self {
        Self::SymbolNotFound {
            symbol: symbol.into(),
        }
    }

    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// SDK status carried by this error, if any.
    pub fn status(&self) -> Option<LimStatus> {
        match self {
            Self::ForeignCall { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for errors that leave the reader usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidCoordinate { .. }
                | Self::InvalidParameter { .. }
                | Self::NotSupported { .. }
                | Self::Frames(_)
                | Self::ForeignCall {
                    status: LimStatus::NotFound | LimStatus::OutOfRange,
                    ..
                }
        )
    }
}

/// Map an SDK status code to a result.
pub fn check(function: &'static str, code: LimResult) -> Nd2Result<()> {
    match LimStatus::from_code(code) {
        LimStatus::Ok => Ok(()),
        status => Err(Nd2Error::ForeignCall { function, status }),
    }
}

/// Result type for ND2 operations.
pub type Nd2Result<T> = Result<T, Nd2Error>;
