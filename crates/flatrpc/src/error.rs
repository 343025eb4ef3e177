use thiserror::Error;

/// A failure to tokenize a request.
///
/// Tokens produced before the failure stay valid; `tokens` says how many
/// there are.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{kind} at byte {position} ({tokens} tokens produced)")]
pub struct TokenizeError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Byte offset of the offending input.
    pub position: usize,
    /// Number of tokens successfully produced before the failure.
    pub tokens: usize,
}

/// The three ways tokenizing can fail.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// The token slice is too small; retry with a larger one.
    #[error("token capacity exceeded")]
    CapacityExceeded,
    /// A byte that is not valid at this point of the document.
    #[error("invalid character {:?}", as_char(.0))]
    InvalidCharacter(u8),
    /// The input ended in the middle of a value.
    #[error("incomplete input")]
    Incomplete,
}

fn as_char(byte: &u8) -> char {
    char::from(*byte)
}

/// The predefined JSON-RPC error conditions.
///
/// Handlers may also report any other code through
/// [`Request::error_with`](crate::Request::error_with).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    /// Invalid JSON was received.
    #[error("Parse error")]
    ParseError,
    /// The JSON sent is not a valid request object.
    #[error("Invalid Request")]
    InvalidRequest,
    /// The method does not exist or is not available.
    #[error("Method not found")]
    MethodNotFound,
    /// Invalid method parameters.
    #[error("Invalid params")]
    InvalidParams,
    /// Internal JSON-RPC error.
    #[error("Internal error")]
    InternalError,
}

impl ErrorCode {
    /// The numeric code sent on the wire.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    /// The message sent alongside [`code`](Self::code).
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, i32> {
        match code {
            -32700 => Ok(Self::ParseError),
            -32600 => Ok(Self::InvalidRequest),
            -32601 => Ok(Self::MethodNotFound),
            -32602 => Ok(Self::InvalidParams),
            -32603 => Ok(Self::InternalError),
            other => Err(other),
        }
    }
}
