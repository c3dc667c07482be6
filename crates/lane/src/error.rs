//! Error taxonomy shared by the resolver, the observed facades and the event client.

use thiserror::Error;

/// Errors surfaced by every public operation of this crate.
#[derive(Debug, Error)]
pub enum LaneError {
    /// The remote type-and-version string is not `"<Name> X.Y.Z"`.
    #[error("invalid type and version {raw:?}: {reason}")]
    VersionParse { raw: String, reason: &'static str },
    /// Well-formed version with no entry in the dispatch table.
    #[error("unsupported contract version: {0}")]
    UnsupportedVersion(String),
    /// Transport, node or ABI failure; the original cause is kept as `source`.
    #[error("{context}: {source}")]
    RemoteCall {
        context: String,
        #[source]
        source: RpcError,
    },
    #[error("operation cancelled")]
    Cancelled,
}

impl LaneError {
    pub fn remote(context: impl Into<String>, source: impl Into<RpcError>) -> Self {
        Self::RemoteCall {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Prefix the context of a [LaneError::RemoteCall]; other variants pass through untouched.
    pub fn with_context(self, outer: impl AsRef<str>) -> Self {
        match self {
            Self::RemoteCall { context, source } => Self::RemoteCall {
                context: format!("{}: {}", outer.as_ref(), context),
                source,
            },
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Underlying chain-client failure.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("ABI decode error: {0}")]
    Abi(#[from] alloy::sol_types::Error),
}

pub type Result<T, E = LaneError> = std::result::Result<T, E>;
