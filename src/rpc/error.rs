use std::fmt;

/// Failures of the RPC machinery itself. Server-reported errors and
/// empty-result conditions are not represented here; they reach the
/// user through the page collaborator instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// Malformed envelope or undecodable payload. Fatal for the one
    /// request that produced it; never retried.
    Protocol(String),
    /// Channel failed to open or died mid-stream. Reported to the
    /// receiver as a single synthetic error; never retried.
    Transport(String),
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::Protocol(msg) => write!(f, "protocol error: {}", msg),
            RpcError::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl std::error::Error for RpcError {}
