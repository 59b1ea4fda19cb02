//! Streaming RPC: one request, one channel, a stream of reply envelopes.

mod connection;
mod error;
mod receiver;
mod transport;
mod wire;

pub use connection::{Connection, RequestHandle};
pub use error::RpcError;
pub use receiver::Receiver;
pub use transport::{Dialer, Transport, WsDialer};
pub use wire::{
    decode_reply, encode_request, RemoteObjectHandle, ReplyEnvelope, ReplyKind, RpcRequest,
};
