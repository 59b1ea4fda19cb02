//! Client core for a streaming data-visualization tool.
//!
//! A browser-style front end issues long-running, cancellable RPC calls
//! over persistent WebSocket channels and chains them into pipelines
//! (filter -> range -> histogram -> render). This crate holds the wire
//! protocol, the per-request dispatch machinery, the receiver-chaining
//! stages, and the histogram coarsening / Trellis layout math those
//! stages feed into. Everything visual stays behind the `Page` trait.

pub mod config;
pub mod histogram;
pub mod logging;
pub mod pipeline;
pub mod rpc;
pub mod trellis;
