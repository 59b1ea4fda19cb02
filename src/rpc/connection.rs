use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Notify;

use crate::logging::{json_log, obj, v_num, v_str};

use super::error::RpcError;
use super::receiver::Receiver;
use super::transport::Dialer;
use super::wire::{self, ReplyKind, RpcRequest};

/// Issues streaming RPC requests. Owns the dialer and the monotonic
/// request-id counter; the counter is the only shared mutable state in
/// this core and is never reset during the connection's lifetime.
///
/// Any number of requests may be in flight at once, each on its own
/// channel with its own receiver. Envelope order is guaranteed only
/// within one request's stream.
pub struct Connection {
    dialer: Arc<dyn Dialer>,
    next_request_id: AtomicU64,
}

/// Cancellation handle for one in-flight request.
#[derive(Clone)]
pub struct RequestHandle {
    request_id: u64,
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl RequestHandle {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Closes the channel without a terminal callback. Values already
    /// delivered stand; envelopes still in flight (including a late
    /// completion) are discarded. A cancelled request never retries.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Connection {
    pub fn new(dialer: Box<dyn Dialer>) -> Arc<Self> {
        Arc::new(Self {
            dialer: Arc::from(dialer),
            next_request_id: AtomicU64::new(0),
        })
    }

    /// Builds a request addressed at `object_id` (empty string for the
    /// root dataset object), allocating the next request id.
    pub fn request<A: Serialize>(&self, object_id: &str, method: &str, arguments: &A) -> RpcRequest {
        RpcRequest {
            request_id: self.next_request_id.fetch_add(1, Ordering::SeqCst),
            object_id: object_id.to_string(),
            method: method.to_string(),
            arguments: serde_json::to_value(arguments).unwrap_or(Value::Null),
        }
    }

    /// Executes the RPC: opens a channel, sends the encoded request
    /// exactly once, and feeds the reply stream to `receiver` until the
    /// terminal envelope, a failure, or cancellation. Returns
    /// immediately; dispatch runs on its own task.
    pub fn invoke<R>(&self, request: RpcRequest, receiver: R) -> RequestHandle
    where
        R: Receiver,
        R::Item: DeserializeOwned + Send,
    {
        let handle = RequestHandle {
            request_id: request.request_id,
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        };
        let dialer = Arc::clone(&self.dialer);
        let cancelled = Arc::clone(&handle.cancelled);
        let notify = Arc::clone(&handle.notify);
        tokio::spawn(async move {
            drive(dialer, request, receiver, cancelled, notify).await;
        });
        handle
    }
}

/// Per-request dispatch loop. Runs until the terminal envelope, a
/// failure, or cancellation; calls at most one terminal callback.
async fn drive<R>(
    dialer: Arc<dyn Dialer>,
    request: RpcRequest,
    mut receiver: R,
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
) where
    R: Receiver,
    R::Item: DeserializeOwned + Send,
{
    let request_id = request.request_id;
    let frame = match wire::encode_request(&request) {
        Ok(frame) => frame,
        Err(e) => {
            receiver.on_error(e.to_string());
            return;
        }
    };

    let mut transport = match dialer.dial().await {
        Ok(t) => t,
        Err(e) => {
            // Failure to open the channel becomes one synthetic error
            // envelope; no retry.
            if !cancelled.load(Ordering::SeqCst) {
                receiver.on_error(RpcError::Transport(e.to_string()).to_string());
            }
            return;
        }
    };

    if let Err(e) = transport.send(frame).await {
        transport.close().await;
        receiver.on_error(RpcError::Transport(e.to_string()).to_string());
        return;
    }
    json_log(
        "rpc",
        obj(&[
            ("event", v_str("request_sent")),
            ("request_id", v_num(request_id as f64)),
            ("method", v_str(&request.method)),
            ("object_id", v_str(&request.object_id)),
        ]),
    );

    loop {
        if cancelled.load(Ordering::SeqCst) {
            json_log(
                "rpc",
                obj(&[
                    ("event", v_str("cancelled")),
                    ("request_id", v_num(request_id as f64)),
                ]),
            );
            break;
        }
        let inbound = tokio::select! {
            biased;
            _ = notify.notified() => None,
            frame = transport.recv() => Some(frame),
        };
        // Cancellation wins over anything already queued.
        if cancelled.load(Ordering::SeqCst) {
            json_log(
                "rpc",
                obj(&[
                    ("event", v_str("cancelled")),
                    ("request_id", v_num(request_id as f64)),
                ]),
            );
            break;
        }
        let text = match inbound {
            None => continue, // spurious wakeup
            Some(None) => {
                receiver.on_error(
                    RpcError::Transport("connection closed before completion".to_string())
                        .to_string(),
                );
                break;
            }
            Some(Some(Err(e))) => {
                receiver.on_error(RpcError::Transport(e.to_string()).to_string());
                break;
            }
            Some(Some(Ok(text))) => text,
        };
        let envelope = match wire::decode_reply(&text) {
            Ok(env) => env,
            Err(e) => {
                receiver.on_error(e.to_string());
                break;
            }
        };
        if envelope.request_id != request_id {
            // Multiplexed channels key envelopes by id; anything else
            // on this channel is not ours.
            continue;
        }
        match envelope.kind {
            ReplyKind::Progress => {
                receiver.on_progress(envelope.progress.unwrap_or(0.0).clamp(0.0, 1.0));
            }
            ReplyKind::Data => {
                if let Some(fraction) = envelope.progress {
                    receiver.on_progress(fraction.clamp(0.0, 1.0));
                }
                match envelope.payload_as::<R::Item>() {
                    Ok(Some(value)) => receiver.on_next(value),
                    Ok(None) => {} // heartbeat
                    Err(e) => {
                        receiver.on_error(e.to_string());
                        break;
                    }
                }
            }
            ReplyKind::Completion => {
                json_log(
                    "rpc",
                    obj(&[
                        ("event", v_str("completed")),
                        ("request_id", v_num(request_id as f64)),
                    ]),
                );
                transport.close().await;
                receiver.on_completed();
                return;
            }
            ReplyKind::Error => {
                let message = envelope
                    .error_message
                    .unwrap_or_else(|| "remote error".to_string());
                transport.close().await;
                receiver.on_error(message);
                return;
            }
        }
    }
    transport.close().await;
}
