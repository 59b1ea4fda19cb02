use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::RpcError;

/// One outbound RPC call. Identity is `request_id`; ids are allocated
/// by `Connection::request` and are monotonic for the process lifetime.
/// An empty `object_id` addresses the root dataset object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    pub request_id: u64,
    pub object_id: String,
    pub method: String,
    pub arguments: Value,
}

/// Reply stream tags. Zero or more `Progress`/`Data` envelopes, then
/// exactly one `Completion` or `Error`, never anything after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    Progress,
    Data,
    Completion,
    Error,
}

/// One message unit of the streaming reply protocol.
///
/// Optional fields that are absent decode to `None`; unknown extra
/// fields are ignored. A `Data` envelope with a null payload is a
/// progress-only heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyEnvelope {
    pub request_id: u64,
    pub kind: ReplyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ReplyEnvelope {
    /// Decode the opaque payload into the reply type of the method that
    /// produced it. `None` for absent or null payloads (heartbeats).
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<Option<T>, RpcError> {
        match &self.payload {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| RpcError::Protocol(format!("undecodable payload: {}", e))),
        }
    }
}

/// Opaque reference to a server-side object created as a side effect of
/// an operation (e.g. a filtered table). Never mutated, only passed
/// forward to the stage that addresses further requests at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObjectHandle {
    pub remote_object_id: String,
}

pub fn encode_request(request: &RpcRequest) -> Result<String, RpcError> {
    serde_json::to_string(request)
        .map_err(|e| RpcError::Protocol(format!("unencodable request: {}", e)))
}

pub fn decode_reply(text: &str) -> Result<ReplyEnvelope, RpcError> {
    serde_json::from_str(text)
        .map_err(|e| RpcError::Protocol(format!("malformed reply envelope: {}", e)))
}
