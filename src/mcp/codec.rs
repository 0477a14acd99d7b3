//! Envelope encoding and strict decoding for `tools/list` and `tools/call`

use crate::mcp::protocol::*;
use crate::types::{Result, SearchError};
use serde_json::{json, Map, Value};

pub fn encode_list_request(id: RequestId) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id: Some(id),
        method: METHOD_TOOLS_LIST.to_string(),
        params: Some(json!({})),
    }
}

pub fn encode_call_request(id: RequestId, tool_name: &str, arguments: Value) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id: Some(id),
        method: METHOD_TOOLS_CALL.to_string(),
        params: Some(json!({
            "name": tool_name,
            "arguments": arguments,
        })),
    }
}

pub fn to_bytes<T: serde::Serialize>(message: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

/// Decode a single JSON-RPC message.
///
/// Requests are recognized by a `method` member. Responses must carry
/// exactly one of `result` / `error`.
pub fn decode(raw: &[u8]) -> Result<RpcEnvelope> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| SearchError::MalformedEnvelope(format!("invalid JSON: {}", e)))?;

    let object = match value {
        Value::Object(object) => object,
        Value::Array(_) => {
            return Err(SearchError::MalformedEnvelope(
                "batch messages are not supported".to_string(),
            ))
        }
        other => {
            return Err(SearchError::MalformedEnvelope(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            )))
        }
    };

    match object.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        Some(other) => {
            return Err(SearchError::MalformedEnvelope(format!(
                "unsupported jsonrpc version {}",
                other
            )))
        }
        None => {
            return Err(SearchError::MalformedEnvelope(
                "missing jsonrpc version".to_string(),
            ))
        }
    }

    if object.contains_key("method") {
        let request: JsonRpcRequest = serde_json::from_value(Value::Object(object))
            .map_err(|e| SearchError::MalformedEnvelope(format!("invalid request: {}", e)))?;
        return Ok(RpcEnvelope::Request(request));
    }

    decode_response_object(object).map(RpcEnvelope::Response)
}

fn decode_response_object(object: Map<String, Value>) -> Result<JsonRpcResponse> {
    let has_result = object.contains_key("result");
    let has_error = object.contains_key("error");

    if has_result == has_error {
        return Err(SearchError::MalformedEnvelope(
            "response must contain exactly one of result or error".to_string(),
        ));
    }
    if !object.contains_key("id") {
        return Err(SearchError::MalformedEnvelope(
            "response is missing id".to_string(),
        ));
    }

    let mut response: JsonRpcResponse = serde_json::from_value(Value::Object(object))
        .map_err(|e| SearchError::MalformedEnvelope(format!("invalid response: {}", e)))?;

    // `"result": null` is a legal success payload
    if has_result && response.result.is_none() {
        response.result = Some(Value::Null);
    }

    Ok(response)
}

/// Decode the response to an outstanding request, rejecting any other id.
///
/// An error response with a null id is accepted: the peer could not read
/// the request id at all.
pub fn decode_response(raw: &[u8], expected: &RequestId) -> Result<JsonRpcResponse> {
    let response = match decode(raw)? {
        RpcEnvelope::Response(response) => response,
        RpcEnvelope::Request(request) => {
            return Err(SearchError::MalformedEnvelope(format!(
                "expected a response, got request '{}'",
                request.method
            )))
        }
    };

    match &response.id {
        Some(id) if id == expected => Ok(response),
        None if response.error.is_some() => Ok(response),
        Some(id) => Err(SearchError::MalformedEnvelope(format!(
            "response id {} does not match outstanding request {}",
            id, expected
        ))),
        None => Err(SearchError::MalformedEnvelope(format!(
            "response id null does not match outstanding request {}",
            expected
        ))),
    }
}

pub fn extract_result(response: JsonRpcResponse) -> Result<Value> {
    if let Some(error) = response.error {
        return Err(SearchError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    response
        .result
        .ok_or_else(|| SearchError::MalformedEnvelope("response has no result".to_string()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
