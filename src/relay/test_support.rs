//! Scripted in-memory transport for relay tests

use crate::mcp::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::relay::transport::Transport;
use crate::types::{ContentKind, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = Box<dyn Fn(&JsonRpcRequest) -> Vec<u8> + Send + Sync>;

pub struct ScriptedTransport {
    handler: Handler,
    requests: Mutex<Vec<JsonRpcRequest>>,
    delay: Mutex<Option<Duration>>,
    slow_tool: Mutex<Option<(String, Duration)>>,
}

impl ScriptedTransport {
    /// Answer each request with a well-formed response carrying its id
    pub fn new(
        handler: impl Fn(&JsonRpcRequest) -> std::result::Result<Value, JsonRpcError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::raw(move |request| {
            let response = match handler(request) {
                Ok(result) => JsonRpcResponse::success(request.id.clone(), result),
                Err(error) => JsonRpcResponse::failure(request.id.clone(), error),
            };
            serde_json::to_vec(&response).unwrap()
        })
    }

    /// Answer each request with arbitrary bytes
    pub fn raw(handler: impl Fn(&JsonRpcRequest) -> Vec<u8> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
            slow_tool: Mutex::new(None),
        })
    }

    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn with_slow_tool(self: Arc<Self>, name: &str, delay: Duration) -> Arc<Self> {
        *self.slow_tool.lock().unwrap() = Some((name.to_string(), delay));
        self
    }

    pub fn requests(&self) -> Vec<JsonRpcRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests().iter().filter(|r| r.method == method).count()
    }

    /// `tools/call` requests addressed to `tool`
    pub fn calls_to(&self, tool: &str) -> Vec<JsonRpcRequest> {
        self.requests()
            .into_iter()
            .filter(|r| called_tool(r) == Some(tool))
            .collect()
    }
}

pub fn called_tool(request: &JsonRpcRequest) -> Option<&str> {
    request.params.as_ref()?.get("name")?.as_str()
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, payload: Vec<u8>) -> Result<Vec<u8>> {
        let request: JsonRpcRequest = serde_json::from_slice(&payload)?;
        self.requests.lock().unwrap().push(request.clone());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let slow = self.slow_tool.lock().unwrap().clone();
        if let Some((tool, delay)) = slow {
            if called_tool(&request) == Some(tool.as_str()) {
                tokio::time::sleep(delay).await;
            }
        }

        Ok((self.handler)(&request))
    }
}

/// `tools/list` entry with the standard search schema
pub fn tool(name: &str, maximum: u32) -> Value {
    json!({
        "name": name,
        "description": format!("{} tool", name),
        "inputSchema": {
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "max_results": {"type": "integer", "minimum": 1, "maximum": maximum, "default": 10}
            },
            "required": ["query"]
        }
    })
}

pub fn listing(names: &[&str]) -> Value {
    json!({ "tools": names.iter().map(|n| tool(n, 50)).collect::<Vec<_>>() })
}

/// `tools/call` result wrapping a JSON payload in a text block
pub fn text_result(payload: Value) -> Value {
    json!({ "content": [{ "type": "text", "text": payload.to_string() }] })
}

/// `n` raw hits in the tool server's per-kind shape
pub fn hits(kind: ContentKind, n: usize) -> Value {
    let hits: Vec<Value> = (0..n)
        .map(|i| match kind {
            ContentKind::Video => json!({
                "video_id": format!("v{}", i),
                "title": format!("Video {}", i),
                "channel": "Chan",
                "views": "10",
                "published": "2024-01-02T03:04:05Z",
                "thumbnail": "https://i.ytimg.com/v.jpg"
            }),
            ContentKind::Channel => json!({
                "channel_id": format!("c{}", i),
                "title": format!("Channel {}", i),
                "subscribers": "5",
                "created": "2019-06-01"
            }),
            ContentKind::Playlist => json!({
                "playlist_id": format!("p{}", i),
                "title": format!("Playlist {}", i),
                "video_count": 12
            }),
        })
        .collect();
    Value::Array(hits)
}

/// Kind served by one of the standard tool names
pub fn kind_of(tool: &str) -> Option<ContentKind> {
    ContentKind::from_tool_name(tool)
}

/// Tool server advertising `tools`, answering each call with `n` hits
pub fn search_server(tools: &'static [&'static str], n: usize) -> Arc<ScriptedTransport> {
    ScriptedTransport::new(move |request| match request.method.as_str() {
        "tools/list" => Ok(listing(tools)),
        "tools/call" => {
            let name = called_tool(request).unwrap_or_default();
            match kind_of(name) {
                Some(kind) if tools.contains(&name) => Ok(text_result(hits(kind, n))),
                _ => Err(JsonRpcError::new(-32601, format!("Tool not found: {}", name))),
            }
        }
        other => Err(JsonRpcError::new(-32601, format!("Method not found: {}", other))),
    })
}
