//! Tool registry: names, schemas and handlers for one service.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use rmcp::model::{CallToolResult, Content, Tool};
use serde_json::{json, Map, Value};

use crate::error::IntegrationResult;
use crate::governor::{govern, govern_text};
use crate::services::ServiceClient;
use crate::tools::args::Args;

/// Handler for one tool. Validates `Args` before any network call.
pub type ToolHandler = fn(Arc<ServiceClient>, Args) -> BoxFuture<'static, IntegrationResult<Value>>;

/// Advertised shape of a tool.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

impl ToolSpec {
    pub fn to_tool(&self) -> Tool {
        let schema = match &self.input_schema {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        Tool::new(self.name, self.description, Arc::new(schema))
    }
}

struct RegisteredTool {
    spec: ToolSpec,
    handler: ToolHandler,
}

pub struct ToolRegistry {
    client: Arc<ServiceClient>,
    max_chars: usize,
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new(client: Arc<ServiceClient>, max_chars: usize) -> Self {
        Self {
            client,
            max_chars,
            tools: Vec::new(),
        }
    }

    pub fn register(&mut self, spec: ToolSpec, handler: ToolHandler) {
        self.tools.push(RegisteredTool { spec, handler });
    }

    pub fn specs(&self) -> Vec<&ToolSpec> {
        self.tools.iter().map(|t| &t.spec).collect()
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.spec.to_tool()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.spec.name == name)
    }

    /// Run tool `name`. `None` if no such tool is registered.
    ///
    /// Upstream and validation failures are reported inside the result with
    /// `is_error` set; the payload is always governed.
    pub async fn call(&self, name: &str, arguments: Value) -> Option<CallToolResult> {
        let tool = self.tools.iter().find(|t| t.spec.name == name)?;

        let outcome = match Args::from_value(arguments) {
            Ok(args) => (tool.handler)(self.client.clone(), args).await,
            Err(e) => Err(e),
        };

        Some(match outcome {
            Ok(value) => CallToolResult::success(vec![Content::text(govern(&value, self.max_chars).text)]),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool call failed");
                let text = govern_text(format!("Error: {e}"), self.max_chars).text;
                CallToolResult::error(vec![Content::text(text)])
            }
        })
    }
}

/// JSON schema for an object with the given properties.
pub fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

pub fn limit_schema(default: i64) -> Value {
    json!({ "type": "integer", "minimum": 1, "maximum": 100, "default": default })
}

pub fn id_schema(description: &str) -> Value {
    json!({ "type": "string", "pattern": "^[A-Za-z0-9_.~-]+$", "description": description })
}

pub fn text_schema(description: &str) -> Value {
    json!({ "type": "string", "maxLength": crate::tools::args::MAX_TEXT_LEN, "description": description })
}
