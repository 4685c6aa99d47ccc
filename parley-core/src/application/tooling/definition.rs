use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::command::CommandTemplate;
use super::error::ToolFailure;
use crate::model::ToolSchema;

/// Result returned by a tool implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub content: String,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
        }
    }

    pub fn failed(content: impl Into<String>) -> Self {
        Self {
            success: false,
            content: content.into(),
        }
    }
}

/// Validates structured tool output.
///
/// Receives the tool content parsed as JSON and returns a message describing
/// the first mismatch.
pub trait OutputValidator: Send + Sync {
    fn validate(&self, value: &Value) -> Result<(), String>;
}

impl<F> OutputValidator for F
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Result<(), String> {
        self(value)
    }
}

/// Requires a JSON object carrying every listed, non-null field.
#[derive(Debug, Clone)]
pub struct RequiredFields {
    fields: Vec<String>,
}

impl RequiredFields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl OutputValidator for RequiredFields {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let Some(object) = value.as_object() else {
            return Err(format!("expected a JSON object, got {}", json_kind(value)));
        };
        for field in &self.fields {
            match object.get(field) {
                None | Some(Value::Null) => {
                    return Err(format!("missing required field '{field}'"));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    /// Extra attempts after the first raised or invalid result.
    pub max_retries: Option<u32>,
    pub output_schema: Option<Arc<dyn OutputValidator>>,
    /// Tool hands work to another agent.
    pub delegates: bool,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({ "type": "object", "properties": {} }),
            max_retries: None,
            output_schema: None,
            delegates: false,
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn with_output_schema(mut self, validator: impl OutputValidator + 'static) -> Self {
        self.output_schema = Some(Arc::new(validator));
        self
    }

    pub fn delegating(mut self) -> Self {
        self.delegates = true;
        self
    }

    pub fn retry_budget(&self) -> u32 {
        self.max_retries.unwrap_or(0)
    }

    pub fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("max_retries", &self.max_retries)
            .field("output_schema", &self.output_schema.is_some())
            .field("delegates", &self.delegates)
            .finish()
    }
}

/// In-process tool implementation.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> Result<ToolOutput, ToolFailure>;
}

/// How a tool is run, fixed at registration time.
#[derive(Clone)]
pub enum ToolKind {
    Handler(Arc<dyn ToolHandler>),
    Command(CommandTemplate),
}

impl fmt::Debug for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolKind::Handler(_) => f.write_str("Handler"),
            ToolKind::Command(template) => f.debug_tuple("Command").field(template).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tool {
    pub definition: ToolDefinition,
    pub kind: ToolKind,
}

impl Tool {
    pub fn handler(definition: ToolDefinition, handler: impl ToolHandler + 'static) -> Self {
        Self {
            definition,
            kind: ToolKind::Handler(Arc::new(handler)),
        }
    }

    pub fn command(definition: ToolDefinition, template: CommandTemplate) -> Self {
        Self {
            definition,
            kind: ToolKind::Command(template),
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub(crate) async fn invoke(&self, arguments: Value) -> Result<ToolOutput, ToolFailure> {
        match &self.kind {
            ToolKind::Handler(handler) => handler.call(arguments).await,
            ToolKind::Command(template) => template.run(&arguments).await,
        }
    }
}
