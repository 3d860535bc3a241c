//! Tools a conversation may invoke.
//!
//! A tool runs on behalf of whoever the conversation is for: it receives the
//! conversation's context alongside the model's arguments and answers with
//! text that is handed back to the model.

use crate::context::ConversationContext;
use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// What the model is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: JsonValue,
}

impl ToolDefinition {
    /// Creates a definition for a tool that takes no arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Declares a string argument.
    #[must_use]
    pub fn with_string_argument(mut self, name: &str, description: &str, required: bool) -> Self {
        if let Some(properties) = self
            .parameters
            .get_mut("properties")
            .and_then(JsonValue::as_object_mut)
        {
            properties.insert(
                name.to_string(),
                serde_json::json!({"type": "string", "description": description}),
            );
        }
        if required && let Some(schema) = self.parameters.as_object_mut() {
            let list = schema
                .entry("required")
                .or_insert_with(|| JsonValue::Array(Vec::new()));
            if let Some(list) = list.as_array_mut() {
                list.push(JsonValue::String(name.to_string()));
            }
        }
        self
    }

    /// Names of the arguments the model must supply.
    #[must_use]
    pub fn required_arguments(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(JsonValue::as_array)
            .map(|list| list.iter().filter_map(JsonValue::as_str).collect())
            .unwrap_or_default()
    }
}

/// A capability the model may call while answering.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Runs the tool for the conversation described by `context`.
    async fn call(
        &self,
        context: &ConversationContext,
        arguments: JsonValue,
    ) -> Result<String, ToolError>;
}

/// The tools available to one conversation.
///
/// Clone is cheap; tools are shared behind `Arc`.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.definition().name, tool);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Tool names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Definitions of every tool, ordered by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Calls a tool by name after checking its required arguments.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown name, `InvalidInput` when `arguments` is not
    /// an object or lacks a required argument, or whatever the tool returns.
    pub async fn call(
        &self,
        name: &str,
        context: &ConversationContext,
        arguments: JsonValue,
    ) -> Result<String, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound {
            name: name.to_string(),
        })?;

        let Some(object) = arguments.as_object() else {
            return Err(ToolError::InvalidInput {
                name: name.to_string(),
                reason: "arguments must be a JSON object".to_string(),
            });
        };
        let definition = tool.definition();
        if let Some(missing) = definition
            .required_arguments()
            .into_iter()
            .find(|arg| !object.contains_key(*arg))
        {
            return Err(ToolError::InvalidInput {
                name: name.to_string(),
                reason: format!("missing argument '{missing}'"),
            });
        }

        tool.call(context, arguments).await
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tools.keys()).finish()
    }
}
