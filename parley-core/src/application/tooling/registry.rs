use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use super::definition::{Tool, ToolDefinition};
use super::error::RegistryError;

/// Owned set of registered tools.
///
/// Created by the application and shared with every executor that needs it;
/// dropping the last handle (or calling [`ToolRegistry::clear`]) ends its
/// lifetime. Lookups are case-insensitive.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn register(&self, tool: Tool) -> Result<(), RegistryError> {
        let name = tool.name().trim().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let key = name.to_lowercase();
        let mut tools = self.tools.write().unwrap_or_else(|e| e.into_inner());
        if tools.contains_key(&key) {
            return Err(RegistryError::Duplicate(name));
        }
        debug!(tool = %name, "Registered tool");
        tools.insert(key, Arc::new(tool));
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&name.to_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&name.to_lowercase())
            .cloned()
    }

    /// Definitions sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let tools = self.tools.read().unwrap_or_else(|e| e.into_inner());
        let mut definitions: Vec<_> = tools.values().map(|t| t.definition.clone()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn len(&self) -> usize {
        self.tools.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.tools.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
