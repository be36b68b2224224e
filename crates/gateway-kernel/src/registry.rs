//! Tool registry.
//!
//! The registry is the single source of truth for every tool the native
//! agent runtime may call. It is built once at process start, from a fixed
//! slice of [`ToolDefinition`]s, and is never mutated afterwards — lookups
//! are lock-free reads against a [`DashMap`] that happens to never see a
//! concurrent write past startup.
//!
//! # Example
//!
//! ```rust
//! # use gateway_kernel::registry::{ToolRegistry, ToolDefinition};
//! # use gateway_kernel::Toolset;
//! let registry = ToolRegistry::new();
//! registry.register(ToolDefinition::new(
//!     "get_teacher_classes",
//!     "List the classes owned by the requesting teacher.",
//!     serde_json::json!({"type": "object", "properties": {}}),
//!     Toolset::BaseData,
//! )).unwrap();
//!
//! let tools = registry.get_tools(&[Toolset::BaseData]);
//! assert_eq!(tools.len(), 1);
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{KernelError, Result};
use crate::Toolset;

/// How a tool's return value should be interpreted by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    /// A raw data map, e.g. `{"status": "ok", ...}`.
    RawDataMap,
    /// A `ToolResult` envelope (generation/RAG/write/clarify tools).
    ToolResult,
    /// A structured clarification request.
    ClarifyEvent,
}

/// A single registered tool.
///
/// `handler` is intentionally absent from this struct: the registry tracks
/// *definitions* (name, description, schema, toolset membership) for prompt
/// construction and lookup. The executable side lives in `gateway-tools`,
/// keyed by the same `name`, so the registry stays free of a dependency on
/// the tool-implementation crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique identifier, e.g. `generate_quiz_questions`.
    pub name: String,
    /// Human-readable description injected into the model's context.
    pub description: String,
    /// JSON Schema describing accepted arguments.
    pub input_schema: Value,
    /// Which of the five fixed toolsets this tool belongs to.
    pub toolset: Toolset,
    /// How the runtime should interpret this tool's return value.
    pub output_type: OutputType,
}

impl ToolDefinition {
    /// Construct a definition whose `output_type` defaults to `RawDataMap`.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        toolset: Toolset,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            toolset,
            output_type: OutputType::RawDataMap,
        }
    }

    /// Builder: set `output_type`.
    #[must_use]
    pub fn with_output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = output_type;
        self
    }
}

/// Concurrent, write-once-at-startup tool registry.
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone)]
pub struct ToolRegistry {
    inner: Arc<DashMap<String, ToolDefinition>>,
    /// Registration order, preserved independently of the map's iteration
    /// order so `get_tools` returns a deterministic sequence across runs.
    order: Arc<std::sync::Mutex<Vec<String>>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            order: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Register a tool definition. Idempotent by name: re-registering the
    /// same name is a programmer error and fails fast.
    pub fn register(&self, definition: ToolDefinition) -> Result<()> {
        if self.inner.contains_key(&definition.name) {
            return Err(KernelError::DuplicateTool {
                name: definition.name,
            });
        }

        tracing::info!(tool = %definition.name, toolset = %definition.toolset, "tool registered");
        self.order.lock().unwrap().push(definition.name.clone());
        self.inner.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Look up a single tool by name.
    pub fn lookup(&self, name: &str) -> Result<ToolDefinition> {
        self.inner
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| KernelError::ToolNotFound {
                name: name.to_string(),
            })
    }

    /// Return every tool whose toolset is in `toolsets`, in registration
    /// order.
    pub fn get_tools(&self, toolsets: &[Toolset]) -> Vec<ToolDefinition> {
        let order = self.order.lock().unwrap();
        order
            .iter()
            .filter_map(|name| self.inner.get(name).map(|e| e.value().clone()))
            .filter(|def| toolsets.contains(&def.toolset))
            .collect()
    }

    /// Return every registered tool, in registration order.
    pub fn get_all(&self) -> Vec<ToolDefinition> {
        let order = self.order.lock().unwrap();
        order
            .iter()
            .filter_map(|name| self.inner.get(name).map(|e| e.value().clone()))
            .collect()
    }

    /// Total number of registered tools.
    pub fn count(&self) -> usize {
        self.inner.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, toolset: Toolset) -> ToolDefinition {
        ToolDefinition::new(name, format!("{name} does things"), serde_json::json!({}), toolset)
    }

    #[test]
    fn register_and_lookup() {
        let registry = ToolRegistry::new();
        registry.register(def("get_teacher_classes", Toolset::BaseData)).unwrap();

        let found = registry.lookup("get_teacher_classes").unwrap();
        assert_eq!(found.name, "get_teacher_classes");
        assert_eq!(found.toolset, Toolset::BaseData);
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = ToolRegistry::new();
        registry.register(def("a", Toolset::Platform)).unwrap();
        let err = registry.register(def("a", Toolset::Platform)).unwrap_err();
        assert!(matches!(err, KernelError::DuplicateTool { .. }));
    }

    #[test]
    fn lookup_missing_tool() {
        let registry = ToolRegistry::new();
        assert!(matches!(
            registry.lookup("nope"),
            Err(KernelError::ToolNotFound { .. })
        ));
    }

    #[test]
    fn get_tools_filters_by_toolset_and_preserves_order() {
        let registry = ToolRegistry::new();
        registry.register(def("t1", Toolset::BaseData)).unwrap();
        registry.register(def("t2", Toolset::Generation)).unwrap();
        registry.register(def("t3", Toolset::BaseData)).unwrap();

        let tools = registry.get_tools(&[Toolset::BaseData]);
        assert_eq!(tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), vec!["t1", "t3"]);
    }

    #[test]
    fn get_all_preserves_registration_order() {
        let registry = ToolRegistry::new();
        registry.register(def("z", Toolset::Platform)).unwrap();
        registry.register(def("a", Toolset::Platform)).unwrap();

        let all = registry.get_all();
        assert_eq!(all.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), vec!["z", "a"]);
    }

    #[test]
    fn count_reflects_registrations() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.count(), 0);
        registry.register(def("a", Toolset::Platform)).unwrap();
        assert_eq!(registry.count(), 1);
    }
}
