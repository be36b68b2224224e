//! The tool catalogue the native agent runtime calls (C1 handlers, §4.1).
//!
//! Five toolsets — `base_data`, `analysis`, `generation`, `artifact_ops`,
//! `platform` — each with a [`gateway_kernel::ToolExecutor`] implementation.
//! [`ToolCatalog`] combines all five into the single executor the runtime
//! holds, and [`tool_definitions`] is the catalogue registered at startup.

pub mod analysis;
pub mod artifact_ops;
pub mod base_data;
pub mod catalog;
pub mod circuit_breaker;
pub mod error;
pub mod external;
pub mod generation;
pub mod platform;
mod util;

pub use catalog::{tool_definitions, ToolCatalog};
pub use circuit_breaker::CircuitBreaker;
pub use error::ExternalDataError;
pub use external::{ExternalDataClient, HttpExternalDataClient};
