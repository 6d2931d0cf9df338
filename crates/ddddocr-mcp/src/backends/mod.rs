//! Recognition backend lifecycle.

pub mod factory;
pub mod registry;

pub use factory::{BackendFactory, ModelBackendFactory};
pub use registry::{BackendKind, BackendRegistry, ModuleStatus};
