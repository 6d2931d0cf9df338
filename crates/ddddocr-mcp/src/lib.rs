//! ddddocr MCP Server: captcha recognition tools for LLM clients over stdio.

pub mod backends;
pub mod config;
pub mod protocol;
pub mod repl;
pub mod tools;
pub mod transport;
pub mod types;

pub use backends::{BackendFactory, BackendRegistry, ModelBackendFactory};
pub use config::resolve_model_dir;
pub use protocol::ProtocolHandler;
pub use tools::ToolRegistry;
pub use transport::StdioTransport;
