//! MCP (Model Context Protocol) client.
//!
//! Connects to MCP servers over stdio or streamable HTTP, discovers their
//! tools, and forwards tool calls to them. Implements JSON-RPC 2.0.

mod client;
mod loader;
mod protocol;
mod transport;

pub use client::{McpClient, PROTOCOL_VERSION};
pub use loader::McpToolLoader;
pub use protocol::Tool;
pub use transport::{HttpTransport, McpTransport, StdioTransport};
