//! whatsnew - AWS service updates search
//!
//! A small HTTP service and CLI that answers questions about recent AWS
//! launches. A chat model decides when to call the `getAwsUpdates` tool, which
//! fetches the AWS "What's New" RSS feed and returns the latest matching updates.
//!
//! # Architecture
//!
//! - `feed` - RSS fetching and the update filter
//! - `tools` - Tool specifications and dispatch (built-in and MCP)
//! - `conversation` - Message types and conversation state
//! - `graph` - The model/tools loop and its routing decision
//! - `mcp` - MCP client (stdio and streamable HTTP)
//! - `api` - HTTP routes
//! - `orchestrator` - Startup wiring and shutdown
//! - `config` - Configuration management
//!
//! # Example
//!
//! ```rust,no_run
//! use whatsnew::config::Settings;
//! use whatsnew::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::init(settings, false).await?;
//!
//!     let conversation = orchestrator.conversation("What's new in Amazon S3?");
//!     let run = orchestrator.graph().invoke(conversation).await?;
//!     println!("{}", run.answer());
//!
//!     orchestrator.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod feed;
pub mod graph;
pub mod mcp;
pub mod openai;
pub mod orchestrator;
pub mod tools;

pub use error::{Result, WhatsNewError};
