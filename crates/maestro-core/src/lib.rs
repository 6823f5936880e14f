//! Maestro core — the orchestration subsystem.
//!
//! A multi-agent conversational orchestrator: a user prompt is analyzed,
//! one or more LLM-backed agents are selected, auxiliary tools (web search,
//! knowledge lookup) run first, and a composed reply streams back as
//! newline-delimited JSON frames.
//!
//! The HTTP server is a thin presentation layer over this crate; see the
//! `maestro-server` crate. Module map:
//!
//! - [`catalog`] — agent definitions and the atomically reloadable registry
//! - [`knowledge`] — static knowledge catalog with lazy file loading
//! - [`providers`] — LLM and web-search ports plus HTTP implementations
//! - [`tools`] — tool relevance, query generation, execution, turn cache
//! - [`analyzer`] — supervisor query decomposition and agent scoring
//! - [`planner`] — ordered step plans from manual pipelines or analysis
//! - [`agent`] — per-agent context composition and streaming runs
//! - [`session`] — JSON-document session store with per-key write locks
//! - [`orchestrator`] — the turn loop and the stream protocol

pub mod agent;
pub mod analyzer;
pub mod catalog;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod orchestrator;
pub mod planner;
pub mod providers;
pub mod session;
pub mod tools;

pub use agent::AgentRunner;
pub use catalog::AgentRegistry;
pub use config::RuntimeConfig;
pub use error::CoreError;
pub use knowledge::KnowledgeBase;
pub use orchestrator::{Orchestrator, StreamEvent};
pub use session::{SessionDoc, SessionStore, StoredMessage};
pub use tools::ToolRuntime;
