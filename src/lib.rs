//! Rust client for the Rubble rule-engine service
//!
//! Rubble hosts processes: a rules file plus a set of facts, driven by
//! messages. This crate addresses those processes, delivers messages to
//! them, and manages their registry entries, trapstates and channel aliases
//! over the service's HTTP/JSON API.
//!
//! # Example
//!
//! ```rust,no_run
//! use rubble_client::{
//!     ChannelAddress, ClientConfig, CreateProcess, MessageEnvelope, RubbleClient, RulesRef,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RubbleClient::new(ClientConfig::from_env()?)?;
//!
//! // Start a process and give it a name
//! let pid = client
//!     .create_process(&CreateProcess::new(RulesRef::local("/todo.rules")))
//!     .await?;
//! client.update_alias("todo", pid).await?;
//!
//! // Talk to it synchronously
//! let envelope = MessageEnvelope::wrap(
//!     vec![rubble_client::term!("add", "task23")],
//!     ChannelAddress::alias("todo"),
//!     Some("default"),
//!     None,
//! )?;
//! let reply = client.call(&envelope).await?;
//! println!("{:?}", reply.output);
//!
//! // Check whether it is still healthy
//! let process = client.get_process(pid, false).await?;
//! println!("{} is {}", pid, process.state());
//! # Ok(())
//! # }
//! ```

#[macro_use]
pub mod term;

pub mod channel;
pub mod client;
pub mod config;
pub mod delivery;
pub mod envelope;
pub mod error;
pub mod process;
pub mod time;
pub mod trapstate;
pub mod types;

// Re-export main types
pub use channel::{AliasListOptions, ChannelAddress, ChannelAlias};
pub use client::RubbleClient;
pub use config::ClientConfig;
pub use delivery::{CallOutput, DeliveryMode};
pub use envelope::MessageEnvelope;
pub use error::{ErrorKind, Result, RubbleError};
pub use process::{
    CreateProcess, Facts, FactsFormat, Pid, Process, ProcessKind, ProcessListOptions,
    ProcessSummary, RulesRef, UpdateProcess,
};
pub use term::{Compound, Term};
pub use trapstate::{
    transition, Cause, DeliveryDecision, HeldMessages, ProcessState, Release, TrapEvent, Trapstate,
};
pub use types::DomainInfo;
