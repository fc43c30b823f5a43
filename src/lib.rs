//! # hookwarden
//!
//! Profile-based commit hooks. A project configuration partitions the
//! repository into profiles by path regex; each profile binds a process of
//! checks and notification handlers to the `precommit` and `postcommit`
//! hooks. Configurations inherit from named templates.
//!
//! ```bash
//! # Run the pre-commit process of the repository in the current directory
//! hookwarden run precommit
//!
//! # Check a configuration without running anything
//! hookwarden validate --config hooks/hookwarden.toml
//! ```

pub mod checks;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod matcher;
pub mod module;
pub mod protocol;
pub mod runner;
pub mod schema;
pub mod transaction;

pub use cli::{Cli, Output};
pub use config::{ProjectConfig, Settings, TemplateResolver};
pub use module::Registry;
pub use protocol::{Protocol, ProtocolEntry, ResultTag};
pub use runner::{ProcessRunner, RunResult};
pub use transaction::{Changeset, GitTransaction, MemoryTransaction, Transaction};

/// Result type alias for hookwarden operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
