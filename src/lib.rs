//! # xserver-renew
//!
//! Unattended contract renewal for the Xserver GameServer panel.
//!
//! The panel exposes no API, so the bot drives the web UI: authenticate
//! (cookie injection first, credential form second), walk the multi-page
//! renewal wizard, and record the outcome in an append-only journal. Every
//! control lookup goes through a layered fallback chain so that wording and
//! markup drift on the panel degrades a run instead of breaking it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clap::Parser;
//! use xserver_renew::{runner, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> xserver_renew::Result<()> {
//! let cfg = Config::parse_from(["xserver-renew", "--cookie", "session=abc123"]);
//! let outcome = runner::execute(&cfg).await?;
//! std::process::exit(outcome.exit_code() as i32);
//! # }
//! ```

pub mod config;
pub mod diag;
pub mod labels;
pub mod locate;
pub mod outcome;
pub mod runner;
pub mod session;
pub mod wizard;

pub use config::Config;
pub use diag::Diag;
pub use labels::LabelPack;
pub use outcome::Journal;
pub use runner::RunOutcome;

/// Result type for xserver-renew operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),
}
