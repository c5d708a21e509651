//! Fridge inventory ledger: library surface and the `fridge` CLI.
//!
//! - [`config`]: where the ledger lives and which timezone "today" is in
//! - [`request`]: the JSON request/response protocol agent tools speak
//! - [`cmd`]: the `fridge` command-line tool
//!
//! # Example Usage
//!
//! ```bash
//! fridge add milk 2 --unit L --exp-days 3
//! fridge consume milk 1.5
//! fridge expiring 3
//! fridge request '{"action":"set_shelf_life","name":"milk","exp_days":10}'
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cmd;
pub mod config;
pub mod request;

pub use config::{Config, ConfigBuilder, ConfigError};
pub use request::{execute, Reply, Request, Response, UpdateExpiry};
