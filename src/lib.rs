//! Harbor registry client library behind the `harbor` binary.
//!
//!   api    - REST client, connection config, job resource manager
//!   cmd    - argument declarations, command registry, parser, shell
//!   utils  - logging, env defaults, interrupt handling, record tables

pub mod api;
pub mod cmd;
pub mod utils;
