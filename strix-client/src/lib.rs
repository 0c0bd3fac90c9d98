//! strix command-line client.
//!
//! Talks to a GameStream host's control plane: host details, the app
//! list, box art and quitting the running app. Streaming itself needs a
//! platform engine and window system, which this binary does not ship.

pub mod commands;
pub mod config;
