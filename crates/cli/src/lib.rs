//! Command line front end: argument parsing, the login callback listener and
//! one handler per subcommand, all reporting through a JSON envelope.

pub mod callback_server;
pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod logging;
pub mod output;
