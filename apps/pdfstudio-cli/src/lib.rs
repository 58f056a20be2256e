//! PDF Studio command line
//!
//! Runs the document tools from a shell. Local tools go through
//! `pdfstudio-core`; unlock, protect, compress, OCR and conversions are
//! posted to the processing server.

pub mod cli;
pub mod commands;
pub mod remote_client;

pub use cli::{Cli, Command};
pub use remote_client::RemoteClient;
