#![forbid(unsafe_code)]

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "scribe", about = "Document-tree store for writing projects")]
pub struct Cli {
    /// Address to bind the HTTP server.
    #[arg(long, default_value = "127.0.0.1:8080", env = "SCRIBE_BIND")]
    pub bind: String,

    /// Directory holding `scribe.db`; created when missing.
    #[arg(long, default_value = "./scribe_data", env = "SCRIBE_STORAGE_DIR")]
    pub storage_dir: PathBuf,

    /// Request header carrying the authenticated user id.
    #[arg(long, default_value = "x-scribe-user", env = "SCRIBE_IDENTITY_HEADER")]
    pub identity_header: String,

    /// Attempts per unit of work before a commit race is reported.
    #[arg(
        long,
        default_value_t = 3,
        env = "SCRIBE_TX_ATTEMPTS",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub tx_attempts: u32,
}
