// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! tbmux - a multiplexing proxy for a single upstream bot API account.
//!
//! Binary entry point: parses the CLI, then hands off to the serve path.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use clap::Parser;

mod serve;

/// tbmux - a multiplexing proxy for a single upstream bot API account.
#[derive(Parser, Debug)]
#[command(name = "tbmux", version, about, long_about = None)]
struct Cli {
    /// Configuration file. When omitted, the XDG hierarchy applies
    /// (./tbmux.toml > ~/.config/tbmux/tbmux.toml > /etc/tbmux/tbmux.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = serve::run(cli.config.as_deref()).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
