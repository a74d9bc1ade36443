// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! staysync - guest-message synchronization for property hosts.
//!
//! This is the binary entry point for the staysync engine.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod run;

use clap::{Parser, Subcommand};

/// staysync - guest-message synchronization for property hosts.
#[derive(Parser, Debug)]
#[command(name = "staysync", version, about, long_about = None)]
struct Cli {
    /// Path to an explicit config file (defaults to the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one synchronization pass for a host.
    Sync {
        /// Host id to synchronize.
        #[arg(long)]
        host: String,
    },
    /// Run recurring synchronization passes for all registered hosts.
    Run,
    /// Send a diagnostic reply into a conversation, bypassing generation.
    SendTest {
        /// Conversation id to send into.
        #[arg(long)]
        conversation: String,
        /// Reply text.
        #[arg(long)]
        text: String,
    },
    /// Print the merged, validated configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let load_result = match &cli.config {
        Some(path) => staysync_config::load_and_validate_path(path),
        None => staysync_config::load_and_validate(),
    };
    let config = match load_result {
        Ok(config) => config,
        Err(errors) => {
            staysync_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    run::init_tracing(&config.sync.log_level);

    let result = match cli.command {
        Commands::Sync { host } => run::run_sync(&config, &host).await,
        Commands::Run => run::run_timer(&config).await,
        Commands::SendTest { conversation, text } => {
            run::run_send_test(&config, &conversation, &text).await
        }
        Commands::Config => run::show_config(&config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
