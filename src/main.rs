// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Palaver - chat with language models from your terminal
//!
//! Entry point for the palaver CLI application.

use std::process::ExitCode;

use clap::Parser;

use palaver::chat::display::format_error;
use palaver::cli::{Cli, Commands};
use palaver::config::{self, ResolveOptions, ResolvedConfig};
use palaver::error::{PalaverError, Result};

#[path = "main/cli_commands.rs"]
mod cli_commands;
#[path = "main/repl.rs"]
mod repl;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = ResolveOptions::from_process(
        cli.config.clone(),
        cli.profile.clone(),
        cli.to_overrides(),
    );
    let resolved = match config::resolve(&options) {
        Ok(resolved) => resolved,
        Err(e) => return report(&e, cli.debug),
    };
    tracing::debug!(
        source = ?resolved.source(),
        profile = ?resolved.profile,
        model = %resolved.config.model,
        "Configuration resolved"
    );

    let debug = resolved.config.debug;
    match dispatch(cli.command(), &resolved).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e, debug),
    }
}

/// Initialize tracing. Logs go to stderr so stdout stays clean.
fn init_tracing(verbose: u8) {
    let mut env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    // `-v` enables palaver diagnostics without requiring users to know
    // target names. `RUST_LOG` still applies to everything else.
    let directive = match verbose {
        0 => None,
        1 => Some("palaver=debug"),
        _ => Some("palaver=trace"),
    };
    if let Some(directive) = directive {
        if let Ok(parsed) = directive.parse() {
            env_filter = env_filter.add_directive(parsed);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(command: Commands, resolved: &ResolvedConfig) -> Result<()> {
    match command {
        Commands::Chat => repl::run_chat(resolved).await,
        Commands::Ask(args) => cli_commands::run_ask(args, resolved).await,
        Commands::Config(command) => cli_commands::run_config_command(command, resolved),
        Commands::Sessions(command) => {
            cli_commands::run_sessions_command(command, &resolved.config)
        }
        Commands::Tools(command) => cli_commands::run_tools_command(command, &resolved.config),
    }
}

fn report(error: &PalaverError, debug: bool) -> ExitCode {
    eprintln!("{}", format_error(error, debug));
    ExitCode::from(error.exit_code())
}
