// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, Write};
use std::sync::Arc;

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};
use tokio::io::AsyncReadExt;

use palaver::chat::{self, display, Agent, AgentObserver, AgentOptions, TurnOutcome};
use palaver::cli::{AskArgs, ConfigCommands, SessionsCommands, ToolsCommands};
use palaver::config::{AppConfig, ConfigFile, ResolvedConfig};
use palaver::error::{PalaverError, Result};
use palaver::llm::message::ContentBlock;
use palaver::llm::{ModelSpec, ProviderFactory};
use palaver::session::{FileSessionManager, SessionStore};
use palaver::tools::ToolRegistry;

/// Build the agent described by config.
pub(super) fn build_agent(config: &AppConfig) -> Result<Agent> {
    let spec = ModelSpec::parse(&config.model)?;
    let provider = ProviderFactory::create(&spec, &config.providers)?;
    let tools = Arc::new(ToolRegistry::load(&config.tools));
    let manager = chat::build_manager(&config.conversation);

    tracing::debug!(
        provider = %spec.provider,
        model = %spec.model_id,
        tools = tools.len(),
        manager = manager.name(),
        "Agent ready"
    );

    Ok(Agent::new(
        provider,
        tools,
        manager,
        AgentOptions::from_config(config, spec.model_id),
    ))
}

/// Open the configured session, if any.
pub(super) fn open_session(config: &AppConfig) -> Result<Option<FileSessionManager>> {
    match (&config.session.name, config.session.enabled) {
        (Some(name), true) => Ok(Some(FileSessionManager::open(&config.session.dir, name)?)),
        (Some(name), false) => {
            tracing::warn!(session = %name, "Sessions are disabled, not loading");
            Ok(None)
        }
        (None, _) => Ok(None),
    }
}

/// Print a line in colour when colour is enabled.
pub(super) fn print_colored(color_enabled: bool, color: Color, text: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    if color_enabled {
        stdout.execute(SetForegroundColor(color))?;
        println!("{}", text);
        stdout.execute(ResetColor)?;
    } else {
        println!("{}", text);
    }
    stdout.flush()
}

/// Tool activity printed to stderr, keeping stdout for the answer
struct StderrObserver {
    show_tool_calls: bool,
}

impl AgentObserver for StderrObserver {
    fn on_tool_invocation(&mut self, name: &str, input: &serde_json::Value) {
        if self.show_tool_calls {
            eprintln!("{}", display::format_tool_invocation(name, input));
        }
    }

    fn on_tool_result(&mut self, name: &str, result: &ContentBlock) {
        if self.show_tool_calls {
            eprintln!("{}", display::format_tool_result(name, result));
        }
    }

    fn on_context_reduced(&mut self) {
        eprintln!("Context window full, trimmed history and retrying");
    }
}

pub(super) async fn run_ask(args: AskArgs, resolved: &ResolvedConfig) -> Result<()> {
    let config = &resolved.config;

    let prompt = if args.reads_stdin() {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        args.text()
    };
    if prompt.trim().is_empty() {
        return Err(PalaverError::InvalidInput("Prompt is empty".to_string()));
    }

    let mut agent = build_agent(config)?;
    let mut session = open_session(config)?;
    if let Some(s) = &session {
        agent.set_messages(s.messages().to_vec());
    }

    let mut observer = StderrObserver {
        show_tool_calls: config.ui.show_tool_calls,
    };
    let cancel = agent.cancel_flag();
    let outcome = tokio::select! {
        outcome = agent.run_turn(prompt.trim(), &mut observer) => outcome?,
        _ = tokio::signal::ctrl_c() => {
            cancel.store(true, std::sync::atomic::Ordering::SeqCst);
            TurnOutcome::Cancelled
        }
    };

    match outcome {
        TurnOutcome::Completed { text, usage, rounds } => {
            println!("{}{}", config.ui.assistant_prefix, text);
            tracing::debug!(
                rounds,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Ask completed"
            );
            if let Some(s) = session.as_mut() {
                s.save(agent.messages(), &config.model)?;
            }
            Ok(())
        }
        TurnOutcome::Cancelled => Err(PalaverError::InvalidInput("Cancelled".to_string())),
    }
}

pub(super) fn run_config_command(command: ConfigCommands, resolved: &ResolvedConfig) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            print!("{}", resolved.to_yaml()?);
        }
        ConfigCommands::Profiles => {
            println!("{}", format_profiles(&resolved.file, resolved.profile.as_deref()));
        }
        ConfigCommands::Path => match resolved.source() {
            Some(path) => println!("{}", path.display()),
            None => println!("(no config file; using built-in defaults)"),
        },
    }
    Ok(())
}

/// Profile listing; `*` marks the active profile.
fn format_profiles(file: &ConfigFile, active: Option<&str>) -> String {
    if file.profiles.is_empty() {
        return "No profiles defined.".to_string();
    }

    file.profiles
        .values()
        .map(|p| {
            let marker = if active == Some(p.name.as_str()) { "*" } else { " " };
            let mut line = format!("{} {}", marker, p.name);
            if let Some(parent) = &p.inherits {
                line.push_str(&format!(" (inherits {})", parent));
            }
            if file.default_profile.as_deref() == Some(p.name.as_str()) {
                line.push_str(" [default]");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(super) fn run_sessions_command(command: SessionsCommands, config: &AppConfig) -> Result<()> {
    let store = SessionStore::new(&config.session.dir);
    match command {
        SessionsCommands::List => {
            let sessions = store.list()?;
            println!(
                "{}",
                display::format_session_list(&sessions, config.session.name.as_deref())
            );
        }
        SessionsCommands::Delete { id } => {
            if !store.delete(&id)? {
                return Err(PalaverError::Session(format!("No session named '{}'", id)));
            }
            println!("Deleted session {}", id);
        }
    }
    Ok(())
}

pub(super) fn run_tools_command(command: ToolsCommands, config: &AppConfig) -> Result<()> {
    match command {
        ToolsCommands::List => {
            let registry = ToolRegistry::load(&config.tools);
            println!("{}", display::format_tool_list(&registry));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver::config::Profile;

    #[test]
    fn test_format_profiles() {
        let mut file = ConfigFile {
            default_profile: Some("work".to_string()),
            ..ConfigFile::default()
        };
        file.profiles.insert("work".to_string(), Profile::new("work"));
        file.profiles.insert(
            "claude".to_string(),
            Profile::new("claude").with_parent("work"),
        );

        let out = format_profiles(&file, Some("claude"));
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines, vec!["* claude (inherits work)", "  work [default]"]);
    }

    #[test]
    fn test_format_no_profiles() {
        assert_eq!(format_profiles(&ConfigFile::default(), None), "No profiles defined.");
    }

    #[test]
    fn test_open_session_disabled() {
        let mut config = AppConfig::default();
        config.session.name = Some("x".to_string());
        config.session.enabled = false;
        assert!(open_session(&config).unwrap().is_none());
    }
}
