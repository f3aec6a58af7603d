// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, Write};
use std::sync::atomic::Ordering;

use crossterm::style::Color;
use tokio::io::{AsyncBufReadExt, BufReader};

use palaver::chat::commands::format_help_text;
use palaver::chat::{display, parse_command, Agent, AgentObserver, ChatCommand, TurnOutcome};
use palaver::config::{AppConfig, ResolvedConfig};
use palaver::error::{PalaverError, Result};
use palaver::llm::message::ContentBlock;
use palaver::session::{FileSessionManager, SessionStore};

use super::cli_commands::{build_agent, open_session, print_colored};

/// Tool activity printed inline in the REPL
struct ReplObserver {
    show_tool_calls: bool,
    color: bool,
}

impl ReplObserver {
    fn note(&self, color: Color, text: &str) {
        if let Err(e) = print_colored(self.color, color, text) {
            tracing::debug!(error = %e, "Failed to write to stdout");
        }
    }
}

impl AgentObserver for ReplObserver {
    fn on_tool_invocation(&mut self, name: &str, input: &serde_json::Value) {
        if self.show_tool_calls {
            self.note(Color::DarkGrey, &display::format_tool_invocation(name, input));
        }
    }

    fn on_tool_result(&mut self, name: &str, result: &ContentBlock) {
        if self.show_tool_calls {
            let color = match result {
                ContentBlock::ToolResult { is_error: true, .. } => Color::Red,
                _ => Color::DarkGrey,
            };
            self.note(color, &display::format_tool_result(name, result));
        }
    }

    fn on_context_reduced(&mut self) {
        self.note(Color::Yellow, "Context window full, trimmed history and retrying...");
    }
}

/// REPL state: the agent and the optional active session
struct Repl<'a> {
    resolved: &'a ResolvedConfig,
    agent: Agent,
    session: Option<FileSessionManager>,
}

enum Flow {
    Continue,
    Exit,
}

impl<'a> Repl<'a> {
    fn config(&self) -> &'a AppConfig {
        &self.resolved.config
    }

    fn report(&self, error: &PalaverError) {
        let msg = display::format_error(error, self.config().debug);
        if print_colored(self.config().ui.color, Color::Red, &msg).is_err() {
            eprintln!("{}", msg);
        }
    }

    fn persist(&mut self) -> Result<()> {
        let model = &self.resolved.config.model;
        if let Some(session) = self.session.as_mut() {
            session.save(self.agent.messages(), model)?;
        }
        Ok(())
    }

    async fn handle(&mut self, command: ChatCommand) -> Result<Flow> {
        let config = self.config();
        match command {
            ChatCommand::Empty => {}
            ChatCommand::Exit => return Ok(Flow::Exit),
            ChatCommand::Help => println!("{}", format_help_text()),
            ChatCommand::Clear => {
                self.agent.clear();
                self.persist()?;
                println!("Conversation cleared.");
            }
            ChatCommand::Session => match &self.session {
                Some(s) => println!("Session: {} ({} messages)", s.id(), s.messages().len()),
                None => println!("Session: (not saved; use /session <id> to keep it)"),
            },
            ChatCommand::SwitchSession(id) => {
                let loaded = self.switch_session(&id)?;
                println!("{}", display::format_session_switch(&id, loaded));
            }
            ChatCommand::Sessions => {
                let sessions = SessionStore::new(&config.session.dir).list()?;
                let current = self.session.as_ref().map(|s| s.id());
                println!("{}", display::format_session_list(&sessions, current));
            }
            ChatCommand::Tools => println!("{}", display::format_tool_list(self.agent.tools())),
            ChatCommand::Model => println!(
                "Model: {} (provider: {}, conversation: {})",
                config.model,
                self.agent.provider_name(),
                self.agent.manager_name()
            ),
            ChatCommand::Config => print!("{}", self.resolved.to_yaml()?),
            ChatCommand::Unknown(cmd) => {
                println!("Unknown command: {}. Type /help for commands.", cmd)
            }
            ChatCommand::Message(text) => self.turn(&text).await?,
        }
        Ok(Flow::Continue)
    }

    /// Switch now; returns the number of messages in the target session.
    fn switch_session(&mut self, id: &str) -> Result<usize> {
        let config = self.config();
        if !config.session.enabled {
            return Err(PalaverError::Session(
                "Sessions are disabled (session.enabled is false)".to_string(),
            ));
        }

        match self.session.as_mut() {
            Some(session) => {
                if !self.agent.messages().is_empty() || session.is_persisted() {
                    session.save(self.agent.messages(), &config.model)?;
                }
                let messages = session.switch_to(id)?;
                let count = messages.len();
                self.agent.set_messages(messages);
                Ok(count)
            }
            None => {
                // An unsaved conversation is carried into a new session.
                let mut session = FileSessionManager::open(&config.session.dir, id)?;
                if session.messages().is_empty() && !self.agent.messages().is_empty() {
                    session.save(self.agent.messages(), &config.model)?;
                } else {
                    self.agent.set_messages(session.messages().to_vec());
                }
                let count = session.messages().len();
                self.session = Some(session);
                Ok(count)
            }
        }
    }

    async fn turn(&mut self, text: &str) -> Result<()> {
        let config = self.config();
        let mut observer = ReplObserver {
            show_tool_calls: config.ui.show_tool_calls,
            color: config.ui.color,
        };
        let checkpoint = self.agent.checkpoint();
        let cancel = self.agent.cancel_flag();

        let outcome = tokio::select! {
            outcome = self.agent.run_turn(text, &mut observer) => outcome,
            _ = tokio::signal::ctrl_c() => {
                cancel.store(true, Ordering::SeqCst);
                Ok(TurnOutcome::Cancelled)
            }
        };

        match outcome? {
            TurnOutcome::Completed { text, .. } => {
                println!("{}{}", config.ui.assistant_prefix, text);
                println!();
                self.persist()?;
            }
            TurnOutcome::Cancelled => {
                // The turn future may have been dropped mid-flight.
                self.agent.restore(checkpoint);
                println!();
                print_colored(config.ui.color, Color::Yellow, &display::format_interrupt_message())?;
            }
        }
        Ok(())
    }
}

fn print_prompt(prompt: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    print!("{}", prompt);
    stdout.flush()
}

/// Run the interactive chat loop until exit or EOF.
pub(super) async fn run_chat(resolved: &ResolvedConfig) -> Result<()> {
    let config = &resolved.config;
    let mut agent = build_agent(config)?;
    let session = open_session(config)?;
    if let Some(s) = &session {
        agent.set_messages(s.messages().to_vec());
    }

    let welcome = config.ui.welcome.clone().unwrap_or_else(|| {
        display::format_welcome(
            &config.model,
            session.as_ref().map(|s| s.id()),
            agent.tools().len(),
        )
    });
    print_colored(config.ui.color, Color::Cyan, &welcome)?;
    println!();

    let mut repl = Repl {
        resolved,
        agent,
        session,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_prompt(&config.ui.prompt)?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("(Use /exit or Ctrl+D to quit)");
                continue;
            }
        };
        let Some(line) = line else {
            // EOF
            println!();
            break;
        };

        match repl.handle(parse_command(&line)).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(e) => repl.report(&e),
        }
    }

    println!("{}", config.ui.goodbye);
    Ok(())
}
