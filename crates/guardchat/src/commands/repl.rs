//! REPL (Read-Eval-Print Loop) implementation for interactive chat.

use anyhow::Result;
use console::{Style, Term, style};
use guardchat_config::FieldName;
use guardchat_session::{ChatSessionManager, Turn, TurnOutcome, TurnRole};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

use super::Context;
use super::config::{print_completeness, print_fields};

/// REPL state and configuration.
pub struct Repl {
    manager: ChatSessionManager,
    ctx: Context,
    editor: Editor<(), DefaultHistory>,
    term: Term,
}

impl Repl {
    /// Create a new REPL instance.
    pub fn new(manager: ChatSessionManager, ctx: Context) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .auto_add_history(false)
            .build();

        let editor = Editor::with_config(config)?;

        Ok(Self {
            manager,
            ctx,
            editor,
            term: Term::stdout(),
        })
    }

    /// Run the REPL loop.
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        loop {
            let prompt = self.format_prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    if records_in_history(line)
                        && let Err(e) = self.editor.add_history_entry(line)
                    {
                        tracing::debug!(error = %e, "Failed to record history entry");
                    }

                    if line.starts_with('/') {
                        match self.handle_slash_command(line).await {
                            Ok(ControlFlow::Continue) => continue,
                            Ok(ControlFlow::Exit) => break,
                            Err(e) => {
                                self.print_error(&format!("Command error: {}", e));
                                continue;
                            }
                        }
                    }

                    self.send_message(line).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!();
                    self.print_dim("(Interrupted - type /quit to exit)");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(e) => {
                    self.print_error(&format!("Input error: {}", e));
                    break;
                }
            }
        }

        self.print_dim("Goodbye!");
        Ok(())
    }

    async fn send_message(&mut self, message: &str) {
        let response = self.manager.submit(message).await;
        print_turn(&response);
        println!();
    }

    /// Handle a slash command.
    async fn handle_slash_command(&mut self, input: &str) -> Result<ControlFlow> {
        let parts: Vec<&str> = input[1..].split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");
        let args = &parts[1..];

        match cmd {
            "quit" | "q" | "exit" => {
                return Ok(ControlFlow::Exit);
            }
            "help" | "h" | "?" => {
                self.print_help();
            }
            "set" if args.len() >= 2 => {
                let field: FieldName = args[0].parse()?;
                let config = self.manager.set_override(field, args[1..].join(" "));
                println!(
                    "{} = {} ({})",
                    field,
                    config.describe(field),
                    config.field(field).provenance()
                );
            }
            "set" => {
                self.print_dim("Usage: /set <field> <value>");
            }
            "unset" if args.len() == 1 => {
                let field: FieldName = args[0].parse()?;
                let config = self.manager.clear_override(field);
                println!(
                    "{} = {} ({})",
                    field,
                    config.describe(field),
                    config.field(field).provenance()
                );
            }
            "unset" => {
                self.print_dim("Usage: /unset <field>");
            }
            "config" | "status" => {
                self.print_config();
            }
            "history" => {
                self.print_history();
            }
            "clear" => {
                self.manager.clear_transcript().await;
                self.term.clear_screen()?;
                self.print_dim("Chat history cleared");
            }
            "reload" => {
                self.ctx.reload()?;
                for warning in &self.ctx.loaded.warnings {
                    println!("{} {}", style("!").yellow(), warning);
                }
                let config = self.manager.refresh_defaults(&self.ctx.defaults());
                print_completeness(&config);
            }
            "" => {
                self.print_dim("Type /help for available commands");
            }
            _ => {
                self.print_error(&format!("Unknown command: /{}", cmd));
                self.print_dim("Type /help for available commands");
            }
        }

        Ok(ControlFlow::Continue)
    }

    fn print_welcome(&self) {
        let dim = Style::new().dim();
        println!();
        println!("{}", style("Guardchat").bold().cyan());
        println!("{}", dim.apply_to("─".repeat(40)));
        println!(
            "{}",
            dim.apply_to(format!(
                "Proxy: {} ({})  Model: {}",
                self.manager.proxy_name(),
                self.ctx.settings.base_url,
                self.ctx.settings.model
            ))
        );
        println!(
            "{}",
            dim.apply_to("Type your message and press Enter to chat.")
        );
        println!(
            "{}",
            dim.apply_to("Use /help for commands, Ctrl+D to exit.")
        );
        println!();
        print_completeness(&self.manager.config());
        println!();
    }

    fn print_help(&self) {
        let dim = Style::new().dim();
        println!();
        println!("{}", style("Available Commands").bold());
        println!("{}", dim.apply_to("─".repeat(40)));
        println!("  {}  - Exit the REPL", style("/quit, /q").cyan());
        println!("  {}  - Show this help", style("/help, /h, /?").cyan());
        println!(
            "  {}  - Override a credential for this session",
            style("/set <field> <value>").cyan()
        );
        println!(
            "  {}  - Drop an override and use the default",
            style("/unset <field>").cyan()
        );
        println!(
            "  {}  - Show credentials and their source",
            style("/config").cyan()
        );
        println!("  {}  - Show the conversation", style("/history").cyan());
        println!("  {}  - Clear chat history", style("/clear").cyan());
        println!(
            "  {}  - Re-read config files and environment",
            style("/reload").cyan()
        );
        println!();
        println!("{}", dim.apply_to("Fields:"));
        for field in FieldName::ALL {
            println!(
                "  {} {}",
                style(field.to_string()).cyan(),
                dim.apply_to(format!("({})", field.display_name()))
            );
        }
        println!();
        println!("{}", dim.apply_to("Keyboard shortcuts:"));
        println!("  {} - Exit the REPL", dim.apply_to("Ctrl+D"));
        println!();
    }

    fn print_config(&self) {
        let status = self.manager.status();
        let dim = Style::new().dim();
        println!();
        print_fields(&self.manager.config(), Some(&self.ctx.defaults()));
        println!();
        print_completeness(&self.manager.config());
        println!(
            "{}",
            dim.apply_to(format!(
                "Session {} ({} turns)",
                status.id, status.turn_count
            ))
        );
        println!();
    }

    fn print_history(&self) {
        let transcript = self.manager.transcript();
        if transcript.is_empty() {
            self.print_dim("No messages yet");
            return;
        }
        println!();
        for turn in &transcript {
            if turn.role == TurnRole::User {
                println!("{} {}", style("you>").cyan().bold(), turn.text);
            } else {
                print_turn(turn);
            }
        }
        println!();
    }

    fn format_prompt(&self) -> String {
        format!("{} ", style("guardchat>").cyan().bold())
    }

    fn print_dim(&self, msg: &str) {
        let dim = Style::new().dim();
        println!("{}", dim.apply_to(msg));
    }

    fn print_error(&self, msg: &str) {
        let red = Style::new().red();
        eprintln!("{}", red.apply_to(msg));
    }
}

/// `/set` lines carry secrets and stay out of the line history.
fn records_in_history(line: &str) -> bool {
    let command = line
        .strip_prefix('/')
        .and_then(|rest| rest.split_whitespace().next());
    command != Some("set")
}

/// Render a response turn.
fn print_turn(turn: &Turn) {
    match turn.outcome {
        Some(TurnOutcome::Ok) | None => println!("{}", turn.text),
        Some(TurnOutcome::BlockedByPolicy) => {
            println!("{}", style(&turn.text).yellow());
        }
        Some(TurnOutcome::UpstreamError) => {
            println!("{}", style(&turn.text).red());
        }
        Some(TurnOutcome::ConfigurationIncomplete) => {
            println!("{}", style(&turn.text).yellow());
            println!(
                "{}",
                Style::new()
                    .dim()
                    .apply_to("Use /set <field> <value> or /config to see what is missing.")
            );
        }
    }
}

/// Control flow for slash commands.
pub enum ControlFlow {
    Continue,
    Exit,
}
