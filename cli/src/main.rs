//! Sylvia CLI - line-oriented terminal driver for the coaching core.
//!
//! ```text
//! main() -> load config -> Coach + SessionContext -> read line -> commands::parse
//!                                                       |
//!                                                       v
//!                                          Coach / SessionContext operation
//! ```
//!
//! The driver holds no state of its own; everything lives in the
//! [`SessionContext`] and the [`Coach`].

mod commands;

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, stdin, stdout};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sylvia_config::{IdentityPrompt, SylviaConfig, config_path};
use sylvia_engine::{
    AttachmentId, AttachmentRef, Coach, ModelAccess, SessionContext, SessionStore, SystemClock,
    TimerPhase, TurnRequest, format_mmss,
};
use sylvia_providers::{DEFAULT_GEMINI_MODEL, GeminiGateway, GeminiSettings};

use crate::commands::{Command, HELP, ParseError, TimerCommand};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than interleave logs with the chat.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.sylvia/logs/sylvia.log
    if let Some(config_path) = config_path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("sylvia.log"));
    }

    // Fallback: ./.sylvia/logs/sylvia.log
    candidates.push(PathBuf::from(".sylvia").join("logs").join("sylvia.log"));

    candidates
}

fn load_config() -> SylviaConfig {
    match SylviaConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(err) => {
            eprintln!("Ignoring config at {}: {err}", err.path().display());
            SylviaConfig::default()
        }
    }
}

fn model_access(config: &SylviaConfig) -> Result<ModelAccess<GeminiGateway>> {
    let Some(api_key) = config.google_api_key() else {
        tracing::warn!("No Gemini API key configured; turns will not reach the model");
        return Ok(ModelAccess::unconfigured());
    };
    let model = config.model().unwrap_or(DEFAULT_GEMINI_MODEL);
    let gateway = GeminiGateway::new(GeminiSettings::new(api_key).with_model(model))
        .context("failed to build the Gemini client")?;
    Ok(ModelAccess::Available(gateway))
}

fn open_store(config: &SylviaConfig) -> SessionStore {
    let Some(dir) = config.sessions_dir() else {
        tracing::warn!("No home directory; saved sessions will not outlive this process");
        return SessionStore::in_memory();
    };
    match SessionStore::open(&dir) {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!("Failed to open session archive at {}: {e}", dir.display());
            eprintln!("Session archive unavailable ({e}); saves are kept in memory only.");
            SessionStore::in_memory()
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

struct Repl {
    coach: Coach<GeminiGateway>,
    ctx: SessionContext,
}

impl Repl {
    async fn handle(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Message(text) => self.turn(TurnRequest::text(&text)).await?,
            Command::Nudge { key, text } => {
                self.turn(TurnRequest::nudge(&key).with_text(&text)).await?;
            }
            Command::Attach {
                name,
                mime_type,
                size_bytes,
                upload_id,
            } => {
                let mut attachment = AttachmentRef::register(name, mime_type, size_bytes);
                if let Some(upload_id) = upload_id {
                    attachment = attachment.with_external_id(upload_id);
                }
                let id = self.ctx.register_attachment(attachment);
                println!("Attached as {id}");
            }
            Command::Detach(raw) => {
                let id = AttachmentId::from(raw.as_str());
                match self.ctx.remove_attachment(&id) {
                    Some(removed) => println!("Removed {}", removed.display_name()),
                    None => println!("No attachment {raw}"),
                }
            }
            Command::Files => {
                if self.ctx.attachments().is_empty() {
                    println!("No attachments.");
                }
                for attachment in self.ctx.attachments() {
                    println!(
                        "{}  {} ({}, {} bytes)",
                        attachment.id(),
                        attachment.display_name(),
                        attachment.mime_type(),
                        attachment.size_bytes()
                    );
                }
            }
            Command::Url(text) => {
                self.ctx.set_url_context(text);
                println!("URL context set.");
            }
            Command::UrlClear => {
                self.ctx.clear_url_context();
                println!("URL context cleared.");
            }
            Command::Search(on) => {
                self.ctx.set_search_enabled(on);
                println!("Search grounding {}", on_off(on));
            }
            Command::CodeExecution(on) => {
                self.ctx.set_code_exec_enabled(on);
                println!("Code execution {}", on_off(on));
            }
            Command::Temperature(t) => self.ctx.set_temperature(t),
            Command::MaxTokens(n) => self.ctx.set_max_tokens(n),
            Command::Timer(timer) => {
                let clock = self.coach.clock();
                let completed = match timer {
                    TimerCommand::Status => None,
                    TimerCommand::Start => self.ctx.start_timer(clock),
                    TimerCommand::Pause => self.ctx.pause_timer(clock),
                    TimerCommand::Reset => {
                        self.ctx.reset_timer();
                        None
                    }
                    TimerCommand::Set(secs) => match self.ctx.set_timer_duration(clock, secs) {
                        Ok(completed) => completed,
                        Err(e) => {
                            println!("{e}");
                            None
                        }
                    },
                };
                if let Some(entry) = completed {
                    println!("Focus block complete: {} min", entry.minutes());
                }
                self.print_timer();
            }
            Command::Save => {
                let key = self.coach.save(&self.ctx)?;
                println!("Saved as {key}");
            }
            Command::Sessions => {
                let sessions = self.coach.list_sessions();
                if sessions.is_empty() {
                    println!("No saved sessions.");
                }
                for summary in sessions {
                    println!(
                        "{}  {} messages, {} focus blocks, {} progress",
                        summary.key, summary.message_count, summary.focus_blocks, summary.progress
                    );
                }
            }
            Command::Load(key) => {
                self.coach.load(&mut self.ctx, &key)?;
                println!("Loaded {key} ({} messages)", self.ctx.session().messages().len());
            }
            Command::Export { key, path } => {
                self.coach.export_to(&key, &path)?;
                println!("Exported {key} to {}", path.display());
            }
            Command::Import(path) => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                self.coach.import(&mut self.ctx, &bytes)?;
                println!("Imported session {}", self.ctx.session().id());
            }
            Command::New => {
                let key = self.coach.new_session(&mut self.ctx)?;
                println!("Previous session saved as {key}. Started a new session.");
            }
            Command::ClearArchive => {
                let removed = self.coach.clear_archive()?;
                println!("Removed {removed} saved sessions.");
            }
            Command::Progress => self.print_progress(),
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn turn(&mut self, request: TurnRequest<'_>) -> Result<()> {
        let outcome = self.coach.send_turn(&mut self.ctx, request).await?;
        println!("\nSylvia: {}\n", outcome.reply);
        Ok(())
    }

    fn print_timer(&mut self) {
        let state = self.ctx.timer_state(self.coach.clock());
        let phase = match state.phase {
            TimerPhase::Idle => "idle",
            TimerPhase::Running => "running",
            TimerPhase::Paused => "paused",
        };
        println!(
            "Timer {phase}: {} left of {}",
            format_mmss(state.remaining_seconds()),
            format_mmss(state.duration_target)
        );
    }

    fn print_progress(&self) {
        let session = self.ctx.session();
        let minutes: u64 = session.focus_log().iter().map(|e| e.minutes()).sum();
        println!(
            "Progress {}  goals {}  focus blocks {} ({minutes} min)",
            session.progress_pct(),
            session.goals_count(),
            session.focus_log().len()
        );
        if let Some(step) = self.ctx.learning_step() {
            println!("Last path step: {}. {}", step.number(), step.label());
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = load_config();
    let identity = IdentityPrompt::load(&config.identity_path());
    let coach = Coach::new(
        model_access(&config)?,
        open_store(&config),
        Arc::new(SystemClock::new()),
    )
    .with_system_instruction(identity.text())
    .with_thinking_budget(config.thinking_budget());
    let ctx = coach.new_context(config.tool_toggles());
    let mut repl = Repl { coach, ctx };

    if !repl.coach.model_access().is_available() {
        println!("No API key found; set GEMINI_API_KEY to talk to the model.");
    }
    println!("Sylvia is ready. Type a message or /help.");

    let mut lines = BufReader::new(stdin()).lines();
    let mut out = stdout();
    loop {
        out.write_all(b"> ").await?;
        out.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match commands::parse(&line) {
            Ok(command) => command,
            Err(ParseError::Empty) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        match repl.handle(command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => {
                tracing::warn!("Command failed: {e:#}");
                println!("Error: {e:#}");
            }
        }
    }

    Ok(())
}
