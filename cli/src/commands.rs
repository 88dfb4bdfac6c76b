//! Line-oriented command parsing.
//!
//! Anything not starting with `/` is a plain message. Coaching actions take
//! optional trailing text that is sent along with the nudge.

use std::path::PathBuf;

use sylvia_engine::{NudgeKey, SnapshotKey, TimerPreset};
use thiserror::Error;

pub const HELP: &str = "\
Coaching actions (optional text after the command is sent too):
  /goal /task /strategies /time /resources /reflect /feedback /bookmark
Context:
  /attach <name> <mime> <bytes> [upload-id]   register a file reference
  /detach <id>                                 remove a file reference
  /files                                       list file references
  /url <text>                                  set URL context (one URL per line)
  /url-clear                                   clear URL context
  /search on|off   /code on|off   /temp <0.0-2.0>   /max-tokens <n>
Focus timer:
  /timer [status|start|pause|reset|set <minutes|25|15|5>]
Sessions:
  /save   /sessions   /load <key>   /export <key> <path>   /import <path>
  /new    /clear-archive   /progress
Other:
  /help   /quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Message(String),
    Nudge { key: NudgeKey, text: String },
    Attach {
        name: String,
        mime_type: String,
        size_bytes: u64,
        upload_id: Option<String>,
    },
    Detach(String),
    Files,
    Url(String),
    UrlClear,
    Search(bool),
    CodeExecution(bool),
    Temperature(f64),
    MaxTokens(u32),
    Timer(TimerCommand),
    Save,
    Sessions,
    Load(SnapshotKey),
    Export { key: SnapshotKey, path: PathBuf },
    Import(PathBuf),
    New,
    ClearArchive,
    Progress,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Status,
    Start,
    Pause,
    Reset,
    Set(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("nothing to send")]
    Empty,
    #[error("unknown command /{0} (try /help)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Slash command to nudge key.
const NUDGE_COMMANDS: &[(&str, &str)] = &[
    ("goal", "goal"),
    ("task", "taskanalysis"),
    ("strategies", "learning strategies"),
    ("time", "time management"),
    ("resources", "resources"),
    ("reflect", "reflection"),
    ("feedback", "feedback"),
    ("bookmark", "save"),
];

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Message(line.to_string()));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    if let Some((_, key)) = NUDGE_COMMANDS.iter().find(|(cmd, _)| *cmd == name) {
        return Ok(Command::Nudge {
            key: NudgeKey::new(*key),
            text: args.to_string(),
        });
    }

    match name {
        "attach" => parse_attach(args),
        "detach" => required(args, "/detach <id>").map(|id| Command::Detach(id.to_string())),
        "files" => Ok(Command::Files),
        "url" => required(args, "/url <text>").map(|text| Command::Url(text.to_string())),
        "url-clear" => Ok(Command::UrlClear),
        "search" => parse_switch(args, "/search on|off").map(Command::Search),
        "code" => parse_switch(args, "/code on|off").map(Command::CodeExecution),
        "temp" => parse_temperature(args),
        "max-tokens" => args
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .map(Command::MaxTokens)
            .ok_or(ParseError::Usage("/max-tokens <n>")),
        "timer" => parse_timer(args).map(Command::Timer),
        "save" => Ok(Command::Save),
        "sessions" => Ok(Command::Sessions),
        "load" => parse_key(args, "/load <key>").map(Command::Load),
        "export" => parse_export(args),
        "import" => required(args, "/import <path>").map(|p| Command::Import(PathBuf::from(p))),
        "new" => Ok(Command::New),
        "clear-archive" => Ok(Command::ClearArchive),
        "progress" => Ok(Command::Progress),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

fn required<'a>(args: &'a str, usage: &'static str) -> Result<&'a str, ParseError> {
    if args.is_empty() {
        Err(ParseError::Usage(usage))
    } else {
        Ok(args)
    }
}

fn parse_switch(args: &str, usage: &'static str) -> Result<bool, ParseError> {
    match args.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(ParseError::Usage(usage)),
    }
}

fn parse_temperature(args: &str) -> Result<Command, ParseError> {
    args.parse::<f64>()
        .ok()
        .filter(|t| (0.0..=2.0).contains(t))
        .map(Command::Temperature)
        .ok_or(ParseError::Usage("/temp <0.0-2.0>"))
}

fn parse_key(args: &str, usage: &'static str) -> Result<SnapshotKey, ParseError> {
    SnapshotKey::parse(args).map_err(|_| ParseError::Usage(usage))
}

fn parse_attach(args: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "/attach <name> <mime> <bytes> [upload-id]";
    let mut parts = args.split_whitespace();
    let (Some(name), Some(mime_type), Some(size)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::Usage(USAGE));
    };
    let size_bytes = size.parse().map_err(|_| ParseError::Usage(USAGE))?;
    let upload_id = parts.next().map(str::to_string);
    if parts.next().is_some() {
        return Err(ParseError::Usage(USAGE));
    }
    Ok(Command::Attach {
        name: name.to_string(),
        mime_type: mime_type.to_string(),
        size_bytes,
        upload_id,
    })
}

fn parse_export(args: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "/export <key> <path>";
    let Some((key, path)) = args.split_once(char::is_whitespace) else {
        return Err(ParseError::Usage(USAGE));
    };
    let path = path.trim();
    if path.is_empty() {
        return Err(ParseError::Usage(USAGE));
    }
    Ok(Command::Export {
        key: parse_key(key, USAGE)?,
        path: PathBuf::from(path),
    })
}

fn parse_timer(args: &str) -> Result<TimerCommand, ParseError> {
    const USAGE: &str = "/timer [status|start|pause|reset|set <minutes>]";
    let mut parts = args.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (None | Some("status"), None, None) => Ok(TimerCommand::Status),
        (Some("start"), None, None) => Ok(TimerCommand::Start),
        (Some("pause"), None, None) => Ok(TimerCommand::Pause),
        (Some("reset"), None, None) => Ok(TimerCommand::Reset),
        (Some("set"), Some(raw), None) => TimerPreset::parse(raw)
            .map(TimerPreset::seconds)
            .or_else(|| {
                raw.parse::<u64>()
                    .ok()
                    .filter(|m| *m > 0)
                    .map(|m| m.saturating_mul(60))
            })
            .map(TimerCommand::Set)
            .ok_or(ParseError::Usage(USAGE)),
        _ => Err(ParseError::Usage(USAGE)),
    }
}
