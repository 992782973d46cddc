//! `focusmode` command-line front end.
//!
//! Every subcommand becomes one core `Action`; notices go to stderr and the
//! response envelope is printed to stdout as JSON.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use focusmode_core::{
    dispatch, init_logging, Action, AppConfig, BookDraft, BookStatus, EntityId, EntityKind,
    FocusApp, FocusTimerDraft, LoginRequest, NoteDraft, Notice, NoticeKind, RegisterRequest,
    SessionDraft, SessionStatus, TimerStatus,
};
use log::warn;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "focusmode", about = "FocusMode study tracker", version)]
struct Cli {
    /// Config file (default: per-user config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print compact JSON instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in to the FocusMode server
    Login {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        username: String,
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the saved sign-in
    Logout,
    /// Show who is signed in and which source is active
    Status,
    /// Study sessions
    #[command(subcommand)]
    Sessions(SessionCommand),
    /// Notes
    #[command(subcommand)]
    Notes(NoteCommand),
    /// Reading list
    #[command(subcommand)]
    Books(BookCommand),
    /// Focus timers
    #[command(subcommand)]
    Timers(TimerCommand),
    /// Today's study figures
    Stats,
}

#[derive(Subcommand)]
enum SessionCommand {
    List,
    Add(SessionFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: SessionFields,
        /// planned | inprogress | completed (kept as is when omitted)
        #[arg(long)]
        status: Option<String>,
    },
    Delete {
        id: String,
    },
    /// Move a planned session to in progress
    Start {
        id: String,
    },
    /// Finish an in-progress session
    Complete {
        id: String,
        /// Minutes actually studied
        #[arg(long)]
        duration: u32,
    },
}

#[derive(Args)]
struct SessionFields {
    title: String,
    subject: String,
    /// Planned minutes
    #[arg(long, default_value_t = 25)]
    duration: u32,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand)]
enum NoteCommand {
    List,
    Add(NoteFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: NoteFields,
    },
    Delete {
        id: String,
    },
}

#[derive(Args)]
struct NoteFields {
    title: String,
    #[arg(long, default_value = "")]
    content: String,
    #[arg(long)]
    category: Option<String>,
    /// Attach to a session id
    #[arg(long)]
    session: Option<String>,
}

#[derive(Subcommand)]
enum BookCommand {
    List,
    Add(BookFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: BookFields,
    },
    Delete {
        id: String,
    },
}

#[derive(Args)]
struct BookFields {
    title: String,
    #[arg(long)]
    author: Option<String>,
    /// to_read | reading | finished
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand)]
enum TimerCommand {
    List,
    Add(TimerFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: TimerFields,
    },
    Delete {
        id: String,
    },
}

#[derive(Args)]
struct TimerFields {
    label: String,
    /// Minutes
    #[arg(long, default_value_t = 25)]
    duration: u32,
    /// Attach to a session id
    #[arg(long)]
    session: Option<String>,
    /// idle | running | finished
    #[arg(long)]
    status: Option<String>,
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;

    if let Err(err) = init_logging(&config.log_level, &config.log_dir()) {
        eprintln!("warning: file logging disabled: {err}");
    }

    let action = into_action(cli.command)?;
    let mut app = FocusApp::open(config).context("opening FocusMode data")?;
    let notify = |notice: &Notice| {
        let tag = match notice.kind {
            NoticeKind::Success => "ok",
            NoticeKind::Error => "error",
        };
        eprintln!("[{tag}] {}", notice.message);
    };

    let response = dispatch(&mut app, action, &notify);
    if !response.ok {
        warn!(
            "event=cli_command module=cli status=error message={}",
            response.message
        );
    }

    let rendered = if cli.compact {
        serde_json::to_string(&response)?
    } else {
        serde_json::to_string_pretty(&response)?
    };
    println!("{rendered}");
    Ok(response.ok)
}

fn into_action(command: Command) -> Result<Action> {
    Ok(match command {
        Command::Login { email, password } => {
            let password = password_or_stdin(password)?;
            Action::Login(LoginRequest::new(&email, &password))
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let password = password_or_stdin(password)?;
            Action::Register(RegisterRequest::new(&username, &email, &password))
        }
        Command::Logout => Action::Logout,
        Command::Status => Action::Status,
        Command::Stats => Action::TodayStats,
        Command::Sessions(command) => session_action(command)?,
        Command::Notes(command) => match command {
            NoteCommand::List => Action::List(EntityKind::Note),
            NoteCommand::Add(fields) => Action::CreateNote(note_draft(fields)?),
            NoteCommand::Update { id, fields } => Action::UpdateNote {
                id: parse_id(&id)?,
                draft: note_draft(fields)?,
            },
            NoteCommand::Delete { id } => delete(EntityKind::Note, &id)?,
        },
        Command::Books(command) => match command {
            BookCommand::List => Action::List(EntityKind::Book),
            BookCommand::Add(fields) => Action::CreateBook(book_draft(fields)?),
            BookCommand::Update { id, fields } => Action::UpdateBook {
                id: parse_id(&id)?,
                draft: book_draft(fields)?,
            },
            BookCommand::Delete { id } => delete(EntityKind::Book, &id)?,
        },
        Command::Timers(command) => match command {
            TimerCommand::List => Action::List(EntityKind::FocusTimer),
            TimerCommand::Add(fields) => Action::CreateTimer(timer_draft(fields)?),
            TimerCommand::Update { id, fields } => Action::UpdateTimer {
                id: parse_id(&id)?,
                draft: timer_draft(fields)?,
            },
            TimerCommand::Delete { id } => delete(EntityKind::FocusTimer, &id)?,
        },
    })
}

fn session_action(command: SessionCommand) -> Result<Action> {
    Ok(match command {
        SessionCommand::List => Action::List(EntityKind::Session),
        SessionCommand::Add(fields) => Action::CreateSession(session_draft(fields)),
        SessionCommand::Update { id, fields, status } => {
            let mut draft = SessionDraft {
                notes: fields.notes,
                ..SessionDraft::details(fields.title, fields.subject, fields.duration)
            };
            if let Some(status) = status {
                draft.status = Some(
                    SessionStatus::parse(&status)
                        .ok_or_else(|| anyhow!("unknown session status `{status}`"))?,
                );
            }
            Action::UpdateSession {
                id: parse_id(&id)?,
                draft,
            }
        }
        SessionCommand::Delete { id } => delete(EntityKind::Session, &id)?,
        SessionCommand::Start { id } => Action::StartSession(parse_id(&id)?),
        SessionCommand::Complete { id, duration } => Action::CompleteSession {
            id: parse_id(&id)?,
            duration,
        },
    })
}

fn session_draft(fields: SessionFields) -> SessionDraft {
    SessionDraft {
        notes: fields.notes,
        ..SessionDraft::planned(fields.title, fields.subject, fields.duration)
    }
}

fn note_draft(fields: NoteFields) -> Result<NoteDraft> {
    let draft = NoteDraft::new(fields.title, fields.content, fields.category.as_deref());
    Ok(match fields.session {
        Some(session) => draft.for_session(parse_id(&session)?),
        None => draft,
    })
}

fn book_draft(fields: BookFields) -> Result<BookDraft> {
    let status = match fields.status {
        Some(status) => BookStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown book status `{status}`"))?,
        None => BookStatus::default(),
    };
    Ok(BookDraft {
        author: fields.author,
        status,
        category: fields.category,
        notes: fields.notes,
        ..BookDraft::new(fields.title)
    })
}

fn timer_draft(fields: TimerFields) -> Result<FocusTimerDraft> {
    let mut draft = FocusTimerDraft::new(fields.label, fields.duration);
    if let Some(session) = fields.session {
        draft.session_id = Some(parse_id(&session)?);
    }
    if let Some(status) = fields.status {
        draft.status = TimerStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown timer status `{status}`"))?;
    }
    Ok(draft)
}

fn delete(kind: EntityKind, id: &str) -> Result<Action> {
    Ok(Action::Delete {
        kind,
        id: parse_id(id)?,
    })
}

fn parse_id(value: &str) -> Result<EntityId> {
    EntityId::parse(value)
        .ok_or_else(|| anyhow!("`{value}` is neither a server id nor a local UUID"))
}

fn password_or_stdin(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("password cannot be empty");
    }
    Ok(password)
}
