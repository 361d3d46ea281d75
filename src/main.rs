//! `buddy` - command-line front end for the study assistant
//!
//! # Commands
//! - `ask`: answer one question, optionally with an attached document
//! - `chat`: line-by-line conversation on stdin (`/attach <path> [question]`)
//! - `scan`: list the catalog topics a document covers
//! - `topics`: print the catalog glossary by semester, or one topic in full
//! - `batch`: match one query per stdin line, JSON lines on stdout
//! - `forget`: delete the user's stored session memory
//!
//! Replies go to stdout; logs go to stderr and follow `RUST_LOG`.

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::borrow::Cow;
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use study_buddy::config::API_KEY_ENV;
use study_buddy::extract::{extract_text, DocumentExtractor};
use study_buddy::format;
use study_buddy::llm::HttpChatBackend;
use study_buddy::{
    match_batch, scan, score_batch, Assistant, BuddyError, Catalog, CatalogSource, Config, Reply,
    ReplyKind, Session, SessionStore, Turn,
};
use tracing::{debug, error, info, warn};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "buddy", version, about = "Offline study assistant for CS concepts")]
struct Cli {
    /// Catalog to use: `lite`, `cs` or a path to a catalog JSON file
    #[arg(long, global = true)]
    catalog: Option<String>,

    /// Config file (defaults to <config_dir>/study-buddy/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// User whose session memory is loaded and updated
    #[arg(long, short, global = true, default_value = "default")]
    user: String,

    /// Keep learned documents in memory only for this run
    #[arg(long, global = true)]
    no_memory: bool,

    /// API key for the AI backend (overrides config and environment)
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Answer a single question
    Ask {
        /// Document to attach to the question
        #[arg(long, short)]
        attach: Option<PathBuf>,

        /// The question
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Interactive conversation on stdin
    Chat,
    /// List catalog topics found in a document
    Scan {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },
    /// Print the catalog glossary, or the full entry for one topic
    Topics {
        /// Topic to show, e.g. `binary search`
        name: Vec<String>,

        #[arg(long)]
        json: bool,
    },
    /// Match one query per stdin line and print JSON lines
    Batch {
        /// Print every topic's score instead of the best match
        #[arg(long)]
        all: bool,
    },
    /// Delete the stored session memory of --user
    Forget,
}

#[derive(Debug, Serialize)]
struct ScanOutput<'a> {
    source: &'a str,
    topics: Vec<String>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    // Initialize tracing if RUST_LOG is set
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("Error: {}", e);
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), BuddyError> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?.with_env_key(std::env::var(API_KEY_ENV).ok());
    debug!("Config from {:?}: endpoint={}, model={}", config_path, config.endpoint(), config.model());

    let source: CatalogSource = match cli.catalog.as_deref().or(config.catalog.as_deref()) {
        Some(name) => name.parse().unwrap_or_default(),
        None => CatalogSource::default(),
    };
    let catalog = source.load()?;
    info!("Using catalog {} with {} concepts", catalog.version, catalog.len());

    match &cli.command {
        Command::Ask { attach, query } => {
            let mut session = open_session(&cli, &config)?;
            let assistant = build_assistant(&catalog, &session, &config);
            let turn = build_turn(&query.join(" "), attach.as_deref())?;
            let reply = assistant.respond(&mut session, &turn);
            print_reply(&mut io::stdout().lock(), &reply).map_err(BuddyError::OutputWrite)?;
        }
        Command::Chat => {
            let mut session = open_session(&cli, &config)?;
            let assistant = build_assistant(&catalog, &session, &config);
            eprintln!("{}", "Ask away. /attach <path> [question] shares a document, /quit leaves.".dimmed());
            chat_loop(&assistant, &mut session, io::stdin().lock(), &mut io::stdout().lock())?;
        }
        Command::Scan { file, json } => run_scan(&catalog, file, *json)?,
        Command::Topics { name, json } => {
            let name = name.join(" ");
            if name.trim().is_empty() {
                run_glossary(&catalog, *json)?
            } else {
                run_topic(&catalog, &name, *json)?
            }
        }
        Command::Batch { all } => run_batch(&catalog, *all)?,
        Command::Forget => {
            let store = SessionStore::new(memory_dir(&config)?);
            if store.forget(&cli.user)? {
                println!("Forgot everything learned for {}", cli.user);
            } else {
                println!("Nothing stored for {}", cli.user);
            }
        }
    }

    Ok(())
}

// ============================================================================
// Session & Assistant Wiring
// ============================================================================

fn memory_dir(config: &Config) -> Result<PathBuf, BuddyError> {
    match &config.memory_dir {
        Some(dir) => Ok(dir.clone()),
        None => SessionStore::default_dir(),
    }
}

fn open_session(cli: &Cli, config: &Config) -> Result<Session, BuddyError> {
    let session = if cli.no_memory {
        Session::ephemeral(cli.user.as_str())
    } else {
        Session::open(SessionStore::new(memory_dir(config)?), cli.user.as_str())?
    };
    let api_key = cli.api_key.clone().or_else(|| config.api_key.clone());
    Ok(session.with_api_key(api_key))
}

fn build_assistant<'c>(catalog: &'c Cow<'static, Catalog>, session: &Session, config: &Config) -> Assistant<'c> {
    let assistant = Assistant::new(catalog.as_ref());
    if session.api_key.is_some() {
        info!("AI backend enabled ({})", config.model());
        assistant.with_backend(Box::new(HttpChatBackend::new(config.endpoint(), config.model())))
    } else {
        assistant
    }
}

fn build_turn(query: &str, attach: Option<&Path>) -> Result<Turn, BuddyError> {
    match attach {
        None => Ok(Turn::text(query)),
        Some(path) => {
            let bytes = fs::read(path).map_err(|e| BuddyError::AttachmentRead {
                path: path.to_path_buf(),
                source: e,
            })?;
            Ok(Turn::with_attachment(query, display_name(path), bytes))
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Commands
// ============================================================================

/// One reply per non-empty input line until `/quit` or end of input.
///
/// A line that is not valid UTF-8 is skipped with a warning; the session
/// carries on with the next line.
fn chat_loop<R: BufRead, W: Write>(
    assistant: &Assistant<'_>,
    session: &mut Session,
    input: R,
    out: &mut W,
) -> Result<(), BuddyError> {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("Skipping chat line: {}", e);
                eprintln!("{} input line was not valid UTF-8, skipped", "warning:".yellow().bold());
                continue;
            }
            Err(e) => return Err(BuddyError::StdinRead(e)),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }

        let turn = match line.strip_prefix("/attach ") {
            Some(rest) => {
                let (path, question) = rest.trim().split_once(' ').unwrap_or((rest.trim(), ""));
                match build_turn(question, Some(Path::new(path))) {
                    Ok(turn) => turn,
                    Err(e) => {
                        eprintln!("{} {}", "error:".red().bold(), e);
                        continue;
                    }
                }
            }
            None => Turn::text(line),
        };

        print_reply(out, &assistant.respond(session, &turn)).map_err(BuddyError::OutputWrite)?;
    }
    Ok(())
}

fn print_reply<W: Write>(out: &mut W, reply: &Reply) -> io::Result<()> {
    let tag = match &reply.kind {
        ReplyKind::Concept(_) | ReplyKind::Backend => "buddy>".green(),
        ReplyKind::Checklist | ReplyKind::FragmentHit => "buddy>".cyan(),
        ReplyKind::Greeting => "buddy>".blue(),
        ReplyKind::DocumentNoted | ReplyKind::Fallback => "buddy>".yellow(),
        ReplyKind::BackendError => "buddy>".red(),
    };
    writeln!(out, "{} {}\n", tag.bold(), reply.text)
}

fn run_scan(catalog: &Catalog, file: &Path, json: bool) -> Result<(), BuddyError> {
    let bytes = fs::read(file).map_err(|e| BuddyError::AttachmentRead {
        path: file.to_path_buf(),
        source: e,
    })?;
    let name = display_name(file);
    let topics = extract_text(&DocumentExtractor::default(), &name, &bytes)
        .map(|text| scan(&text, catalog))
        .unwrap_or_default();

    if json {
        let output = ScanOutput {
            source: &name,
            topics,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if topics.is_empty() {
        println!("No known topics found in \"{}\".", name);
    } else {
        println!("{}", format::render_checklist(&name, &topics));
    }
    Ok(())
}

fn run_glossary(catalog: &Catalog, json: bool) -> Result<(), BuddyError> {
    let glossary = catalog.glossary();
    if json {
        println!("{}", serde_json::to_string(&glossary)?);
        return Ok(());
    }

    println!("{} ({})", "Catalog".bold(), catalog.version);
    for section in glossary {
        println!("\n{}", section.semester.bold().underline());
        for topic in section.topics {
            println!("  - {}", topic);
        }
    }
    Ok(())
}

fn run_topic(catalog: &Catalog, name: &str, json: bool) -> Result<(), BuddyError> {
    let record = catalog
        .find_topic(name)
        .ok_or_else(|| BuddyError::TopicNotFound(name.trim().to_string()))?;
    if json {
        println!("{}", serde_json::to_string(record)?);
    } else {
        println!("{}", format::render_concept(record));
    }
    Ok(())
}

fn run_batch(catalog: &Catalog, all: bool) -> Result<(), BuddyError> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    let queries: Vec<&str> = input.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    if all {
        print_json_lines(&score_batch(&queries, catalog))
    } else {
        print_json_lines(&match_batch(&queries, catalog))
    }
}

fn print_json_lines<T: Serialize>(items: &[T]) -> Result<(), BuddyError> {
    for item in items {
        println!("{}", serde_json::to_string(item)?);
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use study_buddy::BuiltinCatalog;

    fn chat(input: &[u8]) -> String {
        let assistant = Assistant::new(BuiltinCatalog::Lite.catalog());
        let mut session = Session::ephemeral("chat-test");
        let mut out = Vec::new();
        chat_loop(&assistant, &mut session, Cursor::new(input.to_vec()), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_chat_skips_invalid_utf8_line() {
        let out = chat(b"stack\n\xff\xfe broken\nwhat is paging\n");
        assert_eq!(out.matches("buddy>").count(), 2);
        assert!(out.contains("## Stack vs Queue"));
        assert!(out.contains("## Memory Management"));
    }

    #[test]
    fn test_chat_stops_at_quit_and_ignores_blank_lines() {
        let out = chat(b"\n   \nstack\n/quit\nwhat is binary search\n");
        assert_eq!(out.matches("buddy>").count(), 1);
        assert!(!out.contains("phone book"));
    }

    #[test]
    fn test_chat_reports_missing_attachment_and_continues() {
        let out = chat(b"/attach /no/such/file.txt summarize\nstack\n");
        assert_eq!(out.matches("buddy>").count(), 1);
        assert!(out.contains("Stack vs Queue"));
    }

    #[test]
    fn test_topic_lookup_unknown_name_is_an_error() {
        let lite = BuiltinCatalog::Lite.catalog();
        assert!(run_topic(lite, "binary search", false).is_ok());
        let err = run_topic(lite, "quantum computing", false).unwrap_err();
        assert!(matches!(err, BuddyError::TopicNotFound(ref name) if name == "quantum computing"));
    }
}
