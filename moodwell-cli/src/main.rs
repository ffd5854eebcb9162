//! moodwell-cli - terminal client for the Moodwell HTTP API
//!
//! # Subcommands
//! - `chat [-c <conversation>] [message...]`            - one message, or an interactive session
//! - `history <conversation> [-n <limit>] [--json]`     - stored turns, oldest first
//! - `mood log <user> <category> [--note <text>]`       - record a mood
//! - `mood summary <user> [--days <n>] [--json]`        - dashboard summary
//! - `status`                                           - server health

use std::io::{BufRead, Write};

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8780";
const DEFAULT_CONVERSATION: &str = "default";
const BAR_WIDTH: usize = 20;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "moodwell-cli",
    version,
    about = "Moodwell - talk through how you feel and track your mood"
)]
struct Cli {
    /// Moodwell HTTP server URL (overrides MOODWELL_HTTP_URL env var)
    #[arg(long, env = "MOODWELL_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Send a message; with no message, read lines from stdin until EOF
    Chat {
        /// Conversation id
        #[arg(short, long, default_value = DEFAULT_CONVERSATION)]
        conversation: String,

        message: Vec<String>,
    },

    /// Show the turns stored for a conversation
    History {
        conversation: String,

        /// Only the most recent N turns
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Mood log commands
    Mood {
        #[command(subcommand)]
        command: MoodCommands,
    },

    /// Show Moodwell server status
    Status,
}

#[derive(Debug, Subcommand)]
enum MoodCommands {
    /// Record how you feel right now
    Log {
        user: String,

        /// happy, sad, anxious, calm, energetic, tired, content, stressed,
        /// optimistic or overwhelmed
        category: String,

        #[arg(long)]
        note: Option<String>,
    },

    /// Summarize the last N days
    Summary {
        user: String,

        #[arg(long, default_value_t = 7)]
        days: u32,

        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TurnReply {
    pub assistant_text: String,
    pub source: String,
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Turn {
    pub role: String,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct TurnsResponse {
    pub conversation_id: String,
    pub count: usize,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Deserialize)]
pub struct DailyMood {
    pub date: String,
    pub count: usize,
    pub dominant: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MoodSummary {
    pub days: u32,
    pub total: usize,
    pub counts: serde_json::Map<String, serde_json::Value>,
    pub dominant: Option<String>,
    pub daily: Vec<DailyMood>,
}

// ============================================================================
// Formatting
// ============================================================================

pub fn format_reply(reply: &TurnReply) -> String {
    let mut out = reply.assistant_text.clone();
    if reply.source == "local_fallback" {
        out.push_str("\n\n(offline reply)");
    }
    if let Some(w) = &reply.warning {
        out.push_str(&format!("\n\nwarning: {}", w));
    }
    out
}

/// `[HH:MM] you: text` for user turns, `[HH:MM] moodwell: text` otherwise.
pub fn format_turn(turn: &Turn) -> String {
    // RFC 3339: the time of day starts right after the 'T'
    let time = turn
        .created_at
        .split_once('T')
        .map(|(_, t)| t.chars().take(5).collect::<String>())
        .unwrap_or_default();
    let who = if turn.role == "user" { "you" } else { "moodwell" };
    format!("[{}] {}: {}", time, who, turn.text)
}

pub fn format_summary(summary: &MoodSummary) -> String {
    let mut lines = vec![format!(
        "Last {} day(s): {} entr{}, mostly {}",
        summary.days,
        summary.total,
        if summary.total == 1 { "y" } else { "ies" },
        summary.dominant.as_deref().unwrap_or("-")
    )];

    let max = summary
        .counts
        .values()
        .filter_map(|v| v.as_u64())
        .max()
        .unwrap_or(0);
    for (category, count) in &summary.counts {
        let count = count.as_u64().unwrap_or(0);
        if count == 0 {
            continue;
        }
        let width = (count as usize * BAR_WIDTH).div_ceil(max.max(1) as usize);
        lines.push(format!("  {:<12} {:>3} {}", category, count, "#".repeat(width)));
    }

    for day in summary.daily.iter().filter(|d| d.count > 0) {
        lines.push(format!(
            "  {}  {} ({})",
            day.date,
            day.dominant.as_deref().unwrap_or("-"),
            day.count
        ));
    }
    lines.join("\n")
}

/// The `error` field of an API error body, or the raw body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

/// `server` joined with percent-encoded path segments, so ids containing
/// `/`, `?` or `#` stay inside their own segment.
pub fn endpoint(server: &str, segments: &[&str]) -> anyhow::Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(server)?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("server URL cannot take a path: {}", server))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

fn check(resp: reqwest::blocking::Response) -> anyhow::Result<reqwest::blocking::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    anyhow::bail!("server returned {}: {}", status, error_message(&body))
}

fn send_message(
    client: &reqwest::blocking::Client,
    server: &str,
    conversation: &str,
    text: &str,
) -> anyhow::Result<TurnReply> {
    let url = endpoint(server, &["conversations", conversation, "messages"])?;
    let resp = client
        .post(url)
        .json(&serde_json::json!({ "text": text }))
        .send()?;
    Ok(check(resp)?.json()?)
}

fn do_chat(server: &str, conversation: &str, message: &[String]) -> anyhow::Result<()> {
    // Remote replies can take a while
    let client = client(60)?;

    if !message.is_empty() {
        let reply = send_message(&client, server, conversation, &message.join(" "))?;
        println!("{}", format_reply(&reply));
        return Ok(());
    }

    eprintln!("Chatting in '{}'. Ctrl+D to quit.", conversation);
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        match send_message(&client, server, conversation, &line) {
            Ok(reply) => println!("{}\n", format_reply(&reply)),
            Err(e) => eprintln!("moodwell-cli: {}", e),
        }
    }
    Ok(())
}

fn do_history(
    server: &str,
    conversation: &str,
    limit: Option<usize>,
    json_output: bool,
) -> anyhow::Result<()> {
    let mut url = endpoint(server, &["conversations", conversation, "turns"])?;
    if let Some(n) = limit {
        url.query_pairs_mut().append_pair("limit", &n.to_string());
    }
    let resp = check(client(10)?.get(url).send()?)?;

    if json_output {
        let body: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let history: TurnsResponse = resp.json()?;
    if history.count == 0 {
        eprintln!("No turns in conversation: {}", history.conversation_id);
        return Ok(());
    }
    for turn in &history.turns {
        println!("{}", format_turn(turn));
    }
    Ok(())
}

fn do_mood_log(
    server: &str,
    user: &str,
    category: &str,
    note: Option<String>,
) -> anyhow::Result<()> {
    let url = endpoint(server, &["moods", user])?;
    let resp = client(10)?
        .post(url)
        .json(&serde_json::json!({ "category": category, "note": note }))
        .send()?;
    let entry: serde_json::Value = check(resp)?.json()?;
    println!(
        "Logged {} for {}",
        entry["category"].as_str().unwrap_or(category),
        user
    );
    Ok(())
}

fn do_mood_summary(server: &str, user: &str, days: u32, json_output: bool) -> anyhow::Result<()> {
    let mut url = endpoint(server, &["moods", user, "summary"])?;
    url.query_pairs_mut().append_pair("days", &days.to_string());
    let resp = check(client(10)?.get(url).send()?)?;

    if json_output {
        let body: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        let summary: MoodSummary = resp.json()?;
        println!("{}", format_summary(&summary));
    }
    Ok(())
}

fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    match client(10)?.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Moodwell server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:         {}", body["version"].as_str().unwrap_or("?"));
            println!("Store:           {}", body["store"].as_str().unwrap_or("?"));
            println!("PostgreSQL:      {}", body["postgresql"].as_str().unwrap_or("-"));
            println!("Strategy:        {}", body["strategy"].as_str().unwrap_or("?"));
            println!("Persistence:     {}", body["persistence"].as_str().unwrap_or("?"));
            println!("Socket:          {}", body["socket"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            eprintln!("moodwell-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("moodwell-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Chat {
            conversation,
            message,
        } => do_chat(&server, &conversation, &message),
        Commands::History {
            conversation,
            limit,
            json,
        } => do_history(&server, &conversation, limit, json),
        Commands::Mood { command } => match command {
            MoodCommands::Log {
                user,
                category,
                note,
            } => do_mood_log(&server, &user, &category, note),
            MoodCommands::Summary { user, days, json } => {
                do_mood_summary(&server, &user, days, json)
            }
        },
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("moodwell-cli: {}", e);
        std::process::exit(1);
    }
}
