//! scribe-cli — command-line client for the Scribe session-note API
//!
//! # Subcommands
//! - `create --duration <min> --session-type <type> --notes <text>` — store a draft, print the generated note
//! - `finalize <id> --final-note <text>`                              — store the clinician's final note
//! - `show <id>`                                                      — print a note and its status
//! - `status`                                                         — show server health

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "scribe-cli",
    version,
    about = "Create, finalize and inspect clinical session notes"
)]
struct Cli {
    /// Scribe HTTP server URL (overrides SCRIBE_HTTP_URL env var)
    #[arg(long, env = "SCRIBE_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// Print raw JSON response bodies
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit a draft note and print the generated clinical note
    Create {
        /// Session length in minutes
        #[arg(long)]
        duration: i32,

        /// Session type, e.g. "individual" or "group"
        #[arg(long)]
        session_type: String,

        /// Draft note text
        #[arg(long)]
        notes: String,
    },

    /// Store the clinician-approved final note
    Finalize {
        /// Note id returned by `create`
        id: i64,

        /// Final note text
        #[arg(long)]
        final_note: String,
    },

    /// Show a stored note
    Show {
        id: i64,
    },

    /// Show Scribe server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateResponse {
    pub note_id: i64,
    pub generated_note: String,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeResponse {
    pub note_id: i64,
    pub final_note: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteView {
    pub id: i64,
    pub session_duration: i32,
    pub session_type: String,
    pub status: String,
    pub draft_note: String,
    pub generated_note: Option<String>,
    pub final_note: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Human-readable rendering of a stored note.
pub fn render_note(note: &NoteView) -> String {
    let mut out = format!(
        "Note #{} [{}]\nSession:   {} ({} min)\nCreated:   {}\n",
        note.id, note.status, note.session_type, note.session_duration, note.created_at
    );
    if let Some(updated) = &note.updated_at {
        out.push_str(&format!("Updated:   {}\n", updated));
    }
    out.push_str(&format!("\nDraft:\n{}\n", note.draft_note));
    if let Some(generated) = &note.generated_note {
        out.push_str(&format!("\nGenerated:\n{}\n", generated));
    }
    if let Some(final_note) = &note.final_note {
        out.push_str(&format!("\nFinal:\n{}\n", final_note));
    }
    out
}

/// Pull the server's error message out of an error body, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

/// Send a request and return the response body text, exiting on transport or HTTP errors.
fn send(req: reqwest::blocking::RequestBuilder, url: &str) -> anyhow::Result<String> {
    let resp = match req.send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("scribe-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    if !status.is_success() {
        eprintln!("scribe-cli: server returned {}: {}", status, error_message(&body));
        std::process::exit(1);
    }
    Ok(body)
}

fn do_create(
    server: &str,
    json_output: bool,
    duration: i32,
    session_type: &str,
    notes: &str,
) -> anyhow::Result<()> {
    // Generation can take a while on the server side
    let client = client(120)?;
    let url = format!("{}/session-notes/", server);
    let body = serde_json::json!({
        "session_duration": duration,
        "session_type": session_type,
        "notes": notes,
    });

    let text = send(client.post(&url).json(&body), &url)?;
    if json_output {
        println!("{}", text);
        return Ok(());
    }

    let resp: CreateResponse = serde_json::from_str(&text)?;
    println!("Note #{} generated:\n\n{}", resp.note_id, resp.generated_note);
    Ok(())
}

fn do_finalize(server: &str, json_output: bool, id: i64, final_note: &str) -> anyhow::Result<()> {
    let client = client(30)?;
    let url = format!("{}/session-notes/{}", server, id);
    let body = serde_json::json!({ "final_note": final_note });

    let text = send(client.patch(&url).json(&body), &url)?;
    if json_output {
        println!("{}", text);
        return Ok(());
    }

    let resp: FinalizeResponse = serde_json::from_str(&text)?;
    println!("Note #{} finalized.", resp.note_id);
    println!("\n{}", resp.final_note);
    Ok(())
}

fn do_show(server: &str, json_output: bool, id: i64) -> anyhow::Result<()> {
    let client = client(30)?;
    let url = format!("{}/session-notes/{}", server, id);

    let text = send(client.get(&url), &url)?;
    if json_output {
        println!("{}", text);
        return Ok(());
    }

    let note: NoteView = serde_json::from_str(&text)?;
    print!("{}", render_note(&note));
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let client = client(10)?;

    let url = format!("{}/health", server);
    let resp = client.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Scribe server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:       {}", body["version"].as_str().unwrap_or("?"));
            println!("Store:         {}", body["store"].as_str().unwrap_or("?"));
            println!("Database:      {}", body["database"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("scribe-cli: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("scribe-cli: cannot reach {} — {}", url, e);
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
        Commands::Create {
            duration,
            session_type,
            notes,
        } => do_create(&server, cli.json, duration, &session_type, &notes),
        Commands::Finalize { id, final_note } => do_finalize(&server, cli.json, id, &final_note),
        Commands::Show { id } => do_show(&server, cli.json, id),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("scribe-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn note_json() -> serde_json::Value {
        serde_json::json!({
            "id": 1,
            "session_duration": 50,
            "session_type": "individual",
            "draft_note": "Client engaged in...",
            "generated_note": "Processed: Client engaged in...",
            "final_note": null,
            "created_at": "2026-10-19T10:00:00Z",
            "updated_at": "2026-10-19T10:00:03Z",
            "status": "generated"
        })
    }

    #[test]
    fn test_note_view_parses_server_body() {
        let note: NoteView = serde_json::from_value(note_json()).unwrap();
        assert_eq!(note.id, 1);
        assert_eq!(note.status, "generated");
        assert!(note.final_note.is_none());
    }

    #[test]
    fn test_render_note_sections() {
        let note: NoteView = serde_json::from_value(note_json()).unwrap();
        let text = render_note(&note);

        assert!(text.starts_with("Note #1 [generated]"));
        assert!(text.contains("individual (50 min)"));
        assert!(text.contains("Draft:\nClient engaged in..."));
        assert!(text.contains("Generated:\nProcessed: Client engaged in..."));
        assert!(!text.contains("Final:"));
    }

    #[test]
    fn test_render_draft_only_note() {
        let mut v = note_json();
        v["generated_note"] = serde_json::Value::Null;
        v["updated_at"] = serde_json::Value::Null;
        v["status"] = serde_json::json!("draft");
        let note: NoteView = serde_json::from_value(v).unwrap();
        let text = render_note(&note);

        assert!(!text.contains("Generated:"));
        assert!(!text.contains("Updated:"));
    }

    #[test]
    fn test_error_message_extracts_error_field() {
        let body = r#"{"error":"Session note 999 not found","status":"error"}"#;
        assert_eq!(error_message(body), "Session note 999 not found");
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_cli_parses_create() {
        let cli = Cli::try_parse_from([
            "scribe-cli",
            "create",
            "--duration",
            "50",
            "--session-type",
            "individual",
            "--notes",
            "Client engaged in...",
        ])
        .unwrap();

        match cli.command {
            Commands::Create { duration, session_type, notes } => {
                assert_eq!(duration, 50);
                assert_eq!(session_type, "individual");
                assert_eq!(notes, "Client engaged in...");
            }
            other => panic!("Expected Create, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_finalize_with_global_json() {
        let cli = Cli::try_parse_from([
            "scribe-cli",
            "finalize",
            "1",
            "--final-note",
            "Reviewed and approved.",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Finalize { id: 1, .. }));
    }
}
