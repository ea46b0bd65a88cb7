use std::time::Duration;

use clap::{Parser, Subcommand};
use uuid::Uuid;
use wire::{Sample, Stroke};

use client::session::{ClientError, NoteSession, list_notes};

#[derive(Parser, Debug)]
#[command(name = "canvas-cli", about = "Note canvas API and websocket CLI")]
struct Cli {
    #[arg(long, env = "CANVAS_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "CANVAS_SESSION_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the server is up.
    Ping,
    /// List the caller's notes (metadata only).
    Notes,
    /// Join a note's room and log every broadcast.
    Watch { note_id: Uuid },
    /// Inject synthetic strokes into a note and wait for the save.
    Scribble {
        note_id: Uuid,
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Notes => {
            let token = cli.token.ok_or(ClientError::MissingToken)?;
            let notes = list_notes(&cli.base_url, &token).await?;
            println!("{}", serde_json::to_string_pretty(&notes)?);
            Ok(())
        }
        Command::Watch { note_id } => {
            let token = cli.token.ok_or(ClientError::MissingToken)?;
            let mut session = NoteSession::connect(&cli.base_url, &token, note_id).await?;
            session.run().await
        }
        Command::Scribble { note_id, count } => {
            let token = cli.token.ok_or(ClientError::MissingToken)?;
            run_scribble(&cli.base_url, &token, note_id, count).await
        }
    }
}

async fn run_ping(base_url: &str) -> Result<(), ClientError> {
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let response = reqwest::Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Server {
            code: format!("HTTP {}", status.as_u16()),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

async fn run_scribble(
    base_url: &str,
    token: &str,
    note_id: Uuid,
    count: usize,
) -> Result<(), ClientError> {
    let mut session = NoteSession::connect(base_url, token, note_id).await?;

    for index in 0..count {
        #[allow(clippy::cast_precision_loss)]
        let offset = 100.0 + (index as f64) * 30.0;
        let points = (0..20)
            .map(|step| {
                let t = f64::from(step) / 19.0;
                Sample::new(
                    offset + t * 200.0,
                    offset + (t * std::f64::consts::TAU).sin() * 40.0,
                    0.5 + 0.5 * t,
                )
            })
            .collect();
        session
            .engine
            .state
            .create_stroke(Stroke::new("#d94b4b", points, 4.0));
        session.mark_dirty();
    }

    session.run_until_saved(Duration::from_secs(30)).await?;
    eprintln!("scribble complete: note_id={note_id} strokes={count}");
    Ok(())
}
