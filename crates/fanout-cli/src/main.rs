//! Fanout CLI - command line client for the fanout server.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

/// Fanout CLI - prompt dispatch client
#[derive(Parser)]
#[command(name = "fanout")]
#[command(about = "CLI for the fanout supervisor server", long_about = None)]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = "http://127.0.0.1:8000")]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a prompt and wait for the aggregated response
    Prompt {
        /// Prompt text
        text: String,

        /// URL to fan out over the scraper workers (repeatable)
        #[arg(short, long)]
        url: Vec<String>,

        /// Session id, reused as the run id
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Send a prompt and print run events as they arrive
    Stream {
        /// Prompt text
        text: String,

        /// URL to fan out over the scraper workers (repeatable)
        #[arg(short, long)]
        url: Vec<String>,

        /// Session id, reused as the run id
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Prompt { text, url, session } => {
            prompt(&client, &cli.addr, text, url, session).await?;
        }
        Commands::Stream { text, url, session } => {
            stream(&client, &cli.addr, text, url, session).await?;
        }
        Commands::Health => {
            health(&client, &cli.addr).await?;
        }
    }

    Ok(())
}

fn request_body(text: String, urls: Vec<String>, session: Option<String>) -> Value {
    let mut body = json!({ "prompt": text, "urls": urls });
    if let Some(session) = session {
        body["session_id"] = Value::String(session);
    }
    body
}

async fn prompt(
    client: &reqwest::Client,
    addr: &str,
    text: String,
    urls: Vec<String>,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = client
        .post(format!("{addr}/agent/prompt"))
        .json(&request_body(text, urls, session))
        .send()
        .await?;

    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() {
        eprintln!(
            "error ({status}): {}",
            body["error"].as_str().unwrap_or("unknown")
        );
        std::process::exit(1);
    }

    if body["partial"].as_bool().unwrap_or(false) {
        eprintln!("warning: run deadline exceeded, response is partial");
    }
    println!("{}", body["response"].as_str().unwrap_or_default());
    if let Some(order_id) = body["order_id"].as_str() {
        println!("order_id: {order_id}");
    }

    Ok(())
}

async fn stream(
    client: &reqwest::Client,
    addr: &str,
    text: String,
    urls: Vec<String>,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut response = client
        .post(format!("{addr}/agent/prompt/stream"))
        .json(&request_body(text, urls, session))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body: Value = response.json().await?;
        eprintln!(
            "error ({status}): {}",
            body["error"].as_str().unwrap_or("unknown")
        );
        std::process::exit(1);
    }

    // Frames are newline-delimited JSON; chunks can split mid-line.
    let mut buffer = String::new();
    while let Some(chunk) = response.chunk().await? {
        buffer.push_str(&String::from_utf8_lossy(&chunk));
        while let Some(pos) = buffer.find('\n') {
            let line: String = buffer.drain(..=pos).collect();
            let line = line.trim();
            if !line.is_empty() {
                print_frame(line);
            }
        }
    }

    Ok(())
}

fn print_frame(line: &str) {
    match serde_json::from_str::<Value>(line) {
        Ok(frame) => {
            if let Some(error) = frame["error"].as_str() {
                println!("run failed: {error}");
            } else if let Some(text) = frame["response"].as_str() {
                println!("final: {text}");
            } else {
                let event = &frame["response"];
                match event["type"].as_str() {
                    Some("task_completed") => println!(
                        "[{}] attempt {}: {}",
                        event["worker"].as_str().unwrap_or("?"),
                        event["attempt"],
                        event["result"].as_str().unwrap_or_default()
                    ),
                    Some("task_failed") => println!(
                        "[{}] failed after {} attempts: {}",
                        event["worker"].as_str().unwrap_or("?"),
                        event["attempts"],
                        event["error"].as_str().unwrap_or_default()
                    ),
                    _ => println!("{line}"),
                }
            }
        }
        Err(_) => println!("{line}"),
    }
}

async fn health(client: &reqwest::Client, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let response = client.get(format!("{addr}/health")).send().await?;
    let status = response.status();
    let body: Value = response.json().await?;
    println!("{status}: {}", body["status"].as_str().unwrap_or("unknown"));
    Ok(())
}
