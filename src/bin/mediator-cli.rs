use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "mediator-cli")]
#[command(about = "Send requests to and inspect a running tx-mediator", long_about = None)]
struct Cli {
    /// Base URL of the HTTP facade.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Base URL of the admin API.
    #[arg(short, long, default_value = "http://localhost:8081")]
    admin_url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one request and print the reply
    Send {
        /// Value of the `user` header
        #[arg(long)]
        user: String,
        /// Request body
        #[arg(long, default_value = "<request/>")]
        body: String,
        /// Caller deadline in milliseconds
        #[arg(long)]
        deadline_ms: Option<u64>,
    },
    /// Show mediator status
    Status,
    /// Show delivery and reply counters
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Send { user, body, deadline_ms } => {
            let mut request = client
                .post(format!("{}/requests", cli.url))
                .header("user", user)
                .body(body);
            if let Some(ms) = deadline_ms {
                request = request.header("x-deadline-ms", ms.to_string());
            }

            let started = std::time::Instant::now();
            let res = request.send().await?;
            let status = res.status();
            let reply_status = res
                .headers()
                .get("x-reply-status")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();
            let text = res.text().await?;

            println!("HTTP {} ({}) in {:?}", status, reply_status, round(started.elapsed()));
            println!("{}", text);
        }
        Commands::Status => {
            admin_get(&client, &cli.admin_url, &cli.key, "/admin/status").await?;
        }
        Commands::Stats => {
            admin_get(&client, &cli.admin_url, &cli.key, "/admin/stats").await?;
        }
    }

    Ok(())
}

fn round(elapsed: Duration) -> Duration {
    Duration::from_millis(elapsed.as_millis() as u64)
}

async fn admin_get(
    client: &reqwest::Client,
    base: &str,
    key: &str,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);

    let res = client.get(format!("{}{}", base, path)).headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
