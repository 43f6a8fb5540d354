use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Admin CLI for the API gateway", long_about = None)]
struct Cli {
    /// Admin listener base URL
    #[arg(short, long, env = "GATEWAY_ADMIN_URL", default_value = "http://127.0.0.1:8081")]
    url: String,

    /// Admin transport bearer token
    #[arg(short, long, env = "GATEWAY_ADMIN_API_KEY")]
    key: String,

    /// Identity the command is issued as; must be listed in admin.identities
    #[arg(short, long, env = "GATEWAY_ADMIN_IDENTITY", default_value = "cli")]
    identity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gateway status and usage totals
    Status,
    /// Show request and visitor totals
    Stats,
    /// Show the live key of an account
    Key { account: String },
    /// Issue a key for an account (no-op if it has one)
    Issue { account: String },
    /// Replace the key of an account, keeping the old one in history
    Rotate { account: String },
    /// List every key an account was issued
    History { account: String },
    /// Delete an account and its keys
    Delete { account: String },
    /// Delete every account
    DeleteAll,
}

impl Commands {
    /// The admin channel command text, or None for plain endpoints.
    fn text(&self) -> Option<String> {
        match self {
            Commands::Status => None,
            Commands::Stats => Some("/stats".to_string()),
            Commands::Key { account } => Some(format!("/key {}", account)),
            Commands::Issue { account } => Some(format!("/issue {}", account)),
            Commands::Rotate { account } => Some(format!("/rotate {}", account)),
            Commands::History { account } => Some(format!("/history {}", account)),
            Commands::Delete { account } => Some(format!("/delete {}", account)),
            Commands::DeleteAll => Some("/deleteall".to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command.text() {
        None => {
            client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Some(text) => {
            client
                .post(format!("{}/admin/commands", cli.url))
                .headers(headers)
                .json(&json!({ "identity": cli.identity, "text": text }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let body: Value = match res.text().await {
        Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        Err(e) => return Err(e.into()),
    };

    // Command replies are human-readable text; show them as such.
    let envelope_only =
        body.get("result").is_some() && body.as_object().map_or(0, |o| o.len()) == 2;
    let rendered = match body.get("message").and_then(Value::as_str) {
        Some(message) if envelope_only => message.to_string(),
        _ => serde_json::to_string_pretty(&body)?,
    };

    if status.is_success() {
        println!("{}", rendered);
    } else {
        eprintln!("Error: admin API returned status {}", status);
        eprintln!("{}", rendered);
    }
    Ok(())
}
