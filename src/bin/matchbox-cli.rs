use clap::{Parser, Subcommand};
use serde_json::Value;

use matchbox_gateway::governor::{govern, DEFAULT_MAX_CHARS};

#[derive(Parser)]
#[command(name = "matchbox-cli")]
#[command(about = "Query a running Matchbox gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Truncate printed output beyond this many characters
    #[arg(short, long, default_value_t = DEFAULT_MAX_CHARS)]
    max_chars: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every service now
    Health,
    /// Collect metrics for all services, or one
    Metrics { service: Option<String> },
    /// Last scheduled health and metrics snapshot
    Status,
    /// List the service catalogue
    Services,
}

impl Commands {
    fn path(&self) -> String {
        match self {
            Commands::Health => "/api/health".to_string(),
            Commands::Metrics { service: None } => "/api/metrics".to_string(),
            Commands::Metrics {
                service: Some(service),
            } => format!("/api/{service}"),
            Commands::Status => "/api/status".to_string(),
            Commands::Services => "/api/services".to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.command.path());
    let res = client.get(url).send().await?;
    print_response(res, cli.max_chars).await
}

async fn print_response(res: reqwest::Response, max_chars: usize) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    // Error bodies from the gateway are JSON too; print them the same way.
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => govern(&json, max_chars).text,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{rendered}");
    } else {
        eprintln!("Error: gateway returned status {status}");
        eprintln!("{rendered}");
        std::process::exit(1);
    }
    Ok(())
}
