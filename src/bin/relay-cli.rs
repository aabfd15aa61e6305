use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Management CLI for the header relay", long_about = None)]
struct Cli {
    /// Options server base URL
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    /// Bearer key, when the options API requires one
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the status indicator
    Status,
    /// Show the destination URL
    Destination,
    /// Save a new destination URL
    SetDestination { destination: String },
    /// List headers captured by a header sink
    Captured {
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        sink: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder().no_proxy().build()?;

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
    }

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/api/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Destination => {
            let res = client
                .get(format!("{}/api/destination", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::SetDestination { destination } => {
            let res = client
                .put(format!("{}/api/destination", cli.url))
                .headers(headers)
                .json(&json!({ "url": destination }))
                .send()
                .await?;
            if res.status().is_success() {
                let body: Value = res.json().await?;
                println!("{}", body["notice"]["message"].as_str().unwrap_or("Saved."));
            } else {
                print_response(res).await?;
            }
        }
        Commands::Captured { sink } => {
            let res = client.get(format!("{}/captured", sink)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
