use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gatewayctl")]
#[command(about = "Management CLI for the tool gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:4090")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway liveness (no key required)
    Health,
    /// Show gateway status
    Status,
    /// List tools with their resolved ports
    Tools,
    /// Resolve one tool slug to its backend port
    Resolve {
        /// Public tool slug, e.g. `sheets`
        slug: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match &cli.command {
        Commands::Health => client.get(format!("{}/_gateway/health", base)),
        Commands::Status => client.get(format!("{}/admin/status", base)).headers(headers),
        Commands::Tools => client.get(format!("{}/admin/tools", base)).headers(headers),
        Commands::Resolve { slug } => client
            .get(format!("{}/admin/tools/{}", base, slug))
            .headers(headers),
    };

    let res = request.send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
