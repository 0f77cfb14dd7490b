//! Tool gateway.
//!
//! Serves several independently running tool backends behind one origin
//! under `/proxy/{slug}/` and `/_proxy/{slug}/`.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                  TOOL GATEWAY                    │
//!                        │                                                  │
//!   Client Request       │  ┌─────────┐   ┌──────────┐   ┌──────────────┐   │
//!   ─────────────────────┼─▶│  http   │──▶│ routing  │──▶│  security    │   │
//!                        │  │ server  │   │ resolver │   │  auth gate   │   │
//!                        │  └─────────┘   └──────────┘   └──────┬───────┘   │
//!                        │                                      │           │
//!                        │                                      ▼           │
//!   Client Response      │  ┌─────────┐   ┌──────────┐   ┌──────────────┐   │
//!   ◀────────────────────┼──│response │◀──│ rewrite  │◀──│  forwarder   │◀──┼── Tool backend
//!                        │  │finalize │   │html / ws │   │ (per-class   │   │   (127.0.0.1:port)
//!                        │  └─────────┘   └──────────┘   │  timeouts)   │   │
//!                        │                               └──────────────┘   │
//!                        │  ┌────────────────────────────────────────────┐  │
//!                        │  │ config · observability · lifecycle · admin │  │
//!                        │  └────────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use tool_gateway::lifecycle::startup;

#[derive(Parser)]
#[command(name = "tool-gateway")]
#[command(about = "Path-based gateway for internal tool backends", long_about = None)]
struct Cli {
    /// TOML configuration file. Compiled-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match startup::run(cli.config.as_deref()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway failed");
            eprintln!("tool-gateway: {}", e);
            ExitCode::FAILURE
        }
    }
}
