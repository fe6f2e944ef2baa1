use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use serde_json::{json, Value};

use scope_gateway::config::loader::ENV_VARS;
use scope_gateway::http::{SseDecoder, StreamEvent};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Smoke-test CLI for a running Scope Gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the ScopeStack token by fetching the current account
    CheckAuth,
    /// Run a multi-step generation and print progress events
    Stream {
        #[arg(short, long)]
        input: String,
        #[arg(long)]
        analysis_model: Option<String>,
        #[arg(long)]
        draft_model: Option<String>,
    },
    /// Request a single completion
    Complete {
        #[arg(short, long)]
        prompt: String,
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Show which gateway environment variables are set
    Env,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::CheckAuth => {
            let res = client
                .get(format!("{base}/api/scopestack/account"))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Complete { prompt, model } => {
            let mut body = json!({ "prompt": prompt });
            if let Some(model) = model {
                body["model"] = json!(model);
            }
            let res = client
                .post(format!("{base}/api/completion"))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Stream {
            input,
            analysis_model,
            draft_model,
        } => {
            let body = json!({
                "input": input,
                "models": { "analysis": analysis_model, "draft": draft_model },
            });
            let res = client
                .post(format!("{base}/api/generate"))
                .json(&body)
                .send()
                .await?;

            if !res.status().is_success() {
                print_response(res).await?;
                std::process::exit(1);
            }

            if !stream_events(res).await? {
                std::process::exit(1);
            }
        }
        Commands::Env => {
            for (name, secret) in ENV_VARS {
                let shown = match std::env::var(name) {
                    Ok(value) if value.trim().is_empty() => "(empty)".to_string(),
                    Ok(value) if *secret => mask(&value),
                    Ok(value) => value,
                    Err(_) => "(unset)".to_string(),
                };
                println!("{name:<26} {shown}");
            }
        }
    }

    Ok(())
}

/// Print events until a terminal one. Returns `false` if the run failed.
async fn stream_events(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let mut decoder = SseDecoder::new();
    let mut body = res.bytes_stream();

    while let Some(chunk) = body.next().await {
        for event in decoder.push(&chunk?) {
            let event = event?;
            println!("{}", serde_json::to_string(&event)?);
            match event {
                StreamEvent::Error { .. } => return Ok(false),
                StreamEvent::Complete { .. } => return Ok(true),
                StreamEvent::Step { .. } => {}
            }
        }
    }

    eprintln!("Error: stream ended without a terminal event");
    Ok(false)
}

fn mask(value: &str) -> String {
    format!("set ({} chars)", value.chars().count())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
