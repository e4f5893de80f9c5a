use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use pb_core::job::PingJob;

#[derive(Parser)]
#[command(name=env!("CARGO_PKG_NAME"), version, about="Pingboard control CLI")]
struct Cli {
    /// Base URL of the pingboard daemon
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    url: String,
    /// Bearer token, if the daemon requires one
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Daemon liveness and job counts
    Status,
    /// List every registered job
    List,
    /// Register a job (starts probing immediately)
    Add {
        target: String,
        /// continuous | custom | single
        #[arg(long, default_value = "continuous")]
        mode: String,
        /// Probe spacing in seconds
        #[arg(long, default_value_t = 5)]
        interval: u64,
        /// Probe quota, custom mode only
        #[arg(long)]
        count: Option<u64>,
    },
    /// Replace a job's definition, resetting its run state
    Update {
        target: String,
        /// continuous | custom | single
        #[arg(long, default_value = "continuous")]
        mode: String,
        /// Probe spacing in seconds
        #[arg(long, default_value_t = 5)]
        interval: u64,
        /// Probe quota, custom mode only
        #[arg(long)]
        count: Option<u64>,
    },
    /// Remove a job
    Remove { target: String },
    /// Rearm a stopped job
    Start { target: String },
    /// Park a job without removing it
    Stop { target: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    pb_core::logx::init("warn");
    let cli = Cli::parse();
    let client = Client::new();

    match &cli.cmd {
        Command::Status => {
            let v: serde_json::Value = get_json(&client, &cli, "/status").await?;
            println!("{}", serde_json::to_string_pretty(&v)?);
        }
        Command::List => {
            let jobs: HashMap<String, PingJob> = get_json(&client, &cli, "/api/pings").await?;
            print_jobs(&jobs);
        }
        Command::Add { target, mode, interval, count } => {
            let body = json!({
                "target": target, "action": "add", "mode": mode,
                "interval": interval, "target_count": count,
            });
            print_jobs(&mod_ping(&client, &cli, body).await?);
        }
        Command::Update { target, mode, interval, count } => {
            let body = json!({
                "target": target, "action": "update", "mode": mode,
                "interval": interval, "target_count": count,
            });
            print_jobs(&mod_ping(&client, &cli, body).await?);
        }
        Command::Remove { target } => {
            let body = json!({ "target": target, "action": "remove" });
            print_jobs(&mod_ping(&client, &cli, body).await?);
        }
        Command::Start { target } => {
            let body = json!({ "target": target, "action": "start" });
            print_jobs(&mod_ping(&client, &cli, body).await?);
        }
        Command::Stop { target } => {
            let body = json!({ "target": target, "action": "stop" });
            print_jobs(&mod_ping(&client, &cli, body).await?);
        }
    }
    Ok(())
}

async fn get_json<T: DeserializeOwned>(client: &Client, cli: &Cli, path: &str) -> Result<T> {
    let mut req = client.get(format!("{}{}", cli.url, path));
    if let Some(t) = &cli.token {
        req = req.bearer_auth(t);
    }
    let resp = req.send().await.context("request")?;
    debug!("GET {} -> {}", path, resp.status());
    if !resp.status().is_success() {
        bail!("{}: {}", resp.status(), resp.text().await.unwrap_or_default());
    }
    resp.json().await.context("decode body")
}

async fn mod_ping(
    client: &Client,
    cli: &Cli,
    body: serde_json::Value,
) -> Result<HashMap<String, PingJob>> {
    let mut req = client.post(format!("{}/api/pings", cli.url)).json(&body);
    if let Some(t) = &cli.token {
        req = req.bearer_auth(t);
    }
    let resp = req.send().await.context("request")?;
    debug!("POST /api/pings -> {}", resp.status());
    if !resp.status().is_success() {
        bail!("{}: {}", resp.status(), resp.text().await.unwrap_or_default());
    }
    resp.json().await.context("decode body")
}

fn print_jobs(jobs: &HashMap<String, PingJob>) {
    if jobs.is_empty() {
        println!("no jobs registered");
        return;
    }
    println!(
        "{:<32} {:<11} {:>8} {:>6} {:<8} {:<8} {}",
        "TARGET", "MODE", "INTERVAL", "COUNT", "STATUS", "RESULT", "UPDATED"
    );
    let mut targets: Vec<_> = jobs.keys().collect();
    targets.sort();
    for t in targets {
        let j = &jobs[t];
        println!(
            "{:<32} {:<11} {:>7}s {:>6} {:<8} {:<8} {}",
            t, j.mode, j.interval_s, j.count, j.status, j.last_result, j.last_update
        );
    }
}
