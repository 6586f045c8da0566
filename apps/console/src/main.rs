use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use console_core::{ConsoleEvent, HttpAdminApi};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod command;
mod config;
mod dashboard;

use command::{Command, ParseError, USAGE};
use dashboard::{describe_event, Dashboard, Section};

#[derive(Parser, Debug)]
struct Args {
    /// Settings file; defaults to ./console.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Section shown at startup.
    #[arg(long, value_enum, default_value_t = Section::Members)]
    section: Section,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = config::load_settings(args.config.as_deref())?;
    let timestamps = settings.timestamps()?;
    info!(
        admin_api = %settings.admin_api_url,
        recharge_api = %settings.recharge_api_url,
        page_size = settings.page_size,
        window_size = settings.window_size,
        stale_policy = ?settings.stale_policy,
        "starting admin console"
    );

    let api = Arc::new(HttpAdminApi::new(
        settings.admin_api_url.clone(),
        settings.recharge_api_url.clone(),
    ));
    let (events_tx, mut events) = broadcast::channel(256);
    let mut dashboard = Dashboard::new(api, settings.list_config(), timestamps, events_tx);

    dashboard.activate(args.section).await;
    print_events(&mut events);
    println!("{}", dashboard.render());
    println!("type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(ParseError::Empty) => continue,
            Err(err) => {
                println!("{err}\n{USAGE}");
                continue;
            }
        };
        let output = dashboard.execute(command).await;
        print_events(&mut events);
        println!("{output}");
    }

    Ok(())
}

/// Notifications queued by the last command, in emission order.
fn print_events(events: &mut broadcast::Receiver<ConsoleEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => {
                if let Some(text) = describe_event(&event) {
                    println!("{text}");
                }
            }
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                println!("[warn] {skipped} notifications were dropped");
            }
            Err(_) => break,
        }
    }
}
