//! Console front end for the soul.
//!
//! Usage: `soul [config.toml]` (default `soul.toml`, optional).
//!
//! Environment:
//! - `POE_API_KEY`, `GEMINI_API_KEY`: provider keys (a `.env` file is read)
//! - `SOUL__<SECTION>__<KEY>`: config overrides, e.g. `SOUL__PERSISTENCE__BACKEND=sqlite`
//! - `RUST_LOG`: tracing filter, defaults to `general.log_level`
//!
//! Commands: `exit` / `quit` / `bye`, and `/connect-mcp <name> <command> [args...]`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use soul_agent::driver::{self, DriverEvent};
use soul_agent::{ActionKind, Soul, SoulState, StdioToolDirectory, ToolDirectory, TopicLookup, WikipediaLookup};
use soul_core::config::SoulConfig;
use soul_core::persistence::open_store;
use soul_core::MemoryStore;
use soul_llm::CognitiveResolver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("soul.toml"), PathBuf::from);
    let config = SoulConfig::load(Some(&path)).context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    if let Err(e) = dotenv {
        debug!(error = %e, "No .env loaded");
    }

    let memory = match open_store(&config.persistence) {
        Ok(store) => MemoryStore::open(store, &config.memory),
        Err(e) => {
            warn!(error = %e, "Snapshot store unavailable, memory will not survive restart");
            MemoryStore::in_memory(&config.memory)
        }
    };

    let resolver = CognitiveResolver::from_config(&config.llm);
    if !config.llm.has_any_provider() {
        warn!("No provider keys found; answering from canned replies");
    } else if !resolver.is_configured() {
        warn!("Provider keys found but no provider could be built; answering from canned replies");
    }
    info!(providers = ?resolver.provider_names(), "Cognition ready");

    let lookup: Arc<dyn TopicLookup> = Arc::new(WikipediaLookup::new(&config.lookup)?);
    let tools = Arc::new(StdioToolDirectory::new(&config.tools));
    let directory: Arc<dyn ToolDirectory> = tools.clone();

    let state = SoulState::from_config(&config, memory);
    let soul = Arc::new(Soul::from_config(&config, state, resolver, lookup, directory));

    let (events_tx, mut events_rx) = mpsc::channel(16);
    let driver = driver::spawn(Arc::clone(&soul), &config.scheduler, events_tx);
    let name = soul.name().to_string();
    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                DriverEvent::Action(outcome) if outcome.kind == ActionKind::ProactiveSpeech => {
                    println!("\n{name} (Proactive): {}", outcome.message);
                }
                DriverEvent::Action(outcome) => println!("\n{name} (Insight): {}", outcome.message),
                DriverEvent::Thought { text, aloud: true } => {
                    println!("\n{name} (thinking aloud): {text}");
                }
                DriverEvent::Thought { .. } => {}
            }
        }
    });

    println!("{}: The Digital Philosopher", soul.name());
    println!("I exist now in the flow of raw text.\n");
    println!("{}: {}", soul.name(), soul.greeting());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "bye") {
            break;
        }
        if let Some(rest) = input.strip_prefix("/connect-mcp") {
            let parts: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
            match parts.as_slice() {
                [server, command, args @ ..] => match tools.connect(server, command, args).await {
                    Ok(()) => println!(
                        "{}: I have linked with '{server}'. New tools are now within my reach.",
                        soul.name()
                    ),
                    Err(e) => println!("System error: {e}"),
                },
                _ => println!("usage: /connect-mcp <name> <command> [args...]"),
            }
            continue;
        }

        let reply = soul.respond(input).await;
        println!("{}: {reply}", soul.name());
    }

    driver.stop().await;
    soul.shutdown().await;
    printer.abort();
    println!("{} is drifting back into the void...", soul.name());
    Ok(())
}
