use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use varsnap::store::{ConsumeRequest, SnapStore};
use varsnap::{codec, HttpSnapStore, Inputs, ProcessEnv, Settings, Signature, StoreError};

/// Inspect varsnap configuration and snaps
#[derive(Parser)]
#[command(name = "varsnap")]
#[command(about = "Inspect varsnap configuration and recorded snaps", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which roles are enabled in this environment
    Status,

    /// Decode a serialized payload and print its value
    Decode { payload: String },

    /// Print the signature for a fully qualified function name
    Signature { name: String },

    /// Fetch pending snaps for a function and print them
    Fetch { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&ProcessEnv);

    match cli.command {
        Commands::Status => status(&settings),
        Commands::Decode { payload } => decode(&payload),
        Commands::Signature { name } => {
            println!("{}", Signature::resolve(&name));
            Ok(())
        }
        Commands::Fetch { name } => fetch(&settings, &name).await,
    }
}

fn status(settings: &Settings) -> Result<()> {
    println!("enabled:   {}", settings.enabled);
    println!("role:      {}", settings.role.as_str());
    println!("producer:  {}", on_off(settings.producer_enabled()));
    println!("consumer:  {}", on_off(settings.consumer_enabled()));
    println!("store:     {}", settings.api_url);
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn decode(payload: &str) -> Result<()> {
    let value = codec::deserialize(payload).context("Failed to decode payload")?;
    println!("{value}");
    Ok(())
}

async fn fetch(settings: &Settings, name: &str) -> Result<()> {
    let store: Arc<dyn SnapStore> = Arc::new(HttpSnapStore::new(settings));
    let signature = Signature::resolve(name);
    let response = store
        .fetch_snaps(ConsumeRequest {
            consumer_token: settings.consumer_token.clone(),
            signature: signature.to_string(),
        })
        .await
        .context("Failed to fetch snaps")?;
    if !response.is_ok() {
        return Err(StoreError::Status(response.status).into());
    }

    println!("{} pending snap(s) for {signature}", response.results.len());
    for snap in response.results {
        println!();
        println!("id:       {}", snap.id);
        match codec::deserialize(&snap.inputs).and_then(|value| Inputs::from_value(&value)) {
            Ok(inputs) => {
                println!("args:     {}", inputs.args);
                println!("kwargs:   {}", inputs.kwargs);
            }
            Err(err) => println!("inputs:   <undecodable: {err}>"),
        }
        match codec::deserialize(&snap.prod_outputs) {
            Ok(outputs) => println!("outputs:  {outputs}"),
            Err(err) => println!("outputs:  <undecodable: {err}>"),
        }
    }
    Ok(())
}
