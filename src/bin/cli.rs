//! StashKV CLI
//!
//! Command-line interface for inspecting and editing a StashKV data
//! directory.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use stashkv::{BackendKind, Config, Schema, Store, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// StashKV CLI
#[derive(Parser, Debug)]
#[command(name = "stashkv")]
#[command(about = "Schema-validated key-value storage with backend fallback")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./stashkv_data")]
    data_dir: PathBuf,

    /// First backend to try (transactional, flat, memory)
    #[arg(short, long, default_value = "transactional")]
    backend: BackendKind,

    /// Database name
    #[arg(long, default_value = stashkv::config::DEFAULT_DATABASE_NAME)]
    database: String,

    /// Object store name
    #[arg(long, default_value = stashkv::config::DEFAULT_STORE_NAME)]
    store: String,

    /// Database version
    #[arg(long, default_value_t = stashkv::config::DEFAULT_STORE_VERSION)]
    store_version: u32,

    /// Wrap values in a `{ "value": V }` envelope
    #[arg(long)]
    wrap_values: bool,

    /// Key prefix in the flat backend
    #[arg(long)]
    prefix: Option<String>,

    /// Probe timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    probe_timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,

        /// JSON schema the value must match
        #[arg(long)]
        schema: Option<String>,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value (JSON; anything that does not parse is a string)
        value: String,

        /// JSON schema the value must match
        #[arg(long)]
        schema: Option<String>,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Check whether a key exists
    Has {
        /// The key to check
        key: String,
    },

    /// List all keys
    Keys,

    /// Count the keys
    Size,

    /// Delete every key
    Clear,

    /// Show which backend is in use
    Info,

    /// Print a key's value, then its changes until the timeout
    Watch {
        /// The key to watch
        key: String,

        /// Seconds to keep watching
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stashkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .backend(args.backend)
        .database_name(&args.database)
        .store_name(&args.store)
        .store_version(args.store_version)
        .wrap_values(args.wrap_values)
        .probe_timeout_ms(args.probe_timeout_ms);
    if let Some(prefix) = &args.prefix {
        builder = builder.key_prefix(prefix);
    }

    let store = match Store::open(builder.build()).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(&store, args.command).await;
    if let Err(e) = store.close().await {
        tracing::warn!("Failed to close store: {}", e);
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(store: &Store, command: Commands) -> stashkv::Result<()> {
    match command {
        Commands::Get { key, schema } => {
            let schema = schema.as_deref().map(Schema::from_json).transpose()?;
            match store.get(&key, schema.as_ref()).await? {
                Some(value) => println!("{}", render(&value)),
                None => println!("(nil)"),
            }
        }
        Commands::Set { key, value, schema } => {
            let schema = schema.as_deref().map(Schema::from_json).transpose()?;
            store.set(&key, parse_value(&value), schema.as_ref()).await?;
            println!("OK");
        }
        Commands::Del { key } => {
            store.delete(&key).await?;
            println!("OK");
        }
        Commands::Has { key } => println!("{}", store.has(&key).await?),
        Commands::Keys => {
            for key in store.keys().await? {
                println!("{}", key);
            }
        }
        Commands::Size => println!("{}", store.size().await?),
        Commands::Clear => {
            store.clear().await?;
            println!("OK");
        }
        Commands::Info => {
            let backing = store.backing_store().await?;
            println!("{}", serde_json::to_string_pretty(&backing)?);
        }
        Commands::Watch { key, timeout_secs } => {
            let mut watch = store.watch(&key, None).await?;
            let deadline = tokio::time::sleep(Duration::from_secs(timeout_secs));
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    item = watch.recv() => match item {
                        Some(Ok(Some(value))) => println!("{}", render(&value)),
                        Some(Ok(None)) => println!("(nil)"),
                        Some(Err(e)) => return Err(e),
                        None => break,
                    },
                }
            }
        }
    }
    Ok(())
}

/// JSON if it parses, a plain string otherwise
fn parse_value(text: &str) -> Value {
    serde_json::from_str::<serde_json::Value>(text)
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(text))
}

fn render(value: &Value) -> String {
    match serde_json::Value::try_from(value.clone()) {
        Ok(json) => json.to_string(),
        Err(_) => format!("{:?}", value),
    }
}
