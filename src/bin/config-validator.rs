//! # Courier Configuration Validator
//!
//! Command-line tool for validating courier configuration before starting a
//! webhook, poller or queue worker. Exits non-zero when validation fails.

use clap::{Parser, Subcommand};
use courier_core::config::{AppConfig, ConfigLoader, QueueBackend};
use courier_core::handlers::builtin_catalog;
use courier_core::registry::{discover_manifests, HandlerManifest};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate courier configuration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Optional TOML configuration file, layered under the environment
    #[arg(short, long, env = "COURIER_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate all configuration components
    All,

    /// Validate one component (bot, queue, handlers, polling, logging)
    Component { name: String },

    /// Print the effective configuration with secrets masked
    Show,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::All) | None => validate_all_config(&cli),
        Some(Commands::Component { name }) => validate_component(&cli, name),
        Some(Commands::Show) => show_config(&cli),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> Result<AppConfig, Box<dyn std::error::Error>> {
    match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => {
            config.log_summary();
            println!("✅ Configuration loaded and validated");
            Ok(config)
        }
        Err(e) => {
            println!("❌ Failed to load configuration: {}", e);
            Err(Box::new(e))
        }
    }
}

fn validate_all_config(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔧 Validating Courier Configuration");
    if let Some(path) = &cli.config {
        println!("Config File: {}", path.display());
    }
    println!();

    let config = load(cli)?;

    validate_bot_config(&config)?;
    validate_queue_config(&config)?;
    validate_handlers_config(&config)?;
    validate_polling_config(&config)?;
    validate_logging_config(&config)?;

    println!("\n🎉 All configuration validation checks passed!");
    Ok(())
}

fn validate_component(cli: &Cli, component_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔧 Validating Component: {}", component_name);

    let config = load(cli)?;

    match component_name.to_lowercase().as_str() {
        "bot" => validate_bot_config(&config)?,
        "queue" => validate_queue_config(&config)?,
        "handlers" | "plugins" => validate_handlers_config(&config)?,
        "polling" => validate_polling_config(&config)?,
        "logging" => validate_logging_config(&config)?,
        _ => {
            return Err(format!("Unknown component: {}", component_name).into());
        }
    }

    println!("✅ Component '{}' validation passed!", component_name);
    Ok(())
}

fn show_config(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(cli)?;
    println!("{}", serde_json::to_string_pretty(&config.sanitized())?);
    Ok(())
}

fn validate_bot_config(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n🤖 Bot");
    println!("  API URL: {}", config.bot.api_url);
    println!("  Bot mode: {}", config.bot.mode);
    println!("  Update mode: {}", config.update_mode);
    Ok(())
}

fn validate_queue_config(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n📬 Queue");
    println!("  Backend: {}", config.queue.backend);

    match config.queue.backend {
        QueueBackend::Json => {
            println!("  Directory: {}", config.queue.directory.display());
        }
        QueueBackend::Redis => {
            // Building the URL validates host, port and password encoding.
            config.queue.redis.connection_url()?;
            println!(
                "  Redis: {}:{} key '{}'",
                config.queue.redis.host, config.queue.redis.port, config.queue.redis.key
            );
        }
        QueueBackend::RabbitMq => {
            config.queue.rabbitmq.connection_url()?;
            println!(
                "  RabbitMQ: {}:{} queue '{}' (ack {})",
                config.queue.rabbitmq.host,
                config.queue.rabbitmq.port,
                config.queue.rabbitmq.queue,
                config.queue.rabbitmq.ack_policy
            );
        }
        QueueBackend::Memory => {
            println!("  ⚠️  In-memory queue is process-local; workers cannot share it");
        }
    }
    Ok(())
}

fn validate_handlers_config(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n🧩 Handlers");
    println!("  Directory: {}", config.handlers.directory.display());
    println!(
        "  Reload interval: {}s",
        config.handlers.reload_interval.as_secs()
    );

    if !config.handlers.directory.is_dir() {
        println!("  ⚠️  Handler directory does not exist; no handlers will run");
        return Ok(());
    }

    let catalog = builtin_catalog();
    let mut invalid = 0;
    for path in discover_manifests(&config.handlers.directory)? {
        match HandlerManifest::from_path(&path) {
            Ok(manifest) if catalog.get(&manifest.handler).is_none() => {
                invalid += 1;
                println!(
                    "  ❌ {}: unknown handler '{}'",
                    path.display(),
                    manifest.handler
                );
            }
            Ok(manifest) => println!(
                "  ✅ {} -> {}{}",
                path.display(),
                manifest.handler,
                if manifest.enabled { "" } else { " (disabled)" }
            ),
            Err(e) => {
                invalid += 1;
                println!("  ❌ {}", e);
            }
        }
    }

    // Invalid manifests are skipped at runtime, so they are reported but not fatal.
    if invalid > 0 {
        println!("  ⚠️  {} manifest(s) will be skipped", invalid);
    }
    Ok(())
}

fn validate_polling_config(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n🔁 Polling");
    println!("  State file: {}", config.polling.state_file.display());
    println!("  Limit: {}", config.polling.limit);
    println!("  Timeout: {}s", config.polling.timeout);
    match &config.polling.allowed_updates {
        Some(kinds) => println!("  Allowed updates: {}", kinds.join(", ")),
        None => println!("  Allowed updates: all"),
    }
    Ok(())
}

fn validate_logging_config(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n📝 Logging");
    if config.logging.enabled {
        println!(
            "  File: {}",
            config.logging.directory.join(&config.logging.file).display()
        );
    } else {
        println!("  File logging disabled");
    }
    Ok(())
}
