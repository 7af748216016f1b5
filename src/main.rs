//! Keyclack - mechanical keyboard sounds for every key you type
//!
//! Run with `keyclack` or `keyclack run` to start the daemon.
//! Use `keyclack check` to validate a sound pack.
//! Use `keyclack play <name>` to audition a single sound.

use clap::Parser;
use keyclack::audio::{output, AudioOutput};
use keyclack::config::{self, UnmappedKeyPolicy};
use keyclack::keymap::{KeyMap, Layout};
use keyclack::{daemon, Cli, Commands, Config, Daemon};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("keyclack={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(sounds) = cli.sounds {
        config.sounds.pack = sounds;
    }
    if let Some(backend) = cli.backend {
        config.input.backend = backend.parse()?;
    }
    if let Some(device) = cli.device {
        config.output.device = device;
    }
    if cli.strict {
        config.input.unmapped_key = UnmappedKeyPolicy::Fatal;
    }

    // Run the appropriate command
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let mut daemon = Daemon::new(config);
            daemon.run().await?;
        }

        Commands::Check => {
            run_check(&config)?;
        }

        Commands::Play { name } => {
            config.validate()?;
            let catalog = Arc::new(daemon::load_catalog(&config)?);
            let output = AudioOutput::open(&config.output, catalog)?;
            output.play_and_wait(&name)?;
        }

        Commands::Devices => {
            for (i, name) in output::list_devices()?.iter().enumerate() {
                if i == 0 {
                    println!("{} (default)", name);
                } else {
                    println!("{}", name);
                }
            }
        }

        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}

/// Load the sound pack and validate it against every built-in key table
fn run_check(config: &Config) -> anyhow::Result<()> {
    config.validate()?;
    let catalog = daemon::load_catalog(config)?;

    println!("Sound pack: {}", config.sounds.pack);
    println!("Sounds ({}): {}", catalog.len(), catalog.names().join(", "));
    println!();

    let mut failed = false;
    for layout in Layout::ALL {
        let keymap = KeyMap::builtin(layout);
        match catalog.validate(&keymap) {
            Ok(()) => println!("  [OK]   {} key table ({} keys)", layout, keymap.len()),
            Err(e) => {
                println!("  [FAIL] {} key table: {}", layout, e);
                failed = true;
            }
        }
    }

    if failed {
        anyhow::bail!("Sound pack does not cover every key table");
    }
    Ok(())
}

/// Print the effective configuration
fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("# Keyclack Configuration\n");

    if let Some(path) = Config::default_path() {
        println!("# Config file: {:?}", path);
        if !path.exists() {
            println!("# (file not found, using defaults)");
        }
    }
    println!();

    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
