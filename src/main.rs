//! Lounge - an ambient terminal player for recitations.
//!
//! The player picks a random collection from a random source, plays its
//! entries in order with per-source fade-in/fade-out, and shows the text of
//! whatever is being recited. When a collection ends the next one (already
//! picked in the background) takes over, so it can run indefinitely.
//!
//! Recitation data lives in a data directory (see `lounge init`); the
//! terminal front end is behind the default `player` feature.

use clap::{CommandFactory, Parser, Subcommand, builder::PossibleValuesParser};
use clap_complete::{Generator, Shell, generate};
use std::error::Error;
use std::io;

mod cli;

#[cfg(feature = "player")]
mod player;

#[derive(Parser)]
#[command(name = "lounge")]
#[command(about = "Ambient recitation player with time-synced text")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the data directory
    Init,
    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Pick a random collection and print it without playing
    Pick {
        /// Restrict to these sources (repeatable; defaults to the configured list)
        #[arg(short, long = "source")]
        sources: Vec<String>,
    },
    /// Start the player
    Play {
        /// Restrict to these sources (repeatable; defaults to the configured list)
        #[arg(short, long = "source")]
        sources: Vec<String>,
        /// Starting volume between 0 and 1
        #[arg(short, long)]
        volume: Option<f32>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// View current configuration
    View,
    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_parser = PossibleValuesParser::new(["data_dir", "volume", "sources", "text_mode", "show_text"]))]
        key: String,
        /// Configuration value
        value: String,
    },
    /// Edit configuration file in your editor
    Edit,
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    generate(
        generator,
        cmd,
        cmd.get_name().to_string(),
        &mut io::stdout(),
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            cli::init::handle_init()?;
        }
        Commands::Config { action } => match action {
            ConfigAction::View => {
                cli::config::handle_config_view()?;
            }
            ConfigAction::Set { key, value } => {
                cli::config::handle_config_set(&key, &value)?;
            }
            ConfigAction::Edit => {
                cli::config::handle_config_edit()?;
            }
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            print_completions(shell, &mut cmd);
        }
        Commands::Pick { sources } => {
            cli::pick::handle_pick(&sources)?;
        }
        Commands::Play { sources, volume } => {
            cli::play::handle_play(&sources, volume)?;
        }
    }

    Ok(())
}
