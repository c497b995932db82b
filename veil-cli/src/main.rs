//! # veil
//!
//! CLI tool for veilchat encryption modes.
//!
//! ## Commands
//!
//! - `modes`: List the registered modes
//! - `encrypt`: Encrypt a message body under a mode
//! - `decrypt`: Decrypt a stored message body with its mode
//!
//! ## Example
//!
//! ```bash
//! veil modes
//! veil encrypt --mode weak_xor "hello"
//! veil decrypt --mode weak_xor 1f000d0742
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use veil_core::StrategyRegistry;

mod commands;

use commands::{decrypt, encrypt, modes};

/// CLI tool for veilchat encryption modes.
#[derive(Parser, Debug)]
#[command(name = "veil")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered modes
    Modes,

    /// Encrypt a message body
    Encrypt {
        /// Mode id (see `veil modes`)
        #[arg(long, short, default_value = "plaintext")]
        mode: String,

        /// Message body
        text: String,
    },

    /// Decrypt a stored message body
    Decrypt {
        /// Mode the body was stored under
        #[arg(long, short)]
        mode: String,

        /// Stored body
        ciphertext: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let registry = StrategyRegistry::new();

    match cli.command {
        Commands::Modes => {
            print!("{}", modes::run(&registry));
        }
        Commands::Encrypt { mode, text } => {
            println!("{}", encrypt::run(&registry, &mode, &text)?);
        }
        Commands::Decrypt { mode, ciphertext } => {
            println!("{}", decrypt::run(&registry, &mode, &ciphertext)?);
        }
    }

    Ok(())
}
