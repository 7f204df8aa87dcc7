// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Caption Node CLI
#[derive(Parser, Debug)]
#[command(name = "caption-cli")]
#[command(version)]
#[command(about = "Caption and translate images from the command line", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Caption one or more image files
    Caption(commands::CaptionArgs),

    /// Translate a piece of text
    Translate(commands::TranslateArgs),

    /// Show dimensions, color mode and format of image files
    Info(commands::InfoArgs),

    /// List supported translation languages
    Languages,

    /// List captioning models
    Models,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Caption(args) => commands::caption(args).await,
        Commands::Translate(args) => commands::translate(args).await,
        Commands::Info(args) => commands::info(args),
        Commands::Languages => {
            commands::print_languages();
            Ok(())
        }
        Commands::Models => {
            commands::print_models();
            Ok(())
        }
    }
}
