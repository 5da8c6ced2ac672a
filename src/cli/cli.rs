//! Main CLI application structure

use clap::Parser;

use crate::cli::commands::{render, serve, version, Commands};
use crate::cli::error::CliResult;

/// multispec - a single Swagger UI portal for many OpenAPI specifications
#[derive(Debug, Parser)]
#[command(name = "multispec")]
#[command(version = multispec::VERSION)]
#[command(about = "Aggregate OpenAPI/Swagger specifications into one documentation portal")]
#[command(long_about = "multispec discovers services and their specification URLs from a \
                         Kubernetes ConfigMap (or a directory of record files), serves a \
                         Swagger UI listing them, rewrites each specification so \"try it out\" \
                         calls reach the right backend, and relays those calls to avoid \
                         browser cross-origin restrictions.\n\n\
                         Examples:\n\
                           multispec serve                          # In-cluster, ConfigMap default/openapi-specs\n\
                           multispec serve --specs-dir ./specs      # Records from local files\n\
                           multispec render http://orders/v3/api-docs  # Print one rewritten spec")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> CliResult<()> {
        match self.command {
            Commands::Serve(args) => serve::execute_serve(args).await,
            Commands::Render(args) => render::execute_render(args).await,
            Commands::Version(args) => version::execute_version(args).await,
        }
    }
}
