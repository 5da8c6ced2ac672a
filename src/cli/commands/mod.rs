//! Command modules for CLI

pub mod render;
pub mod serve;
pub mod version;

use clap::Subcommand;

#[derive(Debug, Subcommand)]
#[command(about = "multispec commands")]
pub enum Commands {
    /// Run the portal HTTP server and the record poller
    #[command(about = "Serve the documentation portal")]
    Serve(serve::ServeArgs),

    /// Fetch one specification and print it with rewritten server information
    #[command(about = "Fetch and rewrite a single specification")]
    Render(render::RenderArgs),

    /// Display version information
    #[command(about = "Display version information")]
    Version(version::VersionArgs),
}
