//! Render command implementation

use crate::cli::error::CliResult;
use clap::Args;
use multispec::core::service::FetchConfig;
use multispec::{SpecRegistry, SpecRenderer};
use std::sync::Arc;
use std::time::Duration;

/// Fetch one specification and print it rewritten
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// URL of the specification document
    pub url: String,

    /// Seconds allowed for the fetch
    #[arg(long, env = "SPEC_FETCH_TIMEOUT_SECONDS", default_value_t = 30)]
    pub fetch_timeout_seconds: u64,
}

pub async fn execute_render(args: RenderArgs) -> CliResult<()> {
    multispec::init_logging();

    let config = FetchConfig {
        timeout: Duration::from_secs(args.fetch_timeout_seconds.max(1)),
    };
    let renderer = SpecRenderer::new(Arc::new(SpecRegistry::new()), &config)?;

    let doc = renderer.render_url(&args.url).await?;
    println!("{}", serde_json::to_string_pretty(&doc)?);

    Ok(())
}
