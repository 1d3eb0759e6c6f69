mod app;
mod args;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::FmtSubscriber;

use crate::{app::App, args::Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    App::new(args).run().await
}
