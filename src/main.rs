use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use driftshow::catalog::Catalog;
use driftshow::config::{Args, Settings};
use driftshow::slideshow::Slideshow;
use driftshow::window::RaylibBackend;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from(Args::parse());

    // --- Index images before opening the window ---
    info!(root = %settings.root.display(), "scanning for images");
    let catalog = Catalog::build(&settings.root, settings.catalog.clone())
        .with_context(|| format!("cannot index images under {}", settings.root.display()))?;

    let mut backend = RaylibBackend::open(&settings.window).context("failed to open the window")?;

    // --- Main Loop ---
    let mut show = Slideshow::init(catalog, settings.show, &mut backend, Instant::now());
    show.run(&mut backend);
    show.shutdown();

    Ok(())
}
