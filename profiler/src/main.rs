mod options;
mod store;

use anyhow::Error as AnyError;
use clap::Parser;
use elevprof::{reproject::WebMercator, ImageServer, Pipeline, Summary, Tiles};
use log::{info, warn};
use options::Cli;
use std::{
    io::Write,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use store::GeoJsonStore;

/// Raised by the first interrupt. The pipeline stops before its next
/// route and still writes the profiles it already staged.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

fn interrupt() {
    if INTERRUPTED.swap(true, Ordering::Relaxed) {
        warn!("interrupted again, exiting without writing");
        std::process::exit(130);
    }
    warn!("interrupted, finishing the current route");
}

fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();

    env_logger::init();
    ctrlc::set_handler(interrupt)?;

    let config = cli.config()?;
    let mut chain = config.chain();

    if let Some(tile_dir) = &cli.tile_dir {
        let tiles = Arc::new(Tiles::new(tile_dir.clone(), cli.tile_mode())?);
        chain = chain.bulk(Arc::clone(&tiles));
        if cli.image_server.is_none() {
            chain = chain.point(tiles);
        }
    }
    if let Some(url) = &cli.image_server {
        let mut server = ImageServer::new(url.as_str(), config.timeout())?;
        if let Some(token) = &cli.token {
            server = server.token(token.as_str());
        }
        chain = chain.point(server);
    }

    let chain = chain.build()?;
    info!("elevation sources: {:?}", chain.tiers().collect::<Vec<_>>());

    let out = cli.out.clone().unwrap_or_else(|| cli.input.clone());
    let mut store = GeoJsonStore::open(cli.input.clone(), out, config.profile_field.clone())?
        .dry_run(cli.dry_run);
    if let Some(wkid) = cli.wkid {
        store = store.wkid(wkid);
    }

    let pipeline = Pipeline::new(config, chain).reprojector(WebMercator);
    let summary = pipeline.run(&mut store, &INTERRUPTED)?;
    display(&summary, cli.dry_run)
}

fn display(summary: &Summary, dry_run: bool) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    let verb = if dry_run { "would update" } else { "updated" };
    writeln!(stdout, "{verb}: {}", summary.updated)?;
    writeln!(stdout, "skipped (invalid profile): {}", summary.skipped_invalid)?;
    writeln!(stdout, "failed: {}", summary.failed)?;
    if summary.cancelled {
        writeln!(stdout, "cancelled, {} routes not visited", summary.not_visited)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{interrupt, INTERRUPTED};
    use std::sync::atomic::Ordering;

    #[test]
    fn test_first_interrupt_raises_flag() {
        assert!(!INTERRUPTED.load(Ordering::Relaxed));
        interrupt();
        assert!(INTERRUPTED.load(Ordering::Relaxed));
    }
}
