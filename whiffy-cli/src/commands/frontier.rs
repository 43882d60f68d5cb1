//! The `frontier` command: print the accepted regions without merging.
//!
//! Writes one JSON object per line to stdout, in traversal order.

use std::io::{self, BufWriter, Write};

use whiffy::app::Retrieval;
use whiffy::engine::AcceptedFrontier;

use super::common::{install_cancel_handler, start_logging, QueryArgs};
use crate::error::CliError;

pub fn run(args: QueryArgs, verbose: bool) -> Result<(), CliError> {
    let file = args.load_config()?;
    let _guard = start_logging(&file, verbose)?;

    let bounds = args.bounds()?;
    let limit = args.limit()?;
    let config = args.retrieval_config(&file)?;

    let cancel = install_cancel_handler()?;
    let frontier = Retrieval::wfs(args.query(), &config)?
        .with_cancel_flag(cancel)
        .frontier(bounds, limit)?;

    let stdout = io::stdout();
    write_lines(BufWriter::new(stdout.lock()), &frontier)
        .map_err(|e| CliError::Retrieval(e.into()))?;

    let stats = frontier.stats();
    eprintln!(
        "{} regions accepted ({} requests, {} levels, {} depth limited)",
        frontier.len(),
        stats.regions_fetched,
        stats.levels,
        stats.depth_limited
    );
    Ok(())
}

fn write_lines<W: Write>(mut out: W, frontier: &AcceptedFrontier) -> io::Result<()> {
    for entry in frontier.entries() {
        serde_json::to_writer(&mut out, entry)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}
