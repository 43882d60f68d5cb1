//! The `get` command: retrieve every feature in the bounds.

use std::io::{self, BufWriter};
use std::path::PathBuf;

use clap::Args;
use tracing::warn;
use whiffy::app::{Retrieval, RetrievalSummary};
use whiffy::config::parse_id_field;
use whiffy::feature::IdentifierField;
use whiffy::output::AtomicFileOutput;

use super::common::{install_cancel_handler, start_logging, QueryArgs};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct GetArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Write the collection to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Property that identifies a feature when deduplicating
    #[arg(long, value_name = "PROPERTY")]
    pub id_field: Option<String>,

    /// Deduplicate on the GeoJSON feature `id` member
    #[arg(long, conflicts_with = "id_field")]
    pub feature_id: bool,
}

impl GetArgs {
    fn id_field(&self) -> Result<Option<IdentifierField>, CliError> {
        if self.feature_id {
            return Ok(Some(IdentifierField::FeatureId));
        }
        self.id_field
            .as_deref()
            .map(parse_id_field)
            .transpose()
            .map_err(|e| CliError::InvalidArgument(e.to_string()))
    }
}

pub fn run(args: GetArgs, verbose: bool) -> Result<(), CliError> {
    let file = args.query.load_config()?;
    let _guard = start_logging(&file, verbose)?;

    let bounds = args.query.bounds()?;
    let limit = args.query.limit()?;
    let mut config = args.query.retrieval_config(&file)?;
    if let Some(id_field) = args.id_field()? {
        config.merge = config.merge.with_id_field(id_field);
    }

    let cancel = install_cancel_handler()?;
    let retrieval = Retrieval::wfs(args.query.query(), &config)?.with_cancel_flag(cancel);

    let summary = match &args.output {
        Some(path) => {
            let mut out = AtomicFileOutput::create(path)?;
            let summary = retrieval.run(bounds, limit, &mut out)?;
            out.commit()?;
            summary
        }
        None => {
            let stdout = io::stdout();
            retrieval.run(bounds, limit, BufWriter::new(stdout.lock()))?
        }
    };

    report(&summary, args.output.as_deref());
    Ok(())
}

fn report(summary: &RetrievalSummary, output: Option<&std::path::Path>) {
    let stats = &summary.frontier;
    eprintln!(
        "Retrieved {} features from {} regions ({} requests, {} duplicates removed)",
        summary.written, summary.merge.tiles, stats.regions_fetched, summary.merge.duplicates
    );
    if let Some(path) = output {
        eprintln!("Wrote {}", path.display());
    }
    if summary.is_partial() {
        warn!(
            regions = stats.depth_limited,
            max_depth = stats.max_depth,
            "Depth cap reached; the collection may be missing features"
        );
        eprintln!("Re-run with a larger --max-depth or --unbounded for a complete result.");
    }
}
