//! rulesort binary
//!
//! Reads the annotation stream on stdin (or from `--annotations`), rewrites
//! `<input>` into `<output>` with each page's rules grouped by color.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rulesort_core::{inspect, rewrite, Document, RewriteConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "rulesort")]
#[command(version, about = "Group the rules of each DVI page by color")]
struct Args {
    /// Source DVI file
    input: PathBuf,

    /// Where to write the rewritten DVI file
    output: PathBuf,

    /// Read annotations from this file instead of stdin
    #[arg(short, long)]
    annotations: Option<PathBuf>,

    /// Byte capacity of one rule segment (overrides RULESORT_SEGMENT_CAPACITY)
    #[arg(long)]
    segment_capacity: Option<usize>,

    /// Leave the bop previous-page pointers as found in the input
    #[arg(long)]
    no_relink: bool,

    /// Walk the written file and check its structure
    #[arg(long)]
    verify: bool,
}

impl Args {
    fn config(&self) -> RewriteConfig {
        let mut config = RewriteConfig::from_env();
        if let Some(capacity) = self.segment_capacity {
            config.segment_capacity = capacity;
        }
        if self.no_relink {
            config.relink_pages = false;
        }
        config.verify_output |= self.verify;
        config
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // stdout stays free; diagnostics go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = args.config();
    tracing::debug!(?config, "configuration loaded");

    let source = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let sink = File::create(&args.output)
        .map(BufWriter::new)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let verify = config.verify_output;
    let (_, stats) = match &args.annotations {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            rewrite(Document::new(source), BufReader::new(file), sink, config)
        }
        None => rewrite(Document::new(source), io::stdin().lock(), sink, config),
    }
    .with_context(|| format!("failed to rewrite {}", args.input.display()))?;

    if verify {
        let written = std::fs::read(&args.output)
            .with_context(|| format!("failed to re-read {}", args.output.display()))?;
        let layout = inspect(&Document::new(written))?;
        layout
            .validate()
            .with_context(|| format!("{} failed verification", args.output.display()))?;
        tracing::info!(pages = layout.pages.len(), "output verified");
    }

    tracing::info!(
        "{} -> {}: {} page(s), {} rule(s), {:+} bytes",
        args.input.display(),
        args.output.display(),
        stats.pages,
        stats.rules,
        stats.growth()
    );
    Ok(())
}
