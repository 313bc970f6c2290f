use anyhow::{Context, Result};
use clap::Parser;
use native_image_sbom::{logging, Extractor, PackageRecord};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Executables to scan
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_tracing(args.verbose);

    let mut packages: Vec<PackageRecord> = Vec::new();
    for input in &args.inputs {
        let found = match Extractor::open(input).and_then(|e| e.scan_packages()) {
            Ok(found) => found,
            Err(e) => {
                warn!("skipping {}: {}", input.display(), e);
                continue;
            }
        };
        info!("{}: found {} packages", input.display(), found.len());
        packages.extend(found);
    }

    let output = if args.pretty {
        serde_json::to_string_pretty(&packages)
    } else {
        serde_json::to_string(&packages)
    }
    .context("Failed to serialize packages")?;
    println!("{output}");

    Ok(())
}
