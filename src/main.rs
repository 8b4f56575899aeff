use anyhow::Result;
use clap::Parser;
use tracing::error;

use headlindex::{report, run_session, utils, Args};

fn run(args: &Args) -> Result<()> {
    utils::validate_args(args)?;

    if args.links {
        return report::print_download_links(&args.api, args.search.trim());
    }

    let session = run_session(args)?;
    report::print_session(&session, args.json)
}

fn main() {
    let args = Args::parse();
    utils::setup_logging(args.verbose);

    if let Err(e) = run(&args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
