use std::path::PathBuf;

use clap::Parser;
use cldrpack::importer::{Options, run};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the root of the CLDR source tree
    cldr_dir: PathBuf,

    /// Destination directory for compiled records
    #[arg(short, long, default_value = "data")]
    out: PathBuf,

    /// Import even if destination files seem up to date
    #[arg(short, long)]
    force: bool,

    /// Also export debugging JSON dumps of locale data
    #[arg(short, long)]
    json: bool,

    /// Show per-file debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    // RUST_LOG wins when set; otherwise info, or debug with --verbose.
    let fallback = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| fallback.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut options = Options::new(&args.cldr_dir, &args.out);
    options.force = args.force;
    options.dump_json = args.json;

    if let Err(e) = run(&options) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
