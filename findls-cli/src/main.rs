use std::{
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use findls_core::{
    summarize_path, summarize_reader, write_report, ErrorRecovery, Options, SummaryError,
};
use log::debug;

#[derive(Parser, Debug)]
#[command(
    name = "findls",
    version,
    about = "Summarize `find -ls` output per directory",
    long_about = "Reads a recursive `find -ls` listing and prints, for every directory path \
    seen, the number of files and directories below it and their total size.\n\
    Worker threads and batch size can be tuned with FINDLS_THREADS and FINDLS_BATCH_LINES; \
    FINDLS_SHARED_MAP=1 switches to a single lock-per-key map. Logging follows RUST_LOG.",
    after_help = "Examples:\n\
      Summarize a live listing\n\
        find /data -ls | findls\n\
      Summarize a saved listing\n\
        findls -f listing.txt\n\
    "
)]
struct Args {
    /// Input file containing `find -ls` output (reads stdin when omitted)
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let opt = Options::default();

    let summary = match &args.file {
        Some(path) => summarize_path(path, &opt)?,
        None => {
            let stdin = io::stdin();
            summarize_reader(stdin.lock(), &opt).context("reading standard input")?
        }
    };
    debug!("{:?}", summary.stats);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if let Err(source) = write_report(&mut out, &summary.map).and_then(|_| out.flush()) {
        let err = SummaryError::Write { source };
        if err.is_recoverable() {
            debug!("{err}; stopping output");
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}
