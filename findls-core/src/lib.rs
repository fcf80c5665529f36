#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    time::Instant,
};

use ahash::AHashMap as HashMap;
use anyhow::{Context, Result};
use log::debug;

pub mod constants;
mod error_handling;
mod options; // for OptionsBuilder
pub mod parser;
pub mod report;
mod rollup;
mod scheduler; // batch queue + worker loop
pub mod units;

pub use error_handling::{ErrorRecovery, RecoveryAction, SummaryError, SummaryResult};
pub use options::{OptionsBuilder, PerformanceConfig};
pub use parser::{parse_line, Entry};
pub use report::{format_row, sorted_rows, write_report};
pub use rollup::{parent_of, Aggregator, Ancestors, Ingest, SharedAggregator};
pub use units::format_size;

/// Accumulated totals for one path bucket.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stat {
    pub files: u64,
    pub dirs: u64,
    pub size: u64,
}

impl Stat {
    #[inline]
    pub fn record(&mut self, size: u64, is_dir: bool) {
        self.size = self.size.saturating_add(size);
        if is_dir {
            self.dirs = self.dirs.saturating_add(1);
        } else {
            self.files = self.files.saturating_add(1);
        }
    }

    #[inline]
    pub fn merge(&mut self, other: &Stat) {
        self.files = self.files.saturating_add(other.files);
        self.dirs = self.dirs.saturating_add(other.dirs);
        self.size = self.size.saturating_add(other.size);
    }
}

pub type StatMap = HashMap<String, Stat>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregationStrategy {
    /// Every worker owns a private map; maps are merged once all workers joined.
    PerWorker,
    /// All workers write into one lock-per-key map.
    Shared,
}

#[derive(Clone, Debug)]
pub struct Options {
    pub threads: usize,
    pub batch_lines: usize, // lines per queued job
    pub strategy: AggregationStrategy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            threads: std::env::var("FINDLS_THREADS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or_else(|| {
                    std::thread::available_parallelism()
                        .map(|n| n.get())
                        .unwrap_or(constants::pipeline::FALLBACK_THREADS)
                }),
            batch_lines: std::env::var("FINDLS_BATCH_LINES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(constants::pipeline::DEFAULT_BATCH_LINES),
            strategy: if std::env::var("FINDLS_SHARED_MAP")
                .ok()
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
            {
                AggregationStrategy::Shared
            } else {
                AggregationStrategy::PerWorker
            },
        }
    }
}

/// Line counters for one run. Only logged, never part of the report.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunStats {
    pub lines_read: u64,
    pub lines_parsed: u64,
    pub lines_skipped: u64,
    pub bytes_read: u64,
}

impl RunStats {
    #[inline]
    pub fn merge(&mut self, other: &RunStats) {
        self.lines_read += other.lines_read;
        self.lines_parsed += other.lines_parsed;
        self.lines_skipped += other.lines_skipped;
        self.bytes_read += other.bytes_read;
    }
}

#[derive(Debug, Default)]
pub struct Summary {
    pub map: StatMap,
    pub stats: RunStats,
}

impl Summary {
    pub fn get(&self, path: &str) -> Option<&Stat> {
        self.map.get(path)
    }

    /// Rows in report order.
    pub fn sorted(&self) -> Vec<(&str, &Stat)> {
        report::sorted_rows(&self.map)
    }
}

/// Summarize a listing file. An unopenable file is fatal.
pub fn summarize_path(path: impl AsRef<Path>, opt: &Options) -> Result<Summary> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| SummaryError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    summarize_reader(BufReader::new(file), opt)
        .with_context(|| format!("summarizing {}", path.display()))
}

/// Summarize any buffered line source using the parallel parse pipeline.
pub fn summarize_reader<R: BufRead>(reader: R, opt: &Options) -> Result<Summary> {
    let t0 = Instant::now();
    let (map, stats) = scheduler::run(reader, opt)?;
    debug!(
        "summarized {} lines ({} parsed, {} skipped, {} bytes) into {} buckets | threads={} strategy={:?} elapsed={:.3}s",
        stats.lines_read,
        stats.lines_parsed,
        stats.lines_skipped,
        stats.bytes_read,
        map.len(),
        opt.threads.max(1),
        opt.strategy,
        t0.elapsed().as_secs_f64()
    );
    Ok(Summary { map, stats })
}

/// Single-threaded variant over in-memory lines.
pub fn summarize_lines<'a, I>(lines: I) -> Summary
where
    I: IntoIterator<Item = &'a str>,
{
    let mut agg = Aggregator::new();
    let mut stats = RunStats::default();
    for line in lines {
        stats.lines_read += 1;
        stats.bytes_read += line.len() as u64;
        match parse_line(line) {
            Some(entry) => {
                stats.lines_parsed += 1;
                agg.ingest(entry);
            }
            None => stats.lines_skipped += 1,
        }
    }
    Summary {
        map: agg.into_map(),
        stats,
    }
}
