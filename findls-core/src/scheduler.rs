use std::{
    io::BufRead,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
    time::Duration,
};

use anyhow::Result;
use crossbeam_deque::{Injector, Steal, Stealer, Worker};
use crossbeam_utils::Backoff;
use log::{debug, trace, warn};

use crate::{
    constants::pipeline::{IDLE_SLEEP_MICROS, PENDING_BATCHES_PER_WORKER},
    error_handling::{SummaryError, SummaryResult},
    parser::parse_line,
    rollup::{Aggregator, Ingest, SharedAggregator},
    AggregationStrategy, Options, RunStats, StatMap,
};

/// One parse job: a run of raw input lines.
#[derive(Clone, Debug, Default)]
pub struct Batch {
    pub lines: Vec<String>,
}

#[derive(Clone, Copy)]
struct WorkerContext<'a> {
    injector: &'a Injector<Batch>,
    stealers: &'a [Stealer<Batch>],
    done: &'a AtomicBool,
}

// Decrements the live-worker count on exit, including unwinding.
struct LiveGuard<'a>(&'a AtomicUsize);

impl Drop for LiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

#[inline]
fn idle(backoff: &Backoff) {
    if backoff.is_completed() {
        thread::sleep(Duration::from_micros(IDLE_SLEEP_MICROS));
    } else {
        backoff.snooze();
    }
}

fn next_batch(local: &Worker<Batch>, ctx: &WorkerContext<'_>, next: &mut usize) -> Option<Batch> {
    if let Some(b) = local.pop() {
        return Some(b);
    }
    loop {
        match ctx.injector.steal_batch_and_pop(local) {
            Steal::Success(b) => return Some(b),
            Steal::Retry => continue,
            Steal::Empty => {}
        }
        let len = ctx.stealers.len();
        let mut retry = false;
        for k in 0..len {
            let idx = (*next + k) % len;
            match ctx.stealers[idx].steal() {
                Steal::Success(b) => return Some(b),
                Steal::Retry => retry = true,
                Steal::Empty => {}
            }
        }
        if len > 0 {
            *next = (*next + 1) % len;
        }
        if !retry {
            return None;
        }
    }
}

fn worker_loop<S: Ingest>(
    local: Worker<Batch>,
    ctx: WorkerContext<'_>,
    index: usize,
    sink: &mut S,
) -> RunStats {
    let mut stats = RunStats::default();
    let mut next = index % ctx.stealers.len().max(1);
    let backoff = Backoff::new();
    loop {
        // read before polling: once set, an empty poll means the input is drained
        let finished = ctx.done.load(Ordering::Acquire);
        match next_batch(&local, &ctx, &mut next) {
            Some(batch) => {
                backoff.reset();
                for line in &batch.lines {
                    match parse_line(line) {
                        Some(entry) => {
                            stats.lines_parsed += 1;
                            sink.ingest(entry);
                        }
                        None => stats.lines_skipped += 1,
                    }
                }
            }
            None if finished => break,
            None => idle(&backoff),
        }
    }
    stats
}

/// Hold the reader while workers are behind. Returns false once no worker is left.
fn wait_for_room(injector: &Injector<Batch>, live: &AtomicUsize, max_pending: usize) -> bool {
    let backoff = Backoff::new();
    while injector.len() >= max_pending {
        if live.load(Ordering::Acquire) == 0 {
            return false;
        }
        idle(&backoff);
    }
    true
}

fn feed<R: BufRead>(
    reader: &mut R,
    injector: &Injector<Batch>,
    live: &AtomicUsize,
    batch_lines: usize,
    max_pending: usize,
    stats: &mut RunStats,
) -> SummaryResult<()> {
    let mut buf: Vec<u8> = Vec::with_capacity(256);
    let mut lines: Vec<String> = Vec::with_capacity(batch_lines);
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| SummaryError::Read { source })?;
        if n == 0 {
            break;
        }
        stats.lines_read += 1;
        stats.bytes_read += n as u64;
        // non-UTF-8 lines are unparseable
        match std::str::from_utf8(&buf) {
            Ok(line) => lines.push(line.to_owned()),
            Err(e) => {
                trace!("skipping line {}: not UTF-8 ({e})", stats.lines_read);
                stats.lines_skipped += 1;
                continue;
            }
        }
        if lines.len() >= batch_lines {
            if !wait_for_room(injector, live, max_pending) {
                return Ok(());
            }
            let full = std::mem::replace(&mut lines, Vec::with_capacity(batch_lines));
            injector.push(Batch { lines: full });
        }
    }
    if !lines.is_empty() {
        injector.push(Batch { lines });
    }
    Ok(())
}

/// Read `reader` on the calling thread, parse on `opt.threads` workers and
/// return the rolled-up map once every worker has joined.
pub(crate) fn run<R: BufRead>(mut reader: R, opt: &Options) -> Result<(StatMap, RunStats)> {
    let threads = opt.threads.max(1);
    let batch_lines = opt.batch_lines.max(1);
    let max_pending = threads * PENDING_BATCHES_PER_WORKER;
    debug!(
        "parse pipeline: workers={threads} batch_lines={batch_lines} max_pending={max_pending} strategy={:?}",
        opt.strategy
    );

    let injector: Injector<Batch> = Injector::new();
    let done = AtomicBool::new(false);
    let live = AtomicUsize::new(threads);
    let workers: Vec<Worker<Batch>> = (0..threads).map(|_| Worker::new_fifo()).collect();
    let stealers: Vec<Stealer<Batch>> = workers.iter().map(|w| w.stealer()).collect();
    let shared = match opt.strategy {
        AggregationStrategy::Shared => Some(SharedAggregator::new()),
        AggregationStrategy::PerWorker => None,
    };
    let ctx = WorkerContext {
        injector: &injector,
        stealers: &stealers,
        done: &done,
    };

    let mut stats = RunStats::default();
    let (joined, fed) = thread::scope(|s| {
        let mut handles = Vec::with_capacity(threads);
        for (i, local) in workers.into_iter().enumerate() {
            let shared = shared.as_ref();
            let live = &live;
            handles.push(s.spawn(move || {
                let _guard = LiveGuard(live);
                match shared {
                    Some(mut sink) => (None, worker_loop(local, ctx, i, &mut sink)),
                    None => {
                        let mut agg = Aggregator::new();
                        let worker_stats = worker_loop(local, ctx, i, &mut agg);
                        (Some(agg), worker_stats)
                    }
                }
            }));
        }
        let fed = feed(
            &mut reader,
            &injector,
            &live,
            batch_lines,
            max_pending,
            &mut stats,
        );
        done.store(true, Ordering::Release);
        // Join barrier: totals are final only after every worker returned
        let joined: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
        (joined, fed)
    });

    let mut merged = Aggregator::new();
    let mut panicked = None;
    for (i, res) in joined.into_iter().enumerate() {
        match res {
            Ok((agg, worker_stats)) => {
                stats.merge(&worker_stats);
                if let Some(agg) = agg {
                    merged.merge(agg);
                }
            }
            Err(_) => {
                warn!("parse worker {i} panicked");
                panicked.get_or_insert(i);
            }
        }
    }
    fed?;
    if let Some(worker) = panicked {
        return Err(SummaryError::WorkerPanicked { worker }.into());
    }
    let map = match shared {
        Some(shared) => shared.into_map(),
        None => merged.into_map(),
    };
    Ok((map, stats))
}
