/// Parse pipeline constants
pub mod pipeline {
    /// Default number of raw lines handed to a worker per job
    pub const DEFAULT_BATCH_LINES: usize = 4096;

    /// Worker count when available_parallelism cannot be determined
    pub const FALLBACK_THREADS: usize = 4;

    /// Queued batches allowed per worker before the reader waits
    pub const PENDING_BATCHES_PER_WORKER: usize = 4;

    /// Sleep between polls once spinning has backed off completely
    pub const IDLE_SLEEP_MICROS: u64 = 200;
}

/// Report layout constants
pub mod report {
    pub const PATH_WIDTH: usize = 40;

    pub const COUNT_WIDTH: usize = 10;

    pub const SIZE_WIDTH: usize = 15;

    /// Width of the `=` rule under the header
    pub const RULE_WIDTH: usize = 80;
}

/// Size formatting constants
pub mod sizes {
    /// Binary prefix step
    pub const UNIT_STEP: f64 = 1024.0;

    /// Unit labels; the last one is the cap
    pub const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
}
