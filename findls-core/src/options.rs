use crate::{AggregationStrategy, Options};

// Grouped performance knobs; unset fields keep the env-derived defaults
#[derive(Default, Clone, Debug)]
pub struct PerformanceConfig {
    pub threads: Option<usize>,
    pub batch_lines: Option<usize>,
    pub strategy: Option<AggregationStrategy>,
}

#[derive(Default, Clone, Debug)]
pub struct OptionsBuilder {
    pub threads: Option<usize>,
    pub batch_lines: Option<usize>,
    pub strategy: Option<AggregationStrategy>,
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threads(mut self, v: usize) -> Self {
        self.threads = Some(v);
        self
    }
    pub fn batch_lines(mut self, v: usize) -> Self {
        self.batch_lines = Some(v);
        self
    }
    pub fn strategy(mut self, v: AggregationStrategy) -> Self {
        self.strategy = Some(v);
        self
    }
    pub fn with_performance(mut self, cfg: PerformanceConfig) -> Self {
        self.threads = cfg.threads.or(self.threads);
        self.batch_lines = cfg.batch_lines.or(self.batch_lines);
        self.strategy = cfg.strategy.or(self.strategy);
        self
    }

    pub fn build(self) -> Options {
        // Start from default to inherit env overrides
        let mut opt = Options::default();
        if let Some(v) = self.threads {
            opt.threads = v.max(1);
        }
        if let Some(v) = self.batch_lines {
            opt.batch_lines = v.max(1);
        }
        if let Some(v) = self.strategy {
            opt.strategy = v;
        }
        opt
    }
}
