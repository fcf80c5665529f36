use dashmap::DashMap;

use crate::{parser::Entry, Stat, StatMap};

/// Syntactic parent: drop everything from the last `/`.
///
/// `/a` has parent `/`; `/` and separator-free paths have none.
#[inline]
pub fn parent_of(path: &str) -> Option<&str> {
    let idx = memchr::memrchr(b'/', path.as_bytes())?;
    if idx == 0 {
        if path.len() > 1 {
            Some("/")
        } else {
            None
        }
    } else {
        Some(&path[..idx])
    }
}

/// The path itself followed by every ancestor, nearest first.
#[derive(Clone, Debug)]
pub struct Ancestors<'a> {
    next: Option<&'a str>,
}

impl<'a> Ancestors<'a> {
    pub fn new(path: &'a str) -> Self {
        Self { next: Some(path) }
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let cur = self.next?;
        self.next = parent_of(cur);
        Some(cur)
    }
}

/// Sink for parsed entries.
pub trait Ingest {
    fn ingest(&mut self, entry: Entry<'_>);
}

/// Single-writer rollup map.
#[derive(Debug, Default)]
pub struct Aggregator {
    map: StatMap,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another aggregator's buckets into this one.
    pub fn merge(&mut self, other: Aggregator) {
        if self.map.is_empty() {
            self.map = other.map;
            return;
        }
        for (path, stat) in other.map {
            self.map.entry(path).or_default().merge(&stat);
        }
    }

    pub fn get(&self, path: &str) -> Option<&Stat> {
        self.map.get(path)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn into_map(self) -> StatMap {
        self.map
    }
}

impl Ingest for Aggregator {
    fn ingest(&mut self, entry: Entry<'_>) {
        for path in Ancestors::new(entry.path) {
            // avoid allocating a key for buckets that already exist
            if let Some(stat) = self.map.get_mut(path) {
                stat.record(entry.size, entry.is_dir);
            } else {
                let mut stat = Stat::default();
                stat.record(entry.size, entry.is_dir);
                self.map.insert(path.to_owned(), stat);
            }
        }
    }
}

/// Lock-per-key rollup map shared by all workers.
#[derive(Debug)]
pub struct SharedAggregator {
    map: DashMap<String, Stat, ahash::RandomState>,
}

impl Default for SharedAggregator {
    fn default() -> Self {
        Self {
            map: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }
}

impl SharedAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest_shared(&self, entry: Entry<'_>) {
        for path in Ancestors::new(entry.path) {
            // the shard guard must be released before `entry` locks it again
            if let Some(mut stat) = self.map.get_mut(path) {
                stat.record(entry.size, entry.is_dir);
                continue;
            }
            self.map
                .entry(path.to_owned())
                .or_default()
                .record(entry.size, entry.is_dir);
        }
    }

    pub fn get(&self, path: &str) -> Option<Stat> {
        self.map.get(path).map(|s| *s)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn into_map(self) -> StatMap {
        let mut out = StatMap::default();
        out.reserve(self.map.len());
        for (path, stat) in self.map {
            out.insert(path, stat);
        }
        out
    }
}

impl Ingest for &SharedAggregator {
    fn ingest(&mut self, entry: Entry<'_>) {
        self.ingest_shared(entry);
    }
}
