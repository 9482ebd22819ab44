//! Bucket-count storage backing a [`crate::quantiles::DDSketch`].
//!
//! [`DenseStore`] grows without bound as new keys arrive. The two collapsing
//! variants cap memory at `bin_limit` bins by folding whichever tail (lowest
//! or highest keys) overflows the limit into its boundary bin, trading
//! accuracy on that tail for a hard memory ceiling.

use crate::common::{Result, SketchError};

/// Default chunk size new bin arrays are grown by, amortizing reallocation
/// over many single-bin extensions.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Fields and bin-array mechanics shared by all three dense store variants:
/// growing, shifting with zero-fill, and centering the window of keys the
/// backing array currently covers.
#[derive(Debug, Clone)]
struct DenseCore {
    bins: Vec<f64>,
    offset: i64,
    min_key: i64,
    max_key: i64,
    count: f64,
    chunk_size: usize,
}

impl DenseCore {
    fn new(chunk_size: usize) -> Self {
        DenseCore {
            bins: Vec::new(),
            offset: 0,
            min_key: i64::MAX,
            max_key: i64::MIN,
            count: 0.0,
            chunk_size,
        }
    }

    fn length(&self) -> usize {
        self.bins.len()
    }

    /// Rotates the bin array by `shift` positions, filling vacated slots
    /// with zero, and adjusts `offset` so `bins[i]` still refers to the same
    /// key as before the call for every key that survives the shift.
    fn shift_bins(&mut self, shift: i64) {
        let len = self.bins.len();
        if shift > 0 {
            let s = shift as usize;
            let mut shifted = vec![0.0; len];
            if s < len {
                shifted[s..].copy_from_slice(&self.bins[..len - s]);
            }
            self.bins = shifted;
        } else if shift < 0 {
            let s = (-shift) as usize;
            let mut shifted = vec![0.0; len];
            if s < len {
                shifted[..len - s].copy_from_slice(&self.bins[s..]);
            }
            self.bins = shifted;
        }
        self.offset -= shift;
    }

    /// Re-centers the backing array so the midpoint of `[new_min_key,
    /// new_max_key]` sits at the midpoint of the array.
    fn center_bins(&mut self, new_min_key: i64, new_max_key: i64) {
        let middle_key = new_min_key + (new_max_key - new_min_key + 1) / 2;
        let shift = self.offset + (self.length() as i64) / 2 - middle_key;
        self.shift_bins(shift);
    }

    fn hist(&self, keys: &[i64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(keys.len());
        let mut cursor = 0usize;
        let mut cumulative = 0.0;
        for &k in keys {
            while cursor < self.bins.len() && cursor as i64 + self.offset <= k {
                cumulative += self.bins[cursor];
                cursor += 1;
            }
            out.push(cumulative);
        }
        out
    }
}

/// An unbounded dense array of per-key counts. Grows to cover whatever
/// range of keys it is asked to store; never collapses.
#[derive(Debug, Clone)]
pub struct DenseStore {
    core: DenseCore,
}

impl Default for DenseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DenseStore {
    /// Builds an empty store using the default chunk size.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Builds an empty store that grows its backing array `chunk_size` bins
    /// at a time.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        DenseStore {
            core: DenseCore::new(chunk_size.max(1)),
        }
    }

    /// Total weight added to this store so far.
    pub fn count(&self) -> f64 {
        self.core.count
    }

    /// Smallest key this store currently has a bin for.
    pub fn min_key(&self) -> i64 {
        self.core.min_key
    }

    /// Largest key this store currently has a bin for.
    pub fn max_key(&self) -> i64 {
        self.core.max_key
    }

    /// Number of bins currently allocated.
    pub fn length(&self) -> usize {
        self.core.length()
    }

    /// Overwrites `self` with a deep copy of `other`.
    pub fn copy(&mut self, other: &DenseStore) {
        self.core = other.core.clone();
    }

    fn new_length(&self, new_min_key: i64, new_max_key: i64) -> usize {
        let desired = (new_max_key - new_min_key + 1) as usize;
        self.core.chunk_size * ((desired + self.core.chunk_size - 1) / self.core.chunk_size)
    }

    fn extend_range(&mut self, key: i64, second_key: i64) {
        let new_min_key = key.min(second_key).min(self.core.min_key);
        let new_max_key = key.max(second_key).max(self.core.max_key);

        if self.core.length() == 0 {
            self.core.bins = vec![0.0; self.new_length(new_min_key, new_max_key)];
            self.core.offset = new_min_key;
            self.adjust(new_min_key, new_max_key);
        } else if new_min_key >= self.core.min_key
            && new_max_key < self.core.offset + self.core.length() as i64
        {
            self.core.min_key = new_min_key;
            self.core.max_key = new_max_key;
        } else {
            let new_length = self.new_length(new_min_key, new_max_key);
            if new_length > self.core.length() {
                self.core.bins.extend(vec![0.0; new_length - self.core.length()]);
            }
            self.adjust(new_min_key, new_max_key);
        }
    }

    fn adjust(&mut self, new_min_key: i64, new_max_key: i64) {
        self.core.center_bins(new_min_key, new_max_key);
        self.core.min_key = new_min_key;
        self.core.max_key = new_max_key;
    }

    fn index_for(&mut self, key: i64) -> usize {
        if key < self.core.min_key || key > self.core.max_key {
            self.extend_range(key, key);
        }
        (key - self.core.offset) as usize
    }

    /// Adds `weight` to the bin for `key`, growing the backing array if
    /// needed.
    pub fn add(&mut self, key: i64, weight: f64) {
        let idx = self.index_for(key);
        self.core.bins[idx] += weight;
        self.core.count += weight;
    }

    /// Returns the key of the bin containing the `rank`-th item (0-indexed).
    /// With `lower == true`, ties resolve to the lowest such key; otherwise
    /// to the highest.
    pub fn key_at_rank(&self, rank: f64, lower: bool) -> i64 {
        let mut running = 0.0;
        for (i, &bin_count) in self.core.bins.iter().enumerate() {
            running += bin_count;
            if (lower && running > rank) || (!lower && running >= rank + 1.0) {
                return i as i64 + self.core.offset;
            }
        }
        self.core.max_key
    }

    /// Folds `other`'s counts into `self`, growing as needed. `other` is
    /// left untouched.
    pub fn merge(&mut self, other: &DenseStore) {
        if other.core.count == 0.0 {
            return;
        }
        if self.core.count == 0.0 {
            self.copy(other);
            return;
        }
        if other.core.min_key < self.core.min_key || other.core.max_key > self.core.max_key {
            self.extend_range(other.core.min_key, other.core.max_key);
        }
        for key in other.core.min_key..=other.core.max_key {
            self.core.bins[(key - self.core.offset) as usize] +=
                other.core.bins[(key - other.core.offset) as usize];
        }
        self.core.count += other.core.count;
    }

    /// For each key in `keys` (ascending), the cumulative count of bins at
    /// or below that key.
    pub fn hist(&self, keys: &[i64]) -> Vec<f64> {
        self.core.hist(keys)
    }
}

/// A dense store capped at `bin_limit` bins. Once the key range would
/// exceed the limit, the lowest-indexed bins are merged into the new
/// lowest bin, sacrificing resolution on small values to stay within the
/// memory bound.
#[derive(Debug, Clone)]
pub struct CollapsingLowestDenseStore {
    core: DenseCore,
    bin_limit: usize,
    is_collapsed: bool,
}

impl CollapsingLowestDenseStore {
    /// Builds an empty store that will never grow past `bin_limit` bins.
    pub fn new(bin_limit: usize) -> Self {
        Self::with_chunk_size(bin_limit, DEFAULT_CHUNK_SIZE)
    }

    /// As [`CollapsingLowestDenseStore::new`], with an explicit chunk size.
    pub fn with_chunk_size(bin_limit: usize, chunk_size: usize) -> Self {
        CollapsingLowestDenseStore {
            core: DenseCore::new(chunk_size.max(1)),
            bin_limit: bin_limit.max(1),
            is_collapsed: false,
        }
    }

    /// Total weight added to this store so far.
    pub fn count(&self) -> f64 {
        self.core.count
    }
    /// Smallest key this store currently has a bin for.
    pub fn min_key(&self) -> i64 {
        self.core.min_key
    }
    /// Largest key this store currently has a bin for.
    pub fn max_key(&self) -> i64 {
        self.core.max_key
    }
    /// Number of bins currently allocated.
    pub fn length(&self) -> usize {
        self.core.length()
    }
    /// The configured bin cap.
    pub fn bin_limit(&self) -> usize {
        self.bin_limit
    }
    /// Whether this store has ever collapsed its lowest bin.
    pub fn is_collapsed(&self) -> bool {
        self.is_collapsed
    }

    /// Overwrites `self` with a deep copy of `other`.
    pub fn copy(&mut self, other: &CollapsingLowestDenseStore) {
        self.core = other.core.clone();
        self.bin_limit = other.bin_limit;
        self.is_collapsed = other.is_collapsed;
    }

    fn new_length(&self, new_min_key: i64, new_max_key: i64) -> usize {
        let desired = (new_max_key - new_min_key + 1) as usize;
        let grown = self.core.chunk_size * ((desired + self.core.chunk_size - 1) / self.core.chunk_size);
        grown.min(self.bin_limit)
    }

    fn extend_range(&mut self, key: i64, second_key: i64) {
        let new_min_key = key.min(second_key).min(self.core.min_key);
        let new_max_key = key.max(second_key).max(self.core.max_key);

        if self.core.length() == 0 {
            self.core.bins = vec![0.0; self.new_length(new_min_key, new_max_key)];
            self.core.offset = new_min_key;
            self.adjust(new_min_key, new_max_key);
        } else if new_min_key >= self.core.min_key
            && new_max_key < self.core.offset + self.core.length() as i64
        {
            self.core.min_key = new_min_key;
            self.core.max_key = new_max_key;
        } else {
            let new_length = self.new_length(new_min_key, new_max_key);
            if new_length > self.core.length() {
                self.core.bins.extend(vec![0.0; new_length - self.core.length()]);
            }
            self.adjust(new_min_key, new_max_key);
        }
    }

    fn adjust(&mut self, new_min_key: i64, new_max_key: i64) {
        if new_max_key - new_min_key + 1 > self.core.length() as i64 {
            let new_min_key = new_max_key - self.core.length() as i64 + 1;

            if new_min_key >= self.core.max_key {
                self.core.offset = new_min_key;
                self.core.min_key = new_min_key;
                let total = self.core.count;
                for b in self.core.bins.iter_mut() {
                    *b = 0.0;
                }
                if let Some(first) = self.core.bins.first_mut() {
                    *first = total;
                }
            } else {
                let shift = self.core.offset - new_min_key;
                if shift < 0 {
                    let collapse_start = (self.core.min_key - self.core.offset) as usize;
                    let collapse_end = (new_min_key - self.core.offset) as usize;
                    let collapsed: f64 = self.core.bins[collapse_start..collapse_end].iter().sum();
                    for b in self.core.bins[collapse_start..collapse_end].iter_mut() {
                        *b = 0.0;
                    }
                    self.core.bins[collapse_end] += collapsed;
                    self.core.min_key = new_min_key;
                    self.core.shift_bins(shift);
                } else {
                    self.core.min_key = new_min_key;
                    self.core.shift_bins(shift);
                }
            }
            self.core.max_key = new_max_key;
            self.is_collapsed = true;
        } else {
            self.core.center_bins(new_min_key, new_max_key);
            self.core.min_key = new_min_key;
            self.core.max_key = new_max_key;
        }
    }

    fn index_for(&mut self, key: i64) -> usize {
        if key < self.core.min_key {
            if self.is_collapsed {
                return 0;
            }
            self.extend_range(key, key);
            if self.is_collapsed {
                return 0;
            }
        } else if key > self.core.max_key {
            self.extend_range(key, key);
        }
        (key - self.core.offset) as usize
    }

    /// Adds `weight` to the bin for `key`, collapsing the lowest bin if
    /// `key` would push the store past its bin limit.
    pub fn add(&mut self, key: i64, weight: f64) {
        let idx = self.index_for(key);
        self.core.bins[idx] += weight;
        self.core.count += weight;
    }

    /// See [`DenseStore::key_at_rank`].
    pub fn key_at_rank(&self, rank: f64, lower: bool) -> i64 {
        let mut running = 0.0;
        for (i, &bin_count) in self.core.bins.iter().enumerate() {
            running += bin_count;
            if (lower && running > rank) || (!lower && running >= rank + 1.0) {
                return i as i64 + self.core.offset;
            }
        }
        self.core.max_key
    }

    /// Folds `other`'s counts into `self`. `other` is left untouched.
    pub fn merge(&mut self, other: &CollapsingLowestDenseStore) {
        if other.core.count == 0.0 {
            return;
        }
        if self.core.count == 0.0 {
            self.copy(other);
            return;
        }

        if other.core.min_key < self.core.min_key || other.core.max_key > self.core.max_key {
            self.extend_range(other.core.min_key, other.core.max_key);
        }

        let collapse_start_idx = other.core.min_key - other.core.offset;
        let collapse_end_idx = self.core.min_key.min(other.core.max_key + 1) - other.core.offset;
        let resume_key = if collapse_end_idx > collapse_start_idx {
            let s = collapse_start_idx as usize;
            let e = collapse_end_idx as usize;
            let collapsed: f64 = other.core.bins[s..e].iter().sum();
            self.core.bins[0] += collapsed;
            collapse_end_idx + other.core.offset
        } else {
            collapse_start_idx + other.core.offset
        };

        let mut key = resume_key;
        while key <= other.core.max_key {
            self.core.bins[(key - self.core.offset) as usize] +=
                other.core.bins[(key - other.core.offset) as usize];
            key += 1;
        }

        self.core.count += other.core.count;
    }

    /// See [`DenseStore::hist`].
    pub fn hist(&self, keys: &[i64]) -> Vec<f64> {
        self.core.hist(keys)
    }
}

/// The mirror image of [`CollapsingLowestDenseStore`]: once the key range
/// would exceed `bin_limit`, the highest-indexed bins are merged into the
/// new highest bin.
#[derive(Debug, Clone)]
pub struct CollapsingHighestDenseStore {
    core: DenseCore,
    bin_limit: usize,
    is_collapsed: bool,
}

impl CollapsingHighestDenseStore {
    /// Builds an empty store that will never grow past `bin_limit` bins.
    pub fn new(bin_limit: usize) -> Self {
        Self::with_chunk_size(bin_limit, DEFAULT_CHUNK_SIZE)
    }

    /// As [`CollapsingHighestDenseStore::new`], with an explicit chunk size.
    pub fn with_chunk_size(bin_limit: usize, chunk_size: usize) -> Self {
        CollapsingHighestDenseStore {
            core: DenseCore::new(chunk_size.max(1)),
            bin_limit: bin_limit.max(1),
            is_collapsed: false,
        }
    }

    /// Total weight added to this store so far.
    pub fn count(&self) -> f64 {
        self.core.count
    }
    /// Smallest key this store currently has a bin for.
    pub fn min_key(&self) -> i64 {
        self.core.min_key
    }
    /// Largest key this store currently has a bin for.
    pub fn max_key(&self) -> i64 {
        self.core.max_key
    }
    /// Number of bins currently allocated.
    pub fn length(&self) -> usize {
        self.core.length()
    }
    /// The configured bin cap.
    pub fn bin_limit(&self) -> usize {
        self.bin_limit
    }
    /// Whether this store has ever collapsed its highest bin.
    pub fn is_collapsed(&self) -> bool {
        self.is_collapsed
    }

    /// Overwrites `self` with a deep copy of `other`.
    pub fn copy(&mut self, other: &CollapsingHighestDenseStore) {
        self.core = other.core.clone();
        self.bin_limit = other.bin_limit;
        self.is_collapsed = other.is_collapsed;
    }

    fn new_length(&self, new_min_key: i64, new_max_key: i64) -> usize {
        let desired = (new_max_key - new_min_key + 1) as usize;
        let grown = self.core.chunk_size * ((desired + self.core.chunk_size - 1) / self.core.chunk_size);
        grown.min(self.bin_limit)
    }

    fn extend_range(&mut self, key: i64, second_key: i64) {
        let new_min_key = key.min(second_key).min(self.core.min_key);
        let new_max_key = key.max(second_key).max(self.core.max_key);

        if self.core.length() == 0 {
            self.core.bins = vec![0.0; self.new_length(new_min_key, new_max_key)];
            self.core.offset = new_min_key;
            self.adjust(new_min_key, new_max_key);
        } else if new_min_key >= self.core.min_key
            && new_max_key < self.core.offset + self.core.length() as i64
        {
            self.core.min_key = new_min_key;
            self.core.max_key = new_max_key;
        } else {
            let new_length = self.new_length(new_min_key, new_max_key);
            if new_length > self.core.length() {
                self.core.bins.extend(vec![0.0; new_length - self.core.length()]);
            }
            self.adjust(new_min_key, new_max_key);
        }
    }

    fn adjust(&mut self, new_min_key: i64, new_max_key: i64) {
        if new_max_key - new_min_key + 1 > self.core.length() as i64 {
            let new_max_key = new_min_key + self.core.length() as i64 - 1;

            if new_max_key <= self.core.min_key {
                self.core.offset = new_min_key;
                self.core.max_key = new_max_key;
                let total = self.core.count;
                for b in self.core.bins.iter_mut() {
                    *b = 0.0;
                }
                if let Some(last) = self.core.bins.last_mut() {
                    *last = total;
                }
            } else {
                let shift = self.core.offset - new_min_key;
                if shift > 0 {
                    let collapse_start = (new_max_key - self.core.offset + 1) as usize;
                    let collapse_end = (self.core.max_key - self.core.offset + 1) as usize;
                    let collapsed: f64 = self.core.bins[collapse_start..collapse_end].iter().sum();
                    for b in self.core.bins[collapse_start..collapse_end].iter_mut() {
                        *b = 0.0;
                    }
                    self.core.bins[collapse_start - 1] += collapsed;
                    self.core.max_key = new_max_key;
                    self.core.shift_bins(shift);
                } else {
                    self.core.max_key = new_max_key;
                    self.core.shift_bins(shift);
                }
            }
            self.core.min_key = new_min_key;
            self.is_collapsed = true;
        } else {
            self.core.center_bins(new_min_key, new_max_key);
            self.core.min_key = new_min_key;
            self.core.max_key = new_max_key;
        }
    }

    fn index_for(&mut self, key: i64) -> usize {
        if key > self.core.max_key {
            if self.is_collapsed {
                return self.core.length() - 1;
            }
            self.extend_range(key, key);
            if self.is_collapsed {
                return self.core.length() - 1;
            }
        } else if key < self.core.min_key {
            self.extend_range(key, key);
        }
        (key - self.core.offset) as usize
    }

    /// Adds `weight` to the bin for `key`, collapsing the highest bin if
    /// `key` would push the store past its bin limit.
    pub fn add(&mut self, key: i64, weight: f64) {
        let idx = self.index_for(key);
        self.core.bins[idx] += weight;
        self.core.count += weight;
    }

    /// See [`DenseStore::key_at_rank`].
    pub fn key_at_rank(&self, rank: f64, lower: bool) -> i64 {
        let mut running = 0.0;
        for (i, &bin_count) in self.core.bins.iter().enumerate() {
            running += bin_count;
            if (lower && running > rank) || (!lower && running >= rank + 1.0) {
                return i as i64 + self.core.offset;
            }
        }
        self.core.max_key
    }

    /// Folds `other`'s counts into `self`. `other` is left untouched.
    pub fn merge(&mut self, other: &CollapsingHighestDenseStore) {
        if other.core.count == 0.0 {
            return;
        }
        if self.core.count == 0.0 {
            self.copy(other);
            return;
        }

        if other.core.min_key < self.core.min_key || other.core.max_key > self.core.max_key {
            self.extend_range(other.core.min_key, other.core.max_key);
        }

        let collapse_end_idx = other.core.max_key - other.core.offset + 1;
        let collapse_start_idx = (self.core.max_key + 1).max(other.core.min_key) - other.core.offset;
        let collapse_boundary = if collapse_end_idx > collapse_start_idx {
            let s = collapse_start_idx as usize;
            let e = collapse_end_idx as usize;
            let collapsed: f64 = other.core.bins[s..e].iter().sum();
            if let Some(last) = self.core.bins.last_mut() {
                *last += collapsed;
            }
            collapse_start_idx
        } else {
            collapse_end_idx
        };

        let upper_exclusive = collapse_boundary + other.core.offset;
        let mut key = other.core.min_key;
        while key < upper_exclusive {
            self.core.bins[(key - self.core.offset) as usize] +=
                other.core.bins[(key - other.core.offset) as usize];
            key += 1;
        }

        self.core.count += other.core.count;
    }

    /// See [`DenseStore::hist`].
    pub fn hist(&self, keys: &[i64]) -> Vec<f64> {
        self.core.hist(keys)
    }
}

/// The union of the three concrete store kinds, letting [`crate::quantiles::DDSketch`]
/// hold either a bounded or unbounded store behind one type. An enum rather
/// than a trait object: the set of store kinds is closed, and callers
/// usually need to know which kind they are dealing with anyway (the bin
/// limit, the collapse flag) in a way a `dyn Trait` would hide.
#[derive(Debug, Clone)]
pub enum Store {
    /// See [`DenseStore`].
    Dense(DenseStore),
    /// See [`CollapsingLowestDenseStore`].
    CollapsingLowest(CollapsingLowestDenseStore),
    /// See [`CollapsingHighestDenseStore`].
    CollapsingHighest(CollapsingHighestDenseStore),
}

impl Store {
    /// Total weight added to this store so far.
    pub fn count(&self) -> f64 {
        match self {
            Store::Dense(s) => s.count(),
            Store::CollapsingLowest(s) => s.count(),
            Store::CollapsingHighest(s) => s.count(),
        }
    }

    /// Smallest key this store currently has a bin for.
    pub fn min_key(&self) -> i64 {
        match self {
            Store::Dense(s) => s.min_key(),
            Store::CollapsingLowest(s) => s.min_key(),
            Store::CollapsingHighest(s) => s.min_key(),
        }
    }

    /// Largest key this store currently has a bin for.
    pub fn max_key(&self) -> i64 {
        match self {
            Store::Dense(s) => s.max_key(),
            Store::CollapsingLowest(s) => s.max_key(),
            Store::CollapsingHighest(s) => s.max_key(),
        }
    }

    /// Number of bins currently allocated.
    pub fn length(&self) -> usize {
        match self {
            Store::Dense(s) => s.length(),
            Store::CollapsingLowest(s) => s.length(),
            Store::CollapsingHighest(s) => s.length(),
        }
    }

    /// Adds `weight` to the bin for `key`.
    pub fn add(&mut self, key: i64, weight: f64) {
        match self {
            Store::Dense(s) => s.add(key, weight),
            Store::CollapsingLowest(s) => s.add(key, weight),
            Store::CollapsingHighest(s) => s.add(key, weight),
        }
    }

    /// See [`DenseStore::key_at_rank`].
    pub fn key_at_rank(&self, rank: f64, lower: bool) -> i64 {
        match self {
            Store::Dense(s) => s.key_at_rank(rank, lower),
            Store::CollapsingLowest(s) => s.key_at_rank(rank, lower),
            Store::CollapsingHighest(s) => s.key_at_rank(rank, lower),
        }
    }

    /// For each key in `keys` (ascending), the cumulative count of bins at
    /// or below that key.
    pub fn hist(&self, keys: &[i64]) -> Vec<f64> {
        match self {
            Store::Dense(s) => s.hist(keys),
            Store::CollapsingLowest(s) => s.hist(keys),
            Store::CollapsingHighest(s) => s.hist(keys),
        }
    }

    /// Overwrites `self` with a deep copy of `other`.
    pub fn copy(&mut self, other: &Store) {
        *self = other.clone();
    }

    /// Folds `other`'s counts into `self`. Fails if the two stores are of
    /// different kinds (e.g. one collapsing, one not) and both already hold
    /// data, since collapsed tails cannot be reconstructed.
    pub fn merge(&mut self, other: &Store) -> Result<()> {
        match (self, other) {
            (Store::Dense(a), Store::Dense(b)) => {
                a.merge(b);
                Ok(())
            }
            (Store::CollapsingLowest(a), Store::CollapsingLowest(b)) => {
                a.merge(b);
                Ok(())
            }
            (Store::CollapsingHighest(a), Store::CollapsingHighest(b)) => {
                a.merge(b);
                Ok(())
            }
            _ => Err(SketchError::IncompatibleSketches {
                reason: "cannot merge stores of different kinds".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_store_grows_and_tracks_count() {
        let mut s = DenseStore::new();
        s.add(5, 1.0);
        s.add(-3, 2.0);
        s.add(100, 1.0);
        assert_eq!(s.count(), 4.0);
        assert_eq!(s.min_key(), -3);
        assert_eq!(s.max_key(), 100);
    }

    #[test]
    fn dense_store_key_at_rank_matches_insertion_order() {
        let mut s = DenseStore::new();
        for k in 0..10 {
            s.add(k, 1.0);
        }
        assert_eq!(s.key_at_rank(0.0, true), 0);
        assert_eq!(s.key_at_rank(9.0, true), 9);
    }

    #[test]
    fn dense_store_merge_is_commutative_in_effect() {
        let mut a = DenseStore::new();
        let mut b = DenseStore::new();
        for k in [1, 2, 3, -5] {
            a.add(k, 1.0);
        }
        for k in [2, 4, 10] {
            b.add(k, 1.0);
        }
        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);
        assert_eq!(ab.count(), ba.count());
        assert_eq!(ab.min_key(), ba.min_key());
        assert_eq!(ab.max_key(), ba.max_key());
    }

    #[test]
    fn dense_store_merge_does_not_mutate_source() {
        let mut a = DenseStore::new();
        a.add(1, 1.0);
        let mut b = DenseStore::new();
        b.add(2, 1.0);
        let b_before = b.count();
        a.merge(&b);
        assert_eq!(b.count(), b_before);
    }

    #[test]
    fn collapsing_lowest_store_respects_bin_limit_under_wide_range() {
        let mut s = CollapsingLowestDenseStore::new(20);
        s.add(i64::MAX / 2, 1.0);
        s.add(-(i64::MAX / 2), 1.0);
        for k in -10..10 {
            s.add(k, 1.0);
        }
        assert!(s.length() <= 20);
        assert!(s.is_collapsed());
        assert_eq!(s.count(), 22.0);
    }

    #[test]
    fn collapsing_highest_store_respects_bin_limit_under_wide_range() {
        let mut s = CollapsingHighestDenseStore::new(20);
        s.add(i64::MAX / 2, 1.0);
        s.add(-(i64::MAX / 2), 1.0);
        for k in -10..10 {
            s.add(k, 1.0);
        }
        assert!(s.length() <= 20);
        assert!(s.is_collapsed());
        assert_eq!(s.count(), 22.0);
    }

    #[test]
    fn collapsing_lowest_store_merge_preserves_total_count() {
        let mut a = CollapsingLowestDenseStore::new(16);
        let mut b = CollapsingLowestDenseStore::new(16);
        for k in 0..50 {
            a.add(k, 1.0);
        }
        for k in -50..0 {
            b.add(k, 1.0);
        }
        a.merge(&b);
        assert_eq!(a.count(), 100.0);
    }

    #[test]
    fn collapsing_highest_store_merge_preserves_total_count() {
        let mut a = CollapsingHighestDenseStore::new(16);
        let mut b = CollapsingHighestDenseStore::new(16);
        for k in 0..50 {
            a.add(k, 1.0);
        }
        for k in -50..0 {
            b.add(k, 1.0);
        }
        a.merge(&b);
        assert_eq!(a.count(), 100.0);
    }

    #[test]
    fn store_enum_rejects_cross_kind_merge() {
        let mut a = Store::Dense(DenseStore::new());
        a.add(1, 1.0);
        let mut b = Store::CollapsingLowest(CollapsingLowestDenseStore::new(16));
        b.add(1, 1.0);
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn key_at_rank_matches_worked_example() {
        let mut s = DenseStore::new();
        s.add(4, 1.0);
        s.add(10, 1.0);
        s.add(100, 1.0);

        assert_eq!(s.key_at_rank(0.0, true), 4);
        assert_eq!(s.key_at_rank(1.0, true), 10);
        assert_eq!(s.key_at_rank(2.0, true), 100);
        assert_eq!(s.key_at_rank(0.5, true), 4);
        assert_eq!(s.key_at_rank(1.5, true), 10);
        assert_eq!(s.key_at_rank(0.0, false), 4);
        assert_eq!(s.key_at_rank(0.5, false), 10);
    }

    #[test]
    fn shift_bins_zero_fills_vacated_slots() {
        let mut core = DenseCore::new(4);
        core.bins = vec![1.0, 2.0, 3.0, 4.0];
        core.offset = 0;
        core.shift_bins(2);
        assert_eq!(core.bins, vec![0.0, 0.0, 1.0, 2.0]);
        assert_eq!(core.offset, -2);
    }

    #[test]
    fn shift_bins_negative_shift() {
        let mut core = DenseCore::new(4);
        core.bins = vec![1.0, 2.0, 3.0, 4.0];
        core.offset = 0;
        core.shift_bins(-1);
        assert_eq!(core.bins, vec![2.0, 3.0, 4.0, 0.0]);
        assert_eq!(core.offset, 1);
    }
}
