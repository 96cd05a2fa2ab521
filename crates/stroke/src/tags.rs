//! Scratch per-point marks
//!
//! Marching, dissolving and island splitting need one transient bit per
//! point. That bit lives here, sized to the stroke and owned by the caller,
//! so the persistent [`crate::Point`] never carries algorithm state.

const WORD_BITS: usize = 64;

/// Fixed-size bitset with one bit per stroke point
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointTags {
    words: Vec<u64>,
    len: usize,
}

impl PointTags {
    /// All bits cleared
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    /// Tags built from a predicate over point indices
    pub fn from_fn(len: usize, mut tagged: impl FnMut(usize) -> bool) -> Self {
        let mut tags = Self::new(len);
        for i in 0..len {
            if tagged(i) {
                tags.set(i);
            }
        }
        tags
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Out of range indices read as untagged
    pub fn get(&self, index: usize) -> bool {
        index < self.len && self.words[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
    }

    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.len, "tag index {index} out of range");
        if index < self.len {
            self.words[index / WORD_BITS] |= 1u64 << (index % WORD_BITS);
        }
    }

    pub fn unset(&mut self, index: usize) {
        if index < self.len {
            self.words[index / WORD_BITS] &= !(1u64 << (index % WORD_BITS));
        }
    }

    /// Clear every bit and resize to `len`
    pub fn reset(&mut self, len: usize) {
        self.words.clear();
        self.words.resize(len.div_ceil(WORD_BITS), 0);
        self.len = len;
    }

    /// Number of tagged points
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn any(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    /// Indices of tagged points in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&i| self.get(i))
    }
}
