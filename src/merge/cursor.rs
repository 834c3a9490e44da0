//! Forward cursors over sorted postings lists
//!
//! A cursor never moves backwards and never touches the list it reads.
//! Exhaustion is reported through a virtual sentinel head rather than a
//! marker stored in the list, so abandoning a merge mid-flight leaves
//! every list exactly as it was.

/// Head value of an exhausted cursor; greater than any real string id
pub(crate) const FRONTIER_SENTINEL: u32 = u32::MAX;

/// Forward read cursor with lower-bound seeks and galloping probes
#[derive(Clone, Debug)]
pub(crate) struct ListCursor<'a> {
    list: &'a [u32],
    pos: usize,
}

impl<'a> ListCursor<'a> {
    pub fn new(list: &'a [u32]) -> Self {
        Self { list, pos: 0 }
    }

    /// Current element, or the sentinel once past the end
    pub fn head(&self) -> u32 {
        self.list.get(self.pos).copied().unwrap_or(FRONTIER_SENTINEL)
    }

    /// Step over the current element
    pub fn advance(&mut self) {
        if self.pos < self.list.len() {
            self.pos += 1;
        }
    }

    /// Move to the first element >= `target` without passing it
    pub fn seek(&mut self, target: u32) {
        let ahead = &self.list[self.pos.min(self.list.len())..];
        self.pos += ahead.partition_point(|&x| x < target);
    }

    /// Whether `id` occurs at or after the current position
    ///
    /// Doubles its step to bracket the target, then binary-searches the
    /// bracket, leaving the cursor at the lower bound. Amortized cost
    /// stays near-constant as long as successive targets never decrease,
    /// which holds for candidate ids arriving in ascending order.
    pub fn contains_from(&mut self, id: u32) -> bool {
        let list = self.list;
        if self.pos >= list.len() {
            return false;
        }
        if list[self.pos] >= id {
            return list[self.pos] == id;
        }

        // list[lo] < id from here on.
        let mut lo = self.pos;
        let mut step = 1usize;
        while lo + step < list.len() && list[lo + step] < id {
            lo += step;
            step <<= 1;
        }
        let hi = (lo + step).min(list.len());

        let offset = list[lo + 1..hi].partition_point(|&x| x < id);
        self.pos = lo + 1 + offset;
        self.pos < list.len() && list[self.pos] == id
    }
}
