/// Per-entity lists of overlapped bins.
///
/// Slots are addressed by entity index. A slot's capacity is a high-water mark:
/// it grows geometrically when an entity overlaps more bins than ever before
/// and never shrinks, so repeated rebuilds stop reallocating once the largest
/// elements have been seen. Slots beyond the current entity count are kept.
#[derive(Clone, Debug, Default)]
pub struct OverlapRecords {
    bins: Vec<Vec<usize>>,
    capacity: Vec<usize>,
    active: usize,
}

impl OverlapRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties every slot and makes the first `count` active, adding slots as needed.
    pub fn prepare(&mut self, count: usize) {
        self.bins.iter_mut().for_each(|b| b.clear());
        if self.bins.len() < count {
            self.bins.resize_with(count, Vec::new);
            self.capacity.resize(count, 0);
        }
        self.active = count;
    }

    /// Makes room for `needed` bins in `slot`.
    pub fn reserve(&mut self, slot: usize, needed: usize) {
        let current = self.capacity[slot];
        if needed > current {
            let grown = needed.max(2 * current);
            self.bins[slot].reserve_exact(grown);
            self.capacity[slot] = grown;
            log::trace!("overlap record {} grown from {} to {} bins", slot, current, grown);
        }
    }

    pub fn push(&mut self, slot: usize, bin: usize) {
        self.bins[slot].push(bin);
    }

    /// Bins overlapped by the entity in `slot`; empty for inactive slots.
    pub fn get(&self, slot: usize) -> &[usize] {
        if slot < self.active {
            &self.bins[slot]
        } else {
            &[]
        }
    }

    pub fn capacity(&self, slot: usize) -> usize {
        self.capacity.get(slot).copied().unwrap_or(0)
    }

    pub fn active(&self) -> usize {
        self.active
    }

    /// Slots allocated so far, active or not.
    pub fn slots(&self) -> usize {
        self.bins.len()
    }

    pub fn memory_usage(&self) -> usize {
        let lists: usize = self.bins.iter().map(|b| b.capacity() * std::mem::size_of::<usize>()).sum();
        lists + self.bins.capacity() * std::mem::size_of::<Vec<usize>>() + self.capacity.capacity() * std::mem::size_of::<usize>()
    }
}
