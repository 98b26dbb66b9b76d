//! Indexed binary min-heap with decrease-key.
//!
//! A heap over a fixed universe of node ids `0..n`, keyed by a distance array
//! the heap owns. Unlike `std::collections::BinaryHeap`, every node has a
//! tracked slot, so a key can be lowered in place instead of pushing a stale
//! duplicate. This is the priority queue behind one side of the bidirectional
//! Dijkstra expansion in [`crate::subnet`].
//!
//! Node positions are tri-state ([`Position`]). A node that was popped is
//! `Settled` and stays out of the heap for the rest of the run, while its
//! distance remains readable.
//!
//! # Complexity
//!
//! - `insert`, `decrease_key`, `pop_min`: O(log len)
//! - membership / position / distance lookup: O(1)

/// Where a node currently lives with respect to the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Never discovered, distance is infinite.
    Absent,
    /// Held in the given heap slot (0 is the root).
    InHeap(usize),
    /// Popped; its distance is final.
    Settled,
}

/// Binary min-heap over node ids with O(1) position lookup.
#[derive(Debug, Clone)]
pub struct IndexedMinHeap {
    /// slot -> node
    slots: Vec<usize>,
    /// node -> position
    positions: Vec<Position>,
    /// node -> best known distance
    dist: Vec<f64>,
}

impl IndexedMinHeap {
    /// Empty heap over `n` nodes, all distances infinite.
    pub fn new(n: usize) -> Self {
        Self {
            slots: Vec::with_capacity(n),
            positions: vec![Position::Absent; n],
            dist: vec![f64::INFINITY; n],
        }
    }

    /// Heap over `n` nodes seeded with `source` at distance 0.
    ///
    /// # Panics
    ///
    /// Panics if `source >= n`.
    pub fn with_source(n: usize, source: usize) -> Self {
        let mut heap = Self::new(n);
        heap.dist[source] = 0.0;
        heap.insert(source);
        heap
    }

    /// Number of nodes currently held.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Size of the node universe.
    #[inline]
    pub fn universe(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn position(&self, node: usize) -> Position {
        self.positions[node]
    }

    #[inline]
    pub fn is_settled(&self, node: usize) -> bool {
        self.positions[node] == Position::Settled
    }

    #[inline]
    pub fn distance(&self, node: usize) -> f64 {
        self.dist[node]
    }

    pub fn distances(&self) -> &[f64] {
        &self.dist
    }

    /// Consume the heap, keeping only the distance array.
    pub fn into_distances(self) -> Vec<f64> {
        self.dist
    }

    /// Node at the root without removing it.
    pub fn peek_min(&self) -> Option<usize> {
        self.slots.first().copied()
    }

    /// Overwrite a node's key. Callers must follow with [`Self::decrease_key`]
    /// when the node is held and the key went down.
    pub fn set_distance(&mut self, node: usize, dist: f64) {
        self.dist[node] = dist;
    }

    /// Append `node` at the next free slot and sift it toward the root.
    ///
    /// A node already in the heap is only re-sifted; a settled node is left alone.
    pub fn insert(&mut self, node: usize) {
        match self.positions[node] {
            Position::Absent => {
                let slot = self.slots.len();
                self.slots.push(node);
                self.positions[node] = Position::InHeap(slot);
                self.sift_up(slot);
            }
            Position::InHeap(slot) => self.sift_up(slot),
            Position::Settled => {}
        }
    }

    /// Restore heap order after `node`'s key was lowered.
    ///
    /// Absent nodes are inserted, which makes this usable right after the
    /// first relaxation of a freshly discovered node.
    pub fn decrease_key(&mut self, node: usize) {
        self.insert(node);
    }

    /// Lower `node`'s distance to `dist` if that is an improvement.
    ///
    /// Returns `true` when the distance changed. Settled nodes are never reopened.
    pub fn relax(&mut self, node: usize, dist: f64) -> bool {
        if self.is_settled(node) || dist >= self.dist[node] {
            return false;
        }
        self.dist[node] = dist;
        self.decrease_key(node);
        true
    }

    /// Remove and return the node with the smallest key.
    ///
    /// The last slot moves into the root and sifts down, choosing the smaller
    /// child at each level (left child on equal keys).
    pub fn pop_min(&mut self) -> Option<usize> {
        let last = self.slots.pop()?;
        let min = if self.slots.is_empty() {
            last
        } else {
            let root = self.slots[0];
            self.slots[0] = last;
            self.positions[last] = Position::InHeap(0);
            self.sift_down(0);
            root
        };
        self.positions[min] = Position::Settled;
        Some(min)
    }

    fn sift_up(&mut self, mut slot: usize) {
        let node = self.slots[slot];
        let key = self.dist[node];
        while slot > 0 {
            let parent_slot = (slot - 1) / 2;
            let parent = self.slots[parent_slot];
            if self.dist[parent] <= key {
                break;
            }
            self.slots[slot] = parent;
            self.positions[parent] = Position::InHeap(slot);
            slot = parent_slot;
        }
        self.slots[slot] = node;
        self.positions[node] = Position::InHeap(slot);
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.slots.len();
        let node = self.slots[slot];
        let key = self.dist[node];
        loop {
            let left = 2 * slot + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut child = left;
            if right < len && self.dist[self.slots[right]] < self.dist[self.slots[left]] {
                child = right;
            }
            let child_node = self.slots[child];
            if key < self.dist[child_node] {
                break;
            }
            self.slots[slot] = child_node;
            self.positions[child_node] = Position::InHeap(slot);
            slot = child;
        }
        self.slots[slot] = node;
        self.positions[node] = Position::InHeap(slot);
    }

    /// Check the heap property and slot bookkeeping. Test helper.
    #[cfg(test)]
    pub(crate) fn is_valid(&self) -> bool {
        for (slot, &node) in self.slots.iter().enumerate() {
            if self.positions[node] != Position::InHeap(slot) {
                return false;
            }
            if slot > 0 {
                let parent = self.slots[(slot - 1) / 2];
                if self.dist[parent] > self.dist[node] {
                    return false;
                }
            }
        }
        true
    }
}
