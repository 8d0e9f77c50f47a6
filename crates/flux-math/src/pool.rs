//! Reusable scratch storage for 3-component vectors.

use std::ops::{Index, IndexMut};

use crate::Vec3;

/// Handle to a vector slot inside a [`VectorPool`].
///
/// Only valid until the next [`VectorPool::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolVec(usize);

/// Arena of reusable 3D vectors indexed by a cursor.
///
/// Storage only grows: [`clear`](VectorPool::clear) rewinds the cursor but
/// keeps every slot, so repeated small computations within one build reuse
/// the same memory. The pool is not shared between threads; concurrent builds
/// own independent pools.
#[derive(Debug, Default)]
pub struct VectorPool {
    slots: Vec<Vec3>,
    cursor: usize,
}

impl VectorPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool with `capacity` preallocated slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Vec3::zeros(); capacity],
            cursor: 0,
        }
    }

    /// Take the next slot and initialize it to `v`.
    pub fn alloc(&mut self, v: Vec3) -> PoolVec {
        if self.cursor < self.slots.len() {
            self.slots[self.cursor] = v;
        } else {
            self.slots.push(v);
        }
        let handle = PoolVec(self.cursor);
        self.cursor += 1;
        handle
    }

    /// Take the next slot initialized to `(x, y, z)`.
    pub fn vec3(&mut self, x: f64, y: f64, z: f64) -> PoolVec {
        self.alloc(Vec3::new(x, y, z))
    }

    /// Copy of the vector at `handle`.
    pub fn get(&self, handle: PoolVec) -> Vec3 {
        self.slots[handle.0]
    }

    /// Number of slots handed out since the last clear.
    pub fn in_use(&self) -> usize {
        self.cursor
    }

    /// Number of slots ever allocated. Never decreases.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Rewind the cursor. Previously handed-out handles become stale.
    pub fn clear(&mut self) {
        self.cursor = 0;
    }
}

impl Index<PoolVec> for VectorPool {
    type Output = Vec3;

    fn index(&self, handle: PoolVec) -> &Vec3 {
        &self.slots[handle.0]
    }
}

impl IndexMut<PoolVec> for VectorPool {
    fn index_mut(&mut self, handle: PoolVec) -> &mut Vec3 {
        &mut self.slots[handle.0]
    }
}
