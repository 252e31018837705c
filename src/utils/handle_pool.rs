use std::cmp::Ordering;
use std::collections::binary_heap::BinaryHeap;
use std::marker::PhantomData;

use super::handle::{HandleIndex, HandleLike};

#[derive(PartialEq, Eq)]
struct InverseHandleIndex(HandleIndex);

impl PartialOrd for InverseHandleIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        other.0.partial_cmp(&self.0)
    }
}

impl Ord for InverseHandleIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp(&self.0)
    }
}

/// `HandlePool` manages the manipulations of a `Handle` collection, which are
/// created with a continuous `index` field. It also has the ability to find
/// out the current status of a specified `Handle`.
#[derive(Default)]
pub struct HandlePool<H: HandleLike> {
    versions: Vec<HandleIndex>,
    frees: BinaryHeap<InverseHandleIndex>,
    _marker: PhantomData<H>,
}

impl<H: HandleLike> HandlePool<H> {
    /// Constructs a new, empty `HandlePool`.
    pub fn new() -> Self {
        HandlePool {
            versions: Vec::new(),
            frees: BinaryHeap::new(),
            _marker: PhantomData,
        }
    }

    /// Constructs a new `HandlePool` with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        HandlePool {
            versions: Vec::with_capacity(capacity),
            frees: BinaryHeap::with_capacity(capacity),
            _marker: PhantomData,
        }
    }

    /// Creates an unused `Handle`. Recycled indices are preferred, smallest
    /// first.
    pub fn create(&mut self) -> H {
        if let Some(index) = self.frees.pop() {
            let index = index.0 as usize;
            self.versions[index] += 1;
            H::new(index as HandleIndex, self.versions[index])
        } else {
            self.versions.push(1);
            H::new(self.versions.len() as HandleIndex - 1, 1)
        }
    }

    /// Returns true if this `Handle` was created by this `HandlePool`, and
    /// has not been freed yet.
    pub fn contains(&self, handle: H) -> bool {
        let index = handle.index() as usize;
        self.contains_at(index) && (self.versions[index] == handle.version())
    }

    #[inline]
    fn contains_at(&self, index: usize) -> bool {
        (index < self.versions.len()) && ((self.versions[index] & 0x1) == 1)
    }

    /// Recycles the `Handle` index, and marks its version as dead.
    pub fn free(&mut self, handle: H) -> bool {
        if !self.contains(handle) {
            false
        } else {
            self.versions[handle.index() as usize] += 1;
            self.frees.push(InverseHandleIndex(handle.index()));
            true
        }
    }

    /// Returns the total number of alive handles in this `HandlePool`.
    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len() - self.frees.len()
    }

    /// Checks if the pool is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over the alive handles.
    #[inline]
    pub fn iter(&self) -> Iter<H> {
        Iter {
            versions: &self.versions,
            index: 0,
            _marker: PhantomData,
        }
    }
}

/// Immutable `HandlePool` iterator, this struct is created by the `iter`
/// method on `HandlePool`.
pub struct Iter<'a, H: HandleLike> {
    versions: &'a [HandleIndex],
    index: HandleIndex,
    _marker: PhantomData<H>,
}

impl<'a, H: HandleLike> Iterator for Iter<'a, H> {
    type Item = H;

    fn next(&mut self) -> Option<H> {
        while (self.index as usize) < self.versions.len() {
            let v = self.versions[self.index as usize];
            let index = self.index;
            self.index += 1;

            if v & 0x1 == 1 {
                return Some(H::new(index, v));
            }
        }

        None
    }
}

#[cfg(test)]
mod test {
    use super::super::handle::Handle;
    use super::*;

    #[test]
    fn basic() {
        let mut pool: HandlePool<Handle> = HandlePool::new();
        assert_eq!(pool.len(), 0);

        let h1 = pool.create();
        assert!(h1.is_valid());
        assert!(pool.contains(h1));
        assert_eq!(pool.len(), 1);

        assert!(pool.free(h1));
        assert!(!pool.contains(h1));
        assert!(!pool.free(h1));
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn index_reuse() {
        let mut pool: HandlePool<Handle> = HandlePool::new();

        let mut v = Vec::new();
        for _ in 0..10 {
            v.push(pool.create());
        }

        assert_eq!(pool.len(), 10);
        for h in &v {
            pool.free(*h);
        }

        for _ in 0..10 {
            let h = pool.create();
            assert!((h.index() as usize) < v.len());
            assert_ne!(v[h.index() as usize].version(), h.version());
        }
    }

    #[test]
    fn iter() {
        let mut pool: HandlePool<Handle> = HandlePool::new();
        let mut v = Vec::new();
        for _ in 0..6 {
            v.push(pool.create());
        }

        pool.free(v[1]);
        pool.free(v[4]);

        let alive: Vec<Handle> = pool.iter().collect();
        assert_eq!(alive, vec![v[0], v[2], v[3], v[5]]);
    }
}
