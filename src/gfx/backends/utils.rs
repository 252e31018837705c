//! Storage helpers shared by backend implementations: handle-indexed tables
//! for native objects and the structural caches that deduplicate linked
//! pipelines and vertex-array objects.

use crate::gfx::errors::Result;
use crate::gfx::{MAX_SHADER_STAGES, MAX_VERTEX_BUFFER_SLOTS};
use crate::utils::handle::HandleLike;
use crate::utils::hash::FastHashMap;

/// A dense table of backend-side objects addressed by handle index. The
/// facade guarantees handle liveness, so the table only stores payloads.
pub struct DataVec<H: HandleLike, T: Sized> {
    buf: Vec<Option<T>>,
    _marker: ::std::marker::PhantomData<H>,
}

impl<H: HandleLike, T: Sized> DataVec<H, T> {
    pub fn new() -> Self {
        DataVec {
            buf: Vec::new(),
            _marker: ::std::marker::PhantomData,
        }
    }

    #[inline]
    pub fn get(&self, handle: H) -> Option<&T> {
        self.buf.get(handle.index() as usize).and_then(|v| v.as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.buf
            .get_mut(handle.index() as usize)
            .and_then(|v| v.as_mut())
    }

    pub fn create(&mut self, handle: H, value: T) {
        let index = handle.index() as usize;
        while self.buf.len() <= index {
            self.buf.push(None);
        }

        self.buf[index] = Some(value);
    }

    #[inline]
    pub fn free(&mut self, handle: H) -> Option<T> {
        self.buf
            .get_mut(handle.index() as usize)
            .and_then(|v| v.take())
    }
}

impl<H: HandleLike, T: Sized> Default for DataVec<H, T> {
    fn default() -> Self {
        DataVec::new()
    }
}

/// A linked pipeline is identified by the native ids of its shader stages in
/// (vertex, pixel, geometry, hull, domain) order, 0 standing in for absent
/// stages.
pub type PipelineKey = [u32; MAX_SHADER_STAGES];

/// Deduplicates linked pipeline objects by stage combination. Entries are
/// append-only and live until the backend is torn down, so handing out the
/// raw native id is safe.
#[derive(Default)]
pub struct PipelineCache {
    entries: FastHashMap<PipelineKey, u32>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the native pipeline linked for `key`, invoking `link` only on
    /// the first request for this stage combination.
    pub fn get_or_create<F>(&mut self, key: PipelineKey, link: F) -> Result<u32>
    where
        F: FnOnce() -> Result<u32>,
    {
        if let Some(&id) = self.entries.get(&key) {
            return Ok(id);
        }

        let id = link()?;
        self.entries.insert(key, id);
        Ok(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The native ids of every cached pipeline, for teardown.
    pub fn values(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.values().cloned()
    }
}

/// A vertex-array object records attribute sourcing for one (vertex stage,
/// buffer set) combination: the native id of the vertex stage plus the
/// native buffer ids bound per slot, in slot order. 0 marks an empty slot.
pub type VertexArrayKey = (u32, [u32; MAX_VERTEX_BUFFER_SLOTS]);

/// Deduplicates vertex-array objects. Any single differing slot produces a
/// distinct entry; like the pipeline cache, entries are append-only.
#[derive(Default)]
pub struct VertexArrayCache {
    entries: FastHashMap<VertexArrayKey, u32>,
}

impl VertexArrayCache {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the vertex array recorded for `key`, invoking `record` only
    /// the first time this combination is drawn.
    pub fn get_or_create<F>(&mut self, key: VertexArrayKey, record: F) -> Result<u32>
    where
        F: FnOnce() -> Result<u32>,
    {
        if let Some(&id) = self.entries.get(&key) {
            return Ok(id);
        }

        let id = record()?;
        self.entries.insert(key, id);
        Ok(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The native ids of every cached vertex array, for teardown.
    pub fn values(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.values().cloned()
    }

    /// Removes every entry sourcing from the given native buffer id and
    /// returns the freed vertex-array ids. Native buffer names can be
    /// recycled after deletion; without eviction a recycled name could hit
    /// a stale entry recorded for the old buffer.
    pub fn evict_buffer(&mut self, id: u32) -> Vec<u32> {
        let keys: Vec<VertexArrayKey> = self
            .entries
            .keys()
            .filter(|key| key.1.contains(&id))
            .cloned()
            .collect();

        keys.iter().filter_map(|key| self.entries.remove(key)).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::handle::Handle;

    #[test]
    fn data_vec() {
        let mut v = DataVec::<Handle, &'static str>::new();
        let h0 = Handle::new(0, 1);
        let h5 = Handle::new(5, 1);

        v.create(h5, "five");
        assert_eq!(v.get(h0), None);
        assert_eq!(v.get(h5), Some(&"five"));

        v.create(h0, "zero");
        assert_eq!(v.get(h0), Some(&"zero"));

        assert_eq!(v.free(h5), Some("five"));
        assert_eq!(v.free(h5), None);
        assert_eq!(v.get(h5), None);
    }

    #[test]
    fn pipeline_dedup() {
        let mut cache = PipelineCache::new();
        let mut links = 0;

        let key = [1, 2, 0, 0, 0];
        let id1 = cache
            .get_or_create(key, || {
                links += 1;
                Ok(100)
            })
            .unwrap();
        let id2 = cache
            .get_or_create(key, || {
                links += 1;
                Ok(200)
            })
            .unwrap();

        assert_eq!(id1, id2);
        assert_eq!(links, 1);
        assert_eq!(cache.len(), 1);

        // A differing stage anywhere in the tuple is a different pipeline.
        cache.get_or_create([1, 2, 3, 0, 0], || Ok(300)).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn vertex_array_slots() {
        let mut cache = VertexArrayCache::new();

        cache.get_or_create((1, [10, 20, 0, 0]), || Ok(1)).unwrap();
        cache.get_or_create((1, [10, 20, 0, 0]), || Ok(2)).unwrap();
        assert_eq!(cache.len(), 1);

        // Same stage, one slot swapped.
        cache.get_or_create((1, [10, 30, 0, 0]), || Ok(3)).unwrap();
        assert_eq!(cache.len(), 2);

        // Same buffers under a different vertex stage.
        cache.get_or_create((2, [10, 20, 0, 0]), || Ok(4)).unwrap();
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn vertex_array_eviction() {
        let mut cache = VertexArrayCache::new();

        cache.get_or_create((1, [10, 20, 0, 0]), || Ok(1)).unwrap();
        cache.get_or_create((1, [10, 30, 0, 0]), || Ok(2)).unwrap();
        cache.get_or_create((1, [30, 0, 0, 0]), || Ok(3)).unwrap();

        let mut freed = cache.evict_buffer(30);
        freed.sort();
        assert_eq!(freed, [2, 3]);
        assert_eq!(cache.len(), 1);

        // The surviving entry is untouched.
        cache.get_or_create((1, [10, 20, 0, 0]), || Ok(9)).unwrap();
        assert_eq!(cache.len(), 1);
    }
}
