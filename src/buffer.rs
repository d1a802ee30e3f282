/// Owned block of packed vertex records.
///
/// The buffer does not know its own layout; the owner (a [`Mesh`] or an
/// override in a [`PrimitiveBatch`]) keeps the two side by side.
///
/// [`Mesh`]: crate::mesh::Mesh
/// [`PrimitiveBatch`]: crate::batch::PrimitiveBatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexBuffer {
    count: u32,
    data: Vec<u8>,
}

impl VertexBuffer {
    pub fn new(count: u32, data: Vec<u8>) -> Self {
        Self { count, data }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of records.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Whether the storage holds `count` complete records of `stride` bytes.
    pub fn fits(&self, stride: u32) -> bool {
        self.data.len() as u64 >= self.count as u64 * stride as u64
    }

    fn record_range(&self, index: u32, stride: u32) -> Option<std::ops::Range<usize>> {
        if index >= self.count || stride == 0 {
            return None;
        }
        let start = index as usize * stride as usize;
        let end = start + stride as usize;
        (end <= self.data.len()).then_some(start..end)
    }

    pub fn record(&self, index: u32, stride: u32) -> Option<&[u8]> {
        self.record_range(index, stride).map(|r| &self.data[r])
    }

    pub fn record_mut(&mut self, index: u32, stride: u32) -> Option<&mut [u8]> {
        self.record_range(index, stride).map(|r| &mut self.data[r])
    }

    /// Iterates over the complete records, at most `count` of them.
    pub fn records(&self, stride: u32) -> impl Iterator<Item = &[u8]> {
        let take = if stride == 0 { 0 } else { self.count as usize };
        self.data.chunks_exact((stride as usize).max(1)).take(take)
    }

    pub fn records_mut(&mut self, stride: u32) -> impl Iterator<Item = &mut [u8]> {
        let take = if stride == 0 { 0 } else { self.count as usize };
        self.data.chunks_exact_mut((stride as usize).max(1)).take(take)
    }
}
