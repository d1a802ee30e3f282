use crate::buffer::VertexBuffer;
use crate::layout::VertexLayout;

/// How an index sequence maps to drawable primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(bitcode::Encode, bitcode::Decode)]
pub enum Topology {
    TriangleList,
    TriangleStrip,
    TriangleFan,
    LineList,
    LineStrip,
    PointList,
    SpriteList,
}

impl Topology {
    /// Number of primitives described by `n_indices` indices.
    pub const fn primitive_count(self, n_indices: usize) -> usize {
        match self {
            Self::TriangleList => n_indices / 3,
            Self::TriangleStrip | Self::TriangleFan => n_indices.saturating_sub(2),
            Self::LineList => n_indices / 2,
            Self::LineStrip => n_indices.saturating_sub(2),
            Self::PointList | Self::SpriteList => n_indices,
        }
    }

    pub const fn is_triangles(self) -> bool {
        matches!(self, Self::TriangleList | Self::TriangleStrip | Self::TriangleFan)
    }

    pub const fn is_lines(self) -> bool {
        matches!(self, Self::LineList | Self::LineStrip)
    }

    /// Iterates the triangles of a triangle-kind index sequence.
    ///
    /// Yields nothing for non-triangle topologies, for fewer than three
    /// indices, and for triangle lists whose length is not a multiple of 3.
    pub fn triangles(self, indices: &[u32]) -> Triangles<'_> {
        let usable = match self {
            Self::TriangleList => indices.len() >= 3 && indices.len() % 3 == 0,
            Self::TriangleStrip | Self::TriangleFan => indices.len() >= 3,
            _ => false,
        };
        Triangles {
            topology: self,
            indices: if usable { indices } else { &[] },
            next: 0,
            current: [0; 3],
            primitive: 0,
        }
    }
}

/// Triangle walker shared by lists, strips and fans.
///
/// Strips and fans reuse two vertices of the previous triangle per step.
/// Strip winding is not alternated.
pub struct Triangles<'a> {
    topology: Topology,
    indices: &'a [u32],
    next: usize,
    current: [u32; 3],
    primitive: usize,
}

impl Iterator for Triangles<'_> {
    /// Primitive index within the batch, and the triangle's vertex indices.
    type Item = (usize, [u32; 3]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.indices.len() {
            return None;
        }
        if self.next == 0 {
            self.current = [self.indices[0], self.indices[1], self.indices[2]];
            self.next = 3;
        } else {
            let [i0, i1, i2] = self.current;
            let idx = self.indices;
            self.current = match self.topology {
                Topology::TriangleList => {
                    let t = [idx[self.next], idx[self.next + 1], idx[self.next + 2]];
                    self.next += 2;
                    t
                }
                Topology::TriangleStrip => [i1, i2, idx[self.next]],
                _ => [i0, i2, idx[self.next]],
            };
            self.next += 1;
        }
        let primitive = self.primitive;
        self.primitive += 1;
        Some((primitive, self.current))
    }
}

/// Batch-private geometry synthesized from the mesh's own vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideGeometry {
    pub buffer: VertexBuffer,
    pub layout: VertexLayout,
    pub topology: Topology,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum BatchGeometry {
    /// Indices refer to the mesh's vertex buffer.
    #[default]
    Shared,
    /// The batch draws from its own buffer.
    Owned(OverrideGeometry),
}

/// Everything needed to issue one draw call.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub topology: Topology,
    pub buffer: &'a VertexBuffer,
    pub layout: &'a VertexLayout,
    pub indices: &'a [u32],
    pub material: u32,
}

/// Indices into a vertex buffer, grouped under one topology and material.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveBatch {
    pub topology: Topology,
    pub indices: Vec<u32>,
    /// Index into an external material table.
    pub material: u32,
    pub geometry: BatchGeometry,
}

impl PrimitiveBatch {
    pub fn new(topology: Topology, material: u32, indices: Vec<u32>) -> Self {
        Self {
            topology,
            indices,
            material,
            geometry: BatchGeometry::Shared,
        }
    }

    pub fn primitive_count(&self) -> usize {
        self.topology.primitive_count(self.indices.len())
    }

    pub fn override_geometry(&self) -> Option<&OverrideGeometry> {
        match &self.geometry {
            BatchGeometry::Shared => None,
            BatchGeometry::Owned(g) => Some(g),
        }
    }

    pub fn override_geometry_mut(&mut self) -> Option<&mut OverrideGeometry> {
        match &mut self.geometry {
            BatchGeometry::Shared => None,
            BatchGeometry::Owned(g) => Some(g),
        }
    }

    /// Resolves the effective geometry against the owning mesh's vertices.
    pub fn draw_item<'a>(
        &'a self,
        vertices: &'a VertexBuffer,
        layout: &'a VertexLayout,
    ) -> DrawItem<'a> {
        match &self.geometry {
            BatchGeometry::Shared => DrawItem {
                topology: self.topology,
                buffer: vertices,
                layout,
                indices: &self.indices,
                material: self.material,
            },
            BatchGeometry::Owned(g) => DrawItem {
                topology: g.topology,
                buffer: &g.buffer,
                layout: &g.layout,
                indices: &g.indices,
                material: self.material,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::tri_list(Topology::TriangleList, [0, 0, 0, 1, 1, 1, 2, 2])]
    #[case::tri_strip(Topology::TriangleStrip, [0, 0, 0, 1, 2, 3, 4, 5])]
    #[case::tri_fan(Topology::TriangleFan, [0, 0, 0, 1, 2, 3, 4, 5])]
    #[case::line_list(Topology::LineList, [0, 0, 1, 1, 2, 2, 3, 3])]
    #[case::line_strip(Topology::LineStrip, [0, 0, 0, 1, 2, 3, 4, 5])]
    #[case::points(Topology::PointList, [0, 1, 2, 3, 4, 5, 6, 7])]
    #[case::sprites(Topology::SpriteList, [0, 1, 2, 3, 4, 5, 6, 7])]
    fn primitive_counts(#[case] topology: Topology, #[case] expected: [usize; 8]) {
        for (n, want) in expected.into_iter().enumerate() {
            assert_eq!(topology.primitive_count(n), want, "{topology:?} with {n} indices");
            let batch = PrimitiveBatch::new(topology, 0, vec![0; n]);
            assert_eq!(batch.primitive_count(), want);
        }
    }

    #[test]
    fn list_triangles() {
        let tris: Vec<_> = Topology::TriangleList.triangles(&[0, 1, 2, 3, 4, 5]).collect();
        assert_eq!(tris, vec![(0, [0, 1, 2]), (1, [3, 4, 5])]);
    }

    #[test]
    fn ragged_list_yields_nothing() {
        assert_eq!(Topology::TriangleList.triangles(&[0, 1, 2, 3]).count(), 0);
    }

    #[test]
    fn strip_slides_window() {
        let tris: Vec<_> = Topology::TriangleStrip.triangles(&[0, 1, 2, 3, 4]).collect();
        assert_eq!(tris, vec![(0, [0, 1, 2]), (1, [1, 2, 3]), (2, [2, 3, 4])]);
    }

    #[test]
    fn fan_keeps_hub() {
        let tris: Vec<_> = Topology::TriangleFan.triangles(&[0, 1, 2, 3, 4]).collect();
        assert_eq!(tris, vec![(0, [0, 1, 2]), (1, [0, 2, 3]), (2, [0, 3, 4])]);
    }

    #[test]
    fn non_triangle_topologies_yield_nothing() {
        assert_eq!(Topology::LineList.triangles(&[0, 1, 2]).count(), 0);
        assert_eq!(Topology::TriangleStrip.triangles(&[0, 1]).count(), 0);
    }

    #[test]
    fn shared_batch_draws_from_mesh() {
        let vertices = VertexBuffer::new(1, vec![0; 12]);
        let layout = VertexLayout::new(12, vec![]);
        let batch = PrimitiveBatch::new(Topology::PointList, 7, vec![0]);
        let item = batch.draw_item(&vertices, &layout);
        assert_eq!(item.topology, Topology::PointList);
        assert_eq!(item.material, 7);
        assert!(std::ptr::eq(item.buffer, &vertices));
    }
}
