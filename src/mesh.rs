use crate::batch::{BatchGeometry, DrawItem, PrimitiveBatch, Topology};
use crate::buffer::VertexBuffer;
use crate::layout::{AttributeSemantic, LayoutError, VertexLayout};
use crate::lines::expand_lines;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    #[error("Invalid vertex layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("Vertex layout has no usable {0:?} attribute")]
    MissingAttribute(AttributeSemantic),
    #[error("Vertex index {index} out of range for {count} vertices")]
    IndexOutOfRange { index: u32, count: u32 },
    #[error("Remap table has {len} entries but value {value} is in use")]
    IncompleteMap { value: u32, len: usize },
}

/// A vertex buffer, its layout, and the primitive batches drawn from it.
///
/// Batch order is draw order.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    name: String,
    vertices: VertexBuffer,
    layout: VertexLayout,
    batches: Vec<PrimitiveBatch>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn vertices(&self) -> &VertexBuffer {
        &self.vertices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.count()
    }

    /// Replaces the vertex storage; the previous buffer is dropped.
    pub fn set_vertices(&mut self, vertices: VertexBuffer) {
        self.vertices = vertices;
    }

    pub fn vertex_description(&self) -> &VertexLayout {
        &self.layout
    }

    /// Adopts `layout` if it is valid. On failure the current layout is kept.
    pub fn set_vertex_description(&mut self, layout: VertexLayout) -> Result<(), LayoutError> {
        if let Err(e) = layout.check() {
            log::warn!("Rejected vertex layout for mesh {:?}: {}", self.name, e);
            return Err(e);
        }
        if !self.vertices.fits(layout.stride()) {
            log::warn!(
                "Mesh {:?}: {} vertices do not fill stride {}",
                self.name,
                self.vertices.count(),
                layout.stride(),
            );
        }
        self.layout = layout;
        Ok(())
    }

    /// Appends a batch and returns the new batch count.
    ///
    /// Line topologies get quad geometry generated from the current vertices;
    /// the batch still reports the original line indices and topology.
    pub fn add_group(
        &mut self,
        topology: Topology,
        material: u32,
        indices: Vec<u32>,
    ) -> Result<usize, MeshError> {
        let geometry = if topology.is_lines() {
            let strip = topology == Topology::LineStrip;
            BatchGeometry::Owned(expand_lines(strip, &indices, &self.vertices, &self.layout)?)
        } else {
            BatchGeometry::Shared
        };
        self.batches.push(PrimitiveBatch {
            topology,
            indices,
            material,
            geometry,
        });
        Ok(self.batches.len())
    }

    /// Appends an already built batch and returns the new batch count.
    pub fn push_group(&mut self, batch: PrimitiveBatch) -> usize {
        self.batches.push(batch);
        self.batches.len()
    }

    pub fn group(&self, index: usize) -> Option<&PrimitiveBatch> {
        self.batches.get(index)
    }

    pub fn group_mut(&mut self, index: usize) -> Option<&mut PrimitiveBatch> {
        self.batches.get_mut(index)
    }

    pub fn group_count(&self) -> usize {
        self.batches.len()
    }

    pub fn groups(&self) -> &[PrimitiveBatch] {
        &self.batches
    }

    /// Split borrow used by in-place geometry edits.
    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&mut VertexBuffer, &VertexLayout, &mut [PrimitiveBatch]) {
        (&mut self.vertices, &self.layout, &mut self.batches)
    }

    pub fn clear_groups(&mut self) {
        self.batches.clear();
    }

    /// Replaces every vertex index `i` with `map[i]`.
    ///
    /// Fails without modifying anything if `map` does not cover an index in use.
    /// Override geometry keeps its own indices.
    pub fn remap_indices(&mut self, map: &[u32]) -> Result<(), MeshError> {
        let in_use = self.batches.iter().flat_map(|b| b.indices.iter().copied());
        check_coverage(in_use, map)?;
        for batch in self.batches.iter_mut() {
            for index in batch.indices.iter_mut() {
                *index = map[*index as usize];
            }
        }
        Ok(())
    }

    /// Replaces every material reference `m` with `map[m]`.
    pub fn remap_materials(&mut self, map: &[u32]) -> Result<(), MeshError> {
        check_coverage(self.batches.iter().map(|b| b.material), map)?;
        for batch in self.batches.iter_mut() {
            batch.material = map[batch.material as usize];
        }
        Ok(())
    }

    /// Stable-sorts batches by material so equal materials are adjacent.
    pub fn aggregate_by_material(&mut self) {
        self.batches.sort_by_key(|b| b.material);
    }

    pub fn primitive_count(&self) -> usize {
        self.batches.iter().map(|b| b.primitive_count()).sum()
    }

    /// Draw tuples for every batch, in draw order.
    pub fn draw_items(&self) -> impl Iterator<Item = DrawItem<'_>> {
        self.batches
            .iter()
            .map(|b| b.draw_item(&self.vertices, &self.layout))
    }
}

fn check_coverage(
    values: impl Iterator<Item = u32>,
    map: &[u32],
) -> Result<(), MeshError> {
    match values.max() {
        Some(value) if value as usize >= map.len() => {
            Err(MeshError::IncompleteMap { value, len: map.len() })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::AttributeField;
    use crate::layout::AttributeFormat::*;
    use crate::layout::AttributeSemantic::*;

    fn line_mesh() -> Mesh {
        let mut mesh = Mesh::new();
        let points: [[f32; 3]; 3] = [[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        mesh.set_vertices(VertexBuffer::new(3, points.iter().flatten().flat_map(|v| v.to_le_bytes()).collect()));
        mesh.set_vertex_description(VertexLayout::new(
            12,
            vec![AttributeField::new(Position, Float3, 0)],
        ))
        .unwrap();
        mesh
    }

    #[test]
    fn rejected_layout_keeps_previous() {
        let mut mesh = line_mesh();
        let bad = VertexLayout::new(8, vec![AttributeField::new(Position, Float3, 0)]);
        assert!(mesh.set_vertex_description(bad).is_err());
        assert_eq!(mesh.vertex_description().stride(), 12);
    }

    #[test]
    fn add_group_returns_count() {
        let mut mesh = line_mesh();
        assert_eq!(mesh.add_group(Topology::TriangleList, 0, vec![0, 1, 2]), Ok(1));
        assert_eq!(mesh.add_group(Topology::PointList, 0, vec![0]), Ok(2));
        assert_eq!(mesh.group_count(), 2);
        assert!(mesh.group(0).unwrap().override_geometry().is_none());
        mesh.clear_groups();
        assert_eq!(mesh.group_count(), 0);
    }

    #[test]
    fn line_group_keeps_base_indices() {
        let mut mesh = line_mesh();
        mesh.add_group(Topology::LineStrip, 3, vec![0, 1, 2]).unwrap();
        let batch = mesh.group(0).unwrap();
        assert_eq!(batch.topology, Topology::LineStrip);
        assert_eq!(batch.indices, vec![0, 1, 2]);
        assert_eq!(batch.material, 3);
        let g = batch.override_geometry().unwrap();
        assert_eq!(g.topology, Topology::TriangleList);
        assert_eq!(g.indices.len(), 12);

        let item = mesh.draw_items().next().unwrap();
        assert_eq!(item.topology, Topology::TriangleList);
        assert_eq!(item.indices.len(), 12);
        assert_eq!(item.material, 3);
    }

    #[test]
    fn remap_indices_and_materials() {
        let mut mesh = line_mesh();
        mesh.add_group(Topology::TriangleList, 1, vec![0, 1, 2]).unwrap();
        mesh.remap_indices(&[2, 0, 1]).unwrap();
        assert_eq!(mesh.group(0).unwrap().indices, vec![2, 0, 1]);
        mesh.remap_materials(&[5, 9]).unwrap();
        assert_eq!(mesh.group(0).unwrap().material, 9);
    }

    #[test]
    fn short_remap_table_changes_nothing() {
        let mut mesh = line_mesh();
        mesh.add_group(Topology::TriangleList, 4, vec![0, 1, 2]).unwrap();
        assert_eq!(
            mesh.remap_indices(&[0, 1]),
            Err(MeshError::IncompleteMap { value: 2, len: 2 })
        );
        assert_eq!(mesh.group(0).unwrap().indices, vec![0, 1, 2]);
        assert!(mesh.remap_materials(&[0, 0]).is_err());
        assert_eq!(mesh.group(0).unwrap().material, 4);
    }

    #[test]
    fn aggregate_is_stable() {
        let mut mesh = line_mesh();
        for (material, first) in [(2, 0), (1, 1), (2, 2), (1, 0), (0, 1)] {
            mesh.add_group(Topology::PointList, material, vec![first]).unwrap();
        }
        mesh.aggregate_by_material();
        let order: Vec<(u32, u32)> = mesh
            .groups()
            .iter()
            .map(|b| (b.material, b.indices[0]))
            .collect();
        assert_eq!(order, vec![(0, 1), (1, 1), (1, 0), (2, 0), (2, 2)]);
    }

    #[test]
    fn total_primitive_count() {
        let mut mesh = line_mesh();
        mesh.add_group(Topology::TriangleList, 0, vec![0, 1, 2]).unwrap();
        mesh.add_group(Topology::PointList, 0, vec![0, 1]).unwrap();
        mesh.add_group(Topology::LineList, 0, vec![0, 1]).unwrap();
        assert_eq!(mesh.primitive_count(), 1 + 2 + 1);
    }
}
