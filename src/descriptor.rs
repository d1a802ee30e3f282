use crate::batch::{PrimitiveBatch, Topology};
use crate::layout::{AttributeField, VertexLayout};
use crate::mesh::Mesh;

/// Archive metadata: everything about a mesh except the raw bytes.
#[derive(Debug, Clone, PartialEq, bitcode::Encode, bitcode::Decode)]
pub struct MeshDescriptor {
    pub name: String,
    pub n_vertices: u32,
    pub stride: u32,
    pub fields: Vec<AttributeField>,
    pub groups: Vec<GroupInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct GroupInfo {
    pub topology: Topology,
    pub material: u32,
    /// Number of indices stored for this group.
    pub n_indices: u32,
    /// Present when the group draws from its own vertex buffer.
    pub geometry: Option<OverrideInfo>,
}

/// Shape of a batch-private vertex buffer and its index list.
#[derive(Debug, Clone, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct OverrideInfo {
    pub topology: Topology,
    pub n_vertices: u32,
    pub stride: u32,
    pub fields: Vec<AttributeField>,
    pub n_indices: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptorParseError {
    #[error("Bitcode decode error: {0}")]
    Bitcode(#[from] bitcode::Error),
}

impl GroupInfo {
    fn from_batch(batch: &PrimitiveBatch) -> Self {
        Self {
            topology: batch.topology,
            material: batch.material,
            n_indices: batch.indices.len() as u32,
            geometry: batch.override_geometry().map(|g| OverrideInfo {
                topology: g.topology,
                n_vertices: g.buffer.count(),
                stride: g.layout.stride(),
                fields: g.layout.fields().to_vec(),
                n_indices: g.indices.len() as u32,
            }),
        }
    }
}

impl OverrideInfo {
    pub fn layout(&self) -> VertexLayout {
        VertexLayout::new(self.stride, self.fields.clone())
    }

    pub fn compute_vertex_buf_size(&self) -> u64 {
        self.stride as u64 * self.n_vertices as u64
    }
}

impl MeshDescriptor {
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let layout = mesh.vertex_description();
        Self {
            name: mesh.name().to_owned(),
            n_vertices: mesh.vertex_count(),
            stride: layout.stride(),
            fields: layout.fields().to_vec(),
            groups: mesh.groups().iter().map(GroupInfo::from_batch).collect(),
        }
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, DescriptorParseError> {
        let descriptor = bitcode::decode(buf)?;
        Ok(descriptor)
    }

    pub fn layout(&self) -> VertexLayout {
        VertexLayout::new(self.stride, self.fields.clone())
    }

    /// Size of the shared vertex records.
    pub fn compute_vertex_buf_size(&self) -> u64 {
        self.stride as u64 * self.n_vertices as u64
    }

    /// Size of all batch-private vertex records.
    pub fn compute_override_buf_size(&self) -> u64 {
        self.groups
            .iter()
            .filter_map(|g| g.geometry.as_ref())
            .map(OverrideInfo::compute_vertex_buf_size)
            .sum()
    }

    /// Size of every index list, shared and batch-private, as `u32`.
    pub fn compute_index_buf_size(&self) -> u64 {
        self.groups
            .iter()
            .map(|g| {
                let own = g.geometry.as_ref().map_or(0, |o| o.n_indices as u64);
                (g.n_indices as u64 + own) * 4
            })
            .sum()
    }

    pub fn compute_total_raw_data_size(&self) -> u64 {
        self.compute_vertex_buf_size()
            + self.compute_override_buf_size()
            + self.compute_index_buf_size()
    }
}
