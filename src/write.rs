use std::io::Write;

use zstd::Encoder;

use crate::buffer::VertexBuffer;
use crate::descriptor::MeshDescriptor;
use crate::header::{MeshArchiveHeader, checksum_data};
use crate::mesh::Mesh;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("Vertex buffer holds {have} bytes, layout needs {need}")]
    InvalidMesh { have: usize, need: u64 },
    #[error("Encoded descriptor is {0} bytes, limit is 65535")]
    DescriptorTooLarge(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshWriterSettings {
    /// If false, will write zero in place of the data checksum
    ///
    /// Skipping the checksum lets the data be streamed straight to the
    /// output instead of being buffered first.
    pub write_data_checksum: bool,
    /// Zstd compression level.
    pub compression_level: i32,
}

impl Default for MeshWriterSettings {
    fn default() -> Self {
        Self {
            write_data_checksum: true,
            compression_level: *zstd::compression_level_range().end(),
        }
    }
}

/// Serializes a [`Mesh`] into the archive format.
///
/// Layout: header, bitcode descriptor, then one zstd stream holding the
/// shared vertex records followed by each group in order. A group is its
/// indices as little-endian `u32`, then for batches with their own geometry
/// the private vertex records and indices. Private geometry is stored as-is
/// so batches edited after creation load back unchanged.
#[derive(Debug, Clone, Default)]
pub struct MeshWriter {
    settings: MeshWriterSettings,
}

impl MeshWriter {
    pub fn new() -> Self {
        Self::new_with_settings(Default::default())
    }

    pub fn new_with_settings(settings: MeshWriterSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MeshWriterSettings {
        &self.settings
    }

    pub fn write_to(
        &self,
        mesh: &Mesh,
        write: &mut dyn Write,
    ) -> Result<(), WriteError> {
        let descriptor = MeshDescriptor::from_mesh(mesh);
        stored_records(mesh.vertices(), mesh.vertex_description().stride())?;
        for g in mesh.groups().iter().filter_map(|g| g.override_geometry()) {
            stored_records(&g.buffer, g.layout.stride())?;
        }

        let bytes_descriptor = bitcode::encode(&descriptor);
        let descriptor_len = u16::try_from(bytes_descriptor.len())
            .map_err(|_| WriteError::DescriptorTooLarge(bytes_descriptor.len()))?;
        let mut header = MeshArchiveHeader::new(descriptor_len);
        let total_uncompressed_len = descriptor.compute_total_raw_data_size();

        if self.settings.write_data_checksum {
            let mut comprbuf = vec![];
            let encoder = new_zstd_encoder(
                &mut comprbuf,
                self.settings.compression_level,
                total_uncompressed_len,
            )?;
            encode_data(mesh, encoder)?;
            header.data_checksum = checksum_data(&comprbuf);
            header.metadata_checksum = header.metadata_checksum_for(&bytes_descriptor);
            write.write_all(header.to_le().as_bytes())?;
            write.write_all(&bytes_descriptor)?;
            write.write_all(&comprbuf)?;
        } else {
            header.metadata_checksum = header.metadata_checksum_for(&bytes_descriptor);
            write.write_all(header.to_le().as_bytes())?;
            write.write_all(&bytes_descriptor)?;
            let encoder = new_zstd_encoder(
                &mut *write,
                self.settings.compression_level,
                total_uncompressed_len,
            )?;
            encode_data(mesh, encoder)?;
        }
        log::debug!(
            "Wrote mesh {:?}: {} vertices, {} groups, {} raw data bytes",
            descriptor.name,
            descriptor.n_vertices,
            descriptor.groups.len(),
            total_uncompressed_len,
        );
        Ok(())
    }
}

/// The archive header carries its own magic and checksums, so the zstd
/// frame omits them.
fn new_zstd_encoder<W: Write>(
    writer: W,
    level: i32,
    pledged_size: u64,
) -> std::io::Result<Encoder<'static, W>> {
    let mut encoder = Encoder::new(writer, level)?;
    encoder.include_checksum(false)?;
    encoder.include_contentsize(false)?;
    encoder.include_dictid(false)?;
    encoder.include_magicbytes(false)?;
    encoder.long_distance_matching(true)?;
    encoder.set_pledged_src_size(Some(pledged_size))?;
    Ok(encoder)
}

/// The first `count * stride` bytes of `buffer`, the part that gets stored.
fn stored_records(buffer: &VertexBuffer, stride: u32) -> Result<&[u8], WriteError> {
    let bytes = buffer.as_bytes();
    let need = buffer.count() as u64 * stride as u64;
    if (bytes.len() as u64) < need {
        return Err(WriteError::InvalidMesh {
            have: bytes.len(),
            need,
        });
    }
    Ok(&bytes[..need as usize])
}

fn encode_indices<W: Write>(
    encoder: &mut Encoder<'static, W>,
    scratch: &mut Vec<u8>,
    indices: &[u32],
) -> std::io::Result<()> {
    scratch.clear();
    scratch.reserve(indices.len() * 4);
    for index in indices.iter() {
        scratch.extend_from_slice(&index.to_le_bytes());
    }
    encoder.write_all(scratch)
}

fn encode_data<W: Write>(
    mesh: &Mesh,
    mut encoder: Encoder<'static, W>,
) -> Result<W, WriteError> {
    encoder.write_all(stored_records(
        mesh.vertices(),
        mesh.vertex_description().stride(),
    )?)?;
    let mut scratch = Vec::new();
    for group in mesh.groups() {
        encode_indices(&mut encoder, &mut scratch, &group.indices)?;
        if let Some(g) = group.override_geometry() {
            encoder.write_all(stored_records(&g.buffer, g.layout.stride())?)?;
            encode_indices(&mut encoder, &mut scratch, &g.indices)?;
        }
    }
    let write = encoder.finish()?;
    Ok(write)
}
