use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};

use zstd::Decoder;

use crate::batch::{BatchGeometry, OverrideGeometry, PrimitiveBatch};
use crate::buffer::VertexBuffer;
use crate::descriptor::{DescriptorParseError, MeshDescriptor};
use crate::header::{HeaderParseError, MeshArchiveHeader, checksum_stream};
use crate::layout::LayoutError;
use crate::mesh::{Mesh, MeshError};

pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Did not find magic bytes at start of file")]
    BadMagic,
    #[error("Incompatible version of the file format: {0}")]
    BadVersion(u16),
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("Checksum mismatch")]
    InvalidChecksums,
    #[error("Cannot decode header: {0}")]
    Header(#[from] HeaderParseError),
    #[error("Cannot decode descriptor: {0}")]
    Descriptor(#[from] DescriptorParseError),
    #[error("Stored vertex layout is invalid: {0}")]
    Layout(#[from] LayoutError),
    #[error("Stored groups are invalid: {0}")]
    Mesh(#[from] MeshError),
    #[error("Data ends too early")]
    NotEnoughData,
    #[error("Unexpected extra data")]
    TooMuchData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshReaderSettings {
    pub verify_metadata_checksum: bool,
    pub verify_data_checksum: bool,
}

impl Default for MeshReaderSettings {
    fn default() -> Self {
        Self {
            verify_metadata_checksum: true,
            verify_data_checksum: true,
        }
    }
}

/// Reads an archive written by [`MeshWriter`](crate::write::MeshWriter).
///
/// Initialization decodes only the header and descriptor; the data is read
/// by one of the consuming methods.
pub struct MeshReader<'s> {
    read: &'s mut dyn ReadSeek,
    header: MeshArchiveHeader,
    descriptor: MeshDescriptor,
    buf: Vec<u8>,
    settings: MeshReaderSettings,
}

impl<'s> MeshReader<'s> {
    pub fn init(read: &'s mut dyn ReadSeek) -> Result<Self, ReadError> {
        Self::init_with_settings(Default::default(), read)
    }

    pub fn init_with_settings(
        settings: MeshReaderSettings,
        read: &'s mut dyn ReadSeek,
    ) -> Result<Self, ReadError> {
        let mut buf = vec![0; MeshArchiveHeader::encoded_len()];
        read.read_exact(&mut buf).map_err(eof_as_short)?;
        let header = MeshArchiveHeader::from_bytes(&buf)?;
        if header.magic != crate::MAGIC {
            return Err(ReadError::BadMagic);
        }
        if header.version != crate::FORMAT_VERSION {
            return Err(ReadError::BadVersion(header.version));
        }
        buf.resize(header.descriptor_len as usize, 0);
        read.read_exact(&mut buf).map_err(eof_as_short)?;
        if settings.verify_metadata_checksum
            && header.metadata_checksum != header.metadata_checksum_for(&buf)
        {
            return Err(ReadError::InvalidChecksums);
        }
        let descriptor = MeshDescriptor::from_bytes(&buf)?;
        Ok(Self {
            read,
            header,
            descriptor,
            buf,
            settings,
        })
    }

    pub fn header(&self) -> &MeshArchiveHeader {
        &self.header
    }

    pub fn descriptor(&self) -> &MeshDescriptor {
        &self.descriptor
    }

    /// Checks the compressed data against the stored checksum.
    ///
    /// Archives written without a data checksum always pass.
    pub fn verify_data_checksum(mut self) -> Result<(), ReadError> {
        if self.header.data_checksum == 0 {
            return Ok(());
        }
        let actual = checksum_stream(&mut self.buf, &mut *self.read)?;
        if self.header.data_checksum != actual {
            return Err(ReadError::InvalidChecksums);
        }
        Ok(())
    }

    /// Decodes the data into a mesh.
    ///
    /// Batch-private geometry is restored as stored, not regenerated.
    pub fn read_mesh(mut self) -> Result<Mesh, ReadError> {
        if self.settings.verify_data_checksum && self.header.data_checksum != 0 {
            let actual = checksum_stream(&mut self.buf, &mut *self.read)?;
            if self.header.data_checksum != actual {
                return Err(ReadError::InvalidChecksums);
            }
            self.read.seek(SeekFrom::Start(
                MeshArchiveHeader::encoded_len() as u64
                    + self.header.descriptor_len as u64,
            ))?;
        }

        let mut decoder = new_zstd_decoder(&mut *self.read)?;
        let vertex_data = read_block(&mut decoder, self.descriptor.compute_vertex_buf_size())?;

        let mut mesh = Mesh::new();
        mesh.set_name(self.descriptor.name.clone());
        mesh.set_vertices(VertexBuffer::new(self.descriptor.n_vertices, vertex_data));
        mesh.set_vertex_description(self.descriptor.layout())?;

        for info in self.descriptor.groups.iter() {
            let indices = read_indices(&mut decoder, info.n_indices)?;
            let geometry = match &info.geometry {
                None => BatchGeometry::Shared,
                Some(own) => {
                    let layout = own.layout();
                    layout.check()?;
                    let data = read_block(&mut decoder, own.compute_vertex_buf_size())?;
                    let own_indices = read_indices(&mut decoder, own.n_indices)?;
                    if let Some(&index) = own_indices.iter().find(|&&i| i >= own.n_vertices) {
                        return Err(MeshError::IndexOutOfRange {
                            index,
                            count: own.n_vertices,
                        }
                        .into());
                    }
                    BatchGeometry::Owned(OverrideGeometry {
                        buffer: VertexBuffer::new(own.n_vertices, data),
                        layout,
                        topology: own.topology,
                        indices: own_indices,
                    })
                }
            };
            mesh.push_group(PrimitiveBatch {
                topology: info.topology,
                indices,
                material: info.material,
                geometry,
            });
        }
        let mut probe = [0u8; 1];
        if decoder.read(&mut probe)? != 0 {
            return Err(ReadError::TooMuchData);
        }

        log::debug!(
            "Read mesh {:?}: {} vertices, {} groups",
            mesh.name(),
            mesh.vertex_count(),
            mesh.group_count(),
        );
        Ok(mesh)
    }
}

/// Checks for the archive magic and rewinds.
pub fn is_mesh_file(read: &mut dyn ReadSeek) -> Result<bool, ReadError> {
    read.rewind()?;
    let mut magic = [0; 4];
    let found = match read.read_exact(&mut magic) {
        Ok(()) => magic == crate::MAGIC,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(e.into()),
    };
    read.rewind()?;
    Ok(found)
}

/// Reads exactly `len` bytes, growing the buffer only as data arrives.
fn read_block(read: impl Read, len: u64) -> Result<Vec<u8>, ReadError> {
    let mut data = Vec::new();
    read.take(len).read_to_end(&mut data)?;
    if (data.len() as u64) < len {
        return Err(ReadError::NotEnoughData);
    }
    Ok(data)
}

fn read_indices(read: impl Read, count: u32) -> Result<Vec<u32>, ReadError> {
    let data = read_block(read, count as u64 * 4)?;
    Ok(data
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn new_zstd_decoder<R: Read>(
    reader: R,
) -> std::io::Result<Decoder<'static, BufReader<R>>> {
    let mut decoder = Decoder::new(reader)?;
    decoder.include_magicbytes(false)?;
    Ok(decoder)
}

fn eof_as_short(e: std::io::Error) -> ReadError {
    if e.kind() == ErrorKind::UnexpectedEof {
        ReadError::NotEnoughData
    } else {
        ReadError::Io(e)
    }
}
