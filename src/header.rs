use std::io::Read;

use rapidhash::RapidInlineHasher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, packed)]
pub struct MeshArchiveHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub descriptor_len: u16,
    pub metadata_checksum: u64,
    pub data_checksum: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum HeaderParseError {
    #[error("Bytes array cannot be reinterpreted/cast: {0}")]
    Bytemuck(bytemuck::PodCastError),
}

impl MeshArchiveHeader {
    pub const fn encoded_len() -> usize {
        std::mem::size_of::<Self>()
    }

    pub fn new(descriptor_len: u16) -> Self {
        Self {
            magic: crate::MAGIC,
            version: crate::FORMAT_VERSION,
            descriptor_len,
            metadata_checksum: 0,
            data_checksum: 0,
        }
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, HeaderParseError> {
        let raw_header: &MeshArchiveHeader =
            bytemuck::try_from_bytes(buf).map_err(HeaderParseError::Bytemuck)?;
        Ok(raw_header.to_le())
    }

    /// Byte-swaps multi-byte fields between native and little-endian order.
    pub fn to_le(&self) -> Self {
        Self {
            magic: self.magic,
            version: self.version.to_le(),
            descriptor_len: self.descriptor_len.to_le(),
            metadata_checksum: self.metadata_checksum.to_le(),
            data_checksum: self.data_checksum.to_le(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Hash over the encoded descriptor and the header fields that describe it.
    pub fn metadata_checksum_for(&self, encoded_descriptor: &[u8]) -> u64 {
        let descriptor_len = self.descriptor_len;
        let data_checksum = self.data_checksum;
        RapidInlineHasher::default_const()
            .write_const(encoded_descriptor)
            .write_const(&descriptor_len.to_le_bytes())
            .write_const(&data_checksum.to_le_bytes())
            .finish_const()
    }
}

#[inline(always)]
pub fn checksum_data(data: &[u8]) -> u64 {
    rapidhash::rapidhash_inline(data, rapidhash::RAPID_SEED)
}

/// Reads `read` to its end into `scratch` and hashes it like [`checksum_data`].
pub fn checksum_stream<R: Read + ?Sized>(
    scratch: &mut Vec<u8>,
    read: &mut R,
) -> std::io::Result<u64> {
    scratch.clear();
    read.read_to_end(scratch)?;
    Ok(checksum_data(scratch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_bytes_parse_back() {
        let mut header = MeshArchiveHeader::new(42);
        header.data_checksum = 7;
        let parsed = MeshArchiveHeader::from_bytes(header.to_le().as_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(MeshArchiveHeader::encoded_len(), 24);
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(MeshArchiveHeader::from_bytes(&[0u8; 10]).is_err());
    }

    #[test]
    fn streamed_checksum_matches_slice() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i * 31 % 251) as u8).collect();
        let mut scratch = vec![];
        let streamed = checksum_stream(&mut scratch, &mut &data[..]).unwrap();
        assert_eq!(streamed, checksum_data(&data));
    }

    #[test]
    fn metadata_checksum_covers_data_checksum() {
        let mut header = MeshArchiveHeader::new(3);
        let a = header.metadata_checksum_for(b"abc");
        header.data_checksum = 1;
        assert_ne!(a, header.metadata_checksum_for(b"abc"));
    }
}
