use std::cmp::Ordering;

use glam::{Vec3, Vec4};

use crate::HashMap;

/// Logical role of a field inside a vertex record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(bitcode::Encode, bitcode::Decode)]
pub enum AttributeSemantic {
    Position,
    Color0,
    Color1,
    Normal,
    Tangent,
    Texture0,
    Texture1,
    Texture2,
    Texture3,
    PointSize,
    /// Position of the other end of a line segment (expanded lines only).
    NextPosition,
    /// Signed half-width of an expanded line vertex.
    ScaleFactor,
    /// Never registered in a layout; marks the absent field.
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(bitcode::Encode, bitcode::Decode)]
pub enum AttributeFormat {
    Float1,
    Float2,
    Float3,
    Float4,
    /// Four unsigned bytes, normalized to `0.0..=1.0` when decoded.
    UByte4,
    Invalid,
}

impl AttributeFormat {
    /// Returns the byte size of the format.
    pub const fn size(self) -> usize {
        match self {
            Self::Float1 | Self::UByte4 => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::Invalid => 0,
        }
    }

    /// Number of components produced by [`AttributeField::decode`].
    pub const fn components(self) -> usize {
        match self {
            Self::Float1 => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 | Self::UByte4 => 4,
            Self::Invalid => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("Field {semantic:?} at offset {offset} is not 4-byte aligned")]
    Misaligned {
        semantic: AttributeSemantic,
        offset: u32,
    },
    #[error("Field {semantic:?} ({size} bytes at offset {offset}) exceeds stride {stride}")]
    ExceedsStride {
        semantic: AttributeSemantic,
        offset: u32,
        size: u32,
        stride: u32,
    },
}

/// One packed field inside a vertex record.
///
/// Ordered by `(semantic, format, offset)`.
/// Float components are stored little-endian on every platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(bitcode::Encode, bitcode::Decode)]
pub struct AttributeField {
    pub semantic: AttributeSemantic,
    pub format: AttributeFormat,
    /// Byte offset from the start of the record.
    pub offset: u32,
}

impl Default for AttributeField {
    fn default() -> Self {
        Self::ABSENT
    }
}

impl AttributeField {
    /// Returned by lookups for semantics that have no field.
    pub const ABSENT: Self = Self {
        semantic: AttributeSemantic::Invalid,
        format: AttributeFormat::Invalid,
        offset: 0,
    };

    pub const fn new(
        semantic: AttributeSemantic,
        format: AttributeFormat,
        offset: u32,
    ) -> Self {
        Self { semantic, format, offset }
    }

    pub fn is_absent(&self) -> bool {
        self.semantic == AttributeSemantic::Invalid
    }

    pub const fn size(&self) -> usize {
        self.format.size()
    }

    /// Byte range of the field within a record.
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + self.size()
    }

    fn check(&self, stride: u32) -> Result<(), LayoutError> {
        if self.offset % 4 != 0 {
            return Err(LayoutError::Misaligned {
                semantic: self.semantic,
                offset: self.offset,
            });
        }
        if self.offset as u64 + self.size() as u64 > stride as u64 {
            return Err(LayoutError::ExceedsStride {
                semantic: self.semantic,
                offset: self.offset,
                size: self.size() as u32,
                stride,
            });
        }
        Ok(())
    }

    pub fn bytes<'a>(&self, record: &'a [u8]) -> Option<&'a [u8]> {
        record.get(self.range())
    }

    pub fn bytes_mut<'a>(&self, record: &'a mut [u8]) -> Option<&'a mut [u8]> {
        record.get_mut(self.range())
    }

    /// Reads a `Float1` field.
    pub fn read_f32(&self, record: &[u8]) -> Option<f32> {
        if self.format != AttributeFormat::Float1 {
            return None;
        }
        self.bytes(record).and_then(f32_from_le)
    }

    pub fn write_f32(&self, record: &mut [u8], value: f32) -> Option<()> {
        if self.format != AttributeFormat::Float1 {
            return None;
        }
        let dst = self.bytes_mut(record)?;
        dst.copy_from_slice(&value.to_le_bytes());
        Some(())
    }

    /// Reads a `Float3` field.
    pub fn read_vec3(&self, record: &[u8]) -> Option<Vec3> {
        if self.format != AttributeFormat::Float3 {
            return None;
        }
        let mut raw = [0.0f32; 3];
        for (o, chunk) in raw.iter_mut().zip(self.bytes(record)?.chunks_exact(4)) {
            *o = f32_from_le(chunk)?;
        }
        Some(Vec3::from_array(raw))
    }

    pub fn write_vec3(&self, record: &mut [u8], value: Vec3) -> Option<()> {
        if self.format != AttributeFormat::Float3 {
            return None;
        }
        let dst = self.bytes_mut(record)?;
        for (d, s) in dst.chunks_exact_mut(4).zip(value.to_array()) {
            d.copy_from_slice(&s.to_le_bytes());
        }
        Some(())
    }

    /// Decodes the field into up to four floats; unused components are zero.
    pub fn decode(&self, record: &[u8]) -> Option<Vec4> {
        let bytes = self.bytes(record)?;
        let mut out = [0.0f32; 4];
        match self.format {
            AttributeFormat::UByte4 => {
                for (o, b) in out.iter_mut().zip(bytes) {
                    *o = *b as f32 / 255.0;
                }
            }
            AttributeFormat::Invalid => return None,
            _ => {
                for (o, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
                    *o = f32_from_le(chunk)?;
                }
            }
        }
        Some(Vec4::from_array(out))
    }

    /// Encodes up to four floats into the field; `UByte4` clamps to `0.0..=1.0`.
    pub fn encode(&self, record: &mut [u8], value: Vec4) -> Option<()> {
        let format = self.format;
        let dst = self.bytes_mut(record)?;
        let src = value.to_array();
        match format {
            AttributeFormat::UByte4 => {
                for (d, s) in dst.iter_mut().zip(src) {
                    *d = (s.clamp(0.0, 1.0) * 255.0).round() as u8;
                }
            }
            AttributeFormat::Invalid => return None,
            _ => {
                for (d, s) in dst.chunks_exact_mut(4).zip(src) {
                    d.copy_from_slice(&s.to_le_bytes());
                }
            }
        }
        Some(())
    }
}

fn f32_from_le(bytes: &[u8]) -> Option<f32> {
    bytes.try_into().ok().map(f32::from_le_bytes)
}

/// Per-vertex record layout: stride plus the packed fields.
#[derive(Debug, Clone, Default)]
pub struct VertexLayout {
    stride: u32,
    fields: Vec<AttributeField>,
    lookup: HashMap<AttributeSemantic, AttributeField>,
}

impl VertexLayout {
    pub fn new(stride: u32, fields: Vec<AttributeField>) -> Self {
        let mut layout = Self {
            stride,
            fields,
            lookup: HashMap::default(),
        };
        layout.rebuild_lookup();
        layout
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn fields(&self) -> &[AttributeField] {
        &self.fields
    }

    /// Replaces the field list and rebuilds the semantic lookup.
    pub fn set_fields(&mut self, fields: Vec<AttributeField>) {
        self.fields = fields;
        self.rebuild_lookup();
    }

    fn rebuild_lookup(&mut self) {
        self.lookup.clear();
        for field in self.fields.iter() {
            if let Some(prev) = self.lookup.insert(field.semantic, *field) {
                log::warn!(
                    "{:?} at offset {} shadows earlier field at offset {}",
                    field.semantic,
                    field.offset,
                    prev.offset,
                );
            }
        }
    }

    pub fn check(&self) -> Result<(), LayoutError> {
        // Repeated semantics are accepted; the last one wins in the lookup.
        for field in self.fields.iter() {
            field.check(self.stride)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> bool {
        self.check().is_ok()
    }

    /// Current field for `semantic`, or [`AttributeField::ABSENT`].
    pub fn field_for(&self, semantic: AttributeSemantic) -> AttributeField {
        self.field(semantic).unwrap_or(AttributeField::ABSENT)
    }

    pub fn field(&self, semantic: AttributeSemantic) -> Option<AttributeField> {
        self.lookup.get(&semantic).copied()
    }

    /// Field for `semantic` if it is registered with exactly `format`.
    pub fn field_with_format(
        &self,
        semantic: AttributeSemantic,
        format: AttributeFormat,
    ) -> Option<AttributeField> {
        self.field(semantic).filter(|f| f.format == format)
    }

    /// Appends fields after the end of the current record.
    ///
    /// The offsets of `new_fields` are ignored: each is placed at the
    /// original stride plus the sizes of the new fields before it.
    pub fn with_appended_fields(&self, new_fields: &[AttributeField]) -> Self {
        let mut fields = Vec::with_capacity(self.fields.len() + new_fields.len());
        fields.extend_from_slice(&self.fields);
        let mut stride = self.stride;
        for field in new_fields {
            fields.push(AttributeField { offset: stride, ..*field });
            stride += field.size() as u32;
        }
        Self::new(stride, fields)
    }
}

impl PartialEq for VertexLayout {
    fn eq(&self, other: &Self) -> bool {
        self.stride == other.stride && self.fields == other.fields
    }
}

impl Eq for VertexLayout {}

impl PartialOrd for VertexLayout {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VertexLayout {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.stride, &self.fields).cmp(&(other.stride, &other.fields))
    }
}
