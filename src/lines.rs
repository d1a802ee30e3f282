//! Expansion of line lists and line strips into camera-facing quads.
//!
//! Lines have no width, so every segment becomes two triangles whose vertices
//! carry the far endpoint's position and a signed half-width. A vertex shader
//! pushes each vertex sideways by `ScaleFactor` along the screen-space normal
//! of the segment.

use crate::batch::{OverrideGeometry, Topology};
use crate::buffer::VertexBuffer;
use crate::layout::{AttributeField, AttributeFormat, AttributeSemantic, VertexLayout};
use crate::mesh::MeshError;

const HALF_WIDTHS: [f32; 2] = [-0.5, 0.5];
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Number of segments described by `n_indices` line indices.
pub const fn segment_count(strip: bool, n_indices: usize) -> usize {
    if strip {
        n_indices.saturating_sub(1)
    } else {
        n_indices / 2
    }
}

/// Builds quad geometry for the segments of a line list or strip.
///
/// Each segment emits four vertices, `(this, -0.5)`, `(this, +0.5)`,
/// `(other, -0.5)`, `(other, +0.5)`, each a copy of its endpoint's record
/// followed by the other endpoint's position and the half-width.
pub fn expand_lines(
    strip: bool,
    indices: &[u32],
    vertices: &VertexBuffer,
    layout: &VertexLayout,
) -> Result<OverrideGeometry, MeshError> {
    let position = layout
        .field(AttributeSemantic::Position)
        .ok_or(MeshError::MissingAttribute(AttributeSemantic::Position))?;
    let original_stride = layout.stride();
    let new_layout = layout.with_appended_fields(&[
        AttributeField::new(AttributeSemantic::NextPosition, position.format, 0),
        AttributeField::new(AttributeSemantic::ScaleFactor, AttributeFormat::Float1, 0),
    ]);
    let next_position = new_layout.field_for(AttributeSemantic::NextPosition);
    let scale_factor = new_layout.field_for(AttributeSemantic::ScaleFactor);

    let n_segments = segment_count(strip, indices.len());
    let stride = new_layout.stride() as usize;
    let mut data = Vec::with_capacity(n_segments * 4 * stride);
    let mut new_indices = Vec::with_capacity(n_segments * 6);

    let fetch = |index: u32| {
        vertices
            .record(index, original_stride)
            .ok_or(MeshError::IndexOutOfRange { index, count: vertices.count() })
    };

    for segment in 0..n_segments {
        let (a, b) = if strip {
            (indices[segment], indices[segment + 1])
        } else {
            (indices[segment * 2], indices[segment * 2 + 1])
        };
        let this_end = fetch(a)?;
        let other_end = fetch(b)?;
        for (record, far) in [(this_end, other_end), (other_end, this_end)] {
            let far_position = position
                .bytes(far)
                .ok_or(MeshError::MissingAttribute(AttributeSemantic::Position))?;
            for half_width in HALF_WIDTHS {
                let start = data.len();
                data.extend_from_slice(record);
                data.resize(start + stride, 0);
                let out = &mut data[start..];
                if let Some(dst) = next_position.bytes_mut(out) {
                    dst.copy_from_slice(far_position);
                }
                scale_factor.write_f32(out, half_width);
            }
        }
        let base = segment as u32 * 4;
        new_indices.extend(QUAD_INDICES.iter().map(|i| base + i));
    }

    log::debug!(
        "Expanded {} line segments into {} vertices (stride {} -> {})",
        n_segments,
        n_segments * 4,
        original_stride,
        stride,
    );

    Ok(OverrideGeometry {
        buffer: VertexBuffer::new((n_segments * 4) as u32, data),
        layout: new_layout,
        topology: Topology::TriangleList,
        indices: new_indices,
    })
}
