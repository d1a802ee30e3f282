use glam::{DVec3, Vec3};
use packed_mesh::batch::Topology;
use packed_mesh::buffer::VertexBuffer;
use packed_mesh::layout::{AttributeField, AttributeFormat, AttributeSemantic, VertexLayout};
use packed_mesh::mesh::Mesh;

/// Unit square in the z=0 plane, drawn as a strip, a fan and an outline.
fn square() -> anyhow::Result<Mesh> {
    let points: [[f32; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [1.0, 1.0, 0.0],
    ];
    let mut mesh = Mesh::new();
    mesh.set_vertices(VertexBuffer::new(4, points.iter().flatten().flat_map(|v| v.to_le_bytes()).collect()));
    mesh.set_vertex_description(VertexLayout::new(
        12,
        vec![AttributeField::new(AttributeSemantic::Position, AttributeFormat::Float3, 0)],
    ))?;
    mesh.add_group(Topology::LineList, 2, vec![0, 1, 1, 3, 3, 2, 2, 0])?;
    mesh.add_group(Topology::TriangleStrip, 1, vec![0, 1, 2, 3])?;
    mesh.add_group(Topology::TriangleFan, 0, vec![0, 1, 3, 2])?;
    Ok(mesh)
}

#[test]
fn strip_and_fan_are_pickable() -> anyhow::Result<()> {
    let mesh = square()?;
    let origin = DVec3::new(0.6, 0.2, 5.0);
    let hit = mesh.pick(origin, DVec3::NEG_Z).expect("square is hit");
    // strip and fan are coplanar, so the first batch reaching the distance wins
    assert_eq!(hit.group, 1);
    assert_eq!(hit.primitive, 0);
    assert!((hit.distance - 5.0).abs() < 1e-9);

    // upper-left half: second triangle of the strip
    let hit = mesh.pick(DVec3::new(0.7, 0.8, 5.0), DVec3::NEG_Z).expect("hit");
    assert_eq!((hit.group, hit.primitive), (1, 1));

    assert_eq!(mesh.pick(DVec3::new(2.0, 2.0, 5.0), DVec3::NEG_Z), None);
    Ok(())
}

#[test]
fn draw_items_follow_batch_order() -> anyhow::Result<()> {
    let mut mesh = square()?;
    mesh.aggregate_by_material();
    let items: Vec<_> = mesh.draw_items().collect();
    let summary: Vec<(Topology, u32, usize)> = items
        .iter()
        .map(|i| (i.topology, i.material, i.indices.len()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Topology::TriangleFan, 0, 4),
            (Topology::TriangleStrip, 1, 4),
            // four segments, each a quad of two triangles
            (Topology::TriangleList, 2, 24),
        ]
    );
    assert_eq!(items[2].buffer.count(), 16);
    assert_eq!(items[2].layout.stride(), 12 + 12 + 4);
    assert!(std::ptr::eq(items[0].buffer, mesh.vertices()));
    Ok(())
}

#[test]
fn merge_style_remap() -> anyhow::Result<()> {
    let mut mesh = square()?;
    // as if this mesh's vertices were appended after 10 others
    let index_map: Vec<u32> = (10..14).collect();
    mesh.remap_indices(&index_map)?;
    mesh.remap_materials(&[7, 8, 9])?;
    let strip = mesh.group(1).expect("strip");
    assert_eq!(strip.indices, vec![10, 11, 12, 13]);
    assert_eq!(strip.material, 8);
    // line quads still draw from their own buffer
    let outline = mesh.group(0).expect("outline");
    assert_eq!(outline.indices[0], 10);
    assert_eq!(outline.override_geometry().expect("quads").indices[..6], [0, 1, 2, 2, 3, 0]);
    Ok(())
}

#[test]
fn bounds_follow_transform() -> anyhow::Result<()> {
    let mut mesh = square()?;
    mesh.transform(Vec3::new(-0.5, -0.5, 0.0), 4.0);
    let bbox = mesh.bounding_box();
    assert_eq!(bbox.min, Vec3::new(-2.0, -2.0, 0.0));
    assert_eq!(bbox.max, Vec3::new(2.0, 2.0, 0.0));
    assert_eq!(mesh.primitive_count(), 4 + 2 + 2);
    Ok(())
}
