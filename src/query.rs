//! Geometric queries evaluated directly against packed vertex records.

use glam::{DVec3, Vec3};

use crate::buffer::VertexBuffer;
use crate::layout::{AttributeField, AttributeFormat, AttributeSemantic, VertexLayout};
use crate::mesh::Mesh;

/// Distance reported when nothing has been hit yet.
const MAX_PICK_DISTANCE: f64 = 1.0e30;

/// Closest triangle hit by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickResult {
    /// Index of the batch in draw order.
    pub group: usize,
    /// Triangle index within the batch.
    pub primitive: usize,
    pub distance: f64,
}

/// Axis-aligned bounding box. [`Aabb::EMPTY`] contains nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    #[inline]
    pub fn extend_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    #[inline]
    pub fn extend_box(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

fn position_field(layout: &VertexLayout) -> Option<AttributeField> {
    layout.field_with_format(AttributeSemantic::Position, AttributeFormat::Float3)
}

fn point_size_field(layout: &VertexLayout) -> Option<AttributeField> {
    layout.field_with_format(AttributeSemantic::PointSize, AttributeFormat::Float1)
}

fn read_position(
    vertices: &VertexBuffer,
    stride: u32,
    position: AttributeField,
    index: u32,
) -> Option<DVec3> {
    let record = vertices.record(index, stride)?;
    position.read_vec3(record).map(|v| v.as_dvec3())
}

/// Ray/triangle test. Returns the hit distance along `direction`.
///
/// Rays parallel to the triangle plane miss, even when they lie in it.
fn intersect_triangle(
    origin: DVec3,
    direction: DVec3,
    [v0, v1, v2]: [DVec3; 3],
    closest: f64,
) -> Option<f64> {
    let e0 = v1 - v0;
    let e1 = v2 - v0;
    let n = e0.cross(e1);
    let c = n.dot(direction);
    if c == 0.0 {
        return None;
    }
    let t = n.dot(v0 - origin) / c;
    if !(t > 0.0 && t < closest) {
        return None;
    }

    let m00 = e0.dot(e0);
    let m01 = e0.dot(e1);
    let m10 = e1.dot(e0);
    let m11 = e1.dot(e1);
    let det = m00 * m11 - m01 * m10;
    if det == 0.0 {
        return None;
    }
    let q = origin + direction * t - v0;
    let q0 = e0.dot(q);
    let q1 = e1.dot(q);
    let d = 1.0 / det;
    let s0 = (m11 * q0 - m01 * q1) * d;
    let s1 = (m00 * q1 - m10 * q0) * d;
    (s0 >= 0.0 && s1 >= 0.0 && s0 + s1 <= 1.0).then_some(t)
}

impl Mesh {
    /// Finds the closest triangle hit by a ray in mesh-local space.
    ///
    /// Only triangle batches are tested, against the mesh's own vertices.
    /// Returns `None` if the layout has no `Float3` position.
    pub fn pick(&self, origin: DVec3, direction: DVec3) -> Option<PickResult> {
        let layout = self.vertex_description();
        let position = position_field(layout)?;
        let stride = layout.stride();
        let vertices = self.vertices();

        let mut closest = MAX_PICK_DISTANCE;
        let mut result = None;
        for (group, batch) in self.groups().iter().enumerate() {
            for (primitive, tri) in batch.topology.triangles(&batch.indices) {
                let fetch = |i| read_position(vertices, stride, position, i);
                let (Some(v0), Some(v1), Some(v2)) = (fetch(tri[0]), fetch(tri[1]), fetch(tri[2]))
                else {
                    log::trace!("Skipping triangle {primitive} of group {group}: index out of range");
                    continue;
                };
                if let Some(t) = intersect_triangle(origin, direction, [v0, v1, v2], closest) {
                    closest = t;
                    result = Some(PickResult { group, primitive, distance: t });
                }
            }
        }
        result
    }

    /// Distance to the closest triangle hit by the ray, if any.
    pub fn pick_distance(&self, origin: DVec3, direction: DVec3) -> Option<f64> {
        self.pick(origin, direction).map(|hit| hit.distance)
    }

    /// Bounds of all vertex positions.
    ///
    /// With a `Float1` point size, each vertex contributes a cube of that
    /// half-extent around its position. Empty without a `Float3` position.
    pub fn bounding_box(&self) -> Aabb {
        let layout = self.vertex_description();
        let mut bbox = Aabb::EMPTY;
        let Some(position) = position_field(layout) else {
            return bbox;
        };
        let point_size = point_size_field(layout);
        for record in self.vertices().records(layout.stride()) {
            let Some(center) = position.read_vec3(record) else {
                continue;
            };
            match point_size.and_then(|f| f.read_f32(record)) {
                Some(size) => {
                    let offset = Vec3::splat(size);
                    bbox.extend_box(&Aabb::new(center - offset, center + offset));
                }
                None => bbox.extend_point(center),
            }
        }
        bbox
    }

    /// Applies `position = (position + translation) * scale` to every vertex.
    ///
    /// Line quad geometry is updated the same way for both of its positions.
    /// Point sizes are scaled but not translated. No-op without a `Float3`
    /// position.
    pub fn transform(&mut self, translation: Vec3, scale: f32) {
        let (vertices, layout, batches) = self.parts_mut();
        let Some(position) = position_field(layout) else {
            return;
        };
        let targets = [Some(position)];
        transform_records(vertices, layout, &targets, translation, scale);

        for batch in batches.iter_mut() {
            let Some(g) = batch.override_geometry_mut() else {
                continue;
            };
            let targets = [
                position_field(&g.layout),
                g.layout.field_with_format(AttributeSemantic::NextPosition, AttributeFormat::Float3),
            ];
            transform_records(&mut g.buffer, &g.layout, &targets, translation, scale);
        }
    }
}

fn transform_records(
    vertices: &mut VertexBuffer,
    layout: &VertexLayout,
    targets: &[Option<AttributeField>],
    translation: Vec3,
    scale: f32,
) {
    let point_size = point_size_field(layout);
    for record in vertices.records_mut(layout.stride()) {
        for field in targets.iter().flatten() {
            if let Some(p) = field.read_vec3(record) {
                field.write_vec3(record, (p + translation) * scale);
            }
        }
        if let Some(field) = point_size {
            if let Some(size) = field.read_f32(record) {
                field.write_f32(record, size * scale);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Topology;
    use crate::layout::AttributeFormat::*;
    use crate::layout::AttributeSemantic::*;

    fn mesh_from(points: &[[f32; 3]]) -> Mesh {
        let mut mesh = Mesh::new();
        mesh.set_vertices(VertexBuffer::new(
            points.len() as u32,
            points.iter().flatten().flat_map(|v| v.to_le_bytes()).collect(),
        ));
        mesh.set_vertex_description(VertexLayout::new(
            12,
            vec![AttributeField::new(Position, Float3, 0)],
        ))
        .unwrap();
        mesh
    }

    fn unit_triangle() -> Mesh {
        let mut mesh = mesh_from(&[[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        mesh.add_group(Topology::TriangleList, 0, vec![0, 1, 2]).unwrap();
        mesh
    }

    #[test]
    fn ray_hits_triangle() {
        let mesh = unit_triangle();
        let hit = mesh.pick(DVec3::new(-1.0, 0.0, 0.0), DVec3::X).unwrap();
        assert_eq!(hit.group, 0);
        assert_eq!(hit.primitive, 0);
        assert!((hit.distance - 1.0).abs() < 1e-12);
        assert_eq!(mesh.pick_distance(DVec3::new(-1.0, 0.0, 0.0), DVec3::X), Some(hit.distance));
    }

    #[test]
    fn ray_outside_triangle_misses() {
        let mesh = unit_triangle();
        assert_eq!(mesh.pick(DVec3::new(-1.0, 2.0, 2.0), DVec3::X), None);
        // pointing away from the plane
        assert_eq!(mesh.pick(DVec3::new(-1.0, 0.1, 0.1), DVec3::NEG_X), None);
    }

    #[test]
    fn parallel_ray_misses() {
        let mesh = unit_triangle();
        // runs along the edge from (0,0,0) to (0,1,0)
        assert_eq!(mesh.pick(DVec3::new(0.0, -1.0, 0.0), DVec3::Y), None);
    }

    #[test]
    fn closest_hit_wins() {
        let mut mesh = mesh_from(&[
            [2.0, 0.0, 0.0],
            [2.0, 1.0, 0.0],
            [2.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [1.0, 0.0, 1.0],
        ]);
        mesh.add_group(Topology::TriangleList, 0, vec![0, 1, 2]).unwrap();
        mesh.add_group(Topology::TriangleList, 0, vec![0, 1, 2, 3, 4, 5]).unwrap();
        let hit = mesh.pick(DVec3::new(0.0, 0.1, 0.1), DVec3::X).unwrap();
        assert_eq!((hit.group, hit.primitive), (1, 1));
        assert!((hit.distance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn fan_reports_primitive_index() {
        let mut mesh = mesh_from(&[
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 1.0, 1.0],
            [0.0, 0.0, 1.0],
            [0.0, -1.0, 1.0],
        ]);
        mesh.add_group(Topology::TriangleFan, 0, vec![0, 1, 2, 3, 4]).unwrap();
        let hit = mesh.pick(DVec3::new(-1.0, -0.2, 0.5), DVec3::X).unwrap();
        assert_eq!(hit.primitive, 2);
    }

    #[test]
    fn pick_requires_float3_position() {
        let mut mesh = unit_triangle();
        mesh.set_vertex_description(VertexLayout::new(
            12,
            vec![AttributeField::new(Normal, Float3, 0)],
        ))
        .unwrap();
        assert_eq!(mesh.pick(DVec3::new(-1.0, 0.1, 0.1), DVec3::X), None);
        assert!(mesh.bounding_box().is_empty());
    }

    #[test]
    fn single_vertex_box_is_degenerate() {
        let mesh = mesh_from(&[[2.0, 3.0, 4.0]]);
        let bbox = mesh.bounding_box();
        assert_eq!(bbox, Aabb::new(Vec3::new(2.0, 3.0, 4.0), Vec3::new(2.0, 3.0, 4.0)));
        assert!(!bbox.is_empty());
    }

    #[test]
    fn point_size_grows_box() {
        let mut mesh = Mesh::new();
        let record: [f32; 4] = [2.0, 3.0, 4.0, 0.5];
        mesh.set_vertices(VertexBuffer::new(1, record.iter().flat_map(|v| v.to_le_bytes()).collect()));
        mesh.set_vertex_description(VertexLayout::new(
            16,
            vec![
                AttributeField::new(Position, Float3, 0),
                AttributeField::new(PointSize, Float1, 12),
            ],
        ))
        .unwrap();
        assert_eq!(
            mesh.bounding_box(),
            Aabb::new(Vec3::new(1.5, 2.5, 3.5), Vec3::new(2.5, 3.5, 4.5))
        );

        mesh.transform(Vec3::ZERO, 2.0);
        let size = mesh.vertex_description().field_for(PointSize);
        assert_eq!(size.read_f32(mesh.vertices().as_bytes()), Some(1.0));
    }

    #[test]
    fn transform_translates_then_scales() {
        let mut mesh = mesh_from(&[[0.0, 0.0, 0.0]]);
        let pos = mesh.vertex_description().field_for(Position);
        mesh.transform(Vec3::X, 2.0);
        assert_eq!(pos.read_vec3(mesh.vertices().as_bytes()), Some(Vec3::new(2.0, 0.0, 0.0)));
        mesh.transform(Vec3::X, 2.0);
        assert_eq!(pos.read_vec3(mesh.vertices().as_bytes()), Some(Vec3::new(6.0, 0.0, 0.0)));
    }

    #[test]
    fn transform_updates_line_quads() {
        let mut mesh = mesh_from(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        mesh.add_group(Topology::LineList, 0, vec![0, 1]).unwrap();
        mesh.transform(Vec3::Y, 2.0);
        let g = mesh.group(0).unwrap().override_geometry().unwrap();
        let pos = g.layout.field_for(Position);
        let next = g.layout.field_for(NextPosition);
        let first = g.buffer.record(0, g.layout.stride()).unwrap();
        assert_eq!(pos.read_vec3(first), Some(Vec3::new(0.0, 2.0, 0.0)));
        assert_eq!(next.read_vec3(first), Some(Vec3::new(2.0, 2.0, 0.0)));
        let scale = g.layout.field_for(ScaleFactor);
        assert_eq!(scale.read_f32(first), Some(-0.5));
    }

    #[test]
    fn empty_box_absorbs_nothing() {
        let mut bbox = Aabb::EMPTY;
        bbox.extend_box(&Aabb::EMPTY);
        assert!(bbox.is_empty());
        bbox.extend_point(Vec3::ONE);
        assert!(bbox.contains_point(Vec3::ONE));
        assert_eq!(bbox.size(), Vec3::ZERO);
        assert_eq!(bbox.center(), Vec3::ONE);
    }
}
