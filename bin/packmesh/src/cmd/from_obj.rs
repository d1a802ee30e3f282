use std::io::BufReader;

use obj::raw::{RawObj, parse_obj};
use obj::{Obj, Position, TexturedVertex, Vertex};
use packed_mesh::batch::Topology;
use packed_mesh::buffer::VertexBuffer;
use packed_mesh::layout::{AttributeField, AttributeFormat, AttributeSemantic, VertexLayout};
use packed_mesh::mesh::Mesh;
use packed_mesh::write::MeshWriterSettings;

use crate::CommonArgs;
use crate::prelude::*;
use crate::util::save_mesh;

#[derive(clap::Args, Debug)]
pub struct FromObjArgs {
    /// Material index to assign to the imported triangles
    #[arg(short, long, default_value_t = 0)]
    material: u32,
    #[command(flatten)]
    warg: crate::WriteArgs,
    #[command(flatten)]
    oarg: crate::OutputArgs,
    #[command(flatten)]
    inpath: crate::InputPath,
    #[command(flatten)]
    outpath: crate::OutputPath,
}

/// Interleaved vertex records and the layout describing them.
struct Interleaved {
    layout: VertexLayout,
    count: u32,
    data: Vec<u8>,
    indices: Vec<u32>,
}

pub fn run(
    args_common: &CommonArgs,
    args_cmd: &FromObjArgs,
) -> AnyResult<()> {
    let infile = std::fs::File::open(&args_cmd.inpath.in_file)
        .context("Cannot open input OBJ file")?;
    let rawobj = parse_obj(BufReader::new(infile)).context("Cannot parse OBJ file")?;
    let name = rawobj.name.clone().unwrap_or_default();
    let imported = try_ptn(rawobj.clone())
        .or_else(|_| try_pn(rawobj.clone()))
        .or_else(|_| try_p(rawobj.clone()))
        .context("OBJ file is not in any valid vertex format")?;
    if imported.count == 0 {
        bail!("No vertex positions!");
    }
    if args_common.verbose {
        eprintln!(
            "Imported {} vertices, {} triangles, stride {}.",
            imported.count,
            imported.indices.len() / 3,
            imported.layout.stride(),
        );
    }

    let mut mesh = Mesh::new();
    mesh.set_name(name);
    mesh.set_vertices(VertexBuffer::new(imported.count, imported.data));
    mesh.set_vertex_description(imported.layout)
        .context("Generated vertex layout is invalid")?;
    mesh.add_group(Topology::TriangleList, args_cmd.material, imported.indices)
        .context("Cannot add triangle group")?;

    save_mesh(
        &mesh,
        &args_cmd.outpath.out_file,
        MeshWriterSettings::from(&args_cmd.warg),
        args_cmd.oarg.overwrite,
    )
}

fn push_f32s(data: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        data.extend_from_slice(&v.to_le_bytes());
    }
}

fn try_ptn(rawobj: RawObj) -> AnyResult<Interleaved> {
    let obj: Obj<TexturedVertex, u32> = Obj::new(rawobj)?;
    let layout = VertexLayout::new(
        32,
        vec![
            AttributeField::new(AttributeSemantic::Position, AttributeFormat::Float3, 0),
            AttributeField::new(AttributeSemantic::Normal, AttributeFormat::Float3, 12),
            AttributeField::new(AttributeSemantic::Texture0, AttributeFormat::Float2, 24),
        ],
    );
    let mut data = Vec::with_capacity(obj.vertices.len() * 32);
    for v in obj.vertices.iter() {
        push_f32s(&mut data, &v.position);
        push_f32s(&mut data, &v.normal);
        push_f32s(&mut data, &v.texture[..2]);
    }
    Ok(Interleaved {
        layout,
        count: obj.vertices.len() as u32,
        data,
        indices: obj.indices,
    })
}

fn try_pn(rawobj: RawObj) -> AnyResult<Interleaved> {
    let obj: Obj<Vertex, u32> = Obj::new(rawobj)?;
    let layout = VertexLayout::new(
        24,
        vec![
            AttributeField::new(AttributeSemantic::Position, AttributeFormat::Float3, 0),
            AttributeField::new(AttributeSemantic::Normal, AttributeFormat::Float3, 12),
        ],
    );
    let mut data = Vec::with_capacity(obj.vertices.len() * 24);
    for v in obj.vertices.iter() {
        push_f32s(&mut data, &v.position);
        push_f32s(&mut data, &v.normal);
    }
    Ok(Interleaved {
        layout,
        count: obj.vertices.len() as u32,
        data,
        indices: obj.indices,
    })
}

fn try_p(rawobj: RawObj) -> AnyResult<Interleaved> {
    let obj: Obj<Position, u32> = Obj::new(rawobj)?;
    let layout = VertexLayout::new(
        12,
        vec![AttributeField::new(AttributeSemantic::Position, AttributeFormat::Float3, 0)],
    );
    let mut data = Vec::with_capacity(obj.vertices.len() * 12);
    for v in obj.vertices.iter() {
        push_f32s(&mut data, &v.position);
    }
    Ok(Interleaved {
        layout,
        count: obj.vertices.len() as u32,
        data,
        indices: obj.indices,
    })
}
