use glam::Vec3;
use packed_mesh::HashSet;
use packed_mesh::read::MeshReaderSettings;
use packed_mesh::write::MeshWriterSettings;

use crate::CommonArgs;
use crate::prelude::*;
use crate::util::{load_mesh, parse_vec3, save_mesh};

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Translation applied before scaling, as x,y,z
    #[arg(short, long, value_parser = parse_vec3, allow_hyphen_values = true)]
    translate: Option<Vec3>,
    /// Uniform scale factor
    #[arg(short, long)]
    scale: Option<f32>,
    /// Sort groups by material (stable)
    #[arg(short, long)]
    aggregate: bool,
    /// Delete specific groups
    #[arg(short = 'd', long)]
    drop_group: Vec<usize>,
    /// Rename the mesh
    #[arg(long)]
    name: Option<String>,
    #[command(flatten)]
    rarg: crate::ReadArgs,
    #[command(flatten)]
    warg: crate::WriteArgs,
    #[command(flatten)]
    oarg: crate::OutputArgs,
    #[command(flatten)]
    paths: crate::InOutPaths,
}

pub fn run(
    args_common: &CommonArgs,
    args_cmd: &EditArgs,
) -> AnyResult<()> {
    let mut mesh = load_mesh(
        &args_cmd.paths.in_file,
        MeshReaderSettings::from(&args_cmd.rarg),
    )?;

    if !args_cmd.drop_group.is_empty() {
        let drop_groups: HashSet<_> = args_cmd.drop_group.iter().copied().collect();
        let kept: Vec<_> = mesh
            .groups()
            .iter()
            .enumerate()
            .filter(|(i, _)| !drop_groups.contains(i))
            .map(|(_, g)| g.clone())
            .collect();
        if args_common.verbose {
            eprintln!("Dropping {} of {} groups.", mesh.group_count() - kept.len(), mesh.group_count());
        }
        mesh.clear_groups();
        for group in kept {
            mesh.push_group(group);
        }
    }

    if args_cmd.translate.is_some() || args_cmd.scale.is_some() {
        mesh.transform(
            args_cmd.translate.unwrap_or(Vec3::ZERO),
            args_cmd.scale.unwrap_or(1.0),
        );
    }

    if args_cmd.aggregate {
        mesh.aggregate_by_material();
    }

    if let Some(name) = &args_cmd.name {
        mesh.set_name(name.clone());
    }

    let outpath =
        args_cmd.paths.out_file.as_ref().unwrap_or(&args_cmd.paths.in_file);
    save_mesh(
        &mesh,
        outpath,
        MeshWriterSettings::from(&args_cmd.warg),
        args_cmd.oarg.overwrite || args_cmd.paths.out_file.is_none(),
    )
}
