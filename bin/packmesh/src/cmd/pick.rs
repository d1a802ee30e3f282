use glam::Vec3;
use packed_mesh::read::MeshReaderSettings;

use crate::CommonArgs;
use crate::prelude::*;
use crate::util::{load_mesh, parse_vec3};

#[derive(clap::Args, Debug)]
pub struct PickArgs {
    /// Ray origin in mesh space, as x,y,z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    origin: Vec3,
    /// Ray direction, as x,y,z (need not be normalized)
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    direction: Vec3,
    #[command(flatten)]
    rarg: crate::ReadArgs,
    #[command(flatten)]
    inpath: crate::InputPath,
}

pub fn run(
    _args_common: &CommonArgs,
    args_cmd: &PickArgs,
) -> AnyResult<()> {
    if args_cmd.direction == Vec3::ZERO {
        bail!("Ray direction must not be zero");
    }
    let mesh = load_mesh(
        &args_cmd.inpath.in_file,
        MeshReaderSettings::from(&args_cmd.rarg),
    )?;
    match mesh.pick(args_cmd.origin.as_dvec3(), args_cmd.direction.as_dvec3()) {
        Some(hit) => {
            let group = mesh.group(hit.group).context("Hit group out of range")?;
            println!(
                "hit group {} ({:?}, material {}) triangle {} at distance {}",
                hit.group, group.topology, group.material, hit.primitive, hit.distance,
            );
        }
        None => println!("no hit"),
    }
    Ok(())
}
