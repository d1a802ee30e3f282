use packed_mesh::read::MeshReaderSettings;

use crate::CommonArgs;
use crate::prelude::*;
use crate::util::load_mesh;

#[derive(clap::Args, Debug)]
pub struct BoundsArgs {
    #[command(flatten)]
    rarg: crate::ReadArgs,
    #[command(flatten)]
    inpath: crate::InputPath,
}

pub fn run(
    _args_common: &CommonArgs,
    args_cmd: &BoundsArgs,
) -> AnyResult<()> {
    let mesh = load_mesh(
        &args_cmd.inpath.in_file,
        MeshReaderSettings::from(&args_cmd.rarg),
    )?;
    let bbox = mesh.bounding_box();
    if bbox.is_empty() {
        bail!("Mesh has no Float3 positions");
    }
    println!("min:    {} {} {}", bbox.min.x, bbox.min.y, bbox.min.z);
    println!("max:    {} {} {}", bbox.max.x, bbox.max.y, bbox.max.z);
    let center = bbox.center();
    println!("center: {} {} {}", center.x, center.y, center.z);
    Ok(())
}
