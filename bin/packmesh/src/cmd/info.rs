use std::io::BufReader;

use packed_mesh::read::MeshReader;
use packed_mesh::read::MeshReaderSettings;

use crate::CommonArgs;
use crate::prelude::*;

#[derive(clap::Args, Debug)]
pub struct InfoArgs {
    /// Decode the data and print the first N vertices
    #[arg(long, value_name = "N")]
    vertices: Option<u32>,
    #[command(flatten)]
    rarg: crate::ReadArgs,
    #[command(flatten)]
    inpath: crate::InputPath,
}

pub fn run(
    _args_common: &CommonArgs,
    args_cmd: &InfoArgs,
) -> AnyResult<()> {
    let infile = std::fs::File::open(&args_cmd.inpath.in_file)
        .context("Could not open input file")?;
    let mut bufin = BufReader::new(infile);
    let reader = MeshReader::init_with_settings(
        MeshReaderSettings::from(&args_cmd.rarg),
        &mut bufin,
    )
    .context("Cannot decode file metadata and initialize decoding")?;

    println!("{:#?}", reader.descriptor());

    let Some(n) = args_cmd.vertices else {
        return Ok(());
    };
    let mesh = reader.read_mesh().context("Cannot decode mesh data")?;
    let layout = mesh.vertex_description();
    for (i, record) in mesh.vertices().records(layout.stride()).take(n as usize).enumerate() {
        println!("vertex {i}:");
        for field in layout.fields() {
            let components = field.format.components();
            match field.decode(record) {
                Some(v) => println!("  {:?}: {:?}", field.semantic, &v.to_array()[..components]),
                None => println!("  {:?}: <unreadable>", field.semantic),
            }
        }
    }
    Ok(())
}
