use std::io::BufReader;

use packed_mesh::read::MeshReader;
use packed_mesh::read::MeshReaderSettings;

use crate::CommonArgs;
use crate::prelude::*;

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    inarg: crate::ReadArgs,
    #[command(flatten)]
    inpath: crate::InputPath,
}

pub fn run(
    args_common: &CommonArgs,
    args_cmd: &VerifyArgs,
) -> AnyResult<()> {
    let strict = MeshReaderSettings::default();
    match try_run(args_common, args_cmd, strict) {
        Err(e) if args_cmd.inarg.ignore_checksums => {
            log::warn!("{:#}; retrying with checksum checks disabled", e);
            let lenient = MeshReaderSettings {
                verify_metadata_checksum: false,
                verify_data_checksum: false,
            };
            try_run(args_common, args_cmd, lenient)
        }
        other => other,
    }
}

pub fn try_run(
    args_common: &CommonArgs,
    args_cmd: &VerifyArgs,
    settings: MeshReaderSettings,
) -> AnyResult<()> {
    let file = std::fs::File::open(&args_cmd.inpath.in_file)
        .with_context(|| format!("Cannot open {:?}", args_cmd.inpath.in_file))?;
    let mut bufin = BufReader::new(file);
    let reader = MeshReader::init_with_settings(settings, &mut bufin)
        .context("Archive header or descriptor is unreadable")?;
    if args_common.verbose {
        eprintln!("Header and descriptor OK.");
    }
    let mesh = reader.read_mesh().context("Cannot decode mesh data")?;
    if args_common.verbose {
        eprintln!("Mesh data successfully decoded.");
    }
    if !mesh.vertex_description().validate() {
        bail!("Vertex layout is invalid");
    }
    for (i, item) in mesh.draw_items().enumerate() {
        if !item.layout.validate() {
            bail!("Group {} draws with an invalid vertex layout", i);
        }
        let count = item.buffer.count();
        if let Some(bad) = item.indices.iter().find(|&&idx| idx >= count) {
            bail!(
                "Group {} references vertex {} but its buffer has {} vertices",
                i,
                bad,
                count,
            );
        }
    }
    if args_common.verbose {
        eprintln!("All group indices are in range.");
    }
    Ok(())
}
