use std::io::{BufReader, BufWriter, Write};

use glam::Vec3;
use packed_mesh::mesh::Mesh;
use packed_mesh::read::{MeshReader, MeshReaderSettings};
use packed_mesh::write::{MeshWriter, MeshWriterSettings};

use crate::prelude::*;

pub fn load_mesh(
    path: &Path,
    settings: MeshReaderSettings,
) -> AnyResult<Mesh> {
    let infile = std::fs::File::open(path)
        .with_context(|| format!("Could not open input file {}", path.display()))?;
    let mut bufin = BufReader::new(infile);
    let reader = MeshReader::init_with_settings(settings, &mut bufin)
        .context("Cannot decode file metadata and initialize decoding")?;
    let mesh = reader.read_mesh().context("Cannot decode mesh data")?;
    log::debug!(
        "Loaded {}: {} vertices, {} groups",
        path.display(),
        mesh.vertex_count(),
        mesh.group_count(),
    );
    Ok(mesh)
}

pub fn save_mesh(
    mesh: &Mesh,
    path: &Path,
    settings: MeshWriterSettings,
    overwrite: bool,
) -> AnyResult<()> {
    let outfile = if overwrite {
        std::fs::File::create(path).context("Could not open output file")?
    } else {
        std::fs::File::create_new(path).context("Could not open output file")?
    };
    let mut bufout = BufWriter::new(outfile);
    MeshWriter::new_with_settings(settings)
        .write_to(mesh, &mut bufout)
        .context("Cannot encode output file")?;
    bufout.flush().context("Could not write output")?;
    Ok(())
}

/// Parses `x,y,z` into a vector.
pub fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let &[x, y, z] = parts.as_slice() else {
        return Err(format!("expected x,y,z but got {s:?}"));
    };
    let num = |v: &str| v.parse::<f32>().map_err(|e| format!("{v:?}: {e}"));
    Ok(Vec3::new(num(x)?, num(y)?, num(z)?))
}
