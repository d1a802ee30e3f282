use packed_mesh::{read::MeshReaderSettings, write::MeshWriterSettings};

use crate::prelude::*;

#[allow(unused_imports)]
mod prelude {
    pub use std::path::{Path, PathBuf};

    pub use anyhow::{Context, Result as AnyResult, bail};
}

mod cmd {
    pub mod bounds;
    pub mod edit;
    pub mod info;
    pub mod pick;
    pub mod verify;
    #[cfg(feature = "obj")]
    pub mod from_obj;
}

mod util;

#[derive(clap::Parser, Debug)]
#[command(about = "Tool for working with packed mesh archives.")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    /// Operation to perform
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Args, Debug)]
struct CommonArgs {
    /// Log what each step is doing
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Args, Debug)]
struct WriteArgs {
    /// Compression level for the data stream (highest if omitted)
    #[arg(short, long)]
    level: Option<i32>,
    /// Leave the data checksum out of the header
    #[arg(long)]
    no_data_checksum: bool,
}

#[derive(clap::Args, Debug)]
struct ReadArgs {
    /// Keep going when a stored checksum does not match
    #[arg(long)]
    ignore_checksums: bool,
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Replace the output file if it already exists
    #[arg(short, long)]
    overwrite: bool,
}

#[derive(clap::Args, Debug)]
struct InputPath {
    /// Archive to read
    in_file: PathBuf,
}

#[derive(clap::Args, Debug)]
struct OutputPath {
    /// Where to write the archive
    out_file: PathBuf,
}

#[derive(clap::Args, Debug)]
struct InOutPaths {
    /// Archive to read
    in_file: PathBuf,
    /// Where to write the result (defaults to the input path)
    out_file: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum CliCommand {
    /// Print the tool and format versions
    Version,
    /// Describe the layout and groups stored in an archive
    Info(cmd::info::InfoArgs),
    /// Decode an archive fully and report problems
    Verify(cmd::verify::VerifyArgs),
    /// Load a file, transform or reorder it, save the changes
    Edit(cmd::edit::EditArgs),
    /// Cast a ray against the triangles of a mesh
    Pick(cmd::pick::PickArgs),
    /// Print the axis-aligned bounds of a mesh
    Bounds(cmd::bounds::BoundsArgs),
    /// Convert a Wavefront OBJ file into an archive
    #[cfg(feature = "obj")]
    FromObj(cmd::from_obj::FromObjArgs),
}

impl From<&ReadArgs> for MeshReaderSettings {
    fn from(args: &ReadArgs) -> Self {
        Self {
            verify_metadata_checksum: !args.ignore_checksums,
            verify_data_checksum: !args.ignore_checksums,
        }
    }
}

impl From<&WriteArgs> for MeshWriterSettings {
    fn from(args: &WriteArgs) -> Self {
        let default = Self::default();
        Self {
            write_data_checksum: !args.no_data_checksum,
            compression_level: args.level.unwrap_or(default.compression_level),
        }
    }
}

fn run_command(cli: &Cli) -> AnyResult<()> {
    match &cli.command {
        CliCommand::Version => {
            if !cli.common.verbose {
                print_version();
            }
            Ok(())
        }
        CliCommand::Info(args) => cmd::info::run(&cli.common, args),
        CliCommand::Verify(args) => cmd::verify::run(&cli.common, args),
        CliCommand::Edit(args) => cmd::edit::run(&cli.common, args),
        CliCommand::Pick(args) => cmd::pick::run(&cli.common, args),
        CliCommand::Bounds(args) => cmd::bounds::run(&cli.common, args),
        #[cfg(feature = "obj")]
        CliCommand::FromObj(args) => cmd::from_obj::run(&cli.common, args),
    }
}

fn print_version() {
    eprintln!(
        "{} {} (archive format v{})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        packed_mesh::FORMAT_VERSION,
    );
    eprintln!();
}

fn main() {
    use clap::Parser;
    let cli = Cli::parse();

    let default_filter = if cli.common.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if cli.common.verbose {
        print_version();
    }

    if let Err(e) = run_command(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(2);
    }
}
