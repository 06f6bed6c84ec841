use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Selects the partition of a layout file and where to build it.
#[derive(Args, Debug, Clone)]
pub struct PartArgs {
    /// Image layout file (rootdev, bootloader, partitions)
    #[arg(short, long, value_name = "PATH", default_value = "layout.toml")]
    pub layout: PathBuf,

    /// Partition selector: GPT number or mount point
    #[arg(long, value_name = "NUM|MOUNTPOINT")]
    pub part: Option<String>,

    /// Work directory of the build
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub workdir: PathBuf,

    /// Override the partition's source parameters (e.g. loader=grub-efi,initrd=initrd.img)
    #[arg(long, value_name = "PARAMS")]
    pub sourceparams: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PrepareArgs {
    /// Directory holding loader binaries and kernel artifacts
    #[arg(long, value_name = "DIR")]
    pub kernel_dir: Option<PathBuf>,

    /// Boot image directory passed through from the host
    #[arg(long, value_name = "DIR")]
    pub bootimg_dir: Option<PathBuf>,

    /// Root filesystem directory passed through from the host
    #[arg(long, value_name = "DIR")]
    pub rootfs_dir: Option<PathBuf>,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum BootAction {
    /// Write the loader configuration into the staging directory
    Configure {
        #[command(flatten)]
        part: PartArgs,
    },

    /// Populate the staging directory and build the boot image
    Prepare {
        #[command(flatten)]
        part: PartArgs,
        #[command(flatten)]
        dirs: PrepareArgs,
    },

    /// Run configure and prepare in one go
    Build {
        #[command(flatten)]
        part: PartArgs,
        #[command(flatten)]
        dirs: PrepareArgs,
    },

    /// List files inside a built boot image
    Ls {
        /// Boot image path
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Directory path inside image
        #[arg(value_name = "PATH", default_value = "/")]
        path: String,
    },
}
