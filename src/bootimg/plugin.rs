//! The `bootimg-efi` source plugin: EFI boot partition for GRUB2 and
//! systemd-boot.
//!
//! The host calls [`SourcePlugin::configure_partition`] first, which
//! writes the loader configuration into `<workdir>/hdd/boot`, then
//! [`SourcePlugin::prepare_partition`], which adds loader binaries,
//! builds `<workdir>/boot.img` and records it on the partition.

use std::fs;
use std::path::{Path, PathBuf};

use super::config::Settings;
use super::error::{PluginError, Result};
use super::exec::CommandRunner;
use super::fs::build_fat_image;
use super::host::{ConfigLookup, DEPLOY_DIR_IMAGE, DISTRO_ARCH, VarLookup};
use super::loader::{GrubTarget, grub, systemd};
use super::types::{Creator, Loader, Partition, PreparedImage, SourceParams};
use super::utils::{copy_path, disk_usage_kb, sorted_entries};

/// Directories the host hands to `prepare_partition`.
#[derive(Debug, Clone, Default)]
pub struct SourceDirs {
    /// Boot image directory of the host. Not read by this plugin.
    pub bootimg_dir: Option<PathBuf>,
    /// Artifact directory; falls back to `DEPLOY_DIR_IMAGE`.
    pub kernel_dir: Option<PathBuf>,
    /// Root filesystem directory of the host. Not read by this plugin.
    pub rootfs_dir: Option<PathBuf>,
}

/// Calls the host tool makes on a partition source plugin.
pub trait SourcePlugin {
    fn name(&self) -> &'static str;

    /// Writes loader specific configuration before the partition is prepared.
    fn configure_partition(
        &self,
        part: &Partition,
        source_params: &SourceParams,
        creator: &Creator,
        workdir: &Path,
    ) -> Result<()>;

    /// Produces the partition content and records it in `part.size`
    /// and `part.source_file`.
    fn prepare_partition(
        &self,
        part: &mut Partition,
        source_params: &SourceParams,
        creator: &Creator,
        workdir: &Path,
        dirs: &SourceDirs,
    ) -> Result<PreparedImage>;
}

/// Staging directory mirrored into the boot image.
pub fn staging_dir(workdir: &Path) -> PathBuf {
    workdir.join("hdd").join("boot")
}

fn efi_boot_dir(hdddir: &Path) -> PathBuf {
    hdddir.join("EFI").join("BOOT")
}

pub struct BootimgEfi<'a> {
    settings: &'a Settings,
    vars: &'a dyn VarLookup,
    configs: &'a dyn ConfigLookup,
    runner: &'a dyn CommandRunner,
}

impl<'a> BootimgEfi<'a> {
    pub fn new(
        settings: &'a Settings,
        vars: &'a dyn VarLookup,
        configs: &'a dyn ConfigLookup,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            settings,
            vars,
            configs,
            runner,
        }
    }

    /// Content of the custom loader config, if the bootloader line names one.
    fn custom_config(&self, creator: &Creator, purpose: &str) -> Result<Option<String>> {
        let Some(configfile) = creator
            .bootloader
            .configfile
            .as_deref()
            .filter(|c| !c.is_empty())
        else {
            return Ok(None);
        };
        match self.configs.load(configfile).filter(|c| !c.is_empty()) {
            Some(content) => {
                debug!("Using custom configuration file {configfile} for {purpose}");
                Ok(Some(content))
            }
            None => Err(PluginError::config(format!(
                "configfile is specified but failed to get it from {configfile}"
            ))),
        }
    }

    fn configure_grub(&self, creator: &Creator, hdddir: &Path) -> Result<()> {
        let conf = match self.custom_config(creator, "grub.cfg")? {
            Some(custom) => custom,
            None => grub::render_config(creator),
        };

        let path = efi_boot_dir(hdddir).join("grub.cfg");
        debug!("Writing grubefi config {}", path.display());
        write_config(&path, &conf)
    }

    fn configure_systemd(
        &self,
        creator: &Creator,
        hdddir: &Path,
        source_params: &SourceParams,
    ) -> Result<()> {
        let entries = hdddir.join("loader").join("entries");
        fs::create_dir_all(&entries).map_err(|e| {
            PluginError::config(format!("failed to create {}: {e}", entries.display()))
        })?;

        let initrd = source_params.non_empty("initrd");
        match initrd {
            Some(initrd) => {
                let deploy = self
                    .vars
                    .var(DEPLOY_DIR_IMAGE)
                    .ok_or_else(|| PluginError::config("Couldn't find DEPLOY_DIR_IMAGE, exiting"))?;
                let src = Path::new(&deploy).join(initrd);
                let name = src.file_name().ok_or_else(|| {
                    PluginError::config(format!("invalid initrd name: {initrd}"))
                })?;
                fs::copy(&src, hdddir.join(name)).map_err(|e| {
                    PluginError::config(format!("failed to copy initrd {}: {e}", src.display()))
                })?;
            }
            None => debug!("Ignoring missing initrd"),
        }

        let loader_conf = hdddir.join("loader").join("loader.conf");
        debug!("Writing systemd-boot config {}", loader_conf.display());
        write_config(
            &loader_conf,
            &systemd::render_loader_conf(creator.bootloader.timeout),
        )?;

        let boot_conf = match self.custom_config(creator, "systemd-boot's boot.conf")? {
            Some(custom) => custom,
            None => systemd::render_entry(creator, initrd),
        };
        let path = entries.join("boot.conf");
        debug!("Writing systemd-boot config {}", path.display());
        write_config(&path, &boot_conf)
    }

    /// Copies every `<prefix>NAME` artifact of `kernel_dir` to `efi_dir/NAME`.
    fn install_prefixed(&self, kernel_dir: &Path, prefix: &str, efi_dir: &Path) -> Result<()> {
        let names = sorted_entries(kernel_dir).map_err(|e| {
            PluginError::prepare(format!("failed to list {}: {e}", kernel_dir.display()))
        })?;
        for name in names {
            let Some(stripped) = name.strip_prefix(prefix) else {
                continue;
            };
            let src = kernel_dir.join(&name);
            let dst = efi_dir.join(stripped);
            debug!("Installing {} as {}", src.display(), dst.display());
            copy_path(&src, &dst).map_err(|e| {
                PluginError::prepare(format!("failed to copy {}: {e}", src.display()))
            })?;
        }
        Ok(())
    }

    fn prepare_grub(&self, workdir: &Path, hdddir: &Path, kernel_dir: &Path) -> Result<()> {
        let efi_dir = efi_boot_dir(hdddir);
        let cfg = efi_dir.join("grub.cfg");
        let saved = workdir.join("grub.cfg");

        // Deploy artifacts must not replace the configured grub.cfg.
        fs::copy(&cfg, &saved).map_err(|e| {
            PluginError::prepare(format!("failed to save {}: {e}", cfg.display()))
        })?;
        self.install_prefixed(kernel_dir, "grub-efi-", &efi_dir)?;
        fs::rename(&saved, &cfg).map_err(|e| {
            PluginError::prepare(format!("failed to restore {}: {e}", cfg.display()))
        })?;

        let distro_arch = self
            .vars
            .var(DISTRO_ARCH)
            .ok_or_else(|| PluginError::prepare("Couldn't find target architecture"))?;
        let target = GrubTarget::for_arch(&distro_arch).ok_or_else(|| {
            PluginError::prepare(format!("grub-efi is incompatible with target {distro_arch}"))
        })?;

        if efi_dir.join(target.image).is_file() {
            debug!("{} already present, skipping grub-mkimage", target.image);
            return Ok(());
        }
        let cmd = target.mkimage(&self.settings.grub_mkimage, hdddir);
        self.runner
            .run(&cmd)
            .map_err(|e| PluginError::prepare(e.to_string()))?;
        Ok(())
    }

    /// Blocks to allocate for `content_blocks` of staged files.
    pub fn total_blocks(&self, part: &Partition, content_blocks: u64) -> u64 {
        let extra_blocks = part
            .get_extra_block_count(content_blocks)
            .max(self.settings.extra_space);
        let total = content_blocks + extra_blocks;
        debug!(
            "Added {} extra blocks to {} to get to {} total blocks",
            extra_blocks,
            part.mountpoint.as_deref().unwrap_or("-"),
            total
        );
        total
    }
}

impl SourcePlugin for BootimgEfi<'_> {
    fn name(&self) -> &'static str {
        "bootimg-efi"
    }

    fn configure_partition(
        &self,
        _part: &Partition,
        source_params: &SourceParams,
        creator: &Creator,
        workdir: &Path,
    ) -> Result<()> {
        let hdddir = staging_dir(workdir);
        let efi_dir = efi_boot_dir(&hdddir);
        fs::create_dir_all(&efi_dir).map_err(|e| {
            PluginError::config(format!("failed to create {}: {e}", efi_dir.display()))
        })?;

        let loader = Loader::from_params(source_params, PluginError::Config)?;
        debug!("Configuring {loader} in {}", hdddir.display());
        match loader {
            Loader::GrubEfi => self.configure_grub(creator, &hdddir),
            Loader::SystemdBoot => self.configure_systemd(creator, &hdddir, source_params),
        }
    }

    fn prepare_partition(
        &self,
        part: &mut Partition,
        source_params: &SourceParams,
        _creator: &Creator,
        workdir: &Path,
        dirs: &SourceDirs,
    ) -> Result<PreparedImage> {
        let kernel_dir = match &dirs.kernel_dir {
            Some(dir) => dir.clone(),
            None => self
                .vars
                .var(DEPLOY_DIR_IMAGE)
                .map(PathBuf::from)
                .ok_or_else(|| PluginError::prepare("Couldn't find DEPLOY_DIR_IMAGE, exiting"))?,
        };
        let hdddir = staging_dir(workdir);

        match Loader::from_params(source_params, PluginError::Prepare)? {
            Loader::GrubEfi => self.prepare_grub(workdir, &hdddir, &kernel_dir)?,
            Loader::SystemdBoot => {
                self.install_prefixed(&kernel_dir, "systemd-", &efi_boot_dir(&hdddir))?
            }
        }

        let startup = kernel_dir.join("startup.nsh");
        if startup.exists() {
            fs::copy(&startup, hdddir.join("startup.nsh")).map_err(|e| {
                PluginError::prepare(format!("failed to copy {}: {e}", startup.display()))
            })?;
        }

        let content_blocks = disk_usage_kb(&hdddir, false).map_err(|e| {
            PluginError::prepare(format!("failed to measure {}: {e}", hdddir.display()))
        })?;
        let blocks = self.total_blocks(part, content_blocks);

        let bootimg = workdir.join(&self.settings.image_name);
        if bootimg.exists() {
            // mkdosfs -C refuses to overwrite an image left by a previous run
            fs::remove_file(&bootimg).map_err(|e| {
                PluginError::prepare(format!("failed to remove {}: {e}", bootimg.display()))
            })?;
        }
        build_fat_image(self.settings, self.runner, &bootimg, blocks, &hdddir)
            .map_err(|e| PluginError::prepare(format!("{e:#}")))?;
        set_image_mode(&bootimg)?;

        let size = disk_usage_kb(&bootimg, true).map_err(|e| {
            PluginError::prepare(format!("failed to measure {}: {e}", bootimg.display()))
        })?;
        part.size = size;
        part.source_file = Some(bootimg.clone());
        info!("Boot image {} ready, {} KiB", bootimg.display(), size);

        Ok(PreparedImage {
            source_file: bootimg,
            size_kb: size,
        })
    }
}

fn write_config(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)
        .map_err(|e| PluginError::config(format!("failed to write {}: {e}", path.display())))
}

#[cfg(unix)]
fn set_image_mode(image: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(image, fs::Permissions::from_mode(0o644)).map_err(|e| {
        PluginError::prepare(format!("failed to chmod {}: {e}", image.display()))
    })
}

#[cfg(not(unix))]
fn set_image_mode(_image: &Path) -> Result<()> {
    Ok(())
}
