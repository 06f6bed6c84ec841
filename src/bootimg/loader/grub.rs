use std::path::Path;

use super::super::exec::Invocation;
use super::super::types::Creator;

/// Modules built into every GRUB EFI image.
pub const GRUB_MODULES: &[&str] = &[
    "part_gpt", "part_msdos", "ntfs", "ntfscomp", "fat", "ext2", "normal", "chain", "boot",
    "configfile", "linux", "search", "efi_gop", "font", "gfxterm", "gfxmenu", "terminal",
    "minicmd", "test", "loadenv", "echo", "help", "reboot", "serial", "terminfo", "iso9660",
    "loopback", "tar", "memdisk", "ls", "search_fs_uuid", "udf", "btrfs", "xfs", "lvm",
    "reiserfs", "regexp",
];

const X86_MODULES: &[&str] = &["multiboot", "efi_uga", "iorw", "ata"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrubTarget {
    /// `grub-mkimage -O` format
    pub format: &'static str,
    /// Removable-media file name under `EFI/BOOT`
    pub image: &'static str,
    pub extra_modules: &'static [&'static str],
}

impl GrubTarget {
    pub fn for_arch(distro_arch: &str) -> Option<Self> {
        let target = match distro_arch {
            "amd64" => GrubTarget {
                format: "x86_64-efi",
                image: "bootx64.efi",
                extra_modules: X86_MODULES,
            },
            "i386" => GrubTarget {
                format: "i386-efi",
                image: "bootia32.efi",
                extra_modules: X86_MODULES,
            },
            "arm64" => GrubTarget {
                format: "arm64-efi",
                image: "bootaa64.efi",
                extra_modules: &[],
            },
            _ => return None,
        };
        Some(target)
    }

    /// Command line that builds `<boot_dir>/EFI/BOOT/<image>`.
    pub fn mkimage(&self, tool: &str, boot_dir: &Path) -> Invocation {
        let output = boot_dir.join("EFI").join("BOOT").join(self.image);
        Invocation::new(tool)
            .args(["-p", "/EFI/BOOT", "-O", self.format, "-o"])
            .arg_path(&output)
            .args(GRUB_MODULES.iter().copied())
            .args(self.extra_modules.iter().copied())
    }
}

/// Default `grub.cfg` for the image: serial console, one `boot` entry,
/// root disk detected from the GPT number of the `/` partition.
pub fn render_config(creator: &Creator) -> String {
    let bootloader = &creator.bootloader;
    let mut cfg = String::new();
    cfg.push_str("serial --unit=0 --speed=115200 --word=8 --parity=no --stop=1\n");
    cfg.push_str("terminal_input --append serial\n");
    cfg.push_str("terminal_output --append serial\n");
    cfg.push('\n');
    cfg.push_str("default=boot\n");
    cfg.push_str(&format!("timeout={timeout}\n", timeout = bootloader.timeout));
    for part in creator
        .parts
        .iter()
        .filter(|p| p.mountpoint.as_deref() == Some("/"))
    {
        cfg.push_str("regexp --set bootdisk '(hd[0-9]*),' $prefix\n");
        cfg.push_str(&format!(
            "set root=$bootdisk',gpt{realnum}'\n",
            realnum = part.realnum
        ));
    }
    cfg.push('\n');
    cfg.push_str("menuentry 'boot'{\n");
    cfg.push_str(&format!(
        "    linux /vmlinuz root={rootdev} rootwait {append}\n",
        rootdev = creator.rootdev,
        append = bootloader.append.as_deref().unwrap_or("")
    ));
    cfg.push_str("    initrd /initrd.img\n");
    cfg.push_str("}\n");
    cfg
}
