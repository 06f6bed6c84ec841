mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bootimg_efi::bootimg::config::{BOOTDD_EXTRA_SPACE, FatBackend, Settings};
use bootimg_efi::bootimg::types::Partition;
use bootimg_efi::bootimg::{
    BootimgEfi, PluginError, SourceDirs, SourcePlugin, disk_usage_kb, fs as boot_fs,
};
use common::{FakeRunner, MapConfigs, boot_part, creator, params, staging, vars, write};
use tempfile::TempDir;

fn deploy_with(temp: &Path, files: &[(&str, &str)]) -> PathBuf {
    let deploy = temp.join("deploy");
    fs::create_dir_all(&deploy).unwrap();
    for (name, data) in files {
        write(&deploy.join(name), data.as_bytes());
    }
    deploy
}

fn kernel_dirs(deploy: &Path) -> SourceDirs {
    SourceDirs {
        kernel_dir: Some(deploy.to_path_buf()),
        ..Default::default()
    }
}

#[test]
fn grub_efi_builds_image() {
    let temp = TempDir::new().expect("temp dir");
    let work = temp.path().join("work");
    let deploy = deploy_with(
        temp.path(),
        &[
            ("grub-efi-grub.cfg", "stale"),
            ("grub-efi-unicode.pf2", "font"),
            ("vmlinuz", "kernel"),
            ("startup.nsh", "fs0:\\EFI\\BOOT\\bootx64.efi\n"),
        ],
    );

    let settings = Settings::default();
    let vars = vars(&[("DISTRO_ARCH", "amd64")]);
    let (configs, runner) = (MapConfigs::default(), FakeRunner::default());
    let plugin = BootimgEfi::new(&settings, &vars, &configs, &runner);

    let creator = creator(None);
    let mut part = boot_part(&creator);
    let sp = params("loader=grub-efi");
    plugin
        .configure_partition(&part, &sp, &creator, &work)
        .expect("configure");
    let image = plugin
        .prepare_partition(&mut part, &sp, &creator, &work, &kernel_dirs(&deploy))
        .expect("prepare");

    let hdd = staging(&work);
    let cfg = fs::read_to_string(hdd.join("EFI/BOOT/grub.cfg")).unwrap();
    assert!(cfg.contains("menuentry 'boot'"), "grub.cfg must survive the artifact copy");
    assert_eq!(fs::read(hdd.join("EFI/BOOT/unicode.pf2")).unwrap(), b"font");
    assert!(!hdd.join("EFI/BOOT/vmlinuz").exists());
    assert!(hdd.join("startup.nsh").is_file());
    assert!(!work.join("grub.cfg").exists());

    assert_eq!(runner.programs(), vec!["grub-mkimage", "mkdosfs", "mcopy"]);
    let mkimage = runner.call("grub-mkimage").unwrap().args_lossy();
    assert_eq!(&mkimage[..4], &["-p", "/EFI/BOOT", "-O", "x86_64-efi"]);
    assert_eq!(
        PathBuf::from(&mkimage[5]),
        hdd.join("EFI").join("BOOT").join("bootx64.efi")
    );
    assert!(mkimage.ends_with(&[
        "regexp".to_string(),
        "multiboot".to_string(),
        "efi_uga".to_string(),
        "iorw".to_string(),
        "ata".to_string()
    ]));

    let blocks = disk_usage_kb(&hdd, false).unwrap() + BOOTDD_EXTRA_SPACE;
    let bootimg = work.join("boot.img");
    let mkdosfs = runner.call("mkdosfs").unwrap().args_lossy();
    assert_eq!(
        mkdosfs,
        vec![
            "-n".to_string(),
            "efi".to_string(),
            "-C".to_string(),
            bootimg.display().to_string(),
            blocks.to_string()
        ]
    );

    let mcopy = runner.call("mcopy").unwrap().args_lossy();
    assert_eq!(mcopy[0], "-i");
    assert_eq!(mcopy[2], "-s");
    assert_eq!(mcopy.last().map(String::as_str), Some("::/"));
    assert!(mcopy.contains(&hdd.join("EFI").display().to_string()));
    assert!(mcopy.contains(&hdd.join("startup.nsh").display().to_string()));

    assert_eq!(part.size, blocks);
    assert_eq!(part.source_file.as_deref(), Some(bootimg.as_path()));
    assert_eq!(image.size_kb, blocks);
    assert_eq!(image.source_file, bootimg);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&bootimg).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}

#[test]
fn existing_grub_binary_skips_mkimage() {
    let temp = TempDir::new().expect("temp dir");
    let work = temp.path().join("work");
    let deploy = deploy_with(temp.path(), &[("grub-efi-bootaa64.efi", "prebuilt")]);

    let settings = Settings::default();
    let vars = vars(&[("DISTRO_ARCH", "arm64")]);
    let (configs, runner) = (MapConfigs::default(), FakeRunner::default());
    let plugin = BootimgEfi::new(&settings, &vars, &configs, &runner);

    let creator = creator(None);
    let mut part = boot_part(&creator);
    let sp = params("loader=grub-efi");
    plugin.configure_partition(&part, &sp, &creator, &work).unwrap();
    plugin
        .prepare_partition(&mut part, &sp, &creator, &work, &kernel_dirs(&deploy))
        .expect("first prepare");
    plugin
        .prepare_partition(&mut part, &sp, &creator, &work, &kernel_dirs(&deploy))
        .expect("second prepare");

    assert_eq!(runner.programs(), vec!["mkdosfs", "mcopy", "mkdosfs", "mcopy"]);
    assert_eq!(
        fs::read(staging(&work).join("EFI/BOOT/bootaa64.efi")).unwrap(),
        b"prebuilt"
    );
}

#[test]
fn unsupported_architecture_is_fatal() {
    let temp = TempDir::new().expect("temp dir");
    let work = temp.path().join("work");
    let deploy = deploy_with(temp.path(), &[]);

    let settings = Settings::default();
    let vars = vars(&[("DISTRO_ARCH", "mips")]);
    let (configs, runner) = (MapConfigs::default(), FakeRunner::default());
    let plugin = BootimgEfi::new(&settings, &vars, &configs, &runner);

    let creator = creator(None);
    let mut part = boot_part(&creator);
    let sp = params("loader=grub-efi");
    plugin.configure_partition(&part, &sp, &creator, &work).unwrap();
    let err = plugin
        .prepare_partition(&mut part, &sp, &creator, &work, &kernel_dirs(&deploy))
        .unwrap_err();

    assert!(matches!(err, PluginError::Prepare(ref m) if m.contains("incompatible with target mips")));
    assert!(runner.calls.borrow().is_empty());
    assert!(part.source_file.is_none());
}

#[test]
fn missing_architecture_is_fatal() {
    let temp = TempDir::new().expect("temp dir");
    let work = temp.path().join("work");
    let deploy = deploy_with(temp.path(), &[]);

    let settings = Settings::default();
    let (vars, configs, runner) = (
        BTreeMap::<String, String>::new(),
        MapConfigs::default(),
        FakeRunner::default(),
    );
    let plugin = BootimgEfi::new(&settings, &vars, &configs, &runner);

    let creator = creator(None);
    let mut part = boot_part(&creator);
    let sp = params("loader=grub-efi");
    plugin.configure_partition(&part, &sp, &creator, &work).unwrap();
    let err = plugin
        .prepare_partition(&mut part, &sp, &creator, &work, &kernel_dirs(&deploy))
        .unwrap_err();
    assert!(matches!(err, PluginError::Prepare(ref m) if m.contains("target architecture")));
}

#[test]
fn missing_loader_is_prepare_error() {
    let temp = TempDir::new().expect("temp dir");
    let deploy = deploy_with(temp.path(), &[]);

    let settings = Settings::default();
    let (vars, configs, runner) = (
        BTreeMap::<String, String>::new(),
        MapConfigs::default(),
        FakeRunner::default(),
    );
    let plugin = BootimgEfi::new(&settings, &vars, &configs, &runner);

    let creator = creator(None);
    let mut part = boot_part(&creator);
    for raw in ["", "loader=uboot"] {
        let err = plugin
            .prepare_partition(&mut part, &params(raw), &creator, temp.path(), &kernel_dirs(&deploy))
            .unwrap_err();
        assert!(matches!(err, PluginError::Prepare(_)), "{raw}: {err}");
    }
    assert!(runner.calls.borrow().is_empty());
}

#[test]
fn kernel_dir_falls_back_to_deploy_dir() {
    let temp = TempDir::new().expect("temp dir");
    let work = temp.path().join("work");
    let deploy = deploy_with(temp.path(), &[("systemd-bootx64.efi", "sd-boot")]);

    let settings = Settings::default();
    let (configs, runner) = (MapConfigs::default(), FakeRunner::default());
    let creator = creator(None);
    let sp = params("loader=systemd-boot");

    let empty = BTreeMap::<String, String>::new();
    let plugin = BootimgEfi::new(&settings, &empty, &configs, &runner);
    let mut part = boot_part(&creator);
    plugin.configure_partition(&part, &sp, &creator, &work).unwrap();
    let err = plugin
        .prepare_partition(&mut part, &sp, &creator, &work, &SourceDirs::default())
        .unwrap_err();
    assert!(matches!(err, PluginError::Prepare(ref m) if m.contains("DEPLOY_DIR_IMAGE")));

    let vars = vars(&[("DEPLOY_DIR_IMAGE", deploy.to_str().unwrap())]);
    let plugin = BootimgEfi::new(&settings, &vars, &configs, &runner);
    plugin
        .prepare_partition(&mut part, &sp, &creator, &work, &SourceDirs::default())
        .expect("prepare");
    assert_eq!(
        fs::read(staging(&work).join("EFI/BOOT/bootx64.efi")).unwrap(),
        b"sd-boot"
    );
    assert_eq!(runner.programs(), vec!["mkdosfs", "mcopy"]);
}

#[test]
fn failing_tool_aborts_prepare() {
    let temp = TempDir::new().expect("temp dir");
    let work = temp.path().join("work");
    let deploy = deploy_with(temp.path(), &[]);

    let settings = Settings::default();
    let (vars, configs) = (BTreeMap::<String, String>::new(), MapConfigs::default());
    let runner = FakeRunner::failing("mkdosfs");
    let plugin = BootimgEfi::new(&settings, &vars, &configs, &runner);

    let creator = creator(None);
    let mut part = boot_part(&creator);
    let sp = params("loader=systemd-boot");
    plugin.configure_partition(&part, &sp, &creator, &work).unwrap();
    let err = plugin
        .prepare_partition(&mut part, &sp, &creator, &work, &kernel_dirs(&deploy))
        .unwrap_err();

    assert!(matches!(err, PluginError::Prepare(ref m) if m.contains("mkdosfs")));
    assert_eq!(runner.programs(), vec!["mkdosfs"]);
    assert_eq!(part.size, 0);
}

#[test]
fn extra_space_is_clamped_to_minimum() {
    let settings = Settings::default();
    let (vars, configs, runner) = (
        BTreeMap::<String, String>::new(),
        MapConfigs::default(),
        FakeRunner::default(),
    );
    let plugin = BootimgEfi::new(&settings, &vars, &configs, &runner);

    let mut part = Partition::default();
    assert_eq!(plugin.total_blocks(&part, 10_000), 10_000 + BOOTDD_EXTRA_SPACE);

    part.size = 20_000;
    assert_eq!(plugin.total_blocks(&part, 10_000), 10_000 + BOOTDD_EXTRA_SPACE);

    part.size = 100_000;
    assert_eq!(plugin.total_blocks(&part, 10_000), 100_000);
}

#[test]
fn native_backend_writes_fat_image() {
    let temp = TempDir::new().expect("temp dir");
    let work = temp.path().join("work");
    let deploy = deploy_with(
        temp.path(),
        &[
            ("systemd-bootx64.efi", "sd-boot"),
            ("initrd.img", "initramfs"),
        ],
    );

    let settings = Settings {
        fat_backend: FatBackend::Native,
        ..Default::default()
    };
    let vars = vars(&[("DEPLOY_DIR_IMAGE", deploy.to_str().unwrap())]);
    let (configs, runner) = (MapConfigs::default(), FakeRunner::default());
    let plugin = BootimgEfi::new(&settings, &vars, &configs, &runner);

    let creator = creator(Some("console=ttyS0"));
    let mut part = boot_part(&creator);
    let sp = params("loader=systemd-boot,initrd=initrd.img");
    plugin.configure_partition(&part, &sp, &creator, &work).unwrap();
    let content_blocks = disk_usage_kb(&staging(&work), false).unwrap();
    plugin
        .prepare_partition(&mut part, &sp, &creator, &work, &SourceDirs::default())
        .expect("prepare");

    assert!(runner.calls.borrow().is_empty());
    let bootimg = work.join("boot.img");
    assert_eq!(part.source_file.as_deref(), Some(bootimg.as_path()));
    assert_eq!(part.size, fs::metadata(&bootimg).unwrap().len() / 1024);
    assert!(part.size >= content_blocks + BOOTDD_EXTRA_SPACE);

    let root: Vec<String> = boot_fs::list_dir(&bootimg, "/")
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert!(root.contains(&"EFI".to_string()));
    assert!(root.contains(&"loader".to_string()));
    assert!(root.contains(&"initrd.img".to_string()));

    let entry = boot_fs::read_file(&bootimg, "/loader/entries/boot.conf").unwrap();
    assert_eq!(
        String::from_utf8(entry).unwrap(),
        "title boot\nlinux /vmlinuz\noptions LABEL=Boot root=/dev/sda2 console=ttyS0\ninitrd /initrd.img\n"
    );
    assert_eq!(
        boot_fs::read_file(&bootimg, "/EFI/BOOT/bootx64.efi").unwrap(),
        b"sd-boot"
    );
}
