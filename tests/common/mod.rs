#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bootimg_efi::bootimg::ExecError;
use bootimg_efi::bootimg::exec::{CommandRunner, Invocation};
use bootimg_efi::bootimg::host::ConfigLookup;
use bootimg_efi::bootimg::types::{BootloaderConfig, Creator, Partition, SourceParams};

/// Records every command; `mkdosfs` creates an image of the requested size.
#[derive(Default)]
pub struct FakeRunner {
    pub calls: RefCell<Vec<Invocation>>,
    pub fail: Option<&'static str>,
}

impl FakeRunner {
    pub fn failing(program: &'static str) -> Self {
        Self {
            fail: Some(program),
            ..Default::default()
        }
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.program.clone()).collect()
    }

    pub fn call(&self, program: &str) -> Option<Invocation> {
        self.calls
            .borrow()
            .iter()
            .find(|c| c.program == program)
            .cloned()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, cmd: &Invocation) -> Result<String, ExecError> {
        self.calls.borrow_mut().push(cmd.clone());
        if self.fail == Some(cmd.program.as_str()) {
            return Err(ExecError::Other {
                command: cmd.to_string(),
                message: "exit status 1".into(),
            });
        }
        if cmd.program == "mkdosfs" {
            let args = cmd.args_lossy();
            let image = PathBuf::from(&args[args.len() - 2]);
            let blocks: u64 = args[args.len() - 1].parse().unwrap();
            let file = fs::File::create(&image).unwrap();
            file.set_len(blocks * 1024).unwrap();
        }
        Ok(String::new())
    }
}

#[derive(Default)]
pub struct MapConfigs(pub BTreeMap<String, String>);

impl ConfigLookup for MapConfigs {
    fn load(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

pub fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn params(raw: &str) -> SourceParams {
    raw.parse().unwrap()
}

pub fn creator(append: Option<&str>) -> Creator {
    Creator {
        parts: vec![
            Partition {
                mountpoint: Some("/boot".into()),
                realnum: 1,
                ..Default::default()
            },
            Partition {
                mountpoint: Some("/".into()),
                realnum: 2,
                ..Default::default()
            },
        ],
        rootdev: "/dev/sda2".into(),
        bootloader: BootloaderConfig {
            timeout: 5,
            append: append.map(str::to_string),
            configfile: None,
        },
    }
}

pub fn boot_part(creator: &Creator) -> Partition {
    creator.parts[0].clone()
}

pub fn staging(workdir: &Path) -> PathBuf {
    workdir.join("hdd").join("boot")
}

pub fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
