use super::super::types::Creator;

pub fn render_loader_conf(timeout: u32) -> String {
    format!("default boot\ntimeout {timeout}\n")
}

/// Default `entries/boot.conf`. `initrd` is relative to the ESP root.
pub fn render_entry(creator: &Creator, initrd: Option<&str>) -> String {
    let mut conf = String::new();
    conf.push_str("title boot\n");
    conf.push_str("linux /vmlinuz\n");
    conf.push_str(&format!(
        "options LABEL=Boot root={rootdev} {append}\n",
        rootdev = creator.rootdev,
        append = creator.bootloader.append.as_deref().unwrap_or("")
    ));
    if let Some(initrd) = initrd {
        conf.push_str(&format!("initrd /{initrd}\n"));
    }
    conf
}
