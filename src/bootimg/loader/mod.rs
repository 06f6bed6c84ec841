//! Configuration text for the supported loaders. Keywords and line
//! order are what GRUB and systemd-boot parse; keep them unchanged.

pub mod grub;
pub mod systemd;

pub use grub::GrubTarget;
