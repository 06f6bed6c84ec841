pub mod bootimg;
pub mod config;

#[macro_use]
extern crate log;
