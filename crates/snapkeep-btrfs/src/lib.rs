pub mod btrfs;

pub use btrfs::*;
