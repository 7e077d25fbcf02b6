//! Common utilities for tests
#![allow(dead_code)]

use memfs::{FileSystem, FsConfig};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// Routes the engine's status lines to the test output.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Default geometry (512-byte blocks, 1000 blocks) with `num_descriptors` descriptors.
pub fn new_fs(num_descriptors: usize) -> FileSystem {
    init_logger();
    FileSystem::format(FsConfig::default(), num_descriptors).unwrap()
}

/// Tiny geometry for exhausting the block store.
pub fn tiny_fs(num_blocks: usize, num_descriptors: usize) -> FileSystem {
    init_logger();
    let config = FsConfig::default().with_block_size(16).with_num_blocks(num_blocks);
    FileSystem::format(config, num_descriptors).unwrap()
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
