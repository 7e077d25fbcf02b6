use crate::error::{FsError, Result};

pub const BLOCK_SIZE: usize = 512;
pub const NUM_BLOCKS: usize = 1000;
pub const MAX_SYMLINK_DEPTH: usize = 10; // Links followed before giving up with TooManySymlinkLevels
pub const ROOT_DESC_ID: usize = 0; // Descriptor slot of the root directory

pub const DOT_NAME: &str = ".";
pub const DOTDOT_NAME: &str = "..";

/// Constructor-time geometry of an engine instance.
/// The descriptor count is not part of it, `mkfs` picks that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsConfig {
    pub block_size: usize,
    pub num_blocks: usize,
    pub max_symlink_depth: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            num_blocks: NUM_BLOCKS,
            max_symlink_depth: MAX_SYMLINK_DEPTH,
        }
    }
}

impl FsConfig {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_num_blocks(mut self, num_blocks: usize) -> Self {
        self.num_blocks = num_blocks;
        self
    }

    pub fn with_max_symlink_depth(mut self, depth: usize) -> Self {
        self.max_symlink_depth = depth;
        self
    }

    /// Largest logical size a single file may reach.
    pub fn max_file_size(&self) -> u64 {
        self.block_size as u64 * self.num_blocks as u64
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(FsError::InvalidArgument("block size must be non-zero".into()));
        }
        if self.num_blocks == 0 {
            return Err(FsError::InvalidArgument("block count must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let config = FsConfig::default();
        assert_eq!(config.block_size, 512);
        assert_eq!(config.num_blocks, 1000);
        assert_eq!(config.max_symlink_depth, 10);
        assert_eq!(config.max_file_size(), 512 * 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(FsConfig::default().with_block_size(0).validate().is_err());
        assert!(FsConfig::default().with_num_blocks(0).validate().is_err());
    }
}
