use alloc::string::String;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    #[error("no such file or directory: '{0}'")]
    NotFound(String),

    #[error("file already exists: '{0}'")]
    AlreadyExists(String),

    #[error("not a directory: '{0}'")]
    NotADirectory(String),

    #[error("not a regular file: '{0}'")]
    NotARegularFile(String),

    #[error("is a directory: '{0}'")]
    IsADirectory(String),

    #[error("directory not empty: '{0}'")]
    NotEmpty(String),

    #[error("cannot unlink directory: '{0}'")]
    CannotUnlinkDirectory(String),

    #[error("too many levels of symbolic links: '{0}'")]
    TooManySymlinkLevels(String),

    #[error("no free descriptors")]
    NoFreeDescriptors,

    #[error("no free blocks")]
    NoFreeBlocks,

    #[error("bad file handle: {0}")]
    InvalidDescriptor(usize),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    #[error("block {0} out of range")]
    InvalidBlockId(usize),

    #[error("block {0} is not allocated")]
    BlockNotAllocated(usize),
}

pub type Result<T> = core::result::Result<T, FsError>;
