use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure modes of the join pipeline.
///
/// Every fallible operation in the crate returns [`Result`]. Nothing is
/// retried or partially recovered: the caller receives the error and any
/// intermediate storage has already been released.
#[derive(Error, Debug)]
pub enum Error {
    /// A required input was absent or out of its valid range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Allocation failed while sizing the index, adding a chain entry,
    /// draining the result or building a dump buffer.
    #[error("out of memory while {context}")]
    OutOfMemory { context: &'static str },

    /// A dump file whose length is not a whole number of records.
    #[error("{}: length {len} is not a multiple of the {record_size}-byte record size", path.display())]
    MalformedFile {
        path: PathBuf,
        len: u64,
        record_size: usize,
    },

    /// Open, read, write or close failure on a dump file.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
