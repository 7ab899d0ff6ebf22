use std::result;

use classfile_core::Error as CoreError;

/// The façade's error type: everything that can go wrong either inside
/// `classfile-core` or while parsing a type/method descriptor string
/// for one of the convenience accessors in `model`.
#[derive(Debug, YadeError)]
pub enum Error {
    /// An error coming from `classfile-core`.
    Core(CoreError),

    /// Not a valid type or method descriptor.
    InvalidDescriptor { desc: String, at: usize },
}

pub type Result<T> = result::Result<T, Error>;

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Error {
        Error::Core(err)
    }
}
