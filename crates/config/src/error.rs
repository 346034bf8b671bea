use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A config file was explicitly requested but isn't there.
    #[display("config file does not exist: {}", _0.display())]
    MissingFile(#[error(not(source))] PathBuf),
    /// The merged configuration could not be deserialized. The figment error
    /// (with the offending key and its source) is attached as a child.
    #[display("invalid configuration")]
    Invalid,
    #[display("library root could not be made absolute: {}", _0.display())]
    InvalidRoot(#[error(not(source))] PathBuf),
    #[display("library.extensions must contain at least one extension")]
    NoExtensions,
}
