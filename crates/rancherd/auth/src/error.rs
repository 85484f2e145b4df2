use std::{io, path::PathBuf, string::FromUtf8Error};

use rancherd_store::StoreError;
use thiserror::Error;

pub type Result<T, E = Error> = ::core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("only one option can be set for password and password-file")]
    Configuration,

    #[error("failed to read the password file {path:?}: {source}")]
    PasswordFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("the password file {path:?} is not valid UTF-8: {source}")]
    PasswordEncoding {
        path: PathBuf,
        #[source]
        source: FromUtf8Error,
    },

    #[error("{0}")]
    NotReady(&'static str),

    #[error(
        "{count} users were found with {selector} label. They are {users:?}. \
        Can only reset the default admin password when there is exactly one user with this label."
    )]
    AmbiguousState {
        count: usize,
        selector: String,
        users: Vec<String>,
    },

    #[error("failed to hash the password: {0}")]
    Hash(#[from] ::bcrypt::BcryptError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
