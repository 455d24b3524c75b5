use thiserror::Error;
use std::result;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid identifier: `{0}`")]
    InvalidIdentifier(String),
}

pub type Result<T> = result::Result<T, Error>;
