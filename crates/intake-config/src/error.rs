use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load limits: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid limit '{field}': {reason}")]
    InvalidLimit { field: &'static str, reason: String },
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Self::Figment(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
