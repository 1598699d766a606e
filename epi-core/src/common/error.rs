use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage failure: {message}")]
    Database { message: String },
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
