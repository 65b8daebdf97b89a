use std::string::ToString;
use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("operation {0} is not defined in the service model")]
    OperationNotFound(String),

    #[error("shape {0} is not defined in the service model")]
    MissingShape(String),

    #[error("operation {0} has no input shape")]
    MissingInput(String),

    #[error("shape {0} has an unsupported type: {1}")]
    UnsupportedShape(String, String),

    #[error("map shape {0} requires a locationName on its key")]
    MapKeyName(String),

    #[error("map shape {0} has a non-string key")]
    ComplexMapKey(String),

    #[error("operation {0} declares pagination without a result_key")]
    PaginationKey(String),

    #[error("pagination result key {1} of operation {0} does not resolve to a list")]
    PaginationNotIterable(String, String),

    #[error("documentation contains unsupported markup: {0}")]
    UnsupportedDocumentation(String),

    #[error("class {0} could not be parsed for merging: {1}")]
    Merge(String, String),

    #[error("io error: {0}")]
    Io(String),

    #[error("invalid config: {0}")]
    Config(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e.to_string())
    }
}

impl Error {
    /// true for errors caused by an inconsistent service definition
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Error::OperationNotFound(_)
                | Error::MissingShape(_)
                | Error::MissingInput(_)
                | Error::UnsupportedShape(_, _)
                | Error::MapKeyName(_)
                | Error::ComplexMapKey(_)
                | Error::PaginationKey(_)
                | Error::PaginationNotIterable(_, _)
        )
    }
}
