use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("display term has an empty field name (value '{raw_value}')")]
    EmptyFieldName { raw_value: String },
    #[error("duplicate display term for field '{field}' and value '{raw_value}'")]
    DuplicateTerm { field: String, raw_value: String },
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
