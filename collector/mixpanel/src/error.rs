use thiserror::Error;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum MixpanelError {
    #[error("ValidationError: [{message}]")]
    ValidationError { message: String },
    #[error("InvalidTypeError: [Invalid type {query_type}]")]
    InvalidTypeError { query_type: String },
    #[error("UnsupportedValueError: [{message}]")]
    UnsupportedValueError { message: String },
    #[error("MalformedResponseError: [{message}]")]
    MalformedResponseError { message: String },
    #[error("ConfigurationError: [{message}]")]
    ConfigurationError { message: String },
    #[error("RequestError: [{message}], status: {status:?}")]
    RequestError { message: String, status: Option<u16> },
    #[error("JsonError: [{cause}]")]
    JsonError { cause: String },
}

impl From<serde_json::Error> for MixpanelError {
    fn from(err: serde_json::Error) -> Self {
        MixpanelError::JsonError { cause: format!("{:?}", err) }
    }
}
