use thiserror::Error;

#[derive(Debug, Error)]
pub enum RazorpayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Invalid order request: {0}")]
    InvalidRequest(String),
}

impl RazorpayApiError {
    /// True if the gateway looked at the request and refused it, as opposed to the request never getting there.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::QueryError { status, .. } if (400..500).contains(status))
    }
}
