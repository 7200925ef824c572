use actix_web::{
    error::ResponseError,
    http::{header, header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use storefront_engine::{
    traits::{InventoryError, OrderManagementError},
    OrderFlowError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient stock for one or more items in the order")]
    InsufficientStock,
    #[error("Payment gateway error. {0}")]
    GatewayError(String),
    #[error("Invalid payment signature. {0}")]
    InvalidSignature(String),
    #[error("{0}")]
    InvalidStateTransition(String),
    #[error("Validation error. {0}")]
    ValidationError(String),
    #[error("Webhook authentication failed. {0}")]
    WebhookAuthFailed(String),
    #[error("Too many requests. Please try again in {retry_after} seconds.")]
    RateLimited { retry_after: u64 },
    #[error("Unauthorized. {0}")]
    Unauthorized(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientStock => StatusCode::CONFLICT,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            Self::InvalidStateTransition(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::WebhookAuthFailed(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        response.insert_header(ContentType::json());
        if let Self::RateLimited { retry_after } = self {
            response.insert_header((header::RETRY_AFTER, retry_after.to_string()));
        }
        response.body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::InsufficientStock => Self::InsufficientStock,
            OrderFlowError::GatewayCreateFailed(s) => Self::GatewayError(s),
            OrderFlowError::InvalidSignature => Self::InvalidSignature(e.to_string()),
            OrderFlowError::InvalidStateTransition(s) => Self::InvalidStateTransition(s),
            OrderFlowError::OrderNotFound(_) | OrderFlowError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::ValidationError(s) => Self::ValidationError(s),
            OrderFlowError::DatabaseError(s) => {
                error!("💻️ Database error while processing an order: {s}");
                Self::BackendError(format!("Database error: {s}"))
            },
        }
    }
}

impl From<OrderManagementError> for ServerError {
    fn from(e: OrderManagementError) -> Self {
        error!("💻️ Order storage error: {e}");
        Self::BackendError(e.to_string())
    }
}

impl From<InventoryError> for ServerError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            InventoryError::InvalidQuantity(_) => Self::ValidationError(e.to_string()),
            InventoryError::DatabaseError(s) => {
                error!("💻️ Inventory storage error: {s}");
                Self::BackendError(format!("Database error: {s}"))
            },
        }
    }
}
