//! HTTP middleware shared by the public and admin routers.

pub mod correlation_id;

pub use correlation_id::{
    create_request_id_layers, request_span, CorrelationId, UuidRequestIdGenerator, X_REQUEST_ID,
};
