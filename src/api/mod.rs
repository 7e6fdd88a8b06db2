//! API Module
//!
//! HTTP handlers and routing for the admin surface.
//!
//! # Endpoints
//! - `PUT /cache` - Store a value
//! - `GET /cache/:key` - Read a value
//! - `DELETE /cache/:prefix` - Clear keys by prefix
//! - `GET /stats` - Cache statistics
//! - `GET /admission` - Admission policy snapshot
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
