//! User-family API service
//!
//! Exposes the "user with nested family members" resource over HTTP:
//! entity models, validation rules, the PostgreSQL repository owning all
//! transaction boundaries, and the service orchestrating them.

pub mod error;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;
