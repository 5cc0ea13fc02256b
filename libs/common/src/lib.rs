//! Common library for the booking backend
//!
//! This crate provides shared infrastructure used by the backend services:
//! database connectivity, pooling, and error handling.

pub mod database;
pub mod error;
