//! Genbi Backend - tour booking administration API.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries, embedded migrations)
//! - **Authentication**: JWT access/refresh tokens, Argon2 password hashes
//! - **Format**: JSON requests/responses under `/api/v1`
//!
//! Handlers stay thin: they extract the request, consult [`policy`] for
//! role/ownership decisions and call into [`services`], which own the SQL.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;
