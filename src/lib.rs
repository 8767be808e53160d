pub mod app;
pub mod auth;
pub mod config;
pub mod console;
pub mod drive;
pub mod error;
pub mod ingest;
pub mod models;
pub mod routes;
pub mod session;
pub mod vector_store;
