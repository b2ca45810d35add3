pub mod auth;
pub mod config;
pub mod credentials;
pub mod db;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod models;
pub mod qr;
pub mod routes;
pub mod s3;
pub mod schema;
pub mod state;
pub mod storage;
pub mod utils;
