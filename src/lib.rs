//! Hybrid post-quantum file envelopes: Kyber-512 key encapsulation,
//! AES-256-GCM payload encryption and ML-DSA-44 signatures, served as
//! expiring shared links and per-user cloud storage.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;

pub mod crypto {
    pub mod aes;
    pub mod envelope;
    pub mod password;
    pub mod signing;
    pub mod token;
}

pub mod models {
    pub mod cloud_file;
    pub mod session;
    pub mod shared_file;
    pub mod user;
}

pub mod repositories;

pub mod services {
    pub mod access;
    pub mod auth;
    pub mod envelopes;
    pub mod sessions;
}

pub mod handlers {
    pub mod auth;
    pub mod health;
    pub mod reply;
    pub mod share;
    pub mod storage;
    pub mod transfer;
}

pub mod middleware_layer {
    pub mod auth;
    pub mod rate_limit;
}

pub mod validation {
    pub mod auth;
    pub mod upload;
}

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
