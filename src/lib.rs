// Public API for integration tests and front-ends

pub mod api;
pub mod clock;
pub mod config;
pub mod driver;
pub mod games;
pub mod protocol;
pub mod session;
pub mod submitter;
pub mod types;
