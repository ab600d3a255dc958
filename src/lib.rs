mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod schema;
    pub mod serializers;
    pub mod store;
}
mod authentication {
    pub mod accounts;
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
}
mod api {
    pub mod filters;
    pub mod handlers;
    pub mod images;
    pub mod rejection;

    #[cfg(test)]
    mod tests;
}
mod config;
mod constants;

pub use api::filters::{routes, AppState};
pub use api::*;
pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
