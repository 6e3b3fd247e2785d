mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod reconcile;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod api {
    pub mod handlers;
    pub mod rejection;
    pub mod routes;
}
mod constants;

pub mod config;
pub mod media;
pub mod state;
pub mod views;

pub use api::{rejection::handle_rejection, routes::routes};
pub use authentication::*;
pub use constants::*;
pub use database::*;
