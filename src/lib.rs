pub mod adapters;
pub mod application;
pub mod domain;
pub mod services;

pub use adapters::{router::build_router, state::AppState};
