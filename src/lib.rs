pub mod api;
pub mod args;
pub mod commands;
mod config;
pub mod controller;
mod error;
pub mod model;
pub mod queue;
pub mod status;
mod utils;


pub use api::Mode;
pub use config::Config;
pub use controller::SyncController;
pub use error::Error;
pub use error::Result;
pub use error::TransportError;
pub use status::CollectionStatus;
