pub mod api;
pub mod cli;
pub mod config;
pub mod controller;
pub mod identity;
pub mod policy;
pub mod session;
pub mod store;

pub use api::Gateway;
pub use identity::Viewer;
pub use session::SessionStore;
