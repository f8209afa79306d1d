pub mod bootstrap;
pub mod health;
pub mod router;
pub mod routes;
pub mod state;

pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use router::create_app_router;
pub use state::AppState;
