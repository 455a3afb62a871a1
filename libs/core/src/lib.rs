pub mod dispatcher;
pub mod error;
pub mod intent;
pub mod metrics;
pub mod password;
pub mod reconcile;
pub mod registry;
pub mod secret_store;
pub mod telemetry;
pub mod vault_http;

pub use error::{Error, Result};
