pub mod adapter;
pub mod crd;
pub mod intent;
pub mod pipeline;
pub mod reconcile;
pub mod registry;

pub use crd::{KeycloakConnector, KeycloakConnectorSpec};
pub use intent::KeycloakIntent;
pub use pipeline::KeycloakPipeline;
pub use reconcile::{KeycloakAdminCredential, KeycloakInstance, KeycloakReconciler, KeycloakTenantCredential};
pub use registry::CrdRegistry;
