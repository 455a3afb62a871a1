use crate::adapter::KeycloakAdapter;
use crate::intent::KeycloakIntent;

use std::cell::RefCell;
use std::collections::BTreeMap;

use async_trait::async_trait;
use tenantbind_core::error::{Error, Result};
use tenantbind_core::reconcile::{Compatibility, ConnectorReconciler};
use tenantbind_core::registry::{resolve_admin_path, InstanceRegistry};

/// Keycloak's descriptor is a single object; see the Sentry crate's equivalent note.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeycloakInstance {
    pub secret_store_path: String,
    pub url: String,
    pub realm: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeycloakAdminCredential {
    pub url: String,
    pub realm: String,
    pub admin_user: String,
    pub admin_password: String,
}

/// The client secret is only known once `provision` finds or creates the client, so it's
/// populated into this cell after `build_tenant_cred` runs (mirrors the Sentry connector's DSN).
#[derive(Clone, Debug)]
pub struct KeycloakTenantCredential {
    pub client_id: String,
    secret: RefCell<Option<String>>,
}

impl KeycloakTenantCredential {
    pub fn secret(&self) -> Option<String> {
        self.secret.borrow().clone()
    }

    fn set_secret(&self, secret: String) {
        *self.secret.borrow_mut() = Some(secret);
    }
}

pub struct KeycloakReconciler<R, A> {
    registry: R,
    adapter: A,
}

impl<R, A> KeycloakReconciler<R, A> {
    pub fn new(registry: R, adapter: A) -> Self {
        Self { registry, adapter }
    }
}

#[async_trait]
impl<R, A> ConnectorReconciler for KeycloakReconciler<R, A>
where
    R: InstanceRegistry<KeycloakInstance> + Send + Sync,
    A: KeycloakAdapter,
{
    type Intent = KeycloakIntent;
    type AdminCredential = KeycloakAdminCredential;
    type TenantCredential = KeycloakTenantCredential;

    fn connector_name(&self) -> &'static str {
        "keycloak"
    }

    async fn resolve_admin_path(&self, intent: &Self::Intent) -> Result<String> {
        resolve_admin_path(&self.registry, &intent.instance_name, |d: &KeycloakInstance| {
            d.secret_store_path.clone()
        })
    }

    fn parse_admin_cred(
        &self,
        intent: &Self::Intent,
        data: BTreeMap<String, String>,
    ) -> Result<Self::AdminCredential> {
        let descriptor = self
            .registry
            .resolve(&intent.instance_name)?
            .ok_or_else(|| Error::UnknownInstance(intent.instance_name.clone()))?;
        let admin_user = data
            .get("ADMIN_USER")
            .cloned()
            .ok_or_else(|| Error::MissingAdminSecret(intent.instance_name.clone(), "ADMIN_USER".to_string()))?;
        let admin_password = data.get("ADMIN_PASSWORD").cloned().ok_or_else(|| {
            Error::MissingAdminSecret(intent.instance_name.clone(), "ADMIN_PASSWORD".to_string())
        })?;
        Ok(KeycloakAdminCredential {
            url: descriptor.url,
            realm: descriptor.realm,
            admin_user,
            admin_password,
        })
    }

    fn build_tenant_cred(&self, intent: &Self::Intent, _admin: &Self::AdminCredential) -> Self::TenantCredential {
        KeycloakTenantCredential {
            client_id: intent.client_id.clone(),
            secret: RefCell::new(None),
        }
    }

    async fn provision(
        &self,
        _intent: &Self::Intent,
        admin: &Self::AdminCredential,
        tenant: &Self::TenantCredential,
    ) -> Result<()> {
        let internal_id = match self.adapter.find_client(&admin.realm, &tenant.client_id).await? {
            Some(id) => id,
            None => self.adapter.create_client(&admin.realm, &tenant.client_id).await?,
        };
        let secret = self.adapter.read_client_secret(&admin.realm, &internal_id).await?;
        tenant.set_secret(secret);
        Ok(())
    }

    async fn validate_compatibility(&self, intent: &Self::Intent, existing: &Self::TenantCredential) -> Compatibility {
        if existing.client_id != intent.client_id {
            return Compatibility::Conflict("client_id");
        }
        Compatibility::Compatible
    }

    fn tenant_cred_to_map(&self, tenant: &Self::TenantCredential) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("KEYCLOAK_CLIENT_ID".to_string(), tenant.client_id.clone()),
            ("KEYCLOAK_SECRET".to_string(), tenant.secret().unwrap_or_default()),
        ])
    }

    fn tenant_cred_from_map(&self, map: &BTreeMap<String, String>) -> Result<Self::TenantCredential> {
        let get = |key: &str| -> Result<String> {
            map.get(key)
                .cloned()
                .ok_or_else(|| Error::MissingAdminSecret(key.to_string(), "tenant credential".to_string()))
        };
        Ok(KeycloakTenantCredential {
            client_id: get("KEYCLOAK_CLIENT_ID")?,
            secret: RefCell::new(Some(get("KEYCLOAK_SECRET")?)),
        })
    }

    fn tenant_path(&self, intent: &Self::Intent) -> &str {
        &intent.tenant_path
    }

    fn instance_name(&self, intent: &Self::Intent) -> &str {
        &intent.instance_name
    }
}
