use crate::adapter::RabbitAdapter;
use crate::crd::RabbitConnectorEntry;
use crate::intent::RabbitIntent;

use std::collections::BTreeMap;

use async_trait::async_trait;
use tenantbind_core::error::{Error, Result};
use tenantbind_core::password::PasswordGenerator;
use tenantbind_core::reconcile::{Compatibility, ConnectorReconciler};
use tenantbind_core::registry::{resolve_admin_path, InstanceRegistry};
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RabbitAdminCredential {
    pub host: String,
    pub port: u16,
    pub admin_user: String,
    pub admin_password: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RabbitTenantCredential {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vhost: String,
}

impl RabbitTenantCredential {
    fn url(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.vhost
        )
    }
}

pub struct RabbitReconciler<R, A, P> {
    registry: R,
    adapter: A,
    password_generator: P,
}

impl<R, A, P> RabbitReconciler<R, A, P> {
    pub fn new(registry: R, adapter: A, password_generator: P) -> Self {
        Self {
            registry,
            adapter,
            password_generator,
        }
    }
}

#[async_trait]
impl<R, A, P> ConnectorReconciler for RabbitReconciler<R, A, P>
where
    R: InstanceRegistry<RabbitConnectorEntry> + Send + Sync,
    A: RabbitAdapter,
    P: PasswordGenerator,
{
    type Intent = RabbitIntent;
    type AdminCredential = RabbitAdminCredential;
    type TenantCredential = RabbitTenantCredential;

    fn connector_name(&self) -> &'static str {
        "rabbit"
    }

    async fn resolve_admin_path(&self, intent: &Self::Intent) -> Result<String> {
        resolve_admin_path(&self.registry, &intent.instance_name, |d: &RabbitConnectorEntry| {
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
        Ok(RabbitAdminCredential {
            host: descriptor.host,
            port: descriptor.port,
            admin_user,
            admin_password,
        })
    }

    fn build_tenant_cred(&self, intent: &Self::Intent, admin: &Self::AdminCredential) -> Self::TenantCredential {
        RabbitTenantCredential {
            host: admin.host.clone(),
            port: admin.port,
            user: intent.username.clone(),
            password: self.password_generator.generate(),
            vhost: intent.vhost.clone(),
        }
    }

    async fn provision(
        &self,
        _intent: &Self::Intent,
        _admin: &Self::AdminCredential,
        tenant: &Self::TenantCredential,
    ) -> Result<()> {
        if self.adapter.user_exists(&tenant.user).await? {
            warn!(
                msg = "rabbit user already exists, leaving its password untouched",
                user = %tenant.user
            );
        } else {
            self.adapter.create_user(&tenant.user, &tenant.password).await?;
        }
        if !self.adapter.vhost_exists(&tenant.vhost).await? {
            self.adapter.create_vhost(&tenant.vhost).await?;
        }
        if !self
            .adapter
            .user_vhost_permissions_exist(&tenant.user, &tenant.vhost)
            .await?
        {
            self.adapter
                .create_user_vhost_permissions(&tenant.user, &tenant.vhost)
                .await?;
        }
        Ok(())
    }

    async fn validate_compatibility(&self, intent: &Self::Intent, existing: &Self::TenantCredential) -> Compatibility {
        if existing.user != intent.username {
            return Compatibility::Conflict("user");
        }
        if existing.vhost != intent.vhost {
            return Compatibility::Conflict("vhost");
        }
        Compatibility::Compatible
    }

    fn tenant_cred_to_map(&self, tenant: &Self::TenantCredential) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("BROKER_HOST".to_string(), tenant.host.clone()),
            ("BROKER_PORT".to_string(), tenant.port.to_string()),
            ("BROKER_USER".to_string(), tenant.user.clone()),
            ("BROKER_PASSWORD".to_string(), tenant.password.clone()),
            ("BROKER_VHOST".to_string(), tenant.vhost.clone()),
            ("BROKER_URL".to_string(), tenant.url()),
        ])
    }

    fn tenant_cred_from_map(&self, map: &BTreeMap<String, String>) -> Result<Self::TenantCredential> {
        let get = |key: &str| -> Result<String> {
            map.get(key)
                .cloned()
                .ok_or_else(|| Error::MissingAdminSecret(key.to_string(), "tenant credential".to_string()))
        };
        Ok(RabbitTenantCredential {
            host: get("BROKER_HOST")?,
            port: get("BROKER_PORT")?.parse().unwrap_or_default(),
            user: get("BROKER_USER")?,
            password: get("BROKER_PASSWORD")?,
            vhost: get("BROKER_VHOST")?,
        })
    }

    fn tenant_path(&self, intent: &Self::Intent) -> &str {
        &intent.tenant_path
    }

    fn instance_name(&self, intent: &Self::Intent) -> &str {
        &intent.instance_name
    }
}
