use crate::adapter::PostgresAdapter;
use crate::crd::PostgresConnectorEntry;
use crate::intent::PostgresIntent;

use std::collections::BTreeMap;

use async_trait::async_trait;
use tenantbind_core::error::{Error, Result};
use tenantbind_core::password::PasswordGenerator;
use tenantbind_core::reconcile::{Compatibility, ConnectorReconciler};
use tenantbind_core::registry::{resolve_admin_path, InstanceRegistry};

/// Admin connection coordinates plus the credential read from the instance's Secret-Store path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostgresAdminCredential {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub readonly_role: Option<String>,
    pub admin_user: String,
    pub admin_password: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostgresTenantCredential {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

pub struct PostgresReconciler<R, A, P> {
    registry: R,
    adapter: A,
    password_generator: P,
}

impl<R, A, P> PostgresReconciler<R, A, P> {
    pub fn new(registry: R, adapter: A, password_generator: P) -> Self {
        Self {
            registry,
            adapter,
            password_generator,
        }
    }
}

#[async_trait]
impl<R, A, P> ConnectorReconciler for PostgresReconciler<R, A, P>
where
    R: InstanceRegistry<PostgresConnectorEntry> + Send + Sync,
    A: PostgresAdapter,
    P: PasswordGenerator,
{
    type Intent = PostgresIntent;
    type AdminCredential = PostgresAdminCredential;
    type TenantCredential = PostgresTenantCredential;

    fn connector_name(&self) -> &'static str {
        "postgres"
    }

    async fn resolve_admin_path(&self, intent: &Self::Intent) -> Result<String> {
        resolve_admin_path(&self.registry, &intent.instance_name, |d: &PostgresConnectorEntry| {
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
        Ok(PostgresAdminCredential {
            host: descriptor.host,
            port: descriptor.port,
            database: descriptor.database,
            readonly_role: descriptor.readonly_role,
            admin_user,
            admin_password,
        })
    }

    fn build_tenant_cred(&self, intent: &Self::Intent, admin: &Self::AdminCredential) -> Self::TenantCredential {
        PostgresTenantCredential {
            host: admin.host.clone(),
            port: admin.port,
            database: intent.db_name.clone(),
            user: intent.db_username.clone(),
            password: self.password_generator.generate(),
        }
    }

    async fn provision(
        &self,
        _intent: &Self::Intent,
        admin: &Self::AdminCredential,
        tenant: &Self::TenantCredential,
    ) -> Result<()> {
        if !self.adapter.database_exists(&tenant.database).await? {
            self.adapter.create_database(&tenant.database).await?;
        }
        if self.adapter.user_exists(&tenant.user).await? {
            self.adapter.alter_user_password(&tenant.user, &tenant.password).await?;
        } else {
            self.adapter.create_user(&tenant.user, &tenant.password).await?;
        }
        self.adapter.grant_user_on_database(&tenant.user, &tenant.database).await?;
        if let Some(readonly_role) = &admin.readonly_role {
            if !self
                .adapter
                .is_readonly_grantee(&tenant.database, &tenant.user, readonly_role)
                .await?
            {
                self.adapter
                    .grant_select_to_readonly(&tenant.database, &tenant.user, readonly_role)
                    .await?;
            }
        }
        Ok(())
    }

    async fn validate_compatibility(&self, intent: &Self::Intent, existing: &Self::TenantCredential) -> Compatibility {
        if existing.database != intent.db_name {
            return Compatibility::Conflict("database");
        }
        if existing.user != intent.db_username {
            return Compatibility::Conflict("user");
        }
        Compatibility::Compatible
    }

    fn tenant_cred_to_map(&self, tenant: &Self::TenantCredential) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("DATABASE_HOST".to_string(), tenant.host.clone()),
            ("DATABASE_PORT".to_string(), tenant.port.to_string()),
            ("DATABASE_NAME".to_string(), tenant.database.clone()),
            ("DATABASE_USER".to_string(), tenant.user.clone()),
            ("DATABASE_PASSWORD".to_string(), tenant.password.clone()),
        ])
    }

    fn tenant_cred_from_map(&self, map: &BTreeMap<String, String>) -> Result<Self::TenantCredential> {
        let get = |key: &str| -> Result<String> {
            map.get(key)
                .cloned()
                .ok_or_else(|| Error::MissingAdminSecret(key.to_string(), "tenant credential".to_string()))
        };
        Ok(PostgresTenantCredential {
            host: get("DATABASE_HOST")?,
            port: get("DATABASE_PORT")?.parse().unwrap_or_default(),
            database: get("DATABASE_NAME")?,
            user: get("DATABASE_USER")?,
            password: get("DATABASE_PASSWORD")?,
        })
    }

    fn tenant_path(&self, intent: &Self::Intent) -> &str {
        &intent.tenant_path
    }

    fn instance_name(&self, intent: &Self::Intent) -> &str {
        &intent.instance_name
    }
}
