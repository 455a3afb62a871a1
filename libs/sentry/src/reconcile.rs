use crate::adapter::SentryAdapter;
use crate::intent::SentryIntent;

use std::cell::RefCell;
use std::collections::BTreeMap;

use async_trait::async_trait;
use tenantbind_core::error::{Error, Result};
use tenantbind_core::reconcile::{Compatibility, ConnectorReconciler};
use tenantbind_core::registry::{resolve_admin_path, InstanceRegistry};

/// Sentry's descriptor is a single object, carried as a plain struct here rather than
/// `crd::SentryConnectorSpec` so the reconciler stays decoupled from the `kube` types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentryInstance {
    pub secret_store_path: String,
    pub url: String,
    pub organization: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentryAdminCredential {
    pub url: String,
    pub organization: String,
    pub api_token: String,
}

/// The DSN is only known once `provision` creates (or finds) a project key, so it's populated
/// into this cell after `build_tenant_cred` runs rather than at construction time.
#[derive(Clone, Debug)]
pub struct SentryTenantCredential {
    pub team: String,
    pub project_slug: String,
    pub environment: String,
    dsn: RefCell<Option<String>>,
}

impl SentryTenantCredential {
    pub fn dsn(&self) -> Option<String> {
        self.dsn.borrow().clone()
    }

    fn set_dsn(&self, dsn: String) {
        *self.dsn.borrow_mut() = Some(dsn);
    }
}

pub struct SentryReconciler<R, A> {
    registry: R,
    adapter: A,
}

impl<R, A> SentryReconciler<R, A> {
    pub fn new(registry: R, adapter: A) -> Self {
        Self { registry, adapter }
    }
}

fn project_slug(intent: &SentryIntent) -> String {
    format!("{}-{}", intent.project, intent.environment)
}

#[async_trait]
impl<R, A> ConnectorReconciler for SentryReconciler<R, A>
where
    R: InstanceRegistry<SentryInstance> + Send + Sync,
    A: SentryAdapter,
{
    type Intent = SentryIntent;
    type AdminCredential = SentryAdminCredential;
    type TenantCredential = SentryTenantCredential;

    fn connector_name(&self) -> &'static str {
        "sentry"
    }

    async fn resolve_admin_path(&self, intent: &Self::Intent) -> Result<String> {
        resolve_admin_path(&self.registry, &intent.instance_name, |d: &SentryInstance| {
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
        let api_token = data
            .get("API_TOKEN")
            .cloned()
            .ok_or_else(|| Error::MissingAdminSecret(intent.instance_name.clone(), "API_TOKEN".to_string()))?;
        Ok(SentryAdminCredential {
            url: descriptor.url,
            organization: descriptor.organization,
            api_token,
        })
    }

    fn build_tenant_cred(&self, intent: &Self::Intent, _admin: &Self::AdminCredential) -> Self::TenantCredential {
        SentryTenantCredential {
            team: intent.team.clone(),
            project_slug: project_slug(intent),
            environment: intent.environment.clone(),
            dsn: RefCell::new(None),
        }
    }

    async fn provision(
        &self,
        _intent: &Self::Intent,
        admin: &Self::AdminCredential,
        tenant: &Self::TenantCredential,
    ) -> Result<()> {
        if !self.adapter.team_exists(&admin.organization, &tenant.team).await? {
            self.adapter.create_team(&admin.organization, &tenant.team).await?;
        }
        if !self
            .adapter
            .project_exists(&admin.organization, &tenant.project_slug)
            .await?
        {
            self.adapter
                .create_project(&admin.organization, &tenant.team, &tenant.project_slug)
                .await?;
        }
        let existing_keys = self
            .adapter
            .list_project_keys(&admin.organization, &tenant.project_slug)
            .await?;
        let dsn = match existing_keys.into_iter().next() {
            Some(dsn) => dsn,
            None => {
                self.adapter
                    .create_project_key(&admin.organization, &tenant.project_slug)
                    .await?
            }
        };
        tenant.set_dsn(dsn);
        Ok(())
    }

    async fn validate_compatibility(&self, intent: &Self::Intent, existing: &Self::TenantCredential) -> Compatibility {
        if existing.team != intent.team || existing.project_slug != project_slug(intent) {
            return Compatibility::Conflict("project");
        }
        let Some(dsn) = existing.dsn() else {
            return Compatibility::StaleReprovision;
        };
        match self.adapter.is_dsn_live(&dsn).await {
            Ok(true) => Compatibility::Compatible,
            Ok(false) => Compatibility::StaleReprovision,
            Err(_) => Compatibility::StaleReprovision,
        }
    }

    fn tenant_cred_to_map(&self, tenant: &Self::TenantCredential) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("SENTRY_DSN".to_string(), tenant.dsn().unwrap_or_default()),
            ("SENTRY_PROJECT_SLUG".to_string(), tenant.project_slug.clone()),
            ("SENTRY_TEAM".to_string(), tenant.team.clone()),
        ])
    }

    fn tenant_cred_from_map(&self, map: &BTreeMap<String, String>) -> Result<Self::TenantCredential> {
        let get = |key: &str| -> Result<String> {
            map.get(key)
                .cloned()
                .ok_or_else(|| Error::MissingAdminSecret(key.to_string(), "tenant credential".to_string()))
        };
        let project_slug = get("SENTRY_PROJECT_SLUG")?;
        let environment = project_slug
            .rsplit_once('-')
            .map(|(_, env)| env.to_string())
            .unwrap_or_default();
        Ok(SentryTenantCredential {
            team: get("SENTRY_TEAM")?,
            project_slug,
            environment,
            dsn: RefCell::new(Some(get("SENTRY_DSN")?)),
        })
    }

    fn tenant_path(&self, intent: &Self::Intent) -> &str {
        &intent.tenant_path
    }

    fn instance_name(&self, intent: &Self::Intent) -> &str {
        &intent.instance_name
    }
}
