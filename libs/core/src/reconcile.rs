use crate::error::{Error, Result};
use crate::secret_store::{SecretStoreBackend, SecretStoreGateway};

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{info, trace};

/// Outcome of comparing a freshly parsed [`ConnectorReconciler::Intent`] against an already
/// persisted tenant credential (`validateCompatibility`).
pub enum Compatibility {
    /// The existing credential still satisfies the intent: no side effects, `Done`.
    Compatible,
    /// The existing credential names a different downstream identity than the intent demands
    /// (e.g. Rabbit's stored user != `intent.username`): a permanent, human-fixable error.
    Conflict(&'static str),
    /// The existing credential is stale in a way that is safe to repair by replacing it: delete
    /// the tenant secret, then fall through to `buildTenantCred -> provisionDownstream ->
    /// writeTenantCred`. Used by Sentry's "DSN revoked" case: the contradiction with "no
    /// overwrite" is resolved by deleting first, so the write that follows is never an implicit
    /// overwrite.
    StaleReprovision,
}

/// What the state machine actually did, for callers that need to know whether a write happened
/// (tests asserting the "no overwrite" guarantee).
pub struct ReconcileOutcome<T> {
    pub tenant_path: String,
    pub tenant_cred: T,
    pub wrote: bool,
}

/// The common shape of all four connectors' reconcilers. One implementation per connector crate;
/// [`reconcile`] below drives every implementation through the identical state machine.
#[async_trait]
pub trait ConnectorReconciler: Send + Sync {
    type Intent: Send + Sync;
    type AdminCredential: Send + Sync;
    type TenantCredential: Clone + Send + Sync;

    fn connector_name(&self) -> &'static str;

    /// `resolveDescriptor`: look the intent's instance up and return the secret-store path
    /// holding its admin credentials. Fails with `MissingCrd` / `UnknownInstance`.
    async fn resolve_admin_path(&self, intent: &Self::Intent) -> Result<String>;

    /// Parse the admin-credential map read from `resolve_admin_path`'s path (`loadAdminCred`).
    fn parse_admin_cred(
        &self,
        intent: &Self::Intent,
        data: BTreeMap<String, String>,
    ) -> Result<Self::AdminCredential>;

    /// `buildTenantCred`: synthesize the tenant credential to provision and persist.
    fn build_tenant_cred(
        &self,
        intent: &Self::Intent,
        admin: &Self::AdminCredential,
    ) -> Self::TenantCredential;

    /// `provisionDownstream`: idempotent create-if-absent calls against the backing system.
    async fn provision(
        &self,
        intent: &Self::Intent,
        admin: &Self::AdminCredential,
        tenant: &Self::TenantCredential,
    ) -> Result<()>;

    /// `validateCompatibility`: read-only comparison of an already-persisted tenant credential
    /// against the current intent. Async because Sentry's variant calls out to the Sentry API to
    /// check whether the stored DSN is still live.
    async fn validate_compatibility(
        &self,
        intent: &Self::Intent,
        existing: &Self::TenantCredential,
    ) -> Compatibility;

    fn tenant_cred_to_map(&self, tenant: &Self::TenantCredential) -> BTreeMap<String, String>;
    fn tenant_cred_from_map(&self, map: &BTreeMap<String, String>) -> Result<Self::TenantCredential>;

    /// Where this intent's tenant credential lives in the secret store.
    fn tenant_path(&self, intent: &Self::Intent) -> &str;

    /// The instance name this intent names, for `MissingAdminSecret`'s error message.
    fn instance_name(&self, intent: &Self::Intent) -> &str;
}

/// Drive `reconciler` through the shared state machine:
/// resolveDescriptor -> loadAdminCred -> loadTenantCred -> (validate | build+provision+write)?
///
/// Never writes the tenant credential if `provision` failed: the next reconcile re-enters
/// `buildTenantCred`, which is how partial provisioning stays retry-safe.
pub async fn reconcile<C, B>(
    reconciler: &C,
    gateway: &SecretStoreGateway<B>,
    intent: C::Intent,
) -> Result<ReconcileOutcome<C::TenantCredential>>
where
    C: ConnectorReconciler,
    B: SecretStoreBackend,
{
    let connector = reconciler.connector_name();
    trace!(msg = "reconciling", connector, instance = reconciler.instance_name(&intent));

    let admin_ref = reconciler.resolve_admin_path(&intent).await?;
    let admin_path = crate::secret_store::SecretRef::parse(&admin_ref)
        .map(|r| r.subpath)
        .unwrap_or(admin_ref);
    let admin_data = gateway.read_latest(&admin_path).await?.ok_or_else(|| {
        Error::MissingAdminSecret(reconciler.instance_name(&intent).to_string(), admin_path.clone())
    })?;
    let admin_cred = reconciler.parse_admin_cred(&intent, admin_data)?;

    let tenant_path = reconciler.tenant_path(&intent).to_string();
    let existing = gateway.read_latest(&tenant_path).await?;

    if let Some(data) = existing {
        let existing_cred = reconciler.tenant_cred_from_map(&data)?;
        match reconciler.validate_compatibility(&intent, &existing_cred).await {
            Compatibility::Compatible => {
                trace!(msg = "tenant credential compatible, no side effects", connector);
                return Ok(ReconcileOutcome {
                    tenant_path,
                    tenant_cred: existing_cred,
                    wrote: false,
                });
            }
            Compatibility::Conflict(field) => {
                return Err(Error::TenantCredentialConflict {
                    path: tenant_path,
                    field: field.to_string(),
                });
            }
            Compatibility::StaleReprovision => {
                info!(msg = "tenant credential stale, re-provisioning", connector, path = %tenant_path);
                gateway.delete_all_versions(&tenant_path).await?;
            }
        }
    }

    let tenant_cred = reconciler.build_tenant_cred(&intent, &admin_cred);
    reconciler.provision(&intent, &admin_cred, &tenant_cred).await?;
    gateway
        .create(&tenant_path, &reconciler.tenant_cred_to_map(&tenant_cred))
        .await?;
    info!(msg = "provisioned tenant credential", connector, path = %tenant_path);
    Ok(ReconcileOutcome {
        tenant_path,
        tenant_cred,
        wrote: true,
    })
}
