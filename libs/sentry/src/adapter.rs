use tenantbind_core::error::Result;

use async_trait::async_trait;

/// The downstream Sentry API operations the reconciler needs.
#[async_trait]
pub trait SentryAdapter: Send + Sync {
    async fn team_exists(&self, organization: &str, team: &str) -> Result<bool>;
    async fn create_team(&self, organization: &str, team: &str) -> Result<()>;
    async fn project_exists(&self, organization: &str, project_slug: &str) -> Result<bool>;
    async fn create_project(&self, organization: &str, team: &str, project_slug: &str) -> Result<()>;
    async fn list_project_keys(&self, organization: &str, project_slug: &str) -> Result<Vec<String>>;
    async fn create_project_key(&self, organization: &str, project_slug: &str) -> Result<String>;
    /// Whether `dsn` still resolves against a live Sentry project key, i.e. hasn't been revoked
    /// out-of-band. Used to decide between `Compatible` and `StaleReprovision`.
    async fn is_dsn_live(&self, dsn: &str) -> Result<bool>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemorySentry {
        teams: Mutex<BTreeSet<String>>,
        projects: Mutex<BTreeSet<String>>,
        keys: Mutex<BTreeMap<String, Vec<String>>>,
        revoked_dsns: Mutex<BTreeSet<String>>,
        pub create_project_key_calls: Mutex<u32>,
    }

    impl InMemorySentry {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed_team(&self, team: &str) {
            self.teams.lock().unwrap().insert(team.to_string());
        }

        pub fn seed_project_with_key(&self, project_slug: &str, dsn: &str) {
            self.projects.lock().unwrap().insert(project_slug.to_string());
            self.keys
                .lock()
                .unwrap()
                .entry(project_slug.to_string())
                .or_default()
                .push(dsn.to_string());
        }

        pub fn revoke(&self, dsn: &str) {
            self.revoked_dsns.lock().unwrap().insert(dsn.to_string());
        }
    }

    #[async_trait]
    impl SentryAdapter for InMemorySentry {
        async fn team_exists(&self, _organization: &str, team: &str) -> Result<bool> {
            Ok(self.teams.lock().unwrap().contains(team))
        }

        async fn create_team(&self, _organization: &str, team: &str) -> Result<()> {
            self.teams.lock().unwrap().insert(team.to_string());
            Ok(())
        }

        async fn project_exists(&self, _organization: &str, project_slug: &str) -> Result<bool> {
            Ok(self.projects.lock().unwrap().contains(project_slug))
        }

        async fn create_project(&self, _organization: &str, _team: &str, project_slug: &str) -> Result<()> {
            self.projects.lock().unwrap().insert(project_slug.to_string());
            Ok(())
        }

        async fn list_project_keys(&self, _organization: &str, project_slug: &str) -> Result<Vec<String>> {
            Ok(self.keys.lock().unwrap().get(project_slug).cloned().unwrap_or_default())
        }

        async fn create_project_key(&self, _organization: &str, project_slug: &str) -> Result<String> {
            *self.create_project_key_calls.lock().unwrap() += 1;
            let dsn = format!("https://{project_slug}@sentry.example.com/{project_slug}");
            self.keys
                .lock()
                .unwrap()
                .entry(project_slug.to_string())
                .or_default()
                .push(dsn.clone());
            Ok(dsn)
        }

        async fn is_dsn_live(&self, dsn: &str) -> Result<bool> {
            Ok(!self.revoked_dsns.lock().unwrap().contains(dsn))
        }
    }
}
