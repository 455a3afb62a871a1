use crate::error::{Error, Result};

/// Looks up the operator-defined custom resource that names a backing-service instance and
/// resolves it to a descriptor entry `D` (host/admin-ref/etc, kind-specific).
///
/// `resolve` distinguishes "the CRD itself is not installed" (`Error::MissingCrd`) from "the CRD
/// is installed but has no entry named `instance_name`" (`Ok(None)`, turned into
/// `Error::UnknownInstance` by [`resolve_admin_path`]).
pub trait InstanceRegistry<D> {
    fn resolve(&self, instance_name: &str) -> Result<Option<D>>;
}

/// Shared `resolveDescriptor` step: look the instance up and read off its secret-store path
/// holding the instance's admin credentials.
pub fn resolve_admin_path<D>(
    registry: &dyn InstanceRegistry<D>,
    instance_name: &str,
    vault_path_of: impl Fn(&D) -> String,
) -> Result<String> {
    match registry.resolve(instance_name)? {
        Some(descriptor) => Ok(vault_path_of(&descriptor)),
        None => Err(Error::UnknownInstance(instance_name.to_string())),
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;

    /// A registry backed by a fixed in-memory list, standing in for a CRD watch/store.
    pub struct StaticRegistry<D> {
        pub crd_installed: bool,
        pub entries: Vec<(String, D)>,
    }

    impl<D: Clone> InstanceRegistry<D> for StaticRegistry<D> {
        fn resolve(&self, instance_name: &str) -> Result<Option<D>> {
            if !self.crd_installed {
                return Err(Error::MissingCrd);
            }
            Ok(self
                .entries
                .iter()
                .find(|(name, _)| name == instance_name)
                .map(|(_, d)| d.clone()))
        }
    }
}
