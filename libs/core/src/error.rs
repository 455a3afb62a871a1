use thiserror::Error;

/// The closed set of domain errors the reconciler and dispatcher can surface.
///
/// Closed by design: adding a catch-all variant would let an implementation swallow a
/// failure mode the host event framework has no retry policy for. `InfrastructureServiceProblem`
/// is the only variant that implies a transient failure worth retrying.
#[derive(Error, Debug)]
pub enum Error {
    #[error("custom resource definition for this connector is not installed")]
    MissingCrd,

    #[error("no instance named {0:?} is declared on the connector's custom resource")]
    UnknownInstance(String),

    #[error("admin credentials for instance {0:?} are missing from the secret store at {1:?}")]
    MissingAdminSecret(String, String),

    #[error("missing required annotation/label {0:?}")]
    MissingRequiredAnnotation(String),

    #[error("annotation/label {0:?} is present but empty")]
    EmptyAnnotationValue(String),

    #[error("tenant credential at {path:?} conflicts with the current intent on field {field:?}")]
    TenantCredentialConflict { path: String, field: String },

    #[error("{system} reported a problem: {cause}")]
    InfrastructureServiceProblem {
        system: &'static str,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("no secret exists at {0:?}")]
    NonExistSecret(String),
}

impl Error {
    /// `InfrastructureServiceProblem` is the only kind the host event framework should retry;
    /// every other kind is permanent (bad annotations, a real conflict, a missing CRD/instance).
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::InfrastructureServiceProblem { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
