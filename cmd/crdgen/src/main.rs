use tenantbind_keycloak::KeycloakConnector;
use tenantbind_postgres::PostgresConnector;
use tenantbind_rabbit::RabbitConnector;
use tenantbind_sentry::SentryConnector;

use kube::CustomResourceExt;

fn main() {
    for crd in [
        PostgresConnector::crd(),
        RabbitConnector::crd(),
        SentryConnector::crd(),
        KeycloakConnector::crd(),
    ] {
        // safe unwrap: we know the CRD is serializable
        print!("---\n{}\n", serde_yaml::to_string(&crd).unwrap());
    }
}
