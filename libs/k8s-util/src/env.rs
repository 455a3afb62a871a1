use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec};

/// One environment variable a connector wants present on every container, and the
/// Secret-Store reference it should resolve to if the operator has to inject it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvBinding {
    pub env_name: String,
    pub value_ref: String,
}

impl EnvBinding {
    pub fn new(env_name: impl Into<String>, value_ref: impl Into<String>) -> Self {
        Self {
            env_name: env_name.into(),
            value_ref: value_ref.into(),
        }
    }
}

/// Append the missing `bindings` to every container and init-container's `env`, in spec order.
/// User-supplied values always win: a binding whose `env_name` already exists on a container is
/// left untouched. Returns whether anything was appended.
///
/// Pure and total: no I/O, no panics, idempotent when run twice on its own output.
pub fn mutate_pod_spec(spec: &mut PodSpec, bindings: &[EnvBinding]) -> bool {
    let mut mutated = false;
    for container in spec.containers.iter_mut() {
        mutated |= mutate_container(container, bindings);
    }
    if let Some(init_containers) = spec.init_containers.as_mut() {
        for container in init_containers.iter_mut() {
            mutated |= mutate_container(container, bindings);
        }
    }
    mutated
}

fn mutate_container(container: &mut Container, bindings: &[EnvBinding]) -> bool {
    let mut mutated = false;
    let env = container.env.get_or_insert_with(Vec::new);
    for binding in bindings {
        if env.iter().any(|e| e.name == binding.env_name) {
            continue;
        }
        env.push(EnvVar {
            name: binding.env_name.clone(),
            value: Some(binding.value_ref.clone()),
            value_from: None,
        });
        mutated = true;
    }
    mutated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings() -> Vec<EnvBinding> {
        vec![
            EnvBinding::new("BROKER_USER", "vault:secret/data/app/rabbit#BROKER_USER"),
            EnvBinding::new(
                "BROKER_PASSWORD",
                "vault:secret/data/app/rabbit#BROKER_PASSWORD",
            ),
        ]
    }

    fn container(name: &str, env: Option<Vec<EnvVar>>) -> Container {
        Container {
            name: name.to_string(),
            env,
            ..Container::default()
        }
    }

    #[test]
    fn appends_missing_vars_in_order() {
        let mut spec = PodSpec {
            containers: vec![container("app", None)],
            ..PodSpec::default()
        };
        let mutated = mutate_pod_spec(&mut spec, &bindings());
        assert!(mutated);
        let env = spec.containers[0].env.as_ref().unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(env[0].name, "BROKER_USER");
        assert_eq!(env[1].name, "BROKER_PASSWORD");
    }

    #[test]
    fn user_value_wins() {
        let mut spec = PodSpec {
            containers: vec![container(
                "app",
                Some(vec![EnvVar {
                    name: "BROKER_USER".to_string(),
                    value: Some("manually-set".to_string()),
                    value_from: None,
                }]),
            )],
            ..PodSpec::default()
        };
        mutate_pod_spec(&mut spec, &bindings());
        let env = spec.containers[0].env.as_ref().unwrap();
        let user_var = env.iter().find(|e| e.name == "BROKER_USER").unwrap();
        assert_eq!(user_var.value.as_deref(), Some("manually-set"));
    }

    #[test]
    fn idempotent_on_second_pass() {
        let mut spec = PodSpec {
            containers: vec![container("app", None)],
            init_containers: Some(vec![container("init", None)]),
            ..PodSpec::default()
        };
        let first = mutate_pod_spec(&mut spec, &bindings());
        let second = mutate_pod_spec(&mut spec, &bindings());
        assert!(first);
        assert!(!second);
    }

    #[test]
    fn init_containers_are_mutated_too() {
        let mut spec = PodSpec {
            containers: vec![container("app", None)],
            init_containers: Some(vec![container("migrate", None)]),
            ..PodSpec::default()
        };
        mutate_pod_spec(&mut spec, &bindings());
        let init_env = spec.init_containers.as_ref().unwrap()[0].env.as_ref().unwrap();
        assert_eq!(init_env.len(), 2);
    }

    #[test]
    fn env_array_created_when_absent() {
        let mut spec = PodSpec {
            containers: vec![container("app", None)],
            ..PodSpec::default()
        };
        mutate_pod_spec(&mut spec, &bindings());
        assert!(spec.containers[0].env.is_some());
    }
}
