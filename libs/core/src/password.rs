use rand::distributions::Alphanumeric;
use rand::Rng;

/// Password generation as an injected capability (design note: "treated as an injected
/// capability so tests can deterministically seed"), rather than each connector calling a
/// global RNG directly.
pub trait PasswordGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Default generator: a 32-character alphanumeric string from the OS RNG.
pub struct RandPasswordGenerator {
    pub length: usize,
}

impl Default for RandPasswordGenerator {
    fn default() -> Self {
        Self { length: 32 }
    }
}

impl PasswordGenerator for RandPasswordGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;

    /// A deterministic generator for tests asserting on the exact generated password.
    pub struct FixedPasswordGenerator(pub String);

    impl PasswordGenerator for FixedPasswordGenerator {
        fn generate(&self) -> String {
            self.0.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_generator_produces_requested_length() {
        let gen = RandPasswordGenerator { length: 24 };
        assert_eq!(gen.generate().len(), 24);
    }

    #[test]
    fn fixed_generator_is_deterministic() {
        let gen = test_util::FixedPasswordGenerator("seeded-pw".to_string());
        assert_eq!(gen.generate(), "seeded-pw");
        assert_eq!(gen.generate(), "seeded-pw");
    }
}
