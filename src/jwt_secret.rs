//! Token signing secret checks
//!
//! The HS256 signing secret is the only thing standing between a client and
//! a forged identity, so it is checked at startup against a policy chosen by
//! deployment environment: minimum length, no dictionary fragments, a floor on
//! Shannon entropy, and (staging and production) a mix of character classes.
//!
//! ```
//! use schoolbook::app_config::Environment;
//! use schoolbook::jwt_secret::{generate_secret, SecretPolicy};
//!
//! let policy = SecretPolicy::for_environment(Environment::Production);
//! assert!(policy.validate("changeme").is_err());
//! assert!(policy.validate(&generate_secret(Environment::Production)).is_ok());
//! ```

use std::collections::HashMap;

use rand::Rng;

use crate::app_config::Environment;

const WEAK_FRAGMENTS: &[&str] = &[
    "secret", "password", "admin", "123456", "qwerty", "default", "example", "test", "demo",
    "sample", "changeme", "letmein", "welcome", "school",
];

const SECRET_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!#$%&*+-=.:;?@^_~";

/// Why a signing secret was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JwtSecretError {
    #[error("signing secret has {actual} characters, {environment} requires at least {minimum}")]
    TooShort {
        actual: usize,
        minimum: usize,
        environment: Environment,
    },

    #[error("signing secret contains the guessable fragment '{fragment}'")]
    WeakFragment { fragment: &'static str },

    #[error("signing secret carries {actual:.1} bits of entropy, {environment} requires {minimum:.1}")]
    LowEntropy {
        actual: f64,
        minimum: f64,
        environment: Environment,
    },

    #[error("signing secret is missing {}", missing.join(", "))]
    MissingCharacterClasses { missing: Vec<&'static str> },
}

/// Requirements a signing secret must meet.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretPolicy {
    pub environment: Environment,
    pub min_length: usize,
    pub min_entropy_bits: f64,
    pub require_character_classes: bool,
}

impl SecretPolicy {
    pub fn for_environment(environment: Environment) -> Self {
        let (min_length, min_entropy_bits, require_character_classes) = match environment {
            Environment::Production => (64, 128.0, true),
            Environment::Staging => (48, 96.0, true),
            Environment::Testing => (32, 64.0, false),
            Environment::Development => (32, 32.0, false),
        };
        Self {
            environment,
            min_length,
            min_entropy_bits,
            require_character_classes,
        }
    }

    /// Check a secret, reporting the first requirement it misses.
    pub fn validate(&self, secret: &str) -> Result<(), JwtSecretError> {
        let length = secret.chars().count();
        if length < self.min_length {
            return Err(JwtSecretError::TooShort {
                actual: length,
                minimum: self.min_length,
                environment: self.environment,
            });
        }

        let lowered = secret.to_lowercase();
        if let Some(fragment) = WEAK_FRAGMENTS.iter().find(|f| lowered.contains(**f)) {
            return Err(JwtSecretError::WeakFragment { fragment: *fragment });
        }

        let bits = entropy_bits(secret);
        if bits < self.min_entropy_bits {
            return Err(JwtSecretError::LowEntropy {
                actual: bits,
                minimum: self.min_entropy_bits,
                environment: self.environment,
            });
        }

        if self.require_character_classes {
            let missing = missing_character_classes(secret);
            if !missing.is_empty() {
                return Err(JwtSecretError::MissingCharacterClasses { missing });
            }
        }

        Ok(())
    }
}

/// Shannon entropy of the whole string in bits (per-char entropy times length).
pub fn entropy_bits(s: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_insert(0) += 1;
    }

    let total = counts.values().sum::<usize>() as f64;
    if total == 0.0 {
        return 0.0;
    }

    let per_char: f64 = counts
        .values()
        .map(|&n| {
            let p = n as f64 / total;
            -p * p.log2()
        })
        .sum();

    per_char * total
}

fn missing_character_classes(secret: &str) -> Vec<&'static str> {
    let classes: [(&'static str, fn(char) -> bool); 4] = [
        ("uppercase letters", |c| c.is_uppercase()),
        ("lowercase letters", |c| c.is_lowercase()),
        ("digits", |c| c.is_ascii_digit()),
        ("symbols", |c| !c.is_alphanumeric() && !c.is_whitespace()),
    ];

    classes
        .iter()
        .filter(|(_, matches)| !secret.chars().any(matches))
        .map(|(name, _)| *name)
        .collect()
}

/// Random secret of exactly `length` characters from a URL-unsafe but
/// shell-quotable alphabet.
pub fn random_secret(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| SECRET_CHARSET[rng.gen_range(0..SECRET_CHARSET.len())] as char)
        .collect()
}

/// Random secret that passes the policy for `environment`.
pub fn generate_secret(environment: Environment) -> String {
    let policy = SecretPolicy::for_environment(environment);
    let length = policy.min_length.max(64);

    loop {
        let candidate = random_secret(length);
        if policy.validate(&candidate).is_ok() {
            return candidate;
        }
    }
}
