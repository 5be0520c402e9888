//! In-process [`CredentialGenerator`] producing random strings.
//!
//! Generated values are remembered per [`CredentialKey`] so that repeated
//! provisioning of the same application returns the same secret, and deletes
//! release it. Nothing is persisted; a vault-backed generator replaces this
//! one in deployments that need durable secrets.

use async_trait::async_trait;
use dashmap::DashMap;
use rand::Rng;

use crate::traits::{CharacterSet, CredentialGenerator, CredentialKey};

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const NUMERIC: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"~!@#$%^&*_-+=?";

fn alphabet(charset: CharacterSet) -> Vec<u8> {
    let mut alphabet = Vec::new();
    if charset.include_uppercase_alpha {
        alphabet.extend_from_slice(UPPERCASE);
    }
    if charset.include_lowercase_alpha {
        alphabet.extend_from_slice(LOWERCASE);
    }
    if charset.include_numeric {
        alphabet.extend_from_slice(NUMERIC);
    }
    if charset.include_special {
        alphabet.extend_from_slice(SPECIAL);
    }
    alphabet
}

fn random_string(charset: CharacterSet) -> anyhow::Result<String> {
    let alphabet = alphabet(charset);
    anyhow::ensure!(
        !alphabet.is_empty(),
        "credential character set excludes every character class"
    );
    anyhow::ensure!(charset.length > 0, "credential length must be positive");

    let mut rng = rand::rng();
    Ok((0..charset.length)
        .map(|_| char::from(alphabet[rng.random_range(0..alphabet.len())]))
        .collect())
}

/// Random credential generator holding issued values in memory.
#[derive(Default)]
pub struct RandomCredentialGenerator {
    users: DashMap<CredentialKey, (String, String)>,
    strings: DashMap<CredentialKey, String>,
}

impl RandomCredentialGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users and strings currently issued.
    #[must_use]
    pub fn issued(&self) -> usize {
        self.users.len() + self.strings.len()
    }
}

#[async_trait]
impl CredentialGenerator for RandomCredentialGenerator {
    async fn generate_user(
        &self,
        key: &CredentialKey,
        charset: CharacterSet,
    ) -> anyhow::Result<(String, String)> {
        if let Some(existing) = self.users.get(key) {
            return Ok(existing.value().clone());
        }
        // Usernames avoid special characters regardless of the password policy.
        let username = random_string(CharacterSet {
            include_special: false,
            ..charset
        })?;
        let password = random_string(charset)?;
        let entry = self.users.entry(key.clone()).or_insert((username, password));
        Ok(entry.value().clone())
    }

    async fn generate_string(
        &self,
        key: &CredentialKey,
        charset: CharacterSet,
    ) -> anyhow::Result<String> {
        if let Some(existing) = self.strings.get(key) {
            return Ok(existing.value().clone());
        }
        let value = random_string(charset)?;
        let entry = self.strings.entry(key.clone()).or_insert(value);
        Ok(entry.value().clone())
    }

    async fn delete_user(&self, key: &CredentialKey) -> anyhow::Result<()> {
        self.users.remove(key);
        Ok(())
    }

    async fn delete_string(&self, key: &CredentialKey) -> anyhow::Result<()> {
        self.strings.remove(key);
        Ok(())
    }
}
