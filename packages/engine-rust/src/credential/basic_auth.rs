use std::sync::Arc;

use appbroker_core::BackingApplication;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::CredentialProvider;
use crate::extension::ExtensionFactory;
use crate::traits::{CharacterSet, CredentialGenerator, CredentialKey};

pub const USERNAME_KEY: &str = "security.user.name";
pub const PASSWORD_KEY: &str = "security.user.password";

const DESCRIPTOR: &str = "basic";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct BasicAuthConfig {
    pub length: usize,
    pub include_uppercase_alpha: bool,
    pub include_lowercase_alpha: bool,
    pub include_numeric: bool,
    pub include_special: bool,
}

impl Default for BasicAuthConfig {
    fn default() -> Self {
        let charset = CharacterSet::default();
        Self {
            length: charset.length,
            include_uppercase_alpha: charset.include_uppercase_alpha,
            include_lowercase_alpha: charset.include_lowercase_alpha,
            include_numeric: charset.include_numeric,
            include_special: charset.include_special,
        }
    }
}

impl BasicAuthConfig {
    fn charset(&self) -> CharacterSet {
        CharacterSet {
            length: self.length,
            include_uppercase_alpha: self.include_uppercase_alpha,
            include_lowercase_alpha: self.include_lowercase_alpha,
            include_numeric: self.include_numeric,
            include_special: self.include_special,
        }
    }
}

/// Generates a username/password pair and exposes it as two environment entries.
pub struct BasicAuthProvider {
    config: BasicAuthConfig,
    generator: Arc<dyn CredentialGenerator>,
}

#[async_trait]
impl CredentialProvider for BasicAuthProvider {
    async fn add_credentials(
        &self,
        mut application: BackingApplication,
        service_instance_id: &str,
    ) -> anyhow::Result<BackingApplication> {
        let key = CredentialKey::new(&application.name, service_instance_id, DESCRIPTOR);
        let (username, password) = self
            .generator
            .generate_user(&key, self.config.charset())
            .await?;

        application
            .environment
            .insert(USERNAME_KEY.to_string(), Value::String(username));
        application
            .environment
            .insert(PASSWORD_KEY.to_string(), Value::String(password));
        Ok(application)
    }

    async fn delete_credentials(
        &self,
        application: BackingApplication,
        service_instance_id: &str,
    ) -> anyhow::Result<BackingApplication> {
        let key = CredentialKey::new(&application.name, service_instance_id, DESCRIPTOR);
        self.generator.delete_user(&key).await?;
        Ok(application)
    }
}

pub struct BasicAuthFactory {
    generator: Arc<dyn CredentialGenerator>,
}

impl BasicAuthFactory {
    #[must_use]
    pub fn new(generator: Arc<dyn CredentialGenerator>) -> Self {
        Self { generator }
    }
}

impl ExtensionFactory for BasicAuthFactory {
    type Extension = dyn CredentialProvider;
    type Config = BasicAuthConfig;

    fn name(&self) -> &'static str {
        "basic-auth"
    }

    fn create(&self, config: BasicAuthConfig) -> Arc<dyn CredentialProvider> {
        Arc::new(BasicAuthProvider {
            config,
            generator: Arc::clone(&self.generator),
        })
    }
}
