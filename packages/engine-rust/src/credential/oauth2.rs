use std::sync::Arc;

use appbroker_core::BackingApplication;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::CredentialProvider;
use crate::extension::args::string_list;
use crate::extension::ExtensionFactory;
use crate::traits::{
    CharacterSet, CreateOAuth2ClientRequest, CredentialGenerator, CredentialKey,
    DeleteOAuth2ClientRequest, OAuth2Client,
};

const DESCRIPTOR: &str = "oauth2";
const REGISTRATION_PREFIX: &str = "security.oauth2.client.registration";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct OAuth2Config {
    /// Registration name; scopes the environment keys the client is written to.
    pub registration: String,
    /// Fixed client id. Derived from the application and instance when absent.
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    #[serde(deserialize_with = "string_list")]
    pub scopes: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    pub authorities: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    pub grant_types: Vec<String>,
    pub length: usize,
    pub include_uppercase_alpha: bool,
    pub include_lowercase_alpha: bool,
    pub include_numeric: bool,
    pub include_special: bool,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        let charset = CharacterSet::default();
        Self {
            registration: String::new(),
            client_id: None,
            client_name: None,
            scopes: Vec::new(),
            authorities: Vec::new(),
            grant_types: vec!["client_credentials".to_string()],
            length: charset.length,
            include_uppercase_alpha: charset.include_uppercase_alpha,
            include_lowercase_alpha: charset.include_lowercase_alpha,
            include_numeric: charset.include_numeric,
            include_special: charset.include_special,
        }
    }
}

impl OAuth2Config {
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

/// Registers an OAuth2 client per application and exposes its credentials.
pub struct OAuth2Provider {
    config: OAuth2Config,
    generator: Arc<dyn CredentialGenerator>,
    client: Arc<dyn OAuth2Client>,
}

impl OAuth2Provider {
    fn client_id(&self, application_name: &str, service_instance_id: &str) -> String {
        self.config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("{application_name}-{service_instance_id}"))
    }

    fn registration_key(&self, field: &str) -> String {
        format!("{REGISTRATION_PREFIX}.{}.{field}", self.config.registration)
    }
}

#[async_trait]
impl CredentialProvider for OAuth2Provider {
    async fn add_credentials(
        &self,
        mut application: BackingApplication,
        service_instance_id: &str,
    ) -> anyhow::Result<BackingApplication> {
        anyhow::ensure!(
            !self.config.registration.is_empty(),
            "oauth2 credential provider requires a registration name"
        );

        let client_id = self.client_id(&application.name, service_instance_id);
        let key = CredentialKey::new(&application.name, service_instance_id, DESCRIPTOR);
        let client_secret = self
            .generator
            .generate_string(&key, self.config.charset())
            .await?;

        let response = self
            .client
            .create_client(CreateOAuth2ClientRequest {
                client_id: client_id.clone(),
                client_name: self.config.client_name.clone().unwrap_or(client_id),
                client_secret: client_secret.clone(),
                scopes: self.config.scopes.clone(),
                authorities: self.config.authorities.clone(),
                grant_types: self.config.grant_types.clone(),
            })
            .await?;
        info!(
            client_id = %response.client_id,
            application = %application.name,
            service_instance_id,
            "registered oauth2 client"
        );

        application.environment.insert(
            self.registration_key("client-id"),
            Value::String(response.client_id),
        );
        application.environment.insert(
            self.registration_key("client-secret"),
            Value::String(client_secret),
        );
        Ok(application)
    }

    async fn delete_credentials(
        &self,
        application: BackingApplication,
        service_instance_id: &str,
    ) -> anyhow::Result<BackingApplication> {
        let client_id = self.client_id(&application.name, service_instance_id);
        self.client
            .delete_client(DeleteOAuth2ClientRequest {
                client_id: client_id.clone(),
            })
            .await?;
        info!(%client_id, application = %application.name, "unregistered oauth2 client");

        let key = CredentialKey::new(&application.name, service_instance_id, DESCRIPTOR);
        self.generator.delete_string(&key).await?;
        Ok(application)
    }
}

pub struct OAuth2Factory {
    generator: Arc<dyn CredentialGenerator>,
    client: Arc<dyn OAuth2Client>,
}

impl OAuth2Factory {
    #[must_use]
    pub fn new(generator: Arc<dyn CredentialGenerator>, client: Arc<dyn OAuth2Client>) -> Self {
        Self { generator, client }
    }
}

impl ExtensionFactory for OAuth2Factory {
    type Extension = dyn CredentialProvider;
    type Config = OAuth2Config;

    fn name(&self) -> &'static str {
        "oauth2"
    }

    fn create(&self, config: OAuth2Config) -> Arc<dyn CredentialProvider> {
        Arc::new(OAuth2Provider {
            config,
            generator: Arc::clone(&self.generator),
            client: Arc::clone(&self.client),
        })
    }
}
