//! Collaborator contracts consumed by the engine.
//!
//! Implementations live outside this crate: platform adapters, credential
//! vaults, and OAuth2 client registries. Boundary errors are opaque to the
//! engine and carried as `anyhow::Error`.

use std::collections::BTreeMap;

use appbroker_core::DeployedApplication;
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// DeployerClient
// ---------------------------------------------------------------------------

/// Service and plan a provisioned instance currently belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstanceInfo {
    pub service_name: String,
    pub plan_name: String,
}

/// Deployment platform adapter.
///
/// Every call is addressed by the application's final (target-resolved) name
/// plus its deployment properties, which carry the grouping target.
#[async_trait]
pub trait DeployerClient: Send + Sync {
    /// Looks up the service and plan of a provisioned service instance.
    async fn get_service_instance(
        &self,
        service_instance_id: &str,
    ) -> anyhow::Result<ServiceInstanceInfo>;

    /// Fetches the live description of a deployed application.
    async fn get(
        &self,
        name: &str,
        properties: &BTreeMap<String, String>,
    ) -> anyhow::Result<DeployedApplication>;

    async fn start(&self, name: &str, properties: &BTreeMap<String, String>) -> anyhow::Result<()>;

    async fn stop(&self, name: &str, properties: &BTreeMap<String, String>) -> anyhow::Result<()>;

    async fn restart(&self, name: &str, properties: &BTreeMap<String, String>)
        -> anyhow::Result<()>;

    async fn restage(&self, name: &str, properties: &BTreeMap<String, String>)
        -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// CredentialGenerator
// ---------------------------------------------------------------------------

/// Shape of a generated secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterSet {
    pub length: usize,
    pub include_uppercase_alpha: bool,
    pub include_lowercase_alpha: bool,
    pub include_numeric: bool,
    pub include_special: bool,
}

impl Default for CharacterSet {
    fn default() -> Self {
        Self {
            length: 12,
            include_uppercase_alpha: true,
            include_lowercase_alpha: true,
            include_numeric: true,
            include_special: false,
        }
    }
}

/// Identifies one generated credential.
///
/// `descriptor` distinguishes several secrets held by the same application
/// for the same instance (e.g. `"basic"` vs `"oauth2"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialKey {
    pub application_name: String,
    pub service_instance_id: String,
    pub descriptor: String,
}

impl CredentialKey {
    #[must_use]
    pub fn new(
        application_name: impl Into<String>,
        service_instance_id: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            application_name: application_name.into(),
            service_instance_id: service_instance_id.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// Source of generated secrets (random strings, or a vault that stores them).
#[async_trait]
pub trait CredentialGenerator: Send + Sync {
    /// Generates a `(username, password)` pair.
    async fn generate_user(
        &self,
        key: &CredentialKey,
        charset: CharacterSet,
    ) -> anyhow::Result<(String, String)>;

    async fn generate_string(&self, key: &CredentialKey, charset: CharacterSet)
        -> anyhow::Result<String>;

    async fn delete_user(&self, key: &CredentialKey) -> anyhow::Result<()>;

    async fn delete_string(&self, key: &CredentialKey) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// OAuth2Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOAuth2ClientRequest {
    pub client_id: String,
    pub client_name: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub authorities: Vec<String>,
    pub grant_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOAuth2ClientResponse {
    pub client_id: String,
    pub client_name: String,
    pub scopes: Vec<String>,
    pub authorities: Vec<String>,
    pub grant_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOAuth2ClientRequest {
    pub client_id: String,
}

/// OAuth2 client registration backend (e.g. an authorization server admin API).
#[async_trait]
pub trait OAuth2Client: Send + Sync {
    async fn create_client(
        &self,
        request: CreateOAuth2ClientRequest,
    ) -> anyhow::Result<CreateOAuth2ClientResponse>;

    async fn delete_client(&self, request: DeleteOAuth2ClientRequest) -> anyhow::Result<()>;
}
