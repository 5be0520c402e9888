//! End-to-end wiring: catalog JSON in, prepared deployments and lifecycle
//! calls out, with operation state tracked alongside.

use std::collections::BTreeMap;
use std::sync::Arc;

use appbroker_core::{BrokeredServices, DeployedApplication, OperationState, Parameters};
use appbroker_engine::credential::{RandomCredentialGenerator, PASSWORD_KEY, USERNAME_KEY};
use appbroker_engine::traits::{
    CreateOAuth2ClientRequest, CreateOAuth2ClientResponse, DeleteOAuth2ClientRequest,
    ServiceInstanceInfo,
};
use appbroker_engine::{
    BrokerModule, Collaborators, DeployerClient, EngineConfig, OAuth2Client, PipelineError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

const CATALOG: &str = r#"[
  {
    "serviceName": "example",
    "planName": "standard",
    "target": { "name": "per-instance-grouping" },
    "apps": [
      {
        "name": "api",
        "path": "/apps/api.jar",
        "properties": { "memory": "1G" },
        "parametersTransformers": [
          { "name": "env-mapping", "args": { "include": "greeting,count" } },
          { "name": "property-mapping", "args": { "include": ["memory"] } }
        ],
        "credentialProviders": [
          { "name": "basic-auth", "args": { "length": 16 } },
          {
            "name": "oauth2",
            "args": { "registration": "sso", "grant-types": "client_credentials" }
          }
        ]
      },
      { "name": "worker", "path": "/apps/worker.jar" }
    ],
    "services": [
      {
        "name": "mysql",
        "serviceInstanceName": "db",
        "plan": "small",
        "parametersTransformers": [
          { "name": "parameter-mapping", "args": { "include": "size" } }
        ]
      }
    ]
  }
]"#;

#[derive(Default)]
struct Platform {
    instances: Mutex<BTreeMap<String, ServiceInstanceInfo>>,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl DeployerClient for Platform {
    async fn get_service_instance(
        &self,
        service_instance_id: &str,
    ) -> anyhow::Result<ServiceInstanceInfo> {
        self.instances
            .lock()
            .get(service_instance_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown service instance {service_instance_id}"))
    }

    async fn get(
        &self,
        name: &str,
        _properties: &BTreeMap<String, String>,
    ) -> anyhow::Result<DeployedApplication> {
        Ok(DeployedApplication {
            name: name.to_string(),
            ..DeployedApplication::default()
        })
    }

    async fn start(&self, name: &str, properties: &BTreeMap<String, String>) -> anyhow::Result<()> {
        self.record("start", name, properties);
        Ok(())
    }

    async fn stop(&self, name: &str, properties: &BTreeMap<String, String>) -> anyhow::Result<()> {
        self.record("stop", name, properties);
        Ok(())
    }

    async fn restart(
        &self,
        name: &str,
        properties: &BTreeMap<String, String>,
    ) -> anyhow::Result<()> {
        self.record("restart", name, properties);
        Ok(())
    }

    async fn restage(
        &self,
        name: &str,
        properties: &BTreeMap<String, String>,
    ) -> anyhow::Result<()> {
        self.record("restage", name, properties);
        Ok(())
    }
}

impl Platform {
    fn record(&self, action: &str, name: &str, properties: &BTreeMap<String, String>) {
        let target = properties.get("target").map_or("-", String::as_str);
        self.calls.lock().push(format!("{action}:{name}@{target}"));
    }

    fn calls(&self) -> Vec<String> {
        let mut calls = self.calls.lock().clone();
        calls.sort();
        calls
    }
}

#[derive(Default)]
struct AuthServer {
    clients: Mutex<BTreeMap<String, CreateOAuth2ClientRequest>>,
}

#[async_trait]
impl OAuth2Client for AuthServer {
    async fn create_client(
        &self,
        request: CreateOAuth2ClientRequest,
    ) -> anyhow::Result<CreateOAuth2ClientResponse> {
        let response = CreateOAuth2ClientResponse {
            client_id: request.client_id.clone(),
            client_name: request.client_name.clone(),
            scopes: request.scopes.clone(),
            authorities: request.authorities.clone(),
            grant_types: request.grant_types.clone(),
        };
        self.clients.lock().insert(request.client_id.clone(), request);
        Ok(response)
    }

    async fn delete_client(&self, request: DeleteOAuth2ClientRequest) -> anyhow::Result<()> {
        self.clients.lock().remove(&request.client_id);
        Ok(())
    }
}

struct Harness {
    module: BrokerModule,
    platform: Arc<Platform>,
    auth: Arc<AuthServer>,
    generator: Arc<RandomCredentialGenerator>,
}

fn harness() -> Harness {
    let platform = Arc::new(Platform::default());
    let auth = Arc::new(AuthServer::default());
    let generator = Arc::new(RandomCredentialGenerator::new());
    let collaborators = Collaborators {
        deployer: platform.clone(),
        credential_generator: generator.clone(),
        oauth2_client: Some(auth.clone()),
    };
    let catalog = BrokeredServices::from_json(CATALOG).unwrap();
    let module = BrokerModule::new(EngineConfig::default(), catalog, collaborators).unwrap();
    Harness {
        module,
        platform,
        auth,
        generator,
    }
}

fn params() -> Parameters {
    json!({ "greeting": "hello", "count": 2, "size": "large", "ignored": true })
        .as_object()
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn create_update_and_delete_flow() {
    let h = harness();
    let instance_id = uuid::Uuid::new_v4().to_string();
    let catalog = h.module.catalog();
    let brokered = catalog.find("example", "standard").unwrap();
    let state = h.module.instance_state();

    state
        .save_state(&instance_id, OperationState::InProgress, "create in progress")
        .await
        .unwrap();

    let apps = h
        .module
        .provisioning()
        .prepare_applications(brokered, &instance_id, &params())
        .await
        .unwrap();
    let services = h
        .module
        .provisioning()
        .prepare_services(brokered, &instance_id, &params())
        .await
        .unwrap();

    let api = &apps[0];
    assert_eq!(api.name, format!("api-{instance_id}"));
    assert_eq!(api.properties["target"], instance_id);
    assert_eq!(api.properties["memory"], "1G");
    assert_eq!(api.environment["greeting"], json!("hello"));
    assert_eq!(api.environment["count"], json!(2));
    assert!(!api.environment.contains_key("ignored"));
    assert_eq!(api.environment[PASSWORD_KEY].as_str().unwrap().len(), 16);
    assert!(api.environment.contains_key(USERNAME_KEY));
    let client_id = format!("api-{instance_id}-{instance_id}");
    assert_eq!(
        api.environment["security.oauth2.client.registration.sso.client-id"],
        json!(client_id)
    );
    assert!(h.auth.clients.lock().contains_key(&client_id));

    let worker = &apps[1];
    assert_eq!(worker.name, format!("worker-{instance_id}"));
    assert!(worker.environment.is_empty());

    assert_eq!(services[0].service_instance_name, format!("db-{instance_id}"));
    assert_eq!(services[0].parameters["size"], json!("large"));
    assert_eq!(h.generator.issued(), 2);

    state
        .save_state(&instance_id, OperationState::Succeeded, "created")
        .await
        .unwrap();
    assert_eq!(
        state.get_state(&instance_id).await.unwrap().operation_state,
        OperationState::Succeeded
    );

    // Re-provisioning the same instance reuses the issued secrets.
    let again = h
        .module
        .provisioning()
        .prepare_applications(brokered, &instance_id, &params())
        .await
        .unwrap();
    assert_eq!(again[0].environment[PASSWORD_KEY], api.environment[PASSWORD_KEY]);

    let deleted = h
        .module
        .provisioning()
        .prepare_applications_for_delete(brokered, &instance_id)
        .await
        .unwrap();
    assert_eq!(deleted.len(), 2);
    assert_eq!(h.generator.issued(), 0);
    assert!(h.auth.clients.lock().is_empty());

    let removed = state.remove_state(&instance_id).await.unwrap();
    assert_eq!(removed.description, "created");
    assert!(state.get_state(&instance_id).await.is_err());
}

#[tokio::test]
async fn lifecycle_operations_address_targeted_applications() {
    let h = harness();
    h.platform.instances.lock().insert(
        "i-1".to_string(),
        ServiceInstanceInfo {
            service_name: "example".to_string(),
            plan_name: "standard".to_string(),
        },
    );
    let lifecycle = h.module.lifecycle();

    lifecycle.stop("i-1").await.unwrap();
    assert_eq!(h.platform.calls(), vec!["stop:api-i-1@i-1", "stop:worker-i-1@i-1"]);

    lifecycle.restage("i-1").await.unwrap();
    assert_eq!(h.platform.calls().len(), 4);

    let deployed = lifecycle.get_deployed_backing_applications("i-1").await.unwrap();
    let names: Vec<&str> = deployed.iter().map(|app| app.name.as_str()).collect();
    assert_eq!(names, vec!["api-i-1", "worker-i-1"]);

    assert!(lifecycle.start("i-unknown").await.is_err());
}

#[tokio::test]
async fn misconfigured_extension_arguments_fail_provisioning() {
    let h = harness();
    let catalog = BrokeredServices::from_json(
        r#"[{
            "serviceName": "example",
            "planName": "broken",
            "apps": [{
                "name": "api",
                "path": "/apps/api.jar",
                "credentialProviders": [{ "name": "basic-auth", "args": { "lenght": 8 } }]
            }]
        }]"#,
    )
    .unwrap();
    let brokered = catalog.find("example", "broken").unwrap();

    let err = h
        .module
        .provisioning()
        .prepare_applications(brokered, "i-1", &Parameters::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Extension(_)));
    assert!(err.to_string().contains("basic-auth"));
    assert_eq!(h.generator.issued(), 0);
}
