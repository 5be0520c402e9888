use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use appbroker_core::{BackingApplication, BrokeredServices};
use futures_util::future::join_all;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, info_span, warn, Instrument};

use super::{ApplicationFailure, LifecycleAction, LifecycleError, ManagementClient};
use crate::config::{EngineConfig, FailurePolicy};
use crate::target::{TargetContext, TargetService};
use crate::traits::DeployerClient;

/// Runs `operation` inside a `lifecycle` span recording its outcome and duration.
async fn instrumented<T, F>(
    action: &'static str,
    service_instance_id: &str,
    operation: F,
) -> Result<T, LifecycleError>
where
    F: Future<Output = Result<T, LifecycleError>>,
{
    let span = info_span!(
        "lifecycle",
        action,
        service_instance_id,
        duration_ms = tracing::field::Empty,
        outcome = tracing::field::Empty,
    );

    async move {
        let start = Instant::now();
        let result = operation.await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let outcome = match &result {
            Ok(_) => "ok",
            Err(_) => "error",
        };

        let span = tracing::Span::current();
        span.record("duration_ms", duration_ms);
        span.record("outcome", outcome);
        info!(duration_ms, outcome, "lifecycle operation complete");

        result
    }
    .instrument(span)
    .await
}

// ---------------------------------------------------------------------------
// BackingAppManagementService
// ---------------------------------------------------------------------------

/// Fans lifecycle operations out to the backing applications of an instance.
///
/// The applications are the catalog entry's templates after target
/// resolution, so they carry the same final names and grouping properties
/// they were deployed with.
pub struct BackingAppManagementService {
    catalog: Arc<BrokeredServices>,
    deployer: Arc<dyn DeployerClient>,
    client: ManagementClient,
    targets: Arc<TargetService>,
    action_policy: FailurePolicy,
    query_policy: FailurePolicy,
}

impl BackingAppManagementService {
    #[must_use]
    pub fn new(
        catalog: Arc<BrokeredServices>,
        deployer: Arc<dyn DeployerClient>,
        targets: Arc<TargetService>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            catalog,
            client: ManagementClient::new(Arc::clone(&deployer)),
            deployer,
            targets,
            action_policy: config.action_failure_policy,
            query_policy: config.query_failure_policy,
        }
    }

    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn start(&self, service_instance_id: &str) -> Result<(), LifecycleError> {
        self.apply(LifecycleAction::Start, service_instance_id).await
    }

    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn stop(&self, service_instance_id: &str) -> Result<(), LifecycleError> {
        self.apply(LifecycleAction::Stop, service_instance_id).await
    }

    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn restart(&self, service_instance_id: &str) -> Result<(), LifecycleError> {
        self.apply(LifecycleAction::Restart, service_instance_id).await
    }

    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn restage(&self, service_instance_id: &str) -> Result<(), LifecycleError> {
        self.apply(LifecycleAction::Restage, service_instance_id).await
    }

    /// # Errors
    ///
    /// See [`apply_for`](Self::apply_for).
    pub async fn start_for(
        &self,
        service_instance_id: &str,
        service_name: &str,
        plan_name: &str,
    ) -> Result<(), LifecycleError> {
        self.apply_for(LifecycleAction::Start, service_instance_id, service_name, plan_name)
            .await
    }

    /// # Errors
    ///
    /// See [`apply_for`](Self::apply_for).
    pub async fn stop_for(
        &self,
        service_instance_id: &str,
        service_name: &str,
        plan_name: &str,
    ) -> Result<(), LifecycleError> {
        self.apply_for(LifecycleAction::Stop, service_instance_id, service_name, plan_name)
            .await
    }

    /// # Errors
    ///
    /// See [`apply_for`](Self::apply_for).
    pub async fn restart_for(
        &self,
        service_instance_id: &str,
        service_name: &str,
        plan_name: &str,
    ) -> Result<(), LifecycleError> {
        self.apply_for(LifecycleAction::Restart, service_instance_id, service_name, plan_name)
            .await
    }

    /// # Errors
    ///
    /// See [`apply_for`](Self::apply_for).
    pub async fn restage_for(
        &self,
        service_instance_id: &str,
        service_name: &str,
        plan_name: &str,
    ) -> Result<(), LifecycleError> {
        self.apply_for(LifecycleAction::Restage, service_instance_id, service_name, plan_name)
            .await
    }

    /// Looks up the instance's service and plan on the platform, then applies
    /// `action` to its backing applications.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Platform`] if the instance lookup fails, plus
    /// everything [`apply_for`](Self::apply_for) returns.
    pub async fn apply(
        &self,
        action: LifecycleAction,
        service_instance_id: &str,
    ) -> Result<(), LifecycleError> {
        instrumented(action.as_str(), service_instance_id, async {
            let instance = self
                .deployer
                .get_service_instance(service_instance_id)
                .await
                .map_err(LifecycleError::Platform)?;
            self.dispatch(
                action,
                service_instance_id,
                &instance.service_name,
                &instance.plan_name,
            )
            .await
        })
        .await
    }

    /// Applies `action` to the backing applications of the given catalog entry.
    ///
    /// An instance whose service and plan match no catalog entry has nothing
    /// to manage; the call succeeds without contacting the platform.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Target`] if the entry names an unknown target,
    /// and [`LifecycleError::ActionFailed`] when any application's call failed
    /// under [`FailurePolicy::Propagate`].
    pub async fn apply_for(
        &self,
        action: LifecycleAction,
        service_instance_id: &str,
        service_name: &str,
        plan_name: &str,
    ) -> Result<(), LifecycleError> {
        instrumented(
            action.as_str(),
            service_instance_id,
            self.dispatch(action, service_instance_id, service_name, plan_name),
        )
        .await
    }

    /// Fetches the live description of every backing application of the instance.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Platform`] if the instance lookup fails, plus
    /// everything [`Self::get_deployed_backing_applications_for`] returns.
    pub async fn get_deployed_backing_applications(
        &self,
        service_instance_id: &str,
    ) -> Result<Vec<BackingApplication>, LifecycleError> {
        instrumented("get", service_instance_id, async {
            let instance = self
                .deployer
                .get_service_instance(service_instance_id)
                .await
                .map_err(LifecycleError::Platform)?;
            self.query(service_instance_id, &instance.service_name, &instance.plan_name)
                .await
        })
        .await
    }

    /// Fetches the live description of every backing application of the entry.
    ///
    /// Each result keeps the template's path and deployment properties. Under
    /// the default [`FailurePolicy::LogAndSkip`] applications whose lookup
    /// fails are left out of the result.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Target`] if the entry names an unknown target,
    /// and [`LifecycleError::QueryFailed`] when any lookup failed under
    /// [`FailurePolicy::Propagate`].
    pub async fn get_deployed_backing_applications_for(
        &self,
        service_instance_id: &str,
        service_name: &str,
        plan_name: &str,
    ) -> Result<Vec<BackingApplication>, LifecycleError> {
        instrumented(
            "get",
            service_instance_id,
            self.query(service_instance_id, service_name, plan_name),
        )
        .await
    }

    fn resolve_applications(
        &self,
        service_instance_id: &str,
        service_name: &str,
        plan_name: &str,
    ) -> Result<Option<Vec<BackingApplication>>, LifecycleError> {
        let Some(brokered) = self.catalog.find(service_name, plan_name) else {
            debug!(
                service_instance_id,
                service_name, plan_name, "no brokered service for instance; nothing to manage"
            );
            return Ok(None);
        };

        let ctx = TargetContext {
            service_instance_id,
            service_name,
            plan_name,
        };
        let applications =
            self.targets
                .apply_to_applications(brokered.apps.clone(), brokered.target.as_ref(), &ctx)?;
        Ok(Some(applications))
    }

    async fn dispatch(
        &self,
        action: LifecycleAction,
        service_instance_id: &str,
        service_name: &str,
        plan_name: &str,
    ) -> Result<(), LifecycleError> {
        let Some(applications) =
            self.resolve_applications(service_instance_id, service_name, plan_name)?
        else {
            return Ok(());
        };

        let mut pending: FuturesUnordered<_> = applications
            .iter()
            .map(|application| async move {
                (application, self.client.run(action, application).await)
            })
            .collect();

        let mut failures = Vec::new();
        while let Some((application, result)) = pending.next().await {
            match result {
                Ok(()) => {
                    debug!(application = %application.name, %action, "lifecycle action complete");
                }
                Err(error) => {
                    warn!(
                        application = %application.name,
                        %action,
                        service_instance_id,
                        error = %format!("{error:#}"),
                        "lifecycle action failed"
                    );
                    failures.push(ApplicationFailure {
                        application: application.name.clone(),
                        error,
                    });
                }
            }
        }

        if failures.is_empty() || self.action_policy == FailurePolicy::LogAndSkip {
            return Ok(());
        }
        Err(LifecycleError::ActionFailed {
            action,
            service_instance_id: service_instance_id.to_string(),
            failures,
        })
    }

    async fn query(
        &self,
        service_instance_id: &str,
        service_name: &str,
        plan_name: &str,
    ) -> Result<Vec<BackingApplication>, LifecycleError> {
        let Some(templates) =
            self.resolve_applications(service_instance_id, service_name, plan_name)?
        else {
            return Ok(Vec::new());
        };

        let results = join_all(templates.iter().map(|template| self.client.get(template))).await;

        let mut deployed = Vec::with_capacity(templates.len());
        let mut failures = Vec::new();
        for (template, result) in templates.into_iter().zip(results) {
            match result {
                Ok(live) => deployed.push(BackingApplication {
                    path: template.path,
                    properties: template.properties,
                    ..BackingApplication::from(live)
                }),
                Err(error) => {
                    warn!(
                        application = %template.name,
                        service_instance_id,
                        error = %format!("{error:#}"),
                        "failed to fetch deployed application"
                    );
                    failures.push(ApplicationFailure {
                        application: template.name,
                        error,
                    });
                }
            }
        }

        if failures.is_empty() || self.query_policy == FailurePolicy::LogAndSkip {
            return Ok(deployed);
        }
        Err(LifecycleError::QueryFailed {
            service_instance_id: service_instance_id.to_string(),
            failures,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};
    use std::time::Duration;

    use appbroker_core::{BrokeredService, DeployedApplication, ExtensionSpec};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::sync::Barrier;

    use super::*;
    use crate::target::{builtin_targets, DEFAULT_MAX_NAME_LENGTH, TARGET_PROPERTY_KEY};
    use crate::traits::ServiceInstanceInfo;

    /// Platform adapter double recording every call as `"{action}:{name}"`.
    #[derive(Default)]
    struct RecordingDeployer {
        calls: Mutex<Vec<String>>,
        failing: HashSet<String>,
        /// When set, every action waits here before completing.
        barrier: Option<Arc<Barrier>>,
    }

    impl RecordingDeployer {
        fn failing(names: &[&str]) -> Self {
            Self {
                failing: names.iter().map(ToString::to_string).collect(),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            let mut calls = self.calls.lock().clone();
            calls.sort();
            calls
        }

        async fn record(&self, action: &str, name: &str) -> anyhow::Result<()> {
            self.calls.lock().push(format!("{action}:{name}"));
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            anyhow::ensure!(!self.failing.contains(name), "{action} of {name} rejected");
            Ok(())
        }
    }

    #[async_trait]
    impl DeployerClient for RecordingDeployer {
        async fn get_service_instance(
            &self,
            service_instance_id: &str,
        ) -> anyhow::Result<ServiceInstanceInfo> {
            self.calls.lock().push(format!("lookup:{service_instance_id}"));
            match service_instance_id {
                "instance-1" => Ok(ServiceInstanceInfo {
                    service_name: "example".to_string(),
                    plan_name: "standard".to_string(),
                }),
                "empty-instance" => Ok(ServiceInstanceInfo {
                    service_name: "example".to_string(),
                    plan_name: "empty".to_string(),
                }),
                other => anyhow::bail!("service instance {other} does not exist"),
            }
        }

        async fn get(
            &self,
            name: &str,
            _properties: &BTreeMap<String, String>,
        ) -> anyhow::Result<DeployedApplication> {
            self.record("get", name).await?;
            Ok(DeployedApplication {
                name: name.to_string(),
                environment: BTreeMap::from([("live".to_string(), json!(true))]),
                services: vec!["db".to_string()],
            })
        }

        async fn start(&self, name: &str, _: &BTreeMap<String, String>) -> anyhow::Result<()> {
            self.record("start", name).await
        }

        async fn stop(&self, name: &str, _: &BTreeMap<String, String>) -> anyhow::Result<()> {
            self.record("stop", name).await
        }

        async fn restart(&self, name: &str, _: &BTreeMap<String, String>) -> anyhow::Result<()> {
            self.record("restart", name).await
        }

        async fn restage(&self, name: &str, _: &BTreeMap<String, String>) -> anyhow::Result<()> {
            self.record("restage", name).await
        }
    }

    fn catalog() -> BrokeredServices {
        BrokeredServices::new(vec![
            BrokeredService::new("example", "standard")
                .with_app(BackingApplication::new("app1", "/apps/app1.jar"))
                .with_app(BackingApplication::new("app2", "/apps/app2.jar"))
                .with_target(ExtensionSpec::new("per-instance-grouping")),
            BrokeredService::new("example", "empty"),
            BrokeredService::new("example", "misconfigured")
                .with_app(BackingApplication::new("app1", "p"))
                .with_target(ExtensionSpec::new("nowhere")),
        ])
    }

    fn manager_with(
        deployer: Arc<RecordingDeployer>,
        config: &EngineConfig,
    ) -> BackingAppManagementService {
        let targets = Arc::new(TargetService::new(Arc::new(
            builtin_targets(DEFAULT_MAX_NAME_LENGTH).build().unwrap(),
        )));
        BackingAppManagementService::new(Arc::new(catalog()), deployer, targets, config)
    }

    fn manager(deployer: Arc<RecordingDeployer>) -> BackingAppManagementService {
        manager_with(deployer, &EngineConfig::default())
    }

    #[tokio::test]
    async fn stop_reaches_every_application_once() {
        let deployer = Arc::new(RecordingDeployer::default());

        manager(deployer.clone()).stop("instance-1").await.unwrap();

        assert_eq!(
            deployer.calls(),
            vec![
                "lookup:instance-1",
                "stop:app1-instance-1",
                "stop:app2-instance-1"
            ]
        );
    }

    #[tokio::test]
    async fn each_action_maps_to_its_platform_call() {
        let deployer = Arc::new(RecordingDeployer::default());
        let manager = manager(deployer.clone());

        manager.start_for("instance-1", "example", "standard").await.unwrap();
        manager.restart_for("instance-1", "example", "standard").await.unwrap();
        manager.restage_for("instance-1", "example", "standard").await.unwrap();

        let calls = deployer.calls();
        assert_eq!(calls.len(), 6);
        for action in ["start", "restart", "restage"] {
            assert!(calls.contains(&format!("{action}:app1-instance-1")));
            assert!(calls.contains(&format!("{action}:app2-instance-1")));
        }
    }

    #[tokio::test]
    async fn empty_application_set_makes_no_platform_calls() {
        let deployer = Arc::new(RecordingDeployer::default());
        let manager = manager(deployer.clone());

        manager.stop_for("empty-instance", "example", "empty").await.unwrap();
        assert!(deployer.calls().is_empty());

        manager.restart("empty-instance").await.unwrap();
        assert_eq!(deployer.calls(), vec!["lookup:empty-instance"]);
    }

    #[tokio::test]
    async fn unknown_catalog_entry_is_a_no_op() {
        let deployer = Arc::new(RecordingDeployer::default());

        manager(deployer.clone())
            .start_for("instance-1", "unknown", "plan")
            .await
            .unwrap();

        assert!(deployer.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_instance_lookup_is_a_platform_error() {
        let deployer = Arc::new(RecordingDeployer::default());

        let err = manager(deployer).start("missing").await.unwrap_err();

        assert!(matches!(err, LifecycleError::Platform(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn unknown_target_is_reported() {
        let deployer = Arc::new(RecordingDeployer::default());

        let err = manager(deployer.clone())
            .stop_for("instance-1", "example", "misconfigured")
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::Target(_)));
        assert!(deployer.calls().is_empty());
    }

    #[tokio::test]
    async fn failure_is_reported_after_every_action_ran() {
        let deployer = Arc::new(RecordingDeployer::failing(&["app1-instance-1"]));

        let err = manager(deployer.clone()).restart("instance-1").await.unwrap_err();

        match &err {
            LifecycleError::ActionFailed {
                action,
                service_instance_id,
                failures,
            } => {
                assert_eq!(*action, LifecycleAction::Restart);
                assert_eq!(service_instance_id, "instance-1");
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].application, "app1-instance-1");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(deployer.calls().contains(&"restart:app2-instance-1".to_string()));
    }

    #[tokio::test]
    async fn log_and_skip_policy_completes_despite_failures() {
        let deployer = Arc::new(RecordingDeployer::failing(&[
            "app1-instance-1",
            "app2-instance-1",
        ]));
        let config = EngineConfig {
            action_failure_policy: FailurePolicy::LogAndSkip,
            ..EngineConfig::default()
        };

        manager_with(deployer.clone(), &config)
            .stop("instance-1")
            .await
            .unwrap();

        assert_eq!(deployer.calls().len(), 3);
    }

    #[tokio::test]
    async fn actions_are_dispatched_concurrently() {
        // Both stops must be in flight at once to pass the barrier.
        let deployer = Arc::new(RecordingDeployer {
            barrier: Some(Arc::new(Barrier::new(2))),
            ..RecordingDeployer::default()
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            manager(deployer.clone()).stop_for("instance-1", "example", "standard"),
        )
        .await;

        assert!(result.is_ok(), "actions ran sequentially");
        assert_eq!(deployer.calls().len(), 2);
    }

    #[tokio::test]
    async fn deployed_applications_merge_live_state_with_templates() {
        let deployer = Arc::new(RecordingDeployer::default());

        let deployed = manager(deployer)
            .get_deployed_backing_applications("instance-1")
            .await
            .unwrap();

        assert_eq!(deployed.len(), 2);
        assert_eq!(deployed[0].name, "app1-instance-1");
        assert_eq!(deployed[0].path, "/apps/app1.jar");
        assert_eq!(deployed[0].properties[TARGET_PROPERTY_KEY], "instance-1");
        assert_eq!(deployed[0].environment["live"], json!(true));
        assert_eq!(deployed[0].services[0].service_instance_name, "db");
        assert_eq!(deployed[1].name, "app2-instance-1");
    }

    #[tokio::test]
    async fn failed_lookups_are_skipped_by_default() {
        let deployer = Arc::new(RecordingDeployer::failing(&["app1-instance-1"]));

        let deployed = manager(deployer)
            .get_deployed_backing_applications_for("instance-1", "example", "standard")
            .await
            .unwrap();

        assert_eq!(deployed.len(), 1);
        assert_eq!(deployed[0].name, "app2-instance-1");
    }

    #[tokio::test]
    async fn failed_lookups_propagate_when_configured() {
        let deployer = Arc::new(RecordingDeployer::failing(&["app1-instance-1"]));
        let config = EngineConfig {
            query_failure_policy: FailurePolicy::Propagate,
            ..EngineConfig::default()
        };

        let err = manager_with(deployer, &config)
            .get_deployed_backing_applications("instance-1")
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::QueryFailed { .. }));
        assert_eq!(err.failures().len(), 1);
    }

    #[tokio::test]
    async fn unknown_entry_has_no_deployed_applications() {
        let deployer = Arc::new(RecordingDeployer::default());

        let deployed = manager(deployer.clone())
            .get_deployed_backing_applications_for("instance-1", "unknown", "plan")
            .await
            .unwrap();

        assert!(deployed.is_empty());
        assert!(deployer.calls().is_empty());
    }
}
