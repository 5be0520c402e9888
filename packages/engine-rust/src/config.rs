use serde::Deserialize;

use crate::target::DEFAULT_MAX_NAME_LENGTH;

/// What a fan-out operation does when some of its per-application calls fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Wait for every call, then fail the operation with all failures.
    #[default]
    Propagate,
    /// Log each failure and complete successfully with whatever succeeded.
    LogAndSkip,
}

/// Output format of the tracing subscriber installed by
/// [`init_tracing`](crate::logging::init_tracing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Engine-level configuration.
///
/// Controls naming limits of the built-in targets and how lifecycle fan-out
/// reports partial failures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct EngineConfig {
    /// Maximum application name length produced by the `instance-suffix` target.
    pub max_name_length: usize,
    /// Policy for start/stop/restart/restage.
    pub action_failure_policy: FailurePolicy,
    /// Policy for looking up deployed applications.
    pub query_failure_policy: FailurePolicy,
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            action_failure_policy: FailurePolicy::Propagate,
            query_failure_policy: FailurePolicy::LogAndSkip,
            log_format: LogFormat::Plain,
        }
    }
}
