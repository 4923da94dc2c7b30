//! Server configuration.

use std::time::Duration;

use fanout_supervisor::RunConfig;

/// Server configuration, read from the environment with defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address.
    pub http_bind_addr: String,

    /// Dispatch attempts per task.
    pub max_attempts: u32,

    /// Per-task reply deadline (seconds).
    pub task_timeout_secs: u64,

    /// Inter-task delay when fanning out a multi-task run (milliseconds).
    pub dispatch_stagger_ms: u64,

    /// Run deadline for synchronous callers (seconds).
    pub run_deadline_secs: u64,

    /// Workers denied by the identity check (comma separated).
    pub denied_workers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_bind_addr: "0.0.0.0:8000".to_string(),
            max_attempts: 3,
            task_timeout_secs: 15,
            dispatch_stagger_ms: 1000,
            run_deadline_secs: 60,
            denied_workers: Vec::new(),
        }
    }
}

impl Config {
    /// Load from `FANOUT_*` environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            http_bind_addr: env_or("FANOUT_HTTP_ADDR", defaults.http_bind_addr),
            max_attempts: env_parse("FANOUT_MAX_ATTEMPTS", defaults.max_attempts),
            task_timeout_secs: env_parse("FANOUT_TASK_TIMEOUT_SECS", defaults.task_timeout_secs),
            dispatch_stagger_ms: env_parse(
                "FANOUT_DISPATCH_STAGGER_MS",
                defaults.dispatch_stagger_ms,
            ),
            run_deadline_secs: env_parse("FANOUT_RUN_DEADLINE_SECS", defaults.run_deadline_secs),
            denied_workers: std::env::var("FANOUT_DENIED_WORKERS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// The run-level configuration handed to the supervisor.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            max_attempts: self.max_attempts,
            task_timeout: Duration::from_secs(self.task_timeout_secs),
            dispatch_stagger: Duration::from_millis(self.dispatch_stagger_ms),
            run_deadline: Duration::from_secs(self.run_deadline_secs),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
