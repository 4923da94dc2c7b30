//! Request decomposition: which targets does a request imply?
//!
//! The routing logic is a pluggable strategy so that however it is sourced
//! (rules, a classifier, an LLM) it can be swapped without touching the
//! supervisor state machine. The shipped [`RuleDecomposer`] works off a
//! worker directory of roles and aliases.

use fanout_core::{Target, WorkerId};

/// One caller request as received at the boundary.
#[derive(Debug, Clone, Default)]
pub struct PromptRequest {
    /// Free-text instruction.
    pub prompt: String,
    /// Optional explicit URLs to fan out over the scraper role.
    pub urls: Vec<String>,
    /// Optional caller-supplied session id, reused as the run id so that
    /// emitted events group under the caller's observability session.
    pub session_id: Option<String>,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            urls: Vec::new(),
            session_id: None,
        }
    }

    pub fn with_urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// True when there is nothing to act on.
    pub fn is_empty(&self) -> bool {
        self.prompt.trim().is_empty() && self.urls.is_empty()
    }
}

/// One task the decomposition step identified.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub target: Target,
    pub payload: String,
}

impl TaskSpec {
    pub fn new(target: Target, payload: impl Into<String>) -> Self {
        Self {
            target,
            payload: payload.into(),
        }
    }
}

/// Pluggable decomposition strategy. An empty result means the request
/// implies no targets and is rejected as invalid before any dispatch.
pub trait Decomposer: Send + Sync {
    fn decompose(&self, request: &PromptRequest) -> Vec<TaskSpec>;
}

/// A registered worker with its role and the prompt aliases that select it.
#[derive(Debug, Clone)]
pub struct WorkerEntry {
    pub id: WorkerId,
    pub role: String,
    pub aliases: Vec<String>,
}

/// Registry of known workers, grouped by role.
#[derive(Debug, Clone, Default)]
pub struct WorkerDirectory {
    entries: Vec<WorkerEntry>,
}

impl WorkerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker under a role with its prompt aliases.
    pub fn register(
        mut self,
        id: impl Into<WorkerId>,
        role: impl Into<String>,
        aliases: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        self.entries.push(WorkerEntry {
            id: id.into(),
            role: role.into(),
            aliases: aliases.into_iter().map(|a| a.to_lowercase()).collect(),
        });
        self
    }

    pub fn entries(&self) -> &[WorkerEntry] {
        &self.entries
    }

    /// All workers registered under a role, in registration order.
    pub fn workers_in_role(&self, role: &str) -> Vec<&WorkerEntry> {
        self.entries.iter().filter(|e| e.role == role).collect()
    }

    /// Entries whose alias appears in the lowercased prompt.
    pub fn match_aliases(&self, prompt: &str) -> Vec<&WorkerEntry> {
        let prompt = prompt.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.aliases.iter().any(|a| prompt.contains(a.as_str())))
            .collect()
    }
}

/// Rule-based decomposition over a worker directory.
///
/// - Explicit URLs fan out one task per URL across the scraper role.
/// - Exactly one alias match is a unicast dispatch.
/// - Several alias matches, or an "all"-style query with none, broadcast to
///   every worker of the (matched or default) role; aggregation then
///   tolerates any subset succeeding.
pub struct RuleDecomposer {
    directory: WorkerDirectory,
    /// Role broadcast to when the prompt names no worker explicitly.
    default_role: String,
    /// Role URL tasks are spread over.
    scraper_role: String,
}

impl RuleDecomposer {
    pub fn new(directory: WorkerDirectory, default_role: impl Into<String>) -> Self {
        Self {
            directory,
            default_role: default_role.into(),
            scraper_role: "scraper".to_string(),
        }
    }

    pub fn with_scraper_role(mut self, role: impl Into<String>) -> Self {
        self.scraper_role = role.into();
        self
    }

    fn broadcast_topic(role: &str) -> String {
        format!("{role}.broadcast")
    }

    fn url_tasks(&self, urls: &[String]) -> Vec<TaskSpec> {
        let scrapers = self.directory.workers_in_role(&self.scraper_role);
        if scrapers.is_empty() {
            return Vec::new();
        }
        let topic = Self::broadcast_topic(&self.scraper_role);
        urls.iter()
            .enumerate()
            .map(|(i, url)| {
                // Round-robin across the scraper pool.
                let entry = scrapers[i % scrapers.len()];
                TaskSpec::new(
                    Target::broadcast(topic.clone(), entry.id.clone()),
                    format!("scrape {url}"),
                )
            })
            .collect()
    }
}

impl Decomposer for RuleDecomposer {
    fn decompose(&self, request: &PromptRequest) -> Vec<TaskSpec> {
        if !request.urls.is_empty() {
            return self.url_tasks(&request.urls);
        }

        let matched = self.directory.match_aliases(&request.prompt);
        match matched.len() {
            0 => {
                // Ambiguous multi-target query: broadcast to the whole
                // default role.
                let recipients = self.directory.workers_in_role(&self.default_role);
                let topic = Self::broadcast_topic(&self.default_role);
                recipients
                    .iter()
                    .map(|e| {
                        TaskSpec::new(
                            Target::broadcast(topic.clone(), e.id.clone()),
                            request.prompt.clone(),
                        )
                    })
                    .collect()
            }
            1 => vec![TaskSpec::new(
                Target::unicast(matched[0].id.clone()),
                request.prompt.clone(),
            )],
            _ => {
                let topic = Self::broadcast_topic(&matched[0].role);
                matched
                    .iter()
                    .map(|e| {
                        TaskSpec::new(
                            Target::broadcast(topic.clone(), e.id.clone()),
                            request.prompt.clone(),
                        )
                    })
                    .collect()
            }
        }
    }
}
