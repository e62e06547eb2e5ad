//! Host tool registry assembly
//!
//! Decides which tools the host agent sees, based on the configuration,
//! the available API keys and the tool profile of the deployment.

use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::board::TaskBoardStore;
use crate::config::{SubAgentConfig, ToolsConfig};
use crate::error::Error;
use crate::subagent::{AgentBackend, SubAgentRunner};
use crate::tools::document::DownloadPdfText;
use crate::tools::research::{self, ScientificResearch, WebSearcherResearch};
use crate::tools::shell::ExecTool;
use crate::tools::task::TaskListTool;
use crate::tools::web::{has_serpapi_keys, BingWebSearch, BraveSearch, GoogleWebSearch};
use crate::tools::ToolRegistry;
use crate::usage::UsageLedger;

/// Which tool set a deployment exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolProfile {
    #[default]
    All,
    Telegram,
    /// Core search and task tools only
    Minimal,
}

impl ToolProfile {
    /// Bing, scientific research and PDF extraction are extended tools
    pub fn includes_extended(&self) -> bool {
        matches!(self, ToolProfile::All | ToolProfile::Telegram)
    }
}

impl FromStr for ToolProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(ToolProfile::All),
            "telegram" => Ok(ToolProfile::Telegram),
            "minimal" => Ok(ToolProfile::Minimal),
            other => Err(Error::Config(format!("unknown tool profile: {}", other))),
        }
    }
}

/// Builder for the host agent's tool registry
pub struct ToolsetBuilder {
    config: ToolsConfig,
    profile: ToolProfile,
    store: Arc<TaskBoardStore>,
    usage: Arc<UsageLedger>,
    backend: Option<Arc<dyn AgentBackend>>,
}

impl ToolsetBuilder {
    pub fn new(config: ToolsConfig, store: Arc<TaskBoardStore>, usage: Arc<UsageLedger>) -> Self {
        let profile = config.general.tool_profile.parse().unwrap_or_default();
        Self {
            config,
            profile,
            store,
            usage,
            backend: None,
        }
    }

    pub fn with_profile(mut self, profile: ToolProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Agent runtime used by the research sub-agents
    pub fn with_backend(mut self, backend: Arc<dyn AgentBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    fn runner(&self, agent: &SubAgentConfig, model_env: &str) -> Arc<SubAgentRunner> {
        let mut runner = SubAgentRunner::new(self.backend.clone(), self.usage.clone())
            .with_model_env(model_env)
            .with_max_turns(agent.max_turns);
        if let Some(model) = &agent.model {
            runner = runner.with_model(model.clone());
        }
        Arc::new(runner)
    }

    pub fn build(self) -> ToolRegistry {
        let config = &self.config;
        let extended = self.profile.includes_extended();
        let has_brave = config.brave.enabled && config.brave.get_api_key().is_some();
        let has_serpapi = has_serpapi_keys(&config.serpapi.get_api_key().unwrap_or_default());

        let mut registry = ToolRegistry::new();

        if config.exec.enabled {
            registry.register(Arc::new(ExecTool::new(config.exec.clone())));
        }
        registry.register(Arc::new(TaskListTool::new(self.store.clone())));

        if has_brave {
            registry.register(Arc::new(BraveSearch::new(config.brave.clone())));
        }
        if has_serpapi && config.serpapi.google_web_enabled {
            registry.register(Arc::new(GoogleWebSearch::new(config.serpapi.clone())));
        }
        if has_serpapi && config.serpapi.bing_web_enabled && extended {
            registry.register(Arc::new(BingWebSearch::new(config.serpapi.clone())));
        }

        let websearcher = &config.agents.websearcher;
        if websearcher.enabled && (has_brave || has_serpapi) {
            registry.register(Arc::new(WebSearcherResearch::new(
                self.runner(websearcher, research::websearcher::MODEL_ENV),
                config.brave.clone(),
                config.serpapi.clone(),
            )));
        }

        let scientific = &config.agents.scientific;
        if scientific.enabled && extended {
            registry.register(Arc::new(ScientificResearch::new(
                self.runner(scientific, research::scientific::MODEL_ENV),
                config.exec.clone(),
                config.pdf.clone(),
                config.serpapi.clone(),
            )));
        }

        if config.pdf.enabled && extended {
            registry.register(Arc::new(DownloadPdfText::new(config.pdf.clone())));
        }

        debug!(profile = ?self.profile, tools = ?registry.names(), "Built toolset");
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyless() -> ToolsConfig {
        let mut config = ToolsConfig::default();
        config.brave.api_key_env = "SCOUT_TEST_TOOLSET_BRAVE_UNSET".into();
        config.serpapi.api_key_env = "SCOUT_TEST_TOOLSET_SERP_UNSET".into();
        config
    }

    fn build(config: ToolsConfig, profile: ToolProfile) -> Vec<String> {
        ToolsetBuilder::new(
            config,
            Arc::new(TaskBoardStore::new()),
            Arc::new(UsageLedger::new()),
        )
        .with_profile(profile)
        .build()
        .names()
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("Telegram".parse::<ToolProfile>().unwrap(), ToolProfile::Telegram);
        assert_eq!("".parse::<ToolProfile>().unwrap(), ToolProfile::All);
        assert!("bogus".parse::<ToolProfile>().is_err());
    }

    #[test]
    fn test_without_keys() {
        let names = build(keyless(), ToolProfile::All);
        assert_eq!(
            names,
            vec!["download_pdf_as_text", "exec", "scientific_research", "task_list"]
        );
    }

    #[test]
    fn test_minimal_profile_with_keys() {
        let mut config = keyless();
        config.brave.api_key = Some("brave".into());
        config.serpapi.api_key = Some("a,b".into());
        let names = build(config, ToolProfile::Minimal);
        assert_eq!(
            names,
            vec![
                "brave_search",
                "exec",
                "search_google_web",
                "task_list",
                "websearcher_research"
            ]
        );
    }

    #[test]
    fn test_full_profile_with_keys() {
        let mut config = keyless();
        config.serpapi.api_key = Some("a".into());
        config.exec.enabled = false;
        let names = build(config, ToolProfile::Telegram);
        assert_eq!(
            names,
            vec![
                "download_pdf_as_text",
                "scientific_research",
                "search_bing_web",
                "search_google_web",
                "task_list",
                "websearcher_research"
            ]
        );
    }
}
