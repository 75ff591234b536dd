//! Host-owned registry of loaded quest graphs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::EngineConfig;
use crate::graph::QuestGraph;
use crate::loader::{DocumentFormat, LoadReport, load_graph};
use crate::session::QuestSession;

/// Quest graphs keyed by internal name, shared with the sessions created from them.
#[derive(Debug, Default)]
pub struct QuestCatalog {
    quests: BTreeMap<String, Arc<QuestGraph>>,
    config: EngineConfig,
}

impl QuestCatalog {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            quests: BTreeMap::new(),
            config,
        }
    }

    /// Register a graph under its internal name, replacing any earlier one.
    pub fn register(&mut self, graph: QuestGraph) -> Arc<QuestGraph> {
        let graph = Arc::new(graph);
        let name = graph.internal_name().to_string();
        if self.quests.insert(name.clone(), Arc::clone(&graph)).is_some() {
            warn!("quest '{name}' registered twice; keeping the later one");
        }
        graph
    }

    pub fn get(&self, name: &str) -> Option<Arc<QuestGraph>> {
        self.quests.get(name).cloned()
    }

    /// Registered quest names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.quests.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }

    /// Create a fresh, not yet started session for a registered quest.
    pub fn new_session(&self, name: &str) -> Option<QuestSession> {
        self.get(name)
            .map(|graph| QuestSession::with_config(graph, self.config.clone()))
    }

    /// Load and register every quest document in `dir`.
    ///
    /// Files that fail to load are logged and skipped; files with unsupported
    /// extensions are ignored. Returns the load report of each registered quest.
    ///
    /// # Errors
    /// Returns an error only if the directory itself cannot be read.
    pub fn load_dir(&mut self, dir: &Path) -> Result<Vec<(String, LoadReport)>> {
        let mut paths = fs::read_dir(dir)
            .with_context(|| format!("reading quest directory '{}'", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && DocumentFormat::from_path(path).is_some())
            .collect::<Vec<_>>();
        paths.sort();

        let mut reports = Vec::new();
        for path in paths {
            match load_graph(&path) {
                Ok((graph, report)) => {
                    let graph = self.register(graph);
                    reports.push((graph.internal_name().to_string(), report));
                },
                Err(e) => warn!("skipping quest file '{}': {e:#}", path.display()),
            }
        }
        info!("{} quests registered from '{}'", reports.len(), dir.display());
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_share_the_registered_graph() {
        let mut catalog = QuestCatalog::default();
        let graph = catalog.register(QuestGraph::new("cave", "Cave", "start"));
        let session = catalog.new_session("cave").unwrap();
        assert!(std::ptr::eq(session.graph(), graph.as_ref()));
        assert!(catalog.new_session("forest").is_none());
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["cave"]);
    }
}
