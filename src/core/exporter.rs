// src/core/exporter.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::OutputConfig;
use crate::error::{SmtraceError, Result};
use super::state_machine::{MethodDecl, StateMachineGraph};

/// Exported JSON document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExportMetadata>,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub project: String,
    pub generator: String,
    pub generated_at: DateTime<Utc>,
    pub file_count: usize,
    pub step_count: usize,
    pub transition_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub content_hash: String,
    pub methods: Vec<MethodDecl>,
}

impl From<&StateMachineGraph> for FileEntry {
    fn from(graph: &StateMachineGraph) -> Self {
        Self {
            path: graph.path.clone(),
            content_hash: graph.content_hash.clone(),
            methods: graph.methods.values().cloned().collect(),
        }
    }
}

/// Serializes traced graphs as JSON
pub struct GraphExporter {
    config: OutputConfig,
    project: String,
}

impl GraphExporter {
    pub fn new(config: &OutputConfig, project: &str) -> Result<Self> {
        if config.format != "json" {
            return Err(SmtraceError::Config(format!(
                "Unsupported output format: {}",
                config.format
            )));
        }
        Ok(Self {
            config: config.clone(),
            project: project.to_string(),
        })
    }

    pub fn document(&self, graphs: &[StateMachineGraph]) -> GraphDocument {
        let metadata = self.config.include_metadata.then(|| ExportMetadata {
            project: self.project.clone(),
            generator: format!("smtrace {}", env!("CARGO_PKG_VERSION")),
            generated_at: Utc::now(),
            file_count: graphs.len(),
            step_count: graphs.iter().map(|g| g.step_count()).sum(),
            transition_count: graphs.iter().map(|g| g.transition_count()).sum(),
        });

        GraphDocument {
            metadata,
            files: graphs.iter().map(FileEntry::from).collect(),
        }
    }

    pub fn render(&self, graphs: &[StateMachineGraph]) -> Result<String> {
        let document = self.document(graphs);
        let json = if self.config.pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(json)
    }

    pub fn write<P: AsRef<Path>>(&self, graphs: &[StateMachineGraph], path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render(graphs)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state_machine::{MethodKind, MethodTransition, TransitionTarget};
    use serde_json::Value;
    use tempfile::TempDir;

    fn sample_graph() -> StateMachineGraph {
        let mut md = MethodDecl::new("SMTest", "*SMTest", "s", "stepRun", MethodKind::Execution);
        md.add_transition(MethodTransition::to(TransitionTarget::Stop));
        let mut guarded = MethodTransition::to(TransitionTarget::Unknown);
        guarded.condition = Some("[s.ready]".to_string());
        md.add_transition(guarded);
        md.add_transition(MethodTransition::to(TransitionTarget::Dynamic("s.pick()".to_string())));

        let mut graph = StateMachineGraph::new(PathBuf::from("sm.go"), "abc123".to_string());
        graph.add_method(md);
        graph
    }

    fn output(include_metadata: bool) -> OutputConfig {
        OutputConfig {
            format: "json".to_string(),
            pretty: false,
            include_metadata,
        }
    }

    #[test]
    fn test_sentinels_are_exported_verbatim() {
        let exporter = GraphExporter::new(&output(false), "demo").unwrap();
        let json: Value = serde_json::from_str(&exporter.render(&[sample_graph()]).unwrap()).unwrap();

        assert!(json.get("metadata").is_none());
        let transitions = &json["files"][0]["methods"][0]["transitions"];
        assert_eq!(transitions[0]["target"], "<stop>");
        assert_eq!(transitions[1]["target"], "<unknown>");
        assert_eq!(transitions[1]["condition"], "[s.ready]");
        assert_eq!(transitions[2]["target"], "DYNAMIC s.pick()");
    }

    #[test]
    fn test_metadata_counts() {
        let exporter = GraphExporter::new(&output(true), "demo").unwrap();
        let document = exporter.document(&[sample_graph()]);
        let metadata = document.metadata.unwrap();

        assert_eq!(metadata.project, "demo");
        assert_eq!(metadata.file_count, 1);
        assert_eq!(metadata.step_count, 1);
        assert_eq!(metadata.transition_count, 3);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("graph.json");
        let exporter = GraphExporter::new(&output(true), "demo").unwrap();

        exporter.write(&[sample_graph()], &path).unwrap();

        let document: GraphDocument =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(document.files[0].content_hash, "abc123");
        assert_eq!(
            document.files[0].methods[0].transitions[0].target,
            TransitionTarget::Stop
        );
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let config = OutputConfig { format: "yaml".to_string(), ..output(true) };
        assert!(GraphExporter::new(&config, "demo").is_err());
    }
}
