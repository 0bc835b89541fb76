// src/core/engine.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Result;
use tracing::{info, warn, debug};

use crate::config::Config;
use crate::error::SmtraceError;
use super::{CodeParser, GraphExporter, StateMachineGraph};

const DEFAULT_CONFIG_FILE: &str = "smtrace.toml";

/// Main orchestration engine: discovers sources, traces them in parallel and exports the graphs
pub struct Engine {
    config: Arc<Config>,
}

impl Engine {
    /// Create a new engine instance from a configuration file, or the defaults
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;

        debug!("Loaded configuration: {:?}", config);

        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        Self { config: Arc::new(config) }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Trace the source tree and export the result to `output`, or stdout
    pub async fn trace(&self, source: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
        let source_dirs = match source {
            Some(dir) => vec![dir],
            None => self.config.project.source_dirs.clone(),
        };

        info!("🔍 Tracing state machines in {} source dir(s)...", source_dirs.len());
        let graphs = self.trace_sources(&source_dirs).await?;

        let steps: usize = graphs.iter().map(|g| g.step_count()).sum();
        let transitions: usize = graphs.iter().map(|g| g.transition_count()).sum();
        info!("📊 Trace complete:");
        info!("  - {} files with steps", graphs.len());
        info!("  - {} steps", steps);
        info!("  - {} transitions", transitions);

        let exporter = GraphExporter::new(&self.config.output, &self.config.project.name)?;
        match output {
            Some(path) => {
                exporter.write(&graphs, &path)?;
                info!("✅ Graph written to {}", path.display());
            }
            None => println!("{}", exporter.render(&graphs)?),
        }

        Ok(())
    }

    /// Parse every matching file under `source_dirs`, one blocking task per file.
    ///
    /// Files that fail to parse are reported and skipped. Files without any step
    /// are left out of the result.
    pub async fn trace_sources(&self, source_dirs: &[PathBuf]) -> Result<Vec<StateMachineGraph>> {
        let discovery = CodeParser::new(&self.config.parsing, self.config.limits())?;
        let mut files = Vec::new();
        for dir in source_dirs {
            let found = discovery.discover(dir, &self.config.project.ignore_patterns)?;
            debug!("Found {} candidate files in {}", found.len(), dir.display());
            files.extend(found);
        }

        let mut handles = Vec::with_capacity(files.len());
        for path in files {
            let config = Arc::clone(&self.config);
            handles.push(tokio::task::spawn_blocking(move || {
                let graph = CodeParser::new(&config.parsing, config.limits())
                    .and_then(|mut parser| parser.parse_file(&path));
                (path, graph)
            }));
        }

        let mut graphs = Vec::new();
        for handle in handles {
            let (path, result) = handle.await?;
            match result {
                Ok(graph) if graph.methods.is_empty() => {
                    debug!("No steps in {}", path.display());
                }
                Ok(graph) => graphs.push(graph),
                Err(e) => warn!("⚠️ Failed to trace {}: {}", path.display(), e),
            }
        }

        Ok(graphs)
    }

    /// Write a default configuration file into `path`
    pub async fn init(&self, path: Option<PathBuf>) -> Result<PathBuf> {
        let target_dir = match path {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        info!("Initializing smtrace in: {}", target_dir.display());

        let config_path = target_dir.join(DEFAULT_CONFIG_FILE);
        if config_path.exists() {
            return Err(SmtraceError::Config(format!(
                "{} already exists",
                config_path.display()
            ))
            .into());
        }

        std::fs::create_dir_all(&target_dir)?;
        Config::default().save(&config_path)?;
        info!("✅ Created {}", config_path.display());
        Ok(config_path)
    }
}
