use std::collections::HashMap;
use std::path::{Path, PathBuf};
use sha2::{Sha256, Digest};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use tracing::debug;

use crate::config::ParsingConfig;
use crate::error::{SmtraceError, Result};
use super::languages::{GoParser, LanguageParser};
use super::state_machine::{StateMachineGraph, TraceLimits};

/// Source code parser that delegates to language-specific front-ends
pub struct CodeParser {
    config: ParsingConfig,
    language_parsers: HashMap<String, Box<dyn LanguageParser + Send>>,
}

impl CodeParser {
    pub fn new(config: &ParsingConfig, limits: TraceLimits) -> Result<Self> {
        let mut language_parsers: HashMap<String, Box<dyn LanguageParser + Send>> = HashMap::new();
        let go_parser = GoParser::new(config, limits)?;
        language_parsers.insert(go_parser.language_name().to_string(), Box::new(go_parser));

        Ok(Self {
            config: config.clone(),
            language_parsers,
        })
    }

    /// List the files under `dir` that should be traced
    pub fn discover<P: AsRef<Path>>(&self, dir: P, ignore_patterns: &[String]) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let mut overrides = OverrideBuilder::new(dir);
        for pattern in ignore_patterns {
            overrides
                .add(&format!("!{}", pattern))
                .map_err(|e| SmtraceError::Config(format!("Invalid ignore pattern {}: {}", pattern, e)))?;
        }
        let overrides = overrides
            .build()
            .map_err(|e| SmtraceError::Config(e.to_string()))?;

        // Use ignore crate to respect .gitignore and custom patterns
        let walker = WalkBuilder::new(dir)
            .hidden(false)
            .git_ignore(true)
            .overrides(overrides)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| SmtraceError::FileSystem(e.to_string()))?;
            let path = entry.path();

            if path.is_file() && self.should_parse_file(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Parse and trace a single source file
    pub fn parse_file<P: AsRef<Path>>(&mut self, file_path: P) -> Result<StateMachineGraph> {
        let path = file_path.as_ref();
        let language = self.detect_language(path)?;

        // Read file content
        let source_content = std::fs::read_to_string(path)?;

        // Check file size
        if source_content.len() > self.config.max_file_size {
            return Err(SmtraceError::Parser(
                format!("File {} exceeds maximum size limit", path.display())
            ));
        }

        let mut graph = StateMachineGraph::new(path.to_path_buf(), self.calculate_hash(&source_content));

        let parser = self.language_parsers.get_mut(&language).ok_or_else(|| {
            SmtraceError::Parser(format!("No parser registered for {}", language))
        })?;
        for md in parser.parse(&source_content, path)? {
            graph.add_method(md);
        }

        debug!(
            "{}: {} steps, {} transitions",
            path.display(),
            graph.step_count(),
            graph.transition_count()
        );
        Ok(graph)
    }

    /// Determine if a file should be parsed based on configuration
    fn should_parse_file(&self, path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        if !self.config.file_extensions.iter().any(|e| e == extension) {
            return false;
        }

        let is_test = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with("_test.go"))
            .unwrap_or(false);
        !(self.config.skip_tests && is_test)
    }

    /// Detect programming language from file path
    fn detect_language(&self, path: &Path) -> Result<String> {
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            for (lang, parser) in &self.language_parsers {
                if parser.file_extensions().contains(&extension) {
                    return Ok(lang.clone());
                }
            }
        }

        Err(SmtraceError::Parser(
            format!("Could not detect language for file: {}", path.display())
        ))
    }

    /// Calculate SHA256 hash of content
    fn calculate_hash(&self, content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
