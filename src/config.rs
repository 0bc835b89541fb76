use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::state_machine::{MethodKind, TraceLimits};
use crate::error::{SmtraceError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Source code parsing configuration
    pub parsing: ParsingConfig,

    /// Rendering budgets for conditions and arguments
    #[serde(default)]
    pub trace: TraceConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Source directories to analyze
    pub source_dirs: Vec<PathBuf>,

    /// Directories to ignore
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// File extensions to parse
    pub file_extensions: Vec<String>,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,

    /// Skip `_test.go` files
    #[serde(default = "default_skip_tests")]
    pub skip_tests: bool,

    /// Parameter type name -> kind of the method declaring it
    #[serde(default = "default_context_types")]
    pub context_types: BTreeMap<String, MethodKind>,

    /// Methods whose returned step is the initial step of the machine
    #[serde(default = "default_declaration_methods")]
    pub declaration_methods: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Maximum length of a rendered guard condition
    pub max_condition_len: usize,

    /// Maximum length of a rendered call argument
    pub max_argument_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,

    /// Include metadata headers
    pub include_metadata: bool,
}

fn default_skip_tests() -> bool {
    true
}

fn default_context_types() -> BTreeMap<String, MethodKind> {
    [
        ("ExecutionContext", MethodKind::Execution),
        ("InitializationContext", MethodKind::Execution),
        ("SubroutineExitContext", MethodKind::Execution),
        ("MigrationContext", MethodKind::Migration),
        ("ConstructionContext", MethodKind::Construction),
    ]
    .into_iter()
    .map(|(name, kind)| (name.to_string(), kind))
    .collect()
}

fn default_declaration_methods() -> Vec<String> {
    vec!["GetInitStateFor".to_string()]
}

impl Default for TraceConfig {
    fn default() -> Self {
        let limits = TraceLimits::default();
        Self {
            max_condition_len: limits.max_condition_len,
            max_argument_len: limits.max_argument_len,
        }
    }
}

impl From<TraceConfig> for TraceLimits {
    fn from(config: TraceConfig) -> Self {
        Self {
            max_condition_len: config.max_condition_len,
            max_argument_len: config.max_argument_len,
        }
    }
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            file_extensions: vec!["go".to_string()],
            max_file_size: 1024 * 1024, // 1MB
            skip_tests: default_skip_tests(),
            context_types: default_context_types(),
            declaration_methods: default_declaration_methods(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                name: "Unnamed Project".to_string(),
                source_dirs: vec![PathBuf::from(".")],
                ignore_patterns: vec![
                    "vendor/".to_string(),
                    ".git/".to_string(),
                    "testdata/".to_string(),
                ],
            },
            parsing: ParsingConfig::default(),
            trace: TraceConfig::default(),
            output: OutputConfig {
                format: "json".to_string(),
                pretty: true,
                include_metadata: true,
            },
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| SmtraceError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SmtraceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Try common config file locations
                let candidates = [
                    "Smtrace.toml",
                    "smtrace.toml",
                    ".smtrace.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn limits(&self) -> TraceLimits {
        self.trace.into()
    }
}
