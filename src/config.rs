use anyhow::{anyhow, bail, Context, Result};
use path_clean::PathClean;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = ".gensync.yml";

/// Parsed project configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Process-wide settings
    pub settings: SyncSettings,

    /// Projects in declaration order
    pub projects: Vec<ProjectConfig>,

    /// Directory that target roots are relative to
    pub root: PathBuf,
}

/// Synchronization settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SyncSettings {
    /// Append each generated file's `dir` under the target root
    #[serde(default, alias = "code.create.directories")]
    pub create_directories: bool,

    /// Base URI of the code-generation service
    #[serde(default = "default_api_uri")]
    pub api_uri: String,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// One (org, application, version) tuple
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProjectConfig {
    pub org: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub generators: Vec<GeneratorConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub name: String,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

/// How a target root is interpreted
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Decide from the path shape and the filesystem
    #[default]
    Auto,
    /// The root names a single file that is overwritten in place
    File,
    /// The root is a directory receiving one file per generated name
    Directory,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(from = "RawTarget")]
pub struct TargetConfig {
    pub path: String,
    pub kind: TargetKind,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Path(String),
    Detailed {
        path: String,
        #[serde(default)]
        kind: TargetKind,
    },
}

impl From<RawTarget> for TargetConfig {
    fn from(raw: RawTarget) -> Self {
        match raw {
            RawTarget::Path(path) => Self {
                path,
                kind: TargetKind::Auto,
            },
            RawTarget::Detailed { path, kind } => Self { path, kind },
        }
    }
}

impl TargetConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: TargetKind::Auto,
        }
    }

    pub fn with_kind(mut self, kind: TargetKind) -> Self {
        self.kind = kind;
        self
    }
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    settings: SyncSettings,
    #[serde(default)]
    projects: Vec<ProjectConfig>,
    /// Nested `org -> app -> {version, generators}` layout
    #[serde(default)]
    code: Option<Mapping>,
}

#[derive(Deserialize)]
struct LegacyApplication {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    generators: Mapping,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn default_api_uri() -> String {
    "https://api.apibuilder.io".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_version() -> String {
    "latest".to_string()
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            create_directories: false,
            api_uri: default_api_uri(),
            timeout: default_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut config = Self::from_yaml(&content, root)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.expand_paths()?;
        config.validate()?;

        tracing::debug!(
            "Loaded {} project(s) from {:?}",
            config.projects.len(),
            path
        );

        Ok(config)
    }

    /// Parse configuration text; `root` is the directory target roots are relative to
    pub fn from_yaml(content: &str, root: PathBuf) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(content)?;

        let mut projects = raw.projects;
        if let Some(code) = raw.code {
            projects.extend(legacy_projects(&code)?);
        }

        Ok(Self {
            settings: raw.settings,
            projects,
            root,
        })
    }

    /// Path of the config file in the current directory
    pub fn default_config_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Expand environment variables and `~` in target paths
    pub fn expand_paths(&mut self) -> Result<()> {
        for project in &mut self.projects {
            for generator in &mut project.generators {
                for target in &mut generator.targets {
                    target.path = shellexpand::full(&target.path)
                        .with_context(|| format!("Failed to expand target path: {}", target.path))?
                        .into_owned();
                }
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.projects.is_empty() {
            bail!("No projects configured");
        }

        for project in &self.projects {
            if project.org.trim().is_empty() || project.name.trim().is_empty() {
                bail!("Project entries need both an org and a name");
            }
            for generator in &project.generators {
                if generator.name.trim().is_empty() {
                    bail!(
                        "Generator without a name in project {}/{}",
                        project.org,
                        project.name
                    );
                }
                if generator.targets.is_empty() {
                    tracing::warn!(
                        "Generator {} in {}/{} has no targets",
                        generator.name,
                        project.org,
                        project.name
                    );
                }
            }
        }

        Ok(())
    }

    /// On-disk root for a configured target path
    pub fn target_root(&self, target: &TargetConfig) -> PathBuf {
        self.root.join(&target.path).clean()
    }
}

fn legacy_projects(code: &Mapping) -> Result<Vec<ProjectConfig>> {
    let mut projects = Vec::new();

    for (org, apps) in code {
        let org = key_string(org)?;
        let apps = apps
            .as_mapping()
            .ok_or_else(|| anyhow!("code.{} must be a mapping of applications", org))?;

        for (app, value) in apps {
            let name = key_string(app)?;
            let application: LegacyApplication = serde_yaml::from_value(value.clone())
                .with_context(|| format!("Invalid entry code.{}.{}", org, name))?;

            let mut generators = Vec::new();
            for (generator, targets) in &application.generators {
                let targets = match serde_yaml::from_value::<OneOrMany>(targets.clone())
                    .with_context(|| format!("Invalid targets for generator {:?}", generator))?
                {
                    OneOrMany::One(path) => vec![TargetConfig::new(path)],
                    OneOrMany::Many(paths) => paths.into_iter().map(TargetConfig::new).collect(),
                };
                generators.push(GeneratorConfig {
                    name: key_string(generator)?,
                    targets,
                });
            }

            projects.push(ProjectConfig {
                org: org.clone(),
                name,
                version: application.version,
                generators,
            });
        }
    }

    Ok(projects)
}

fn key_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(anyhow!("Expected a string key, found {:?}", other)),
    }
}

/// Restricts a run to matching projects
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub org: Option<String>,
    pub app: Option<String>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &ProjectConfig) -> bool {
        self.org.as_deref().map_or(true, |org| org == project.org)
            && self.app.as_deref().map_or(true, |app| app == project.name)
    }
}
