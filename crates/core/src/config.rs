//! Configuration management for civic-rag.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (.civic/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Credentials never live in the config file. Backends name the environment
//! variable that holds a credential, and the value is resolved once at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Known embedding backends.
pub const EMBEDDING_PROVIDERS: [&str; 4] = ["azure", "openai", "ollama", "mock"];

/// Known generation backends.
pub const GENERATION_PROVIDERS: [&str; 3] = ["azure", "openai", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .civic/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Ranking settings shared by both collections
    pub retrieval: RetrievalConfig,

    /// Per-collection document source and embedding backend
    pub collections: CollectionsConfig,

    /// Completion backend used for partial and fused answers
    pub generation: GenerationConfig,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Socket address to bind (e.g., "0.0.0.0:8001")
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Load both collections before accepting requests
    #[serde(default = "default_true")]
    pub preload: bool,
}

/// Ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Documents kept per collection
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Optional relevance floor; results scoring below it are dropped
    #[serde(default)]
    pub min_score: Option<f32>,
}

/// The fixed `{collection -> source, backend}` record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionsConfig {
    /// Municipal-council decisions
    pub legislative: CollectionConfig,

    /// Public-service descriptions
    pub service: CollectionConfig,
}

/// Document source and embedding backend of one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfig {
    /// CSV file holding the records and their precomputed embeddings
    pub source: PathBuf,

    /// Column holding the text-encoded embedding
    #[serde(default)]
    pub embedding_column: Option<String>,

    /// Column holding the record identifier
    #[serde(default)]
    pub id_column: Option<String>,

    /// Expected embedding dimension (inferred from the data when absent)
    #[serde(default)]
    pub dimension: Option<usize>,

    /// Backend used to embed queries for this collection
    pub embedding: EmbeddingBackendConfig,
}

/// Remote embedding backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingBackendConfig {
    /// Provider name: "azure", "openai", "ollama", "mock"
    pub provider: String,

    /// Endpoint URL given inline
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the endpoint URL
    #[serde(default)]
    pub endpoint_env: Option<String>,

    /// Environment variable holding the credential
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Model identifier, when the backend needs one
    #[serde(default)]
    pub model: Option<String>,

    /// Dimension produced by the mock backend
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Maximum attempts when the service signals rate limiting
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait applied when a rate-limit response carries no Retry-After
    #[serde(default = "default_retry_after_secs")]
    pub default_retry_after_secs: u64,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Completion backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Provider name: "azure", "openai", "ollama"
    pub provider: String,

    /// Model or deployment name
    pub model: String,

    /// Endpoint URL given inline
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the endpoint URL
    #[serde(default)]
    pub endpoint_env: Option<String>,

    /// Environment variable holding the credential
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Azure API version given inline
    #[serde(default)]
    pub api_version: Option<String>,

    /// Environment variable holding the Azure API version
    #[serde(default)]
    pub api_version_env: Option<String>,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Per-request timeout
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    server: Option<ServerConfig>,
    retrieval: Option<RetrievalConfig>,
    collections: Option<CollectionsConfig>,
    generation: Option<GenerationConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

fn default_bind() -> String {
    "0.0.0.0:8001".to_string()
}

fn default_true() -> bool {
    true
}

fn default_top_k() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_after_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_generation_timeout_secs() -> u64 {
    120
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            preload: true,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: None,
        }
    }
}

impl EmbeddingBackendConfig {
    /// Azure-style backend reading endpoint and key from the given variables.
    pub fn azure(endpoint_env: &str, api_key_env: &str) -> Self {
        Self {
            provider: "azure".to_string(),
            endpoint: None,
            endpoint_env: Some(endpoint_env.to_string()),
            api_key_env: Some(api_key_env.to_string()),
            model: None,
            dimensions: None,
            max_attempts: default_max_attempts(),
            default_retry_after_secs: default_retry_after_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Resolve the endpoint: inline value first, then the named variable.
    pub fn resolve_endpoint(&self) -> Option<String> {
        resolve_inline_or_env(self.endpoint.as_deref(), self.endpoint_env.as_deref())
    }

    /// Resolve the credential from its environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_inline_or_env(None, self.api_key_env.as_deref())
    }
}

impl GenerationConfig {
    /// Resolve the endpoint: inline value first, then the named variable.
    pub fn resolve_endpoint(&self) -> Option<String> {
        resolve_inline_or_env(self.endpoint.as_deref(), self.endpoint_env.as_deref())
    }

    /// Resolve the credential from its environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_inline_or_env(None, self.api_key_env.as_deref())
    }

    /// Resolve the Azure API version.
    pub fn resolve_api_version(&self) -> Option<String> {
        resolve_inline_or_env(self.api_version.as_deref(), self.api_version_env.as_deref())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "azure".to_string(),
            model: "gpt-4o".to_string(),
            endpoint: None,
            endpoint_env: Some("ENDPOINT_URL_4o".to_string()),
            api_key_env: Some("API_KEY_4o".to_string()),
            api_version: None,
            api_version_env: Some("API_VERSION".to_string()),
            temperature: None,
            max_tokens: None,
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            legislative: CollectionConfig {
                source: PathBuf::from("data/hcl_summarized_with_embeddings.csv"),
                embedding_column: None,
                id_column: None,
                dimension: None,
                embedding: EmbeddingBackendConfig::azure("ENDPOINT_URL", "API_KEY"),
            },
            service: CollectionConfig {
                source: PathBuf::from("data/ServicesEmbedings.csv"),
                embedding_column: None,
                id_column: None,
                dimension: None,
                embedding: EmbeddingBackendConfig::azure("ENDPOINT_URL_SERV", "API_KEY_SERV"),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            server: ServerConfig::default(),
            retrieval: RetrievalConfig::default(),
            collections: CollectionsConfig::default(),
            generation: GenerationConfig::default(),
            log_level: None,
            log_json: false,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and the environment.
    ///
    /// Environment variables:
    /// - `CIVIC_WORKSPACE`: Override workspace path
    /// - `CIVIC_CONFIG`: Path to config file
    /// - `CIVIC_BIND`: Server bind address
    /// - `CIVIC_TOP_K`: Documents kept per collection
    /// - `CIVIC_LEGISLATIVE_CSV` / `CIVIC_SERVICE_CSV`: Document sources
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use civic_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace and config file
    /// taking precedence over `CIVIC_WORKSPACE` and `CIVIC_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var_os("CIVIC_WORKSPACE").map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        if let Some(config_file) =
            config_file.or_else(|| std::env::var_os("CIVIC_CONFIG").map(PathBuf::from))
        {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.civic_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(bind) = std::env::var("CIVIC_BIND") {
            config.server.bind = bind;
        }

        if let Ok(top_k) = std::env::var("CIVIC_TOP_K") {
            config.retrieval.top_k = top_k.parse().map_err(|e| {
                AppError::Config(format!("Invalid CIVIC_TOP_K '{}': {}", top_k, e))
            })?;
        }

        if let Ok(path) = std::env::var("CIVIC_LEGISLATIVE_CSV") {
            config.collections.legislative.source = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("CIVIC_SERVICE_CSV") {
            config.collections.service.source = PathBuf::from(path);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        config.resolve_relative_paths();

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(server) = config_file.server {
            result.server = server;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(collections) = config_file.collections {
            result.collections = collections;
        }

        if let Some(generation) = config_file.generation {
            result.generation = generation;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        tracing::debug!("Merged configuration from {:?}", path);

        Ok(result)
    }

    /// Relative document sources are resolved against the workspace.
    fn resolve_relative_paths(&mut self) {
        for collection in [
            &mut self.collections.legislative,
            &mut self.collections.service,
        ] {
            if collection.source.is_relative() {
                collection.source = self.workspace.join(&collection.source);
            }
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        bind: Option<String>,
        top_k: Option<usize>,
        log_level: Option<String>,
        log_json: bool,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(bind) = bind {
            self.server.bind = bind;
        }

        if let Some(top_k) = top_k {
            self.retrieval.top_k = top_k;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if log_json {
            self.log_json = true;
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .civic directory.
    pub fn civic_dir(&self) -> PathBuf {
        self.workspace.join(".civic")
    }

    /// Validate settings every command relies on: `top_k`, provider names
    /// and retry bounds.
    ///
    /// Missing document sources are only logged: an unreadable source leaves
    /// its collection empty at runtime rather than failing startup.
    pub fn validate(&self) -> AppResult<()> {
        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        for (name, collection) in self.named_collections() {
            validate_embedding_backend(name, &collection.embedding)?;

            if !collection.source.exists() {
                tracing::warn!(
                    "Document source for '{}' not found at {:?}; collection will be empty",
                    name,
                    collection.source
                );
            }
        }

        let generation = &self.generation;
        if !GENERATION_PROVIDERS.contains(&generation.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown generation provider: {}. Supported: {}",
                generation.provider,
                GENERATION_PROVIDERS.join(", ")
            )));
        }

        Ok(())
    }

    /// Check that credentials and endpoints of the remote backends resolve.
    ///
    /// Only needed by commands that embed queries or generate answers.
    pub fn validate_credentials(&self) -> AppResult<()> {
        for (name, collection) in self.named_collections() {
            let backend = &collection.embedding;
            match backend.provider.as_str() {
                "azure" | "openai" => {
                    require_env(backend.api_key_env.as_deref(), name)?;
                    // openai falls back to the public embeddings URL
                    if backend.provider == "azure" && backend.resolve_endpoint().is_none() {
                        return Err(AppError::Config(format!(
                            "Embedding backend for '{}' has no endpoint",
                            name
                        )));
                    }
                }
                _ => {}
            }
        }

        let generation = &self.generation;
        if generation.provider != "ollama" {
            require_env(generation.api_key_env.as_deref(), "generation")?;
        }

        if generation.provider == "azure" && generation.resolve_endpoint().is_none() {
            return Err(AppError::Config(
                "Azure generation backend requires an endpoint".to_string(),
            ));
        }

        Ok(())
    }

    fn named_collections(&self) -> [(&'static str, &CollectionConfig); 2] {
        [
            ("legislative", &self.collections.legislative),
            ("service", &self.collections.service),
        ]
    }
}

fn validate_embedding_backend(collection: &str, backend: &EmbeddingBackendConfig) -> AppResult<()> {
    if !EMBEDDING_PROVIDERS.contains(&backend.provider.as_str()) {
        return Err(AppError::Config(format!(
            "Unknown embedding provider for '{}': {}. Supported: {}",
            collection,
            backend.provider,
            EMBEDDING_PROVIDERS.join(", ")
        )));
    }

    if backend.max_attempts == 0 {
        return Err(AppError::Config(format!(
            "maxAttempts for '{}' must be at least 1",
            collection
        )));
    }

    Ok(())
}

fn require_env(var: Option<&str>, owner: &str) -> AppResult<()> {
    let var = var.ok_or_else(|| {
        AppError::Config(format!("No apiKeyEnv configured for '{}'", owner))
    })?;

    if std::env::var(var).is_err() {
        return Err(AppError::Config(format!(
            "API key for '{}' not found in environment variable: {}",
            owner, var
        )));
    }

    Ok(())
}

fn resolve_inline_or_env(inline: Option<&str>, env: Option<&str>) -> Option<String> {
    inline
        .map(str::to_string)
        .or_else(|| env.and_then(|var| std::env::var(var).ok()))
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.server.bind, "0.0.0.0:8001");
        assert_eq!(config.generation.model, "gpt-4o");
        assert_eq!(config.collections.legislative.embedding.max_attempts, 5);
        assert_eq!(
            config.collections.service.embedding.api_key_env.as_deref(),
            Some("API_KEY_SERV")
        );
        assert!(!config.verbose);
    }

    #[test]
    fn test_civic_dir() {
        let config = AppConfig::default();
        assert!(config.civic_dir().ends_with(".civic"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("127.0.0.1:9000".to_string()),
            Some(3),
            None,
            false,
            true,
            false,
        );

        assert_eq!(overridden.server.bind, "127.0.0.1:9000");
        assert_eq!(overridden.retrieval.top_k, 3);
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
retrieval:
  topK: 3
  minScore: 0.2
collections:
  legislative:
    source: data/hcl.csv
    dimension: 2
    embedding:
      provider: mock
      dimensions: 2
  service:
    source: data/services.csv
    embeddingColumn: embedding
    embedding:
      provider: ollama
      endpoint: http://localhost:11434
      model: nomic-embed-text
      maxAttempts: 2
logging:
  level: warn
  json: true
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.retrieval.top_k, 3);
        assert_eq!(merged.retrieval.min_score, Some(0.2));
        assert_eq!(merged.collections.legislative.dimension, Some(2));
        assert_eq!(merged.collections.service.embedding.max_attempts, 2);
        assert_eq!(merged.collections.service.embedding.default_retry_after_secs, 10);
        assert_eq!(
            merged.collections.service.embedding_column.as_deref(),
            Some("embedding")
        );
        assert_eq!(merged.log_level.as_deref(), Some("warn"));
        assert!(merged.log_json);
    }

    #[test]
    fn test_load_from_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("civic.yaml");
        std::fs::write(&path, "server:\n  preload: false\n").unwrap();

        let config =
            AppConfig::load_from(Some(temp.path().to_path_buf()), Some(path.clone())).unwrap();
        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.config_file, Some(path));
        assert!(!config.server.preload);
        assert!(config.collections.legislative.source.starts_with(temp.path()));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = AppConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_local_backends() {
        let mut config = AppConfig::default();
        config.collections.legislative.embedding.provider = "mock".to_string();
        config.collections.service.embedding.provider = "ollama".to_string();
        config.generation.provider = "ollama".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_credentials_only_fail_credential_check() {
        let mut config = AppConfig::default();
        config.collections.legislative.embedding.api_key_env =
            Some("CIVIC_TEST_UNSET_KEY".to_string());
        config.generation.provider = "ollama".to_string();

        assert!(config.validate().is_ok());
        let err = config.validate_credentials().unwrap_err();
        assert!(err.to_string().contains("CIVIC_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_openai_embedding_without_endpoint_is_valid() {
        std::env::set_var("CIVIC_TEST_OPENAI_EMBED_KEY", "sk-test");
        let mut config = AppConfig::default();
        for collection in [
            &mut config.collections.legislative,
            &mut config.collections.service,
        ] {
            collection.embedding.provider = "openai".to_string();
            collection.embedding.endpoint = None;
            collection.embedding.endpoint_env = Some("CIVIC_TEST_UNSET_ENDPOINT".to_string());
            collection.embedding.api_key_env = Some("CIVIC_TEST_OPENAI_EMBED_KEY".to_string());
        }
        config.generation.provider = "ollama".to_string();

        assert!(config.validate_credentials().is_ok());

        config.collections.service.embedding.provider = "azure".to_string();
        let err = config.validate_credentials().unwrap_err();
        assert!(err.to_string().contains("no endpoint"));
    }

    #[test]
    fn test_validate_unknown_embedding_provider() {
        let mut config = AppConfig::default();
        config.collections.service.embedding.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_endpoint_prefers_inline() {
        let mut backend = EmbeddingBackendConfig::azure("CIVIC_TEST_UNSET_ENDPOINT", "KEY");
        assert_eq!(backend.resolve_endpoint(), None);

        backend.endpoint = Some("https://example.test/embeddings".to_string());
        assert_eq!(
            backend.resolve_endpoint().as_deref(),
            Some("https://example.test/embeddings")
        );
    }
}
