//! HTTP server configuration types.
//!
//! `ServerConfig` holds the listener address and the write key.
//! `EndpointConfig` describes a single API endpoint for centralized routing.

use crate::config::FolioConfig;
use crate::errors::{FolioError, Result};
use crate::store::Entity;

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on.
    pub port: u16,
    /// Bind address (e.g. "0.0.0.0").
    pub host: String,
    /// Key required on write requests. Writes are refused when unset.
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".into(),
            api_key: None,
        }
    }
}

impl From<&FolioConfig> for ServerConfig {
    fn from(config: &FolioConfig) -> Self {
        Self {
            port: config.port,
            host: config.host.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

impl ServerConfig {
    /// Validate the configuration: the host must be set and a configured
    /// API key must not be blank.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(FolioError::Config("host is not set".into()));
        }
        if self.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(FolioError::Config("API key is set but blank".into()));
        }
        Ok(())
    }

    /// Returns the socket address string "host:port".
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// URL prefix of an entity's collection.
pub fn collection_path(entity: Entity) -> &'static str {
    match entity {
        Entity::Skill => "/api/skills",
        Entity::Project => "/api/projects",
        Entity::Education => "/api/education",
        Entity::WorkExperience => "/api/work-experiences",
        Entity::Article => "/api/articles",
        Entity::ArticleCategory => "/api/article-categories",
    }
}

/// Describes a single HTTP endpoint for centralized configuration.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// URL path template (e.g. "/api/skills/{id}").
    pub path: String,
    /// HTTP method.
    pub method: axum::http::Method,
    /// Human-readable description.
    pub description: String,
    /// Whether this endpoint requires an identity.
    pub requires_auth: bool,
}

impl EndpointConfig {
    fn new(path: impl Into<String>, method: axum::http::Method, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            description: description.into(),
            requires_auth: false,
        }
    }

    fn protected(mut self) -> Self {
        self.requires_auth = true;
        self
    }
}

/// Returns the full list of endpoint configurations for the server.
pub fn endpoint_configurations() -> Vec<EndpointConfig> {
    use axum::http::Method;

    let mut endpoints = vec![EndpointConfig::new("/health", Method::GET, "Health check")];

    for entity in [Entity::Skill, Entity::Project, Entity::Education, Entity::WorkExperience] {
        let base = collection_path(entity);
        let item = format!("{base}/{{id}}");
        let plural = entity.noun(true);
        let single = entity.noun(false);
        endpoints.push(EndpointConfig::new(base, Method::GET, format!("List {plural}")));
        endpoints.push(EndpointConfig::new(&item, Method::GET, format!("Get one {single}")));
        endpoints.push(EndpointConfig::new(&item, Method::PUT, format!("Update {single}")).protected());
        endpoints.push(EndpointConfig::new(&item, Method::DELETE, format!("Delete {single}")).protected());
    }

    let articles = collection_path(Entity::Article);
    let categories = collection_path(Entity::ArticleCategory);
    endpoints.extend([
        EndpointConfig::new(articles, Method::GET, "List articles, optionally by category_id"),
        EndpointConfig::new(format!("{articles}/{{slug}}"), Method::GET, "Get article by slug"),
        EndpointConfig::new(categories, Method::GET, "List article categories"),
        EndpointConfig::new(format!("{categories}/{{key}}"), Method::GET, "Get category by id or slug"),
    ]);
    endpoints
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Graceful shutdown timeout in seconds.
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 5;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
