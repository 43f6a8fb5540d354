//! The set of proxied routes, built from configuration.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use url::Url;

use crate::config::UpstreamRouteConfig;

/// Query parameters that carry credentials and are never forwarded.
pub const CREDENTIAL_PARAMS: [&str; 2] = ["username", "apikey"];

#[derive(Debug)]
pub struct UpstreamRoute {
    pub path: String,
    pub target: Url,
    pub required_params: Vec<String>,
    pub defaults: BTreeMap<String, String>,
    pub forward_params: Vec<String>,
    pub protected: bool,
    pub message: String,
    pub failure_message: String,
    pub extract: Option<String>,
    pub format_paragraphs: bool,
    pub passthrough: bool,
}

impl UpstreamRoute {
    pub fn from_config(config: &UpstreamRouteConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            path: config.path.clone(),
            target: Url::parse(&config.target)?,
            required_params: config.required_params.clone(),
            defaults: config.defaults.clone(),
            forward_params: config.forward_params.clone(),
            protected: config.protected,
            message: config.message.clone(),
            failure_message: config.failure_message.clone(),
            extract: config.extract.clone(),
            format_paragraphs: config.format_paragraphs,
            passthrough: config.passthrough,
        })
    }

    /// Required parameters the caller left out or sent empty, after defaults.
    pub fn missing_params(&self, supplied: &HashMap<String, String>) -> Vec<&str> {
        self.required_params
            .iter()
            .filter(|name| {
                let given = supplied.get(name.as_str()).is_some_and(|v| !v.trim().is_empty());
                !given && !self.defaults.contains_key(name.as_str())
            })
            .map(String::as_str)
            .collect()
    }

    /// Parameters to send upstream: defaults overlaid with caller values,
    /// credentials removed, restricted to `forward_params` when set.
    pub fn upstream_params(&self, supplied: &HashMap<String, String>) -> Vec<(String, String)> {
        let mut params = self.defaults.clone();
        for (k, v) in supplied {
            if v.trim().is_empty() && params.contains_key(k) {
                continue;
            }
            params.insert(k.clone(), v.clone());
        }

        params
            .into_iter()
            .filter(|(k, _)| !CREDENTIAL_PARAMS.contains(&k.as_str()))
            .filter(|(k, _)| self.forward_params.is_empty() || self.forward_params.contains(k))
            .collect()
    }
}

/// Routes keyed by public path.
#[derive(Debug, Default)]
pub struct Catalogue {
    routes: HashMap<String, Arc<UpstreamRoute>>,
}

impl Catalogue {
    /// Build from config. Entries that fail to parse are skipped with an error log;
    /// validation normally rejects them before this point.
    pub fn from_config(routes: &[UpstreamRouteConfig]) -> Self {
        let mut map = HashMap::with_capacity(routes.len());
        for config in routes {
            match UpstreamRoute::from_config(config) {
                Ok(route) => {
                    map.insert(route.path.clone(), Arc::new(route));
                }
                Err(e) => tracing::error!(
                    path = %config.path,
                    target = %config.target,
                    error = %e,
                    "Skipping upstream route with invalid target"
                ),
            }
        }
        Self { routes: map }
    }

    pub fn get(&self, path: &str) -> Option<Arc<UpstreamRoute>> {
        self.routes.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> UpstreamRoute {
        let config: UpstreamRouteConfig = toml::from_str(
            r#"
            path = "/api/ai/gpt3"
            target = "https://upstream.example/api/ai/gpt3"
            required_params = ["prompt", "content"]
            defaults = { content = "hai" }
            "#,
        )
        .unwrap();
        UpstreamRoute::from_config(&config).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_params_respect_defaults() {
        let route = route();
        assert_eq!(route.missing_params(&params(&[])), vec!["prompt"]);
        assert_eq!(route.missing_params(&params(&[("prompt", "  ")])), vec!["prompt"]);
        assert!(route.missing_params(&params(&[("prompt", "hi")])).is_empty());
    }

    #[test]
    fn test_upstream_params_strip_credentials() {
        let route = route();
        let out = route.upstream_params(&params(&[
            ("prompt", "hi"),
            ("content", ""),
            ("username", "alice"),
            ("apikey", "abc123"),
        ]));
        assert_eq!(
            out,
            vec![
                ("content".to_string(), "hai".to_string()),
                ("prompt".to_string(), "hi".to_string()),
            ]
        );
    }

    #[test]
    fn test_catalogue_lookup() {
        let config: UpstreamRouteConfig =
            toml::from_str("path = \"/api/x\"\ntarget = \"http://127.0.0.1:1/x\"").unwrap();
        let catalogue = Catalogue::from_config(&[config]);
        assert_eq!(catalogue.len(), 1);
        assert!(catalogue.get("/api/x").is_some());
        assert!(catalogue.get("/api/y").is_none());
    }
}
