//! Gateway configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.owpro/` by default) and
//! deserializes it into [`GatewayConfig`]. Falls back to defaults when the
//! file is missing or malformed, then layers environment overrides on top.

use std::path::{Path, PathBuf};

use owpro_types::config::GatewayConfig;

/// Resolve the data directory.
///
/// Priority: `OWPRO_DATA_DIR`, then `~/.owpro`, then `./.owpro`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("OWPRO_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".owpro");
    }

    PathBuf::from(".owpro")
}

/// Load configuration from `{data_dir}/config.toml` and the process
/// environment.
pub async fn load_gateway_config(data_dir: &Path) -> GatewayConfig {
    let config = load_config_file(data_dir).await;
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Load `{data_dir}/config.toml` without environment overrides.
///
/// - If the file does not exist, returns [`GatewayConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_config_file(data_dir: &Path) -> GatewayConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GatewayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GatewayConfig::default();
        }
    };

    match toml::from_str::<GatewayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GatewayConfig::default()
        }
    }
}

/// Layer environment variables over a loaded config.
///
/// Recognized: `OLLAMA_URL` (or `OLLAMA_HOST`), `OPENAI_BASE_URL`, `HOST`,
/// `PORT`, `FRONTEND_URL`. The API key itself is read when the remote
/// provider is built, from the variable named by `remote.api_key_env`.
pub fn apply_env_overrides(
    mut config: GatewayConfig,
    var: impl Fn(&str) -> Option<String>,
) -> GatewayConfig {
    let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty("OLLAMA_URL").or_else(|| non_empty("OLLAMA_HOST")) {
        config.local.base_url = normalize_base_url(&url);
    }
    if let Some(url) = non_empty("OPENAI_BASE_URL") {
        config.remote.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(host) = non_empty("HOST") {
        config.server.host = host;
    }
    if let Some(port) = non_empty("PORT") {
        match port.parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
        }
    }
    if let Some(origin) = non_empty("FRONTEND_URL") {
        config.server.frontend_url = Some(origin);
    }

    config
}

/// Accept both `http://host:port` and the bare `host:port` form Ollama uses.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.server.port, 3001);
        assert!(config.models.is_empty());
        assert_eq!(config.effective_models().len(), 4);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[local]
base_url = "http://gpu-box:11434"

[probe]
timeout_ms = 1000

[[models]]
id = "phi3"
provider_kind = "local"
context_window = 4096
max_tokens = 1024
temperature = 0.5
"#,
        )
        .await
        .unwrap();

        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.local.base_url, "http://gpu-box:11434");
        assert_eq!(config.probe.timeout_ms, 1000);
        assert_eq!(config.effective_models()[0].id, "phi3");
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.local.base_url, "http://localhost:11434");
    }

    #[test]
    fn env_overrides_replace_endpoints() {
        let config = apply_env_overrides(
            GatewayConfig::default(),
            env(&[
                ("OLLAMA_URL", "http://ollama:11434/"),
                ("OPENAI_BASE_URL", "https://proxy.example.com/v1/"),
                ("HOST", "0.0.0.0"),
                ("PORT", "8080"),
                ("FRONTEND_URL", "http://localhost:3000"),
            ]),
        );
        assert_eq!(config.local.base_url, "http://ollama:11434");
        assert_eq!(config.remote.base_url, "https://proxy.example.com/v1");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.frontend_url.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn ollama_host_without_scheme_gets_http() {
        let config = apply_env_overrides(
            GatewayConfig::default(),
            env(&[("OLLAMA_HOST", "127.0.0.1:11500")]),
        );
        assert_eq!(config.local.base_url, "http://127.0.0.1:11500");
    }

    #[test]
    fn ollama_url_wins_over_ollama_host() {
        let config = apply_env_overrides(
            GatewayConfig::default(),
            env(&[("OLLAMA_URL", "http://a:1"), ("OLLAMA_HOST", "b:2")]),
        );
        assert_eq!(config.local.base_url, "http://a:1");
    }

    #[test]
    fn invalid_port_is_ignored() {
        let config = apply_env_overrides(GatewayConfig::default(), env(&[("PORT", "http")]));
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn empty_values_are_ignored() {
        let config = apply_env_overrides(GatewayConfig::default(), env(&[("HOST", "  ")]));
        assert_eq!(config.server.host, "localhost");
    }
}
