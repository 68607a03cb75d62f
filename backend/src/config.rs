use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

const DEFAULT_CONFIG_PATH: &str = "config/app.yaml";

/// How the (1, H, W) tensor is laid out before it is handed to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    Nhw,
    Nhwc,
    #[default]
    Nchw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: Vec<ModelSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub path: PathBuf,
    /// Apply softmax to the raw output. Leave off for models that already end in one.
    #[serde(default)]
    pub softmax: bool,
    #[serde(default)]
    pub layout: ChannelLayout,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            models: vec![
                ModelSpec {
                    name: "Model 1".to_string(),
                    path: PathBuf::from("Models/CKD_Pred_Model_V_1.pt"),
                    softmax: false,
                    layout: ChannelLayout::default(),
                },
                ModelSpec {
                    name: "Model 2".to_string(),
                    path: PathBuf::from("Models/CKD_Pred_Model_V_2.pt"),
                    softmax: false,
                    layout: ChannelLayout::default(),
                },
            ],
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let frontend_dir = if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            PathBuf::from(format!("{}/../frontend/dist", manifest_dir))
        } else {
            PathBuf::from("frontend/dist")
        };

        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            frontend_dir,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Reads `APP_CONFIG` (or `config/app.yaml`), then applies environment
    /// overrides. A missing default file falls back to built-in defaults.
    /// Returns the file that was actually read, if any.
    pub fn load() -> Result<(Self, Option<PathBuf>), ConfigError> {
        let explicit = std::env::var("APP_CONFIG").ok();
        let path = PathBuf::from(explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));

        let (mut config, source) = if explicit.is_some() || path.exists() {
            (Self::from_file(&path)?, Some(path))
        } else {
            (Self::default(), None)
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok((config, source))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(config_str)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::Env {
                key: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(dir) = lookup("FRONTEND_DIR") {
            self.server.frontend_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("MODELS_DIR") {
            let root = PathBuf::from(dir);
            for model in self.models.iter_mut().filter(|m| m.path.is_relative()) {
                if let Some(file_name) = model.path.file_name() {
                    model.path = root.join(file_name);
                }
            }
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_point_at_both_models() {
        let config = AppConfig::default();
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[0].name, "Model 1");
        assert!(config.models[1].path.ends_with("CKD_Pred_Model_V_2.pt"));
        assert_eq!(config.bind_address(), "0.0.0.0:8081");
    }

    #[test]
    fn yaml_fills_missing_sections_with_defaults() {
        let config = AppConfig::from_yaml(
            r#"
server:
  port: 9000
models:
  - name: Baseline
    path: /srv/models/a.pt
    softmax: true
    layout: nhwc
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.models.len(), 1);
        assert!(config.models[0].softmax);
        assert_eq!(config.models[0].layout, ChannelLayout::Nhwc);
    }

    #[test]
    fn unknown_layout_is_rejected() {
        let err = AppConfig::from_yaml("models:\n  - name: x\n    path: x.pt\n    layout: chw\n");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn env_overrides_port_and_reroots_relative_models() {
        let vars = env(&[("PORT", "7000"), ("MODELS_DIR", "/opt/ckd")]);
        let mut config = AppConfig::default();
        config.models[1].path = PathBuf::from("/abs/keep.pt");

        config.apply_overrides(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(
            config.models[0].path,
            PathBuf::from("/opt/ckd/CKD_Pred_Model_V_1.pt")
        );
        assert_eq!(config.models[1].path, PathBuf::from("/abs/keep.pt"));
    }

    #[test]
    fn bad_port_is_an_error() {
        let vars = env(&[("PORT", "eighty")]);
        let mut config = AppConfig::default();
        let err = config.apply_overrides(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "PORT", .. }));
    }
}
