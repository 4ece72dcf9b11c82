use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::SettingsError;

pub mod loader;
pub mod nginx_parser;
pub mod types;
pub mod validation;

pub use loader::{ConfigSource, FileSource, StaticSource};
pub use nginx_parser::{parse_config_content, parse_config_file, NginxConfig};
pub use types::*;
pub use validation::validate;

/// Настройки движка nginx, общие для всего конфига.
///
/// Значение по умолчанию соответствует стандартной установке nginx:
/// `/var/run/nginx.pid`, daemon включен, 512 соединений на воркер,
/// `server_names_hash_bucket_size 128`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineOptions {
    pub pid_file: String,
    pub daemon: bool,
    pub worker_connections: u32,
    pub server_names_hash_bucket_size: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            pid_file: "/var/run/nginx.pid".to_string(),
            daemon: true,
            worker_connections: 512,
            server_names_hash_bucket_size: 128,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: String, // json или text
    pub level: String,  // error, warn, info, debug, trace
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            level: "info".to_string(),
        }
    }
}

/// Настройки генератора, загружаемые из YAML файла
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub version: u32,
    pub engine: EngineOptions,
    pub logging: LoggingConfig,
    // Проверять ссылки на upstream'ы перед рендерингом
    pub validate_references: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            engine: EngineOptions::default(),
            logging: LoggingConfig::default(),
            validate_references: false,
        }
    }
}

impl Settings {
    /// Загружает настройки из YAML файла
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Сохраняет настройки в YAML файл
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
