use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use super::types::ReverseProxyConfig;
use crate::error::SourceError;

/// Источник текущего снимка топологии.
///
/// Каждый вызов возвращает полный неизменяемый снимок. Если снимок недоступен,
/// рендеринг не выполняется и ошибка передается вызывающему.
pub trait ConfigSource {
    fn reverse_proxy_config(&self) -> Result<ReverseProxyConfig, SourceError>;
}

impl<F> ConfigSource for F
where
    F: Fn() -> Result<ReverseProxyConfig, SourceError>,
{
    fn reverse_proxy_config(&self) -> Result<ReverseProxyConfig, SourceError> {
        self()
    }
}

/// Источник с заранее заданным снимком или заранее заданной ошибкой
#[derive(Debug, Clone)]
pub struct StaticSource {
    snapshot: Result<ReverseProxyConfig, String>,
}

impl StaticSource {
    pub fn new(config: ReverseProxyConfig) -> Self {
        Self { snapshot: Ok(config) }
    }

    /// Источник, который всегда сообщает, что снимок недоступен
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            snapshot: Err(reason.into()),
        }
    }
}

impl ConfigSource for StaticSource {
    fn reverse_proxy_config(&self) -> Result<ReverseProxyConfig, SourceError> {
        self.snapshot
            .clone()
            .map_err(SourceError::Unavailable)
    }
}

/// Формат файла со снимком, определяется по расширению
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotFormat {
    Yaml,
    Json,
}

impl SnapshotFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Читает снимок из YAML или JSON файла при каждом запросе
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn reverse_proxy_config(&self) -> Result<ReverseProxyConfig, SourceError> {
        let format = SnapshotFormat::from_path(&self.path)
            .ok_or_else(|| SourceError::UnsupportedFormat(self.path.clone()))?;

        // Отсутствующий файл означает, что состояние еще не готово
        if !self.path.exists() {
            return Err(SourceError::Unavailable(format!(
                "snapshot file {} does not exist yet",
                self.path.display()
            )));
        }

        let content = fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;

        let config: ReverseProxyConfig = match format {
            SnapshotFormat::Yaml => serde_yaml::from_str(&content).map_err(|source| SourceError::Yaml {
                path: self.path.clone(),
                source,
            })?,
            SnapshotFormat::Json => serde_json::from_str(&content).map_err(|source| SourceError::Json {
                path: self.path.clone(),
                source,
            })?,
        };

        debug!(
            "Loaded snapshot from {}: {} http server(s), {} tcp server(s)",
            self.path.display(),
            config.http_servers.len(),
            config.tcp_servers.len()
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TcpServer;
    use tempfile::tempdir;

    #[test]
    fn test_static_source() {
        let config = ReverseProxyConfig {
            tcp_servers: vec![TcpServer::new(9001, "foo")],
            ..Default::default()
        };
        let source = StaticSource::new(config.clone());
        assert_eq!(source.reverse_proxy_config().unwrap(), config);

        let source = StaticSource::unavailable("state not ready");
        let err = source.reverse_proxy_config().unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(reason) if reason == "state not ready"));
    }

    #[test]
    fn test_closure_source() {
        let closure = || -> Result<ReverseProxyConfig, SourceError> { Ok(ReverseProxyConfig::default()) };
        assert!(closure.reverse_proxy_config().unwrap().is_empty());

        let failing = || -> Result<ReverseProxyConfig, SourceError> {
            Err(SourceError::Unavailable("down".to_string()))
        };
        assert!(failing.reverse_proxy_config().is_err());
    }

    #[test]
    fn test_file_source_yaml_and_json() {
        let temp_dir = tempdir().unwrap();

        let yaml_path = temp_dir.path().join("snapshot.yaml");
        fs::write(
            &yaml_path,
            "tcp_servers:\n  - listen_port: 9001\n    upstream: foo\n",
        )
        .unwrap();
        let config = FileSource::new(&yaml_path).reverse_proxy_config().unwrap();
        assert_eq!(config.tcp_servers, vec![TcpServer::new(9001, "foo")]);

        let json_path = temp_dir.path().join("snapshot.json");
        fs::write(&json_path, r#"{"tcp_servers":[{"listen_port":9001,"upstream":"foo"}]}"#).unwrap();
        assert_eq!(FileSource::new(&json_path).reverse_proxy_config().unwrap(), config);
    }

    #[test]
    fn test_file_source_errors() {
        let temp_dir = tempdir().unwrap();

        let missing = FileSource::new(temp_dir.path().join("missing.yaml"));
        assert!(matches!(
            missing.reverse_proxy_config(),
            Err(SourceError::Unavailable(_))
        ));

        let toml = FileSource::new(temp_dir.path().join("snapshot.toml"));
        assert!(matches!(
            toml.reverse_proxy_config(),
            Err(SourceError::UnsupportedFormat(_))
        ));

        let broken_path = temp_dir.path().join("broken.json");
        fs::write(&broken_path, "{ not json").unwrap();
        assert!(matches!(
            FileSource::new(&broken_path).reverse_proxy_config(),
            Err(SourceError::Json { .. })
        ));
    }
}
