use log::{debug, error, info, warn};
use std::time::Instant;

use crate::config::{validate, ConfigSource, EngineOptions, ReverseProxyConfig, Settings};
use crate::error::GenerateError;
use crate::metrics::{self, RenderOutcome};
use crate::render::render;

/// Связывает источник снимков с рендерером.
///
/// Сначала получает снимок, затем (если включено) проверяет ссылки на
/// upstream'ы и только после этого рендерит. При ошибке источника рендеринг
/// не выполняется.
pub struct ConfigGenerator<S> {
    source: S,
    options: EngineOptions,
    validate_references: bool,
}

impl<S: ConfigSource> ConfigGenerator<S> {
    pub fn new(source: S, options: EngineOptions) -> Self {
        Self {
            source,
            options,
            validate_references: false,
        }
    }

    /// Создает генератор по настройкам из файла
    pub fn from_settings(source: S, settings: &Settings) -> Self {
        Self {
            source,
            options: settings.engine.clone(),
            validate_references: settings.validate_references,
        }
    }

    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_references = enabled;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Получает текущий снимок и рендерит его в текст конфига
    pub fn generate(&self) -> Result<String, GenerateError> {
        let config = match self.source.reverse_proxy_config() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to fetch reverse proxy configuration: {}", e);
                metrics::SOURCE_FAILURES.inc();
                metrics::record_outcome(RenderOutcome::SourceError);
                return Err(e.into());
            }
        };

        self.generate_from(&config)
    }

    /// Рендерит уже полученный снимок с настройками генератора
    pub fn generate_from(&self, config: &ReverseProxyConfig) -> Result<String, GenerateError> {
        if self.validate_references {
            if let Err(errors) = validate(config) {
                metrics::record_outcome(RenderOutcome::Invalid);
                return Err(GenerateError::Validation(errors));
            }
            debug!("Upstream references validated");
        }

        let started = Instant::now();
        let text = match render(&self.options, config) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to render nginx configuration: {}", e);
                metrics::record_outcome(RenderOutcome::RenderError);
                return Err(e.into());
            }
        };
        metrics::RENDER_DURATION.observe(started.elapsed().as_secs_f64());
        metrics::RENDERED_BYTES.set(text.len() as i64);
        metrics::record_outcome(RenderOutcome::Ok);

        info!(
            "Rendered nginx configuration: {} http server(s), {} http upstream(s), {} tcp server(s), {} tcp upstream(s), {} bytes",
            config.http_servers.len(),
            config.http_upstreams.len(),
            config.tcp_servers.len(),
            config.tcp_upstreams.len(),
            text.len()
        );

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpLocation, HttpServer, StaticSource};
    use crate::error::{SourceError, ValidationError};
    use std::cell::Cell;

    fn dangling_config() -> ReverseProxyConfig {
        ReverseProxyConfig {
            http_servers: vec![HttpServer::new(80).with_location(HttpLocation::proxy("/", "missing"))],
            ..Default::default()
        }
    }

    #[test]
    fn test_source_error_skips_render() {
        let fetches = Cell::new(0);
        let source = || -> Result<ReverseProxyConfig, SourceError> {
            fetches.set(fetches.get() + 1);
            Err(SourceError::Unavailable("no leader".to_string()))
        };
        let generator = ConfigGenerator::new(source, EngineOptions::default());

        let err = generator.generate().unwrap_err();
        assert!(matches!(err, GenerateError::Source(SourceError::Unavailable(_))));
        assert_eq!(fetches.get(), 1);
    }

    #[test]
    fn test_dangling_reference_renders_without_validation() {
        let generator =
            ConfigGenerator::new(StaticSource::new(dangling_config()), EngineOptions::default());

        let text = generator.generate().unwrap();
        assert!(text.contains("proxy_pass http://missing;"));
    }

    #[test]
    fn test_validation_rejects_dangling_reference() {
        let generator = ConfigGenerator::new(StaticSource::new(dangling_config()), EngineOptions::default())
            .with_validation(true);

        match generator.generate() {
            Err(GenerateError::Validation(errors)) => assert_eq!(
                errors,
                vec![ValidationError::UnknownHttpUpstream {
                    location: "/".to_string(),
                    upstream: "missing".to_string(),
                }]
            ),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        settings.engine.daemon = false;
        settings.validate_references = true;

        let generator = ConfigGenerator::from_settings(StaticSource::new(ReverseProxyConfig::default()), &settings);
        assert!(!generator.options().daemon);

        let text = generator.generate().unwrap();
        assert!(text.contains("daemon off;\n"));
    }
}
