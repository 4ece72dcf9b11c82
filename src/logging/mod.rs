use tracing::info;
use tracing_subscriber::{filter::ParseError, EnvFilter};

use crate::config::LoggingConfig;

/// Формат вывода логов
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn from_config(format: &str) -> Self {
        if format.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Строит фильтр: `RUST_LOG` важнее уровня из конфигурации
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ParseError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level),
    }
}

/// Инициализирует систему логирования.
///
/// Записи крейта `log` попадают в тот же subscriber. Если глобальный
/// subscriber уже установлен, используется существующий.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ParseError> {
    let env_filter = build_filter(config)?;

    let result = match LogFormat::from_config(&config.format) {
        // JSON формат для production
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_current_span(false)
            .with_target(true)
            .try_init(),
        // Обычный текстовый формат для разработки
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .try_init(),
    };

    match result {
        Ok(_) => {
            info!("Logging initialized with level: {}, format: {}", config.level, config.format);
        }
        Err(_) => {
            // Логгер уже установлен, используем существующий
            info!("Global logger already set, using existing configuration");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_config() {
        assert_eq!(LogFormat::from_config("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_config("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_config("text"), LogFormat::Text);
        assert_eq!(LogFormat::from_config("pretty"), LogFormat::Text);
    }

    #[test]
    fn test_init_logging_twice() {
        let config = LoggingConfig {
            format: "text".to_string(),
            level: "debug".to_string(),
        };

        assert!(init_logging(&config).is_ok());
        // Повторная инициализация не является ошибкой
        assert!(init_logging(&config).is_ok());
    }
}
