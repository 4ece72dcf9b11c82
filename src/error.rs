use std::path::PathBuf;
use thiserror::Error;

/// Ошибка получения снимка конфигурации из источника
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("reverse proxy configuration is not available: {0}")]
    Unavailable(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML snapshot {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse JSON snapshot {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported snapshot format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// Ошибка сборки текста конфигурации.
///
/// Возникает только при внутреннем сбое форматирования, а не из-за данных:
/// повтор с теми же входными данными даст тот же результат.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to compose nginx configuration text: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Группа upstream'ов, к которой относится ошибка валидации
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Tcp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Tcp => write!(f, "tcp"),
        }
    }
}

/// Семантическая ошибка модели, найденная необязательной проверкой перед рендерингом
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream '{upstream}' not found for location '{location}'")]
    UnknownHttpUpstream { location: String, upstream: String },

    #[error("upstream '{upstream}' not found for stream server listening on {listen_port}")]
    UnknownTcpUpstream { listen_port: u16, upstream: String },

    #[error("{protocol} upstream '{name}' is defined more than once")]
    DuplicateUpstream { protocol: Protocol, name: String },

    #[error("{protocol} upstream '{name}' has no servers")]
    EmptyUpstream { protocol: Protocol, name: String },
}

/// Ошибка разбора ранее сгенерированного конфига
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unbalanced braces in '{0}' block")]
    Unbalanced(String),

    #[error("invalid directive '{0}'")]
    InvalidDirective(String),
}

/// Ошибка загрузки файла настроек
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Ошибка полного цикла генерации: источник -> проверка -> рендеринг
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Render(#[from] RenderError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
