pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod metrics;
pub mod render;

pub use config::{ConfigSource, EngineOptions, ReverseProxyConfig, Settings};
pub use error::{GenerateError, RenderError, SourceError, ValidationError};
pub use generator::ConfigGenerator;
pub use render::{render, render_to};
