use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use log::info;

/// Количество попыток генерации по результату (ok, source_error, invalid, render_error)
pub static RENDERS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "nginx_config_renders_total",
        "Total nginx configuration generation attempts",
        &["result"]
    )
    .expect("Failed to register nginx_config_renders_total metric")
});

/// Длительность рендеринга
pub static RENDER_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "nginx_config_render_duration_seconds",
        "nginx configuration render duration in seconds"
    )
    .expect("Failed to register nginx_config_render_duration_seconds metric")
});

/// Сбои получения снимка из источника
pub static SOURCE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "nginx_config_source_failures_total",
        "Total failures to fetch the reverse proxy configuration snapshot"
    )
    .expect("Failed to register nginx_config_source_failures_total metric")
});

/// Размер последнего сгенерированного конфига
pub static RENDERED_BYTES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "nginx_config_rendered_bytes",
        "Size of the last rendered nginx configuration in bytes"
    )
    .expect("Failed to register nginx_config_rendered_bytes metric")
});

/// Результат генерации для метки `result`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Ok,
    SourceError,
    Invalid,
    RenderError,
}

impl RenderOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderOutcome::Ok => "ok",
            RenderOutcome::SourceError => "source_error",
            RenderOutcome::Invalid => "invalid",
            RenderOutcome::RenderError => "render_error",
        }
    }
}

pub fn record_outcome(outcome: RenderOutcome) {
    RENDERS_TOTAL.with_label_values(&[outcome.as_str()]).inc();
}

/// Инициализация метрик
pub fn init_metrics() {
    Lazy::force(&RENDERS_TOTAL);
    Lazy::force(&RENDER_DURATION);
    Lazy::force(&SOURCE_FAILURES);
    Lazy::force(&RENDERED_BYTES);

    info!("Prometheus metrics initialized");
    info!("Available metrics:");
    info!("  - nginx_config_renders_total");
    info!("  - nginx_config_render_duration_seconds");
    info!("  - nginx_config_source_failures_total");
    info!("  - nginx_config_rendered_bytes");
}
