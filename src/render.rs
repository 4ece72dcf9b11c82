use std::fmt::{self, Write};

use crate::config::{EngineOptions, HttpLocation, HttpServer, ReverseProxyConfig, StaticResponse, UpstreamServer};
use crate::error::RenderError;

const INDENT: &str = "    ";

/// Собирает полный текст конфига nginx из настроек движка и снимка топологии.
///
/// Функция чистая: одинаковые входные данные всегда дают побайтово одинаковый
/// результат. Ссылки на upstream'ы не проверяются и выводятся как есть.
/// При ошибке частичный результат не возвращается.
pub fn render(options: &EngineOptions, config: &ReverseProxyConfig) -> Result<String, RenderError> {
    let mut out = String::with_capacity(estimate_capacity(config));
    render_to(&mut out, options, config)?;
    Ok(out)
}

/// То же, что [`render`], но пишет в переданный буфер
pub fn render_to<W: Write>(
    out: &mut W,
    options: &EngineOptions,
    config: &ReverseProxyConfig,
) -> Result<(), RenderError> {
    write_preamble(out, options)?;
    write_http(out, options, config)?;
    write_stream(out, config)?;
    Ok(())
}

fn write_preamble<W: Write>(out: &mut W, options: &EngineOptions) -> fmt::Result {
    let daemon = if options.daemon { "on" } else { "off" };
    write!(out, "\npid {};\ndaemon {};\n\n", options.pid_file, daemon)?;
    write!(
        out,
        "events {{\n{INDENT}worker_connections {};\n}}\n\n",
        options.worker_connections
    )
}

fn write_http<W: Write>(out: &mut W, options: &EngineOptions, config: &ReverseProxyConfig) -> fmt::Result {
    write!(
        out,
        "http {{\n{INDENT}server_names_hash_bucket_size {};\n",
        options.server_names_hash_bucket_size
    )?;

    for server in &config.http_servers {
        write_http_server(out, server)?;
    }
    out.write_char('\n')?;

    for upstream in &config.http_upstreams {
        write_upstream(out, &upstream.name, &upstream.servers)?;
    }
    out.write_str("\n}\n\n")
}

fn write_http_server<W: Write>(out: &mut W, server: &HttpServer) -> fmt::Result {
    write!(
        out,
        "\n{INDENT}server {{\n{INDENT}{INDENT}listen {};\n{INDENT}{INDENT}",
        server.listen_port
    )?;

    if let Some(response) = server.response() {
        write!(out, "\n{INDENT}{INDENT}")?;
        write_return(out, response)?;
    }

    if !server.locations.is_empty() {
        write!(out, "\n{INDENT}{INDENT}")?;
        for location in &server.locations {
            write_location(out, location)?;
        }
    }

    write!(out, "\n{INDENT}}}\n")
}

fn write_location<W: Write>(out: &mut W, location: &HttpLocation) -> fmt::Result {
    write!(
        out,
        "\n{INDENT}{INDENT}location {} {{\n{INDENT}{INDENT}{INDENT}",
        location.path
    )?;

    // Статический ответ важнее upstream'а
    if let Some(response) = location.response() {
        write_return(out, response)?;
    } else if let Some(upstream) = location.upstream() {
        write!(out, "\n{INDENT}{INDENT}{INDENT}proxy_pass http://{};", upstream)?;
    }

    write!(out, "\n{INDENT}{INDENT}}}\n")
}

fn write_return<W: Write>(out: &mut W, response: &StaticResponse) -> fmt::Result {
    write!(out, "return {}", response.code)?;
    if let Some(message) = response.message() {
        write!(out, " '{}'", message)?;
    }
    out.write_char(';')
}

fn write_stream<W: Write>(out: &mut W, config: &ReverseProxyConfig) -> fmt::Result {
    out.write_str("stream {\n")?;

    // В stream-блоке proxy_pass указывает на upstream без схемы
    for server in &config.tcp_servers {
        write!(
            out,
            "\n{INDENT}server {{\n{INDENT}{INDENT}listen {};\n{INDENT}{INDENT}proxy_pass {};\n{INDENT}}}\n",
            server.listen_port, server.upstream
        )?;
    }
    out.write_char('\n')?;

    for upstream in &config.tcp_upstreams {
        write_upstream(out, &upstream.name, &upstream.servers)?;
    }
    out.write_str("\n}\n")
}

fn write_upstream<W: Write>(out: &mut W, name: &str, servers: &[UpstreamServer]) -> fmt::Result {
    write!(out, "\n{INDENT}upstream {} {{\n", name)?;
    for server in servers {
        write!(
            out,
            "\n{INDENT}{INDENT}server {}:{};  # {}",
            server.host, server.port, server.name
        )?;
    }
    write!(out, "\n{INDENT}}}\n")
}

fn estimate_capacity(config: &ReverseProxyConfig) -> usize {
    let locations: usize = config.http_servers.iter().map(|s| s.locations.len()).sum();
    let members: usize = config
        .http_upstreams
        .iter()
        .map(|u| u.servers.len())
        .chain(config.tcp_upstreams.iter().map(|u| u.servers.len()))
        .sum();
    let blocks = config.http_servers.len()
        + config.http_upstreams.len()
        + config.tcp_servers.len()
        + config.tcp_upstreams.len();

    256 + blocks * 64 + locations * 80 + members * 64
}
