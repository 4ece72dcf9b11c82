use log::warn;
use std::collections::HashSet;

use super::types::{ReverseProxyConfig, UpstreamServer};
use crate::error::{Protocol, ValidationError};

/// Проверяет ссылки на upstream'ы и сами upstream'ы.
///
/// Возвращает все найденные ошибки, а не только первую. Поиск не пересекает
/// протоколы: location ищется только среди HTTP upstream'ов, stream server
/// только среди TCP. Рендеринг эту проверку не вызывает.
pub fn validate(config: &ReverseProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let http_names = check_upstreams(
        Protocol::Http,
        config.http_upstreams.iter().map(|u| (u.name.as_str(), u.servers.as_slice())),
        &mut errors,
    );
    let tcp_names = check_upstreams(
        Protocol::Tcp,
        config.tcp_upstreams.iter().map(|u| (u.name.as_str(), u.servers.as_slice())),
        &mut errors,
    );

    for server in &config.http_servers {
        for location in &server.locations {
            // Location со статическим ответом upstream не использует
            if location.response().is_some() {
                continue;
            }
            if let Some(upstream) = location.upstream() {
                if !http_names.contains(upstream) {
                    errors.push(ValidationError::UnknownHttpUpstream {
                        location: location.path.clone(),
                        upstream: upstream.to_string(),
                    });
                }
            }
        }
    }

    for server in &config.tcp_servers {
        if !tcp_names.contains(server.upstream.as_str()) {
            errors.push(ValidationError::UnknownTcpUpstream {
                listen_port: server.listen_port,
                upstream: server.upstream.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        for error in &errors {
            warn!("Configuration problem: {}", error);
        }
        Err(errors)
    }
}

fn check_upstreams<'a>(
    protocol: Protocol,
    upstreams: impl Iterator<Item = (&'a str, &'a [UpstreamServer])>,
    errors: &mut Vec<ValidationError>,
) -> HashSet<&'a str> {
    let mut names = HashSet::new();

    for (name, servers) in upstreams {
        if !names.insert(name) {
            errors.push(ValidationError::DuplicateUpstream {
                protocol,
                name: name.to_string(),
            });
        }
        if servers.is_empty() {
            errors.push(ValidationError::EmptyUpstream {
                protocol,
                name: name.to_string(),
            });
        }
    }

    names
}
