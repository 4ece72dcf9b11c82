use serde::{Deserialize, Serialize};

/// Снимок топологии обратного прокси, который превращается в конфиг nginx.
///
/// Порядок элементов во всех последовательностях сохраняется в выводе как есть.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReverseProxyConfig {
    pub http_servers: Vec<HttpServer>,
    pub http_upstreams: Vec<HttpUpstream>,
    pub tcp_servers: Vec<TcpServer>,
    pub tcp_upstreams: Vec<TcpUpstream>,
}

/// Статический ответ вместо проксирования (`return <code> ['<message>']`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StaticResponse {
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StaticResponse {
    pub fn new(code: u16) -> Self {
        Self { code, message: None }
    }

    pub fn with_message(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    /// Сообщение, если оно задано и не пустое
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

/// HTTP server блок
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HttpServer {
    pub listen_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_response: Option<StaticResponse>,
    #[serde(default)]
    pub locations: Vec<HttpLocation>,
}

impl HttpServer {
    pub fn new(listen_port: u16) -> Self {
        Self {
            listen_port,
            static_response: None,
            locations: Vec::new(),
        }
    }

    pub fn with_static_response(mut self, response: StaticResponse) -> Self {
        self.static_response = Some(response);
        self
    }

    pub fn with_location(mut self, location: HttpLocation) -> Self {
        self.locations.push(location);
        self
    }

    /// Статический ответ, если он задан с ненулевым кодом
    pub fn response(&self) -> Option<&StaticResponse> {
        effective_response(&self.static_response)
    }
}

/// Location внутри HTTP server блока
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HttpLocation {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_response: Option<StaticResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,
}

impl HttpLocation {
    /// Location, который отдает статический ответ
    pub fn static_response(path: impl Into<String>, response: StaticResponse) -> Self {
        Self {
            path: path.into(),
            static_response: Some(response),
            upstream: None,
        }
    }

    /// Location, который проксирует в HTTP upstream
    pub fn proxy(path: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            static_response: None,
            upstream: Some(upstream.into()),
        }
    }

    /// Статический ответ, если он задан с ненулевым кодом
    pub fn response(&self) -> Option<&StaticResponse> {
        effective_response(&self.static_response)
    }

    /// Имя upstream'а, если оно задано и не пустое
    pub fn upstream(&self) -> Option<&str> {
        self.upstream.as_deref().filter(|u| !u.is_empty())
    }
}

// Код 0 означает, что статического ответа нет
fn effective_response(response: &Option<StaticResponse>) -> Option<&StaticResponse> {
    response.as_ref().filter(|r| r.code != 0)
}

/// Сервер внутри upstream блока; `name` попадает в вывод только комментарием
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpstreamServer {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl UpstreamServer {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HttpUpstream {
    pub name: String,
    #[serde(default)]
    pub servers: Vec<UpstreamServer>,
}

impl HttpUpstream {
    pub fn new(name: impl Into<String>, servers: Vec<UpstreamServer>) -> Self {
        Self {
            name: name.into(),
            servers,
        }
    }
}

/// TCP server блок внутри `stream`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TcpServer {
    pub listen_port: u16,
    pub upstream: String,
}

impl TcpServer {
    pub fn new(listen_port: u16, upstream: impl Into<String>) -> Self {
        Self {
            listen_port,
            upstream: upstream.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TcpUpstream {
    pub name: String,
    #[serde(default)]
    pub servers: Vec<UpstreamServer>,
}

impl TcpUpstream {
    pub fn new(name: impl Into<String>, servers: Vec<UpstreamServer>) -> Self {
        Self {
            name: name.into(),
            servers,
        }
    }
}

impl ReverseProxyConfig {
    /// Находит HTTP upstream по имени
    pub fn http_upstream(&self, name: &str) -> Option<&HttpUpstream> {
        self.http_upstreams.iter().find(|u| u.name == name)
    }

    /// Находит TCP upstream по имени
    pub fn tcp_upstream(&self, name: &str) -> Option<&TcpUpstream> {
        self.tcp_upstreams.iter().find(|u| u.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.http_servers.is_empty()
            && self.http_upstreams.is_empty()
            && self.tcp_servers.is_empty()
            && self.tcp_upstreams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sequences_default_to_empty() {
        let config: ReverseProxyConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.is_empty());

        let config: ReverseProxyConfig = serde_json::from_str(
            r#"{"tcp_servers": [{"listen_port": 9001, "upstream": "foo"}]}"#,
        )
        .unwrap();
        assert!(config.http_servers.is_empty());
        assert_eq!(config.tcp_servers, vec![TcpServer::new(9001, "foo")]);
    }

    #[test]
    fn test_empty_message_and_upstream_are_absent() {
        let response = StaticResponse::with_message(204, "");
        assert_eq!(response.message(), None);

        let location = HttpLocation::proxy("/abc", "");
        assert_eq!(location.upstream(), None);
    }

    #[test]
    fn test_zero_code_is_no_response() {
        let server = HttpServer::new(80).with_static_response(StaticResponse::with_message(0, "ignored"));
        assert_eq!(server.response(), None);

        let location = HttpLocation::static_response("/", StaticResponse::new(0));
        assert_eq!(location.response(), None);

        let location = HttpLocation::static_response("/", StaticResponse::new(204));
        assert_eq!(location.response(), Some(&StaticResponse::new(204)));
    }

    #[test]
    fn test_parse_yaml_snapshot() {
        let yaml = r#"
http_servers:
  - listen_port: 9001
    locations:
      - path: /abc
        upstream: foo
      - path: /health
        static_response:
          code: 200
          message: ok
http_upstreams:
  - name: foo
    servers:
      - name: ping
        host: ping.example.com
        port: 443
"#;
        let config: ReverseProxyConfig = serde_yaml::from_str(yaml).unwrap();

        let server = &config.http_servers[0];
        assert_eq!(server.listen_port, 9001);
        assert_eq!(server.static_response, None);
        assert_eq!(server.locations[0].upstream(), Some("foo"));
        assert_eq!(
            server.locations[1].static_response,
            Some(StaticResponse::with_message(200, "ok"))
        );
        assert_eq!(
            config.http_upstream("foo").map(|u| u.servers.len()),
            Some(1)
        );
        assert!(config.tcp_upstream("foo").is_none());
    }
}
