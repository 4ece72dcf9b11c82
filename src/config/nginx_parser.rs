use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

use super::types::*;
use super::EngineOptions;
use crate::error::ParseError;

static UPSTREAM_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<host>\S+):(?P<port>\d+)$").expect("valid upstream address regex"));

static PROXY_PASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<scheme>[a-z][a-z0-9+.-]*)://)?(?P<target>\S+)$").expect("valid proxy_pass regex")
});

/// Конфиг nginx, прочитанный обратно в настройки движка и модель
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NginxConfig {
    pub options: EngineOptions,
    pub proxy: ReverseProxyConfig,
}

/// Элемент синтаксического дерева: директива `words;` или блок `words { ... }`
#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Directive {
        words: Vec<String>,
        comment: Option<String>,
    },
    Block {
        words: Vec<String>,
        children: Vec<Node>,
    },
}

/// Парсит один конфигурационный файл
pub fn parse_config_file<P: AsRef<Path>>(path: P) -> Result<NginxConfig, ParseError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config_content(&content)?;
    debug!("Parsed nginx config from: {}", path.display());
    Ok(config)
}

/// Парсит содержимое конфига в диалекте, который выдает генератор.
///
/// Неизвестные директивы пропускаются с предупреждением. Метка сервера
/// upstream'а берется из комментария в конце строки, без комментария
/// вместо метки используется host.
pub fn parse_config_content(content: &str) -> Result<NginxConfig, ParseError> {
    let mut config = NginxConfig::default();

    for node in tokenize(content)? {
        match node {
            Node::Directive { words, .. } => match words[0].as_str() {
                "pid" => config.options.pid_file = words[1..].join(" "),
                "daemon" => config.options.daemon = parse_flag(&words)?,
                _ => warn!("Skipping unsupported directive: {}", words.join(" ")),
            },
            Node::Block { words, children } => match words[0].as_str() {
                "events" => parse_events_block(&children, &mut config.options)?,
                "http" => parse_http_block(&children, &mut config)?,
                "stream" => parse_stream_block(&children, &mut config.proxy)?,
                _ => warn!("Skipping unsupported block: {}", words.join(" ")),
            },
        }
    }

    Ok(config)
}

/// Разбирает текст на дерево директив и блоков
fn tokenize(content: &str) -> Result<Vec<Node>, ParseError> {
    // Стек открытых блоков: заголовок и уже прочитанные дочерние элементы
    let mut stack: Vec<(Vec<String>, Vec<Node>)> = vec![(Vec::new(), Vec::new())];
    let mut buffer = String::new();
    let mut in_quote = false;
    let mut line = 0usize;
    let mut last_directive_line = None;

    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quote {
            if c == '\'' {
                in_quote = false;
            }
            if c == '\n' {
                line += 1;
            }
            buffer.push(c);
            continue;
        }

        match c {
            '\'' => {
                in_quote = true;
                buffer.push(c);
            }
            '#' => {
                let mut comment = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    comment.push(next);
                    chars.next();
                }
                // Комментарий относится к директиве, закончившейся на той же строке
                if buffer.trim().is_empty() && last_directive_line == Some(line) {
                    if let Some((_, children)) = stack.last_mut() {
                        if let Some(Node::Directive { comment: slot, .. }) = children.last_mut() {
                            *slot = Some(comment.trim().to_string());
                        }
                    }
                }
            }
            ';' => {
                let words = split_words(&buffer);
                buffer.clear();
                if words.is_empty() {
                    continue;
                }
                if let Some((_, children)) = stack.last_mut() {
                    children.push(Node::Directive { words, comment: None });
                }
                last_directive_line = Some(line);
            }
            '{' => {
                let words = split_words(&buffer);
                buffer.clear();
                if words.is_empty() {
                    return Err(ParseError::InvalidDirective("{".to_string()));
                }
                stack.push((words, Vec::new()));
            }
            '}' => {
                if !buffer.trim().is_empty() {
                    return Err(ParseError::InvalidDirective(buffer.trim().to_string()));
                }
                buffer.clear();
                if stack.len() < 2 {
                    return Err(ParseError::Unbalanced("}".to_string()));
                }
                if let Some((words, children)) = stack.pop() {
                    if let Some((_, parent)) = stack.last_mut() {
                        parent.push(Node::Block { words, children });
                    }
                }
            }
            '\n' => {
                line += 1;
                buffer.push(' ');
            }
            _ => buffer.push(c),
        }
    }

    if !buffer.trim().is_empty() {
        return Err(ParseError::InvalidDirective(buffer.trim().to_string()));
    }
    if stack.len() != 1 {
        let open = stack.last().map(|(words, _)| words.join(" ")).unwrap_or_default();
        return Err(ParseError::Unbalanced(open));
    }

    Ok(stack.pop().map(|(_, nodes)| nodes).unwrap_or_default())
}

/// Делит директиву на слова; текст в одинарных кавычках остается одним словом без кавычек
fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut quoted = false;

    for c in text.chars() {
        match c {
            '\'' => {
                in_quote = !in_quote;
                quoted = true;
            }
            c if c.is_whitespace() && !in_quote => {
                if !current.is_empty() || quoted {
                    words.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() || quoted {
        words.push(current);
    }

    words
}

fn parse_flag(words: &[String]) -> Result<bool, ParseError> {
    match words.get(1).map(String::as_str) {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => Err(ParseError::InvalidDirective(words.join(" "))),
    }
}

fn parse_number<T: std::str::FromStr>(words: &[String]) -> Result<T, ParseError> {
    words
        .get(1)
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| ParseError::InvalidDirective(words.join(" ")))
}

fn parse_events_block(children: &[Node], options: &mut EngineOptions) -> Result<(), ParseError> {
    for node in children {
        match node {
            Node::Directive { words, .. } if words[0] == "worker_connections" => {
                options.worker_connections = parse_number(words)?;
            }
            other => warn!("Skipping unsupported events entry: {:?}", other),
        }
    }
    Ok(())
}

fn parse_http_block(children: &[Node], config: &mut NginxConfig) -> Result<(), ParseError> {
    for node in children {
        match node {
            Node::Directive { words, .. } if words[0] == "server_names_hash_bucket_size" => {
                config.options.server_names_hash_bucket_size = parse_number(words)?;
            }
            Node::Block { words, children } if words[0] == "server" => {
                config.proxy.http_servers.push(parse_http_server(children)?);
            }
            Node::Block { words, children } if words[0] == "upstream" => {
                config.proxy.http_upstreams.push(HttpUpstream {
                    name: words[1..].join(" "),
                    servers: parse_upstream_servers(children)?,
                });
            }
            other => warn!("Skipping unsupported http entry: {:?}", other),
        }
    }
    Ok(())
}

fn parse_http_server(children: &[Node]) -> Result<HttpServer, ParseError> {
    let mut server = HttpServer::new(0);

    for node in children {
        match node {
            Node::Directive { words, .. } if words[0] == "listen" => {
                server.listen_port = parse_number(words)?;
            }
            Node::Directive { words, .. } if words[0] == "return" => {
                server.static_response = Some(parse_return(words)?);
            }
            Node::Block { words, children } if words[0] == "location" => {
                server.locations.push(parse_location(&words[1..].join(" "), children)?);
            }
            other => warn!("Skipping unsupported server entry: {:?}", other),
        }
    }

    Ok(server)
}

fn parse_location(path: &str, children: &[Node]) -> Result<HttpLocation, ParseError> {
    let mut location = HttpLocation {
        path: path.to_string(),
        static_response: None,
        upstream: None,
    };

    for node in children {
        match node {
            Node::Directive { words, .. } if words[0] == "return" => {
                location.static_response = Some(parse_return(words)?);
            }
            Node::Directive { words, .. } if words[0] == "proxy_pass" => {
                location.upstream = Some(parse_proxy_pass(words)?);
            }
            other => warn!("Skipping unsupported location entry: {:?}", other),
        }
    }

    Ok(location)
}

fn parse_return(words: &[String]) -> Result<StaticResponse, ParseError> {
    let code = parse_number(words)?;
    let message = match words.get(2..) {
        Some(rest) if !rest.is_empty() => Some(rest.join(" ")),
        _ => None,
    };
    Ok(StaticResponse { code, message })
}

/// Возвращает имя upstream'а из `proxy_pass`, отбрасывая схему
fn parse_proxy_pass(words: &[String]) -> Result<String, ParseError> {
    let target = words
        .get(1)
        .ok_or_else(|| ParseError::InvalidDirective(words.join(" ")))?;
    PROXY_PASS
        .captures(target)
        .and_then(|cap| cap.name("target"))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ParseError::InvalidDirective(words.join(" ")))
}

fn parse_upstream_servers(children: &[Node]) -> Result<Vec<UpstreamServer>, ParseError> {
    let mut servers = Vec::new();

    for node in children {
        match node {
            Node::Directive { words, comment } if words[0] == "server" => {
                let address = words
                    .get(1)
                    .ok_or_else(|| ParseError::InvalidDirective(words.join(" ")))?;
                let cap = UPSTREAM_ADDRESS
                    .captures(address)
                    .ok_or_else(|| ParseError::InvalidDirective(words.join(" ")))?;
                let host = cap["host"].to_string();
                let port = cap["port"]
                    .parse()
                    .map_err(|_| ParseError::InvalidDirective(words.join(" ")))?;
                let name = comment.clone().unwrap_or_else(|| host.clone());

                servers.push(UpstreamServer { name, host, port });
            }
            other => warn!("Skipping unsupported upstream entry: {:?}", other),
        }
    }

    Ok(servers)
}

fn parse_stream_block(children: &[Node], config: &mut ReverseProxyConfig) -> Result<(), ParseError> {
    for node in children {
        match node {
            Node::Block { words, children } if words[0] == "server" => {
                let mut server = TcpServer::new(0, "");
                for entry in children {
                    match entry {
                        Node::Directive { words, .. } if words[0] == "listen" => {
                            server.listen_port = parse_number(words)?;
                        }
                        Node::Directive { words, .. } if words[0] == "proxy_pass" => {
                            server.upstream = words[1..].join(" ");
                        }
                        other => warn!("Skipping unsupported stream server entry: {:?}", other),
                    }
                }
                config.tcp_servers.push(server);
            }
            Node::Block { words, children } if words[0] == "upstream" => {
                config.tcp_upstreams.push(TcpUpstream {
                    name: words[1..].join(" "),
                    servers: parse_upstream_servers(children)?,
                });
            }
            other => warn!("Skipping unsupported stream entry: {:?}", other),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_config() {
        let config_content = r#"
            pid /run/nginx.pid;
            daemon off;

            events {
                worker_connections 1024;
            }

            http {
                server_names_hash_bucket_size 64;

                server {
                    listen 80;
                    location / { proxy_pass http://backend; }
                    location /health { return 200 'all good'; }
                }

                upstream backend {
                    server 127.0.0.1:8080;  # first
                    server 127.0.0.1:8081;
                }
            }

            stream {
                server { listen 5432; proxy_pass db; }
            }
        "#;

        let config = parse_config_content(config_content).unwrap();

        assert_eq!(config.options.pid_file, "/run/nginx.pid");
        assert!(!config.options.daemon);
        assert_eq!(config.options.worker_connections, 1024);
        assert_eq!(config.options.server_names_hash_bucket_size, 64);

        let server = &config.proxy.http_servers[0];
        assert_eq!(server.listen_port, 80);
        assert_eq!(server.locations[0].upstream(), Some("backend"));
        assert_eq!(
            server.locations[1].static_response,
            Some(StaticResponse::with_message(200, "all good"))
        );

        let upstream = &config.proxy.http_upstreams[0];
        assert_eq!(upstream.name, "backend");
        assert_eq!(
            upstream.servers,
            vec![
                UpstreamServer::new("first", "127.0.0.1", 8080),
                UpstreamServer::new("127.0.0.1", "127.0.0.1", 8081),
            ]
        );

        assert_eq!(config.proxy.tcp_servers, vec![TcpServer::new(5432, "db")]);
    }

    #[test]
    fn test_comment_on_own_line_is_ignored() {
        let config = parse_config_content(
            "stream {\n    upstream foo {\n        server a.example.com:1;\n        # not a label\n    }\n}\n",
        )
        .unwrap();

        assert_eq!(
            config.proxy.tcp_upstreams[0].servers,
            vec![UpstreamServer::new("a.example.com", "a.example.com", 1)]
        );
    }

    #[test]
    fn test_quoted_message_keeps_special_characters() {
        let config =
            parse_config_content("http { server { listen 80; return 418 'tea; {pot} # hot'; } }").unwrap();

        assert_eq!(
            config.proxy.http_servers[0].static_response,
            Some(StaticResponse::with_message(418, "tea; {pot} # hot"))
        );
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(matches!(
            parse_config_content("http { server { listen 80; }"),
            Err(ParseError::Unbalanced(block)) if block == "http"
        ));
        assert!(matches!(
            parse_config_content("}"),
            Err(ParseError::Unbalanced(_))
        ));
    }

    #[test]
    fn test_invalid_directives() {
        assert!(matches!(
            parse_config_content("daemon maybe;"),
            Err(ParseError::InvalidDirective(_))
        ));
        assert!(matches!(
            parse_config_content("http { server { listen eighty; } }"),
            Err(ParseError::InvalidDirective(_))
        ));
        assert!(matches!(
            parse_config_content("pid /var/run/nginx.pid"),
            Err(ParseError::InvalidDirective(_))
        ));
    }

    #[test]
    fn test_unknown_directives_are_skipped() {
        let config =
            parse_config_content("worker_processes auto;\nhttp { gzip on; server { listen 80; } }").unwrap();
        assert_eq!(config.proxy.http_servers, vec![HttpServer::new(80)]);
        assert_eq!(config.options, EngineOptions::default());
    }

    #[test]
    fn test_static_location_loses_upstream_after_render() {
        let location = HttpLocation {
            path: "/".to_string(),
            static_response: Some(StaticResponse::new(503)),
            upstream: Some("foo".to_string()),
        };
        let model = ReverseProxyConfig {
            http_servers: vec![HttpServer::new(80).with_location(location)],
            ..Default::default()
        };
        let text = crate::render::render(&EngineOptions::default(), &model).unwrap();

        let parsed = parse_config_content(&text).unwrap();
        assert_eq!(
            parsed.proxy.http_servers[0].locations,
            vec![HttpLocation::static_response("/", StaticResponse::new(503))]
        );
    }
}
