use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid URI: {0}")]
pub struct InvalidUriError(String);

// RFC 3986 host production: reg-name, IPv4, or a bracketed IPv6 literal.
static REG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-._~%!$&'()*+,;=]*$").expect("valid regex"));
static IPV6_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[0-9A-Fa-f:.]+\]$").expect("valid regex"));

/// Universal Resource Identifier, the target location of a request.
///
/// URIs are value-equal by all fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    scheme: String,
    username: Option<String>,
    password: Option<String>,
    host: String,
    port: Option<u16>,
    path: Option<String>,
    query: Option<String>,
    fragment: Option<String>,
}

impl Uri {
    #[must_use]
    pub fn builder() -> UriBuilder {
        UriBuilder::default()
    }

    /// Parse a URI of the form `scheme://host[:port][/path][?query][#fragment]`.
    pub fn parse(value: &str) -> Result<Uri, InvalidUriError> {
        let (scheme, rest) = value
            .split_once("://")
            .ok_or_else(|| InvalidUriError(format!("missing scheme: {value}")))?;
        let (rest, fragment) = match rest.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (rest, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query)),
            None => (rest, None),
        };
        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(&rest[idx..])),
            None => (rest, None),
        };
        let (userinfo, host_port) = match authority.rsplit_once('@') {
            Some((userinfo, host_port)) => (Some(userinfo), host_port),
            None => (None, authority),
        };
        let (username, password) = match userinfo {
            Some(userinfo) => match userinfo.split_once(':') {
                Some((username, password)) => (Some(username), Some(password)),
                None => (Some(userinfo), None),
            },
            None => (None, None),
        };
        // The port separator of a bracketed IPv6 literal follows the bracket.
        let (host, port) = if host_port.starts_with('[') {
            match host_port.rsplit_once("]:") {
                Some((host, port)) => (format!("{host}]"), Some(port)),
                None => (host_port.to_string(), None),
            }
        } else {
            match host_port.rsplit_once(':') {
                Some((host, port)) => (host.to_string(), Some(port)),
                None => (host_port.to_string(), None),
            }
        };
        let port = port
            .map(|p| {
                p.parse::<u16>()
                    .map_err(|_| InvalidUriError(format!("invalid port: {p}")))
            })
            .transpose()?;

        let mut builder = Uri::builder().scheme(scheme).host(host);
        if let Some(username) = username {
            builder = builder.username(username);
        }
        if let Some(password) = password {
            builder = builder.password(password);
        }
        if let Some(port) = port {
            builder = builder.port(port);
        }
        if let Some(path) = path {
            builder = builder.path(path);
        }
        if let Some(query) = query {
            builder = builder.query(query);
        }
        if let Some(fragment) = fragment {
            builder = builder.fragment(fragment);
        }
        builder.build()
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Construct the netloc in the form `{username}:{password}@{host}:{port}`.
    ///
    /// `username`, `password`, and `port` are only included when set, and
    /// `password` is ignored unless `username` is also set. IPv6 hosts are
    /// bracketed.
    #[must_use]
    pub fn netloc(&self) -> String {
        let userinfo = match (&self.username, &self.password) {
            (Some(username), Some(password)) => format!("{username}:{password}@"),
            (Some(username), None) => format!("{username}@"),
            _ => String::new(),
        };
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        match self.port {
            Some(port) => format!("{userinfo}{host}:{port}"),
            None => format!("{userinfo}{host}"),
        }
    }

    /// Render the full URI.
    #[must_use]
    pub fn build(&self) -> String {
        let mut result = format!("{}://{}", self.scheme, self.netloc());
        if let Some(path) = &self.path {
            result.push_str(path);
        }
        if let Some(query) = &self.query {
            result.push('?');
            result.push_str(query);
        }
        if let Some(fragment) = &self.fragment {
            result.push('#');
            result.push_str(fragment);
        }
        result
    }

    /// Copy this URI, replacing the port.
    #[must_use]
    pub fn with_port(&self, port: Option<u16>) -> Uri {
        let mut uri = self.clone();
        uri.port = port;
        uri
    }

    /// Copy this URI, replacing the path and query.
    #[must_use]
    pub fn with_target(&self, path: Option<String>, query: Option<String>) -> Uri {
        let mut uri = self.clone();
        uri.path = path;
        uri.query = query;
        uri
    }

    /// Copy this URI, replacing the host.
    pub fn with_host(&self, host: impl Into<String>) -> Result<Uri, InvalidUriError> {
        let host = host.into();
        validate_host(&host)?;
        let mut uri = self.clone();
        uri.host = host;
        Ok(uri)
    }
}

impl Display for Uri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.build())
    }
}

fn validate_host(host: &str) -> Result<(), InvalidUriError> {
    if REG_NAME_RE.is_match(host) || IPV6_LITERAL_RE.is_match(host) {
        Ok(())
    } else {
        Err(InvalidUriError(format!("invalid host: {host}")))
    }
}

/// Builder for [`Uri`] values.
#[derive(Debug, Default)]
pub struct UriBuilder {
    scheme: Option<String>,
    username: Option<String>,
    password: Option<String>,
    host: String,
    port: Option<u16>,
    path: Option<String>,
    query: Option<String>,
    fragment: Option<String>,
}

impl UriBuilder {
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    #[must_use]
    pub fn fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    pub fn build(self) -> Result<Uri, InvalidUriError> {
        validate_host(&self.host)?;
        Ok(Uri {
            scheme: self.scheme.unwrap_or_else(|| "https".to_string()),
            username: self.username,
            password: self.password,
            host: self.host,
            port: self.port,
            path: self.path,
            query: self.query,
            fragment: self.fragment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_simple_uri() {
        let uri = Uri::builder()
            .host("example.com")
            .path("/foo")
            .query("bar=bam")
            .build()
            .unwrap();
        assert_eq!(uri.build(), "https://example.com/foo?bar=bam");
        assert_eq!(uri.netloc(), "example.com");
    }

    #[test]
    fn netloc_renders_userinfo_and_port() {
        let uri = Uri::builder()
            .scheme("http")
            .host("example.com")
            .username("user")
            .password("pass")
            .port(8080)
            .build()
            .unwrap();
        assert_eq!(uri.netloc(), "user:pass@example.com:8080");
    }

    #[test]
    fn netloc_brackets_ipv6_hosts() {
        let uri = Uri::builder().host("[::1]").port(443).build().unwrap();
        assert_eq!(uri.netloc(), "[::1]:443");
    }

    #[test]
    fn rejects_invalid_host() {
        assert!(Uri::builder().host("exa mple.com").build().is_err());
        assert!(Uri::builder().host("exam/ple").build().is_err());
    }

    #[test]
    fn parses_full_uri() {
        let uri = Uri::parse("https://user:pw@example.com:8443/path/to?x=1#frag").unwrap();
        assert_eq!(uri.scheme(), "https");
        assert_eq!(uri.username(), Some("user"));
        assert_eq!(uri.password(), Some("pw"));
        assert_eq!(uri.host(), "example.com");
        assert_eq!(uri.port(), Some(8443));
        assert_eq!(uri.path(), Some("/path/to"));
        assert_eq!(uri.query(), Some("x=1"));
        assert_eq!(uri.fragment(), Some("frag"));
        assert_eq!(
            uri.build(),
            "https://user:pw@example.com:8443/path/to?x=1#frag"
        );
    }

    #[test]
    fn uris_are_value_equal() {
        let a = Uri::parse("https://example.com/foo").unwrap();
        let b = Uri::builder()
            .host("example.com")
            .path("/foo")
            .build()
            .unwrap();
        assert_eq!(a, b);
    }
}
