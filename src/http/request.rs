use crate::error::ContextError;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    CONNECT,
    OPTIONS,
    TRACE,
    PATCH,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::CONNECT => "CONNECT",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::PATCH => "PATCH",
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "HEAD" => Ok(Method::HEAD),
            "CONNECT" => Ok(Method::CONNECT),
            "OPTIONS" => Ok(Method::OPTIONS),
            "TRACE" => Ok(Method::TRACE),
            "PATCH" => Ok(Method::PATCH),
            other => Err(format!("unsupported method {other}")),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Clone)]
pub struct Body {
    pub(crate) content_type: String,
    pub(crate) data: Vec<u8>,
}

impl Body {
    pub fn new(content_type: &str, data: impl Into<Vec<u8>>) -> Body {
        Body {
            content_type: content_type.to_owned(),
            data: data.into(),
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.data).to_string()
    }

    pub fn is_form_urlencoded(&self) -> bool {
        self.content_type
            .split(';')
            .next()
            .map(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
            .unwrap_or(false)
    }
}

/// An inbound request as handed over by the transport.
///
/// Header names are stored lowercased. The query string is kept raw and only
/// parsed when a handler asks for it.
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) body: Body,
}

impl Request {
    /// Builds a request from a method and a request target such as
    /// `/items/7?sort=asc`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        let path = if path.is_empty() { "/" } else { path };
        Self {
            method,
            path: path.to_owned(),
            query: query.to_owned(),
            headers: HashMap::new(),
            body: Body::default(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = name.to_lowercase();
        if name == "content-type" {
            self.body.content_type = value.to_owned();
        }
        self.headers.insert(name, value.to_owned());
        self
    }

    pub fn with_body(mut self, content_type: &str, data: impl Into<Vec<u8>>) -> Self {
        self.headers
            .insert("content-type".to_owned(), content_type.to_owned());
        self.body = Body::new(content_type, data);
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_string(&self) -> &str {
        &self.query
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

pub(crate) type Values = HashMap<String, Vec<String>>;

/// Parses `application/x-www-form-urlencoded` data, failing on pairs that do
/// not decode to UTF-8.
pub(crate) fn parse_urlencoded(input: &str) -> Result<Values, ContextError> {
    let mut values = Values::new();
    for pair in input.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key)?;
        let value = decode_component(value)?;
        values.entry(key).or_default().push(value);
    }
    Ok(values)
}

/// Like [`parse_urlencoded`] but never fails: undecodable bytes are replaced.
pub(crate) fn parse_query(input: &str) -> Values {
    let mut values = Values::new();
    for pair in input.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        values
            .entry(decode_lossy(key))
            .or_default()
            .push(decode_lossy(value));
    }
    values
}

fn decode_component(raw: &str) -> Result<String, ContextError> {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|err| ContextError::Form(format!("{raw}: {err}")))
}

fn decode_lossy(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}
