use futures::future::BoxFuture;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// The response buffer a handler chain writes into.
///
/// A status of `0` means nothing set one; the transport then falls back to
/// `200`. Header names compare case-insensitively and keep the spelling of
/// their last [`header`](Response::header) call.
#[derive(Debug, Default, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Response {
        Response {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    pub fn body<T: Into<Vec<u8>>>(&mut self, body: T) -> &mut Self {
        self.body = body.into();
        self
    }

    /// Sets a header, replacing every value previously set under that name.
    pub fn header<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) -> &mut Self {
        let name = name.as_ref();
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.headers
            .push((name.to_string(), value.as_ref().to_string()));
        self
    }

    /// Adds another value for a header that may repeat, such as `Set-Cookie`.
    pub fn append_header<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) -> &mut Self {
        self.headers
            .push((name.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn get_headers<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Serializes the response as an HTTP/1.1 message.
    /// The status that goes on the wire: an unset status is sent as 200.
    pub fn written_status(&self) -> u16 {
        if self.status == 0 {
            200
        } else {
            self.status
        }
    }

    pub fn to_http1(&self) -> Vec<u8> {
        let status = self.written_status();
        let mut head = format!("HTTP/1.1 {} {}\r\n", status, reason_phrase(status));
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("content-length") || name.eq_ignore_ascii_case("connection") {
                continue;
            }
            head += &format!("{}: {}\r\n", name, value);
        }
        head += &format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.body.len()
        );

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

/// Where the dispatcher flushes a finished response.
pub trait ResponseSink: Send {
    fn write_response<'a>(&'a mut self, response: &'a Response) -> BoxFuture<'a, io::Result<()>>;
}

impl<W> ResponseSink for W
where
    W: AsyncWrite + Unpin + Send,
{
    fn write_response<'a>(&'a mut self, response: &'a Response) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            self.write_all(&response.to_http1()).await?;
            self.flush().await
        })
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Payload Too Large",
        431 => "Request Header Fields Too Large",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
