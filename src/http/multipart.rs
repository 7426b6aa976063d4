//! Minimal `multipart/form-data` parsing over an in-memory body.

use crate::error::ContextError;

/// One part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFile {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

fn is_multipart(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case("multipart/form-data"))
        .unwrap_or(false)
}

fn boundary(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| key.eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn malformed(reason: &str) -> ContextError {
    ContextError::Form(format!("malformed multipart body: {reason}"))
}

pub(crate) fn parse_multipart(content_type: &str, body: &[u8]) -> Result<Vec<FormFile>, ContextError> {
    if !is_multipart(content_type) {
        return Err(ContextError::Form(format!(
            "expected multipart/form-data, got {content_type:?}"
        )));
    }
    let boundary = boundary(content_type).ok_or_else(|| malformed("missing boundary"))?;
    let delimiter = format!("--{boundary}").into_bytes();
    let separator = [b"\r\n".as_slice(), &delimiter].concat();

    let start = find_subsequence(body, &delimiter).ok_or_else(|| malformed("no opening boundary"))?;
    let mut rest = &body[start + delimiter.len()..];
    let mut parts = Vec::new();

    loop {
        if rest.starts_with(b"--") {
            break;
        }
        rest = rest
            .strip_prefix(b"\r\n")
            .ok_or_else(|| malformed("boundary not followed by CRLF"))?;
        let end = find_subsequence(rest, &separator).ok_or_else(|| malformed("unterminated part"))?;
        parts.push(parse_part(&rest[..end])?);
        rest = &rest[end + separator.len()..];
    }

    Ok(parts)
}

fn parse_part(part: &[u8]) -> Result<FormFile, ContextError> {
    let split = find_subsequence(part, b"\r\n\r\n").ok_or_else(|| malformed("part without headers"))?;
    let head = String::from_utf8_lossy(&part[..split]);
    let data = part[split + 4..].to_vec();

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;
    for line in head.split("\r\n") {
        let Some((header, value)) = line.split_once(':') else {
            continue;
        };
        if header.trim().eq_ignore_ascii_case("content-disposition") {
            for param in value.split(';').skip(1) {
                match param.trim().split_once('=') {
                    Some(("name", value)) => name = Some(value.trim_matches('"').to_owned()),
                    Some(("filename", value)) => filename = Some(value.trim_matches('"').to_owned()),
                    _ => {}
                }
            }
        } else if header.trim().eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_owned());
        }
    }

    Ok(FormFile {
        name: name.ok_or_else(|| malformed("part without a name"))?,
        filename,
        content_type,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPE: &str = "multipart/form-data; boundary=XyZ";

    #[test]
    fn splits_fields_and_files() {
        let body = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"title\"\r\n\r\n\
notes\r\n\
--XyZ\r\n\
Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
Content-Type: text/plain\r\n\r\n\
line one\r\nline two\r\n\
--XyZ--\r\n";

        let parts = parse_multipart(TYPE, body).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name, "title");
        assert_eq!(parts[0].filename, None);
        assert_eq!(parts[0].data, b"notes");
        assert_eq!(parts[1].filename.as_deref(), Some("a.txt"));
        assert_eq!(parts[1].content_type.as_deref(), Some("text/plain"));
        assert_eq!(parts[1].data, b"line one\r\nline two");
    }

    #[test]
    fn rejects_bodies_it_cannot_frame() {
        assert!(parse_multipart("multipart/form-data", b"--XyZ--").is_err());
        assert!(parse_multipart("text/plain", b"").is_err());
        assert!(parse_multipart(TYPE, b"--XyZ\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nno end").is_err());
    }
}
