mod common;

use common::send;
use std::fs;
use std::path::{Path, PathBuf};
use weft::files::{FileDownloader, FileUploader, StaticResourceHandler};
use weft::{Method, Request, Server};

/// A scratch directory laid out as
/// `public/{hello.txt, page.html, data.bin, nested/}` plus `secret.txt`
/// next to `public`.
struct Fixture {
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = std::env::temp_dir().join(format!("weft-files-{}", uuid::Uuid::new_v4()));
        let public = root.join("public");
        fs::create_dir_all(public.join("nested")).unwrap();
        fs::write(public.join("hello.txt"), "hello from disk").unwrap();
        fs::write(public.join("page.html"), "<p>page</p>").unwrap();
        fs::write(public.join("data.bin"), [0u8, 1, 2]).unwrap();
        fs::write(root.join("secret.txt"), "top secret").unwrap();
        Self { root }
    }

    fn public(&self) -> PathBuf {
        self.root.join("public")
    }

    fn server(&self) -> Server {
        let mut server = Server::new();
        server
            .endpoint(
                Method::GET,
                "/static/:file",
                StaticResourceHandler::new(self.public()).unwrap(),
            )
            .unwrap()
            .endpoint(
                Method::GET,
                "/assets",
                StaticResourceHandler::new(self.public()).unwrap(),
            )
            .unwrap()
            .endpoint(
                Method::GET,
                "/download",
                FileDownloader::new(self.public()).unwrap(),
            )
            .unwrap();
        server
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn get(target: &str) -> Request {
    Request::new(Method::GET, target)
}

#[tokio::test]
async fn serves_files_with_content_type_and_last_modified() {
    let fixture = Fixture::new();
    let server = fixture.server();

    let reply = send(&server, get("/static/hello.txt")).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "hello from disk");
    assert_eq!(reply.header("Content-Type"), Some("text/plain"));
    let last_modified = reply.header("Last-Modified").unwrap();
    assert!(httpdate::parse_http_date(last_modified).is_ok());

    let reply = send(&server, get("/static/page.html")).await;
    assert_eq!(reply.header("Content-Type"), Some("text/html"));

    let reply = send(&server, get("/static/data.bin")).await;
    assert_eq!(reply.header("Content-Type"), Some("application/octet-stream"));
}

#[tokio::test]
async fn served_files_are_cached() {
    let fixture = Fixture::new();
    let server = fixture.server();

    assert_eq!(send(&server, get("/static/hello.txt")).await.body, "hello from disk");
    fs::write(fixture.public().join("hello.txt"), "changed").unwrap();
    assert_eq!(send(&server, get("/static/hello.txt")).await.body, "hello from disk");
}

#[tokio::test]
async fn oversized_files_are_served_but_not_cached() {
    let fixture = Fixture::new();
    let mut server = Server::new();
    server
        .endpoint(
            Method::GET,
            "/static/:file",
            StaticResourceHandler::new(fixture.public())
                .unwrap()
                .max_file_size(4),
        )
        .unwrap();

    assert_eq!(send(&server, get("/static/hello.txt")).await.body, "hello from disk");
    fs::write(fixture.public().join("hello.txt"), "changed").unwrap();
    assert_eq!(send(&server, get("/static/hello.txt")).await.body, "changed");
}

#[tokio::test]
async fn custom_content_types_override_defaults() {
    let fixture = Fixture::new();
    let mut server = Server::new();
    server
        .endpoint(
            Method::GET,
            "/static/:file",
            StaticResourceHandler::new(fixture.public())
                .unwrap()
                .content_type("BIN", "application/x-weft"),
        )
        .unwrap();

    let reply = send(&server, get("/static/data.bin")).await;
    assert_eq!(reply.header("Content-Type"), Some("application/x-weft"));
}

#[tokio::test]
async fn static_handler_rejects_bad_lookups() {
    let fixture = Fixture::new();
    let server = fixture.server();

    let reply = send(&server, get("/static/missing.txt")).await;
    assert_eq!(reply.status, 404);
    assert_eq!(reply.body, "file not found");

    let reply = send(&server, get("/static/nested")).await;
    assert_eq!(reply.status, 404);

    let reply = send(&server, get("/static/..")).await;
    assert_eq!(reply.status, 403);
    assert_eq!(reply.body, "forbidden");

    let reply = send(&server, get("/assets")).await;
    assert_eq!(reply.status, 400);
}

#[tokio::test]
async fn downloads_are_sent_as_attachments() {
    let fixture = Fixture::new();
    let server = fixture.server();

    let reply = send(&server, get("/download?file=hello.txt")).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "hello from disk");
    assert_eq!(
        reply.header("Content-Disposition"),
        Some("attachment; filename=\"hello.txt\"")
    );
    assert_eq!(
        reply.header("Content-Type"),
        Some("application/octet-stream")
    );
    assert_eq!(reply.header("Cache-Control"), Some("must-revalidate"));
}

#[tokio::test]
async fn downloader_rejects_bad_lookups() {
    let fixture = Fixture::new();
    let server = fixture.server();

    assert_eq!(send(&server, get("/download")).await.status, 400);
    assert_eq!(send(&server, get("/download?file=nope.txt")).await.status, 404);
    assert_eq!(send(&server, get("/download?file=nested")).await.status, 404);

    let reply = send(&server, get("/download?file=..%2Fsecret.txt")).await;
    assert_eq!(reply.status, 403);
    assert!(!reply.body.contains("top secret"));
}

#[tokio::test]
async fn download_names_are_escaped_in_the_disposition() {
    let fixture = Fixture::new();
    fs::write(fixture.public().join("odd\"name.txt"), "odd").unwrap();
    let server = fixture.server();

    let reply = send(&server, get("/download?file=odd%22name.txt")).await;
    assert_eq!(reply.status, 200);
    assert_eq!(
        reply.header("Content-Disposition"),
        Some(r#"attachment; filename="odd\"name.txt""#)
    );
}

const BOUNDARY: &str = "weft-boundary";

fn upload(field: &str, filename: &str, data: &str) -> Request {
    let body = format!(
        "--{BOUNDARY}\r\n\
Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
Content-Type: text/plain\r\n\r\n\
{data}\r\n\
--{BOUNDARY}--\r\n"
    );
    Request::new(Method::POST, "/upload").with_body(
        &format!("multipart/form-data; boundary={BOUNDARY}"),
        body,
    )
}

fn uploader_server(dir: &Path) -> Server {
    let dir = dir.to_path_buf();
    let mut server = Server::new();
    server
        .endpoint(
            Method::POST,
            "/upload",
            FileUploader::new("upload", move |file| {
                dir.join(file.filename.as_deref().unwrap_or("unnamed"))
            }),
        )
        .unwrap();
    server
}

#[tokio::test]
async fn uploads_are_written_to_the_chosen_path() {
    let fixture = Fixture::new();
    let server = uploader_server(&fixture.root);

    let reply = send(&server, upload("upload", "notes.txt", "first line\r\nsecond")).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "upload succeeded");
    assert_eq!(
        fs::read_to_string(fixture.root.join("notes.txt")).unwrap(),
        "first line\r\nsecond"
    );
}

#[tokio::test]
async fn uploads_without_the_field_fail() {
    let fixture = Fixture::new();
    let server = uploader_server(&fixture.root);

    let reply = send(&server, upload("other", "notes.txt", "data")).await;
    assert_eq!(reply.status, 500);
    assert!(reply.body.starts_with("upload failed:"));
    assert!(!fixture.root.join("notes.txt").exists());

    let plain = Request::new(Method::POST, "/upload").with_body("text/plain", "data");
    assert_eq!(send(&server, plain).await.status, 500);
}

#[tokio::test]
async fn uploads_that_cannot_be_written_fail() {
    let fixture = Fixture::new();
    let server = uploader_server(&fixture.root.join("no-such-dir"));

    let reply = send(&server, upload("upload", "notes.txt", "data")).await;
    assert_eq!(reply.status, 500);
    assert!(reply.body.starts_with("upload failed:"));
}

#[test]
fn handlers_require_an_existing_directory() {
    let missing = std::env::temp_dir().join(format!("weft-missing-{}", uuid::Uuid::new_v4()));
    assert!(StaticResourceHandler::new(&missing).is_err());
    assert!(FileDownloader::new(&missing).is_err());
}
