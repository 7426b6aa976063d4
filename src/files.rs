//! Handlers for serving files from a directory.

use crate::cache::CacheManager;
use crate::context::Context;
use crate::handler::Handler;
use crate::http::FormFile;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

const CACHE_ENTRIES: u64 = 1000;

#[derive(Clone)]
struct CachedFile {
    data: Vec<u8>,
    last_modified: Option<String>,
}

/// Serves `<dir>/<file>` where `file` is the `:file` path parameter of the
/// route, e.g. `/static/:file`.
///
/// Files up to `max_file_size` bytes are kept in memory after the first
/// read.
pub struct StaticResourceHandler {
    dir: PathBuf,
    cache: CacheManager<String, Arc<CachedFile>>,
    content_types: HashMap<String, String>,
    max_file_size: usize,
}

impl StaticResourceHandler {
    pub fn new<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let content_types = [
            ("html", "text/html"),
            ("css", "text/css"),
            ("js", "text/javascript"),
            ("json", "application/json"),
            ("txt", "text/plain"),
            ("png", "image/png"),
            ("jpg", "image/jpeg"),
            ("jpeg", "image/jpeg"),
            ("jpe", "image/jpeg"),
            ("gif", "image/gif"),
            ("svg", "image/svg+xml"),
            ("ico", "image/x-icon"),
            ("pdf", "application/pdf"),
        ]
        .into_iter()
        .map(|(ext, mime)| (ext.to_owned(), mime.to_owned()))
        .collect();

        Ok(Self {
            dir: std::fs::canonicalize(dir)?,
            cache: CacheManager::new(CACHE_ENTRIES),
            content_types,
            max_file_size: 10 * 1024 * 1024,
        })
    }

    pub fn max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Maps an extension (without the dot) to a content type.
    pub fn content_type(mut self, extension: &str, content_type: &str) -> Self {
        self.content_types
            .insert(extension.to_lowercase(), content_type.to_owned());
        self
    }

    fn content_type_of(&self, file: &str) -> &str {
        Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.content_types.get(&ext.to_lowercase()))
            .map(String::as_str)
            .unwrap_or("application/octet-stream")
    }

    async fn serve(&self, ctx: &mut Context) {
        let file = match ctx.path_value("file") {
            Ok(file) => file.to_owned(),
            Err(_) => {
                ctx.text(400, "invalid resource path");
                return;
            }
        };

        let cached = match self.cache.get(&file).await {
            Some(cached) => cached,
            None => {
                let path = match resolve(&self.dir, &file).await {
                    Ok(path) => path,
                    Err(status) => {
                        reject(ctx, status);
                        return;
                    }
                };
                let loaded = match load(&path).await {
                    Ok(loaded) => Arc::new(loaded),
                    Err(err) => {
                        tracing::warn!(file = %path.display(), error = %err, "failed to read static file");
                        reject(ctx, 500);
                        return;
                    }
                };
                if loaded.data.len() <= self.max_file_size {
                    self.cache.set(file.clone(), Arc::clone(&loaded)).await;
                }
                loaded
            }
        };

        let content_type = self.content_type_of(&file).to_owned();
        let response = ctx.response_mut();
        response
            .status(200)
            .header("Content-Type", content_type)
            .body(cached.data.clone());
        if let Some(last_modified) = &cached.last_modified {
            response.header("Last-Modified", last_modified);
        }
    }
}

impl Handler for StaticResourceHandler {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(self.serve(ctx))
    }
}

/// Sends `<dir>/<?file>` as an attachment, `file` being a query parameter.
pub struct FileDownloader {
    dir: PathBuf,
}

impl FileDownloader {
    pub fn new<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        Ok(Self {
            dir: std::fs::canonicalize(dir)?,
        })
    }

    async fn serve(&self, ctx: &mut Context) {
        let file = match ctx.query_value("file") {
            Ok(file) => file,
            Err(_) => {
                ctx.text(400, "missing file parameter");
                return;
            }
        };

        let path = match resolve(&self.dir, &file).await {
            Ok(path) => path,
            Err(status) => {
                reject(ctx, status);
                return;
            }
        };
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(file = %path.display(), error = %err, "failed to read download");
                reject(ctx, 500);
                return;
            }
        };

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        ctx.response_mut()
            .status(200)
            .header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", quote_filename(&name)),
            )
            .header("Content-Type", "application/octet-stream")
            .header("Content-Transfer-Encoding", "binary")
            .header("Expires", "0")
            .header("Cache-Control", "must-revalidate")
            .header("Pragma", "public")
            .body(data);
    }
}

impl Handler for FileDownloader {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(self.serve(ctx))
    }
}

/// Stores the multipart part named `field` at the path chosen by
/// `destination`.
///
/// Any failure, including a missing part, answers 500 with the reason.
pub struct FileUploader {
    field: String,
    destination: Box<dyn Fn(&FormFile) -> PathBuf + Send + Sync>,
}

impl FileUploader {
    pub fn new<F>(field: &str, destination: F) -> Self
    where
        F: Fn(&FormFile) -> PathBuf + Send + Sync + 'static,
    {
        Self {
            field: field.to_owned(),
            destination: Box::new(destination),
        }
    }

    async fn store(&self, ctx: &mut Context) -> Result<PathBuf, String> {
        let file = ctx.form_file(&self.field).map_err(|err| err.to_string())?;
        let path = (self.destination)(file);
        tokio::fs::write(&path, &file.data)
            .await
            .map_err(|err| err.to_string())?;
        Ok(path)
    }

    async fn serve(&self, ctx: &mut Context) {
        match self.store(ctx).await {
            Ok(path) => {
                tracing::debug!(file = %path.display(), "stored upload");
                ctx.text(200, "upload succeeded");
            }
            Err(err) => {
                tracing::warn!(field = %self.field, error = %err, "upload failed");
                ctx.text(500, format!("upload failed: {err}"));
            }
        }
    }
}

impl Handler for FileUploader {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(self.serve(ctx))
    }
}

/// Escapes a name for use inside a quoted `filename` parameter.
fn quote_filename(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(ch);
            }
            ch if ch.is_control() => quoted.push('_'),
            ch => quoted.push(ch),
        }
    }
    quoted
}

/// Resolves `file` below `dir`, answering with the status to reject it with.
async fn resolve(dir: &Path, file: &str) -> Result<PathBuf, u16> {
    let path = tokio::fs::canonicalize(dir.join(file))
        .await
        .map_err(|_| 404u16)?;
    if !path.starts_with(dir) {
        return Err(403);
    }
    let meta = tokio::fs::metadata(&path).await.map_err(|_| 404u16)?;
    if !meta.is_file() {
        return Err(404);
    }
    Ok(path)
}

async fn load(path: &Path) -> io::Result<CachedFile> {
    let data = tokio::fs::read(path).await?;
    let last_modified = tokio::fs::metadata(path)
        .await
        .and_then(|meta| meta.modified())
        .ok()
        .filter(|modified| *modified >= SystemTime::UNIX_EPOCH)
        .map(httpdate::fmt_http_date);
    Ok(CachedFile {
        data,
        last_modified,
    })
}

fn reject(ctx: &mut Context, status: u16) {
    let message = match status {
        403 => "forbidden",
        404 => "file not found",
        _ => "internal server error",
    };
    ctx.text(status, message);
}
