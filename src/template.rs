use crate::error::TemplateError;
use crate::http::Request;
use futures::future::BoxFuture;
use serde_json::Value;

/// Renders named templates for [`Context::render`].
///
/// The server does not ship an engine; plug one in with
/// [`Server::template_engine`].
///
/// [`Context::render`]: crate::context::Context::render
/// [`Server::template_engine`]: crate::server::Server::template_engine
pub trait TemplateEngine: Send + Sync + 'static {
    fn render<'a>(
        &'a self,
        request: &'a Request,
        template: &'a str,
        data: &'a Value,
    ) -> BoxFuture<'a, Result<Vec<u8>, TemplateError>>;
}
