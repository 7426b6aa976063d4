//! Per-request state shared by the handler and every middleware around it.
//!
//! A [`Context`] is created by the server for each inbound request, handed
//! through the middleware chain by mutable reference, and dropped once the
//! response has been flushed.

use crate::error::{ContextError, TemplateError};
use crate::http::multipart::{parse_multipart, FormFile};
use crate::http::request::{parse_query, parse_urlencoded, Values};
use crate::http::{Request, Response};
use crate::template::TemplateEngine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;

pub struct Context {
    request: Request,
    response: Response,
    path_params: HashMap<String, String>,
    query: Option<Values>,
    form: Option<Values>,
    files: Option<Vec<FormFile>>,
    matched_route: Option<String>,
    templates: Option<Arc<dyn TemplateEngine>>,
    user_values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::default(),
            path_params: HashMap::new(),
            query: None,
            form: None,
            files: None,
            matched_route: None,
            templates: None,
            user_values: HashMap::new(),
        }
    }

    pub fn with_template_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.templates = Some(engine);
        self
    }

    pub(crate) fn set_route(&mut self, route: &str, params: HashMap<String, String>) {
        self.matched_route = Some(route.to_owned());
        self.path_params = params;
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// The pattern the request was routed by, e.g. `/order/detail/:id`.
    pub fn matched_route(&self) -> Option<&str> {
        self.matched_route.as_deref()
    }

    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    pub fn status(&self) -> u16 {
        self.response.status
    }

    pub fn set_status(&mut self, status: u16) -> &mut Self {
        self.response.status = status;
        self
    }

    pub fn body(&self) -> &[u8] {
        &self.response.body
    }

    pub fn set_body<T: Into<Vec<u8>>>(&mut self, body: T) -> &mut Self {
        self.response.body = body.into();
        self
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.response.header(name, value);
        self
    }

    /// Responds with a plain text body.
    pub fn text<T: Into<String>>(&mut self, status: u16, body: T) {
        self.response
            .status(status)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body.into());
    }

    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, ContextError> {
        serde_json::from_slice(self.request.body.as_bytes()).map_err(ContextError::Decode)
    }

    /// Reads a form field. Urlencoded body fields win over query fields and
    /// an absent key yields an empty string.
    pub fn form_value(&mut self, key: &str) -> Result<String, ContextError> {
        if self.form.is_none() {
            let mut form = if self.request.body.is_form_urlencoded() {
                parse_urlencoded(&self.request.body.as_string())?
            } else {
                Values::new()
            };
            for (name, values) in parse_urlencoded(&self.request.query)? {
                form.entry(name).or_default().extend(values);
            }
            self.form = Some(form);
        }

        Ok(self
            .form
            .as_ref()
            .and_then(|form| form.get(key))
            .and_then(|values| values.first())
            .cloned()
            .unwrap_or_default())
    }

    /// Returns the first `multipart/form-data` part named `field`.
    pub fn form_file(&mut self, field: &str) -> Result<&FormFile, ContextError> {
        if self.files.is_none() {
            let body = &self.request.body;
            self.files = Some(parse_multipart(body.content_type(), body.as_bytes())?);
        }
        self.files
            .iter()
            .flatten()
            .find(|part| part.name == field)
            .ok_or_else(|| ContextError::key_not_found(field))
    }

    /// Returns the first value of a query parameter.
    pub fn query_value(&mut self, key: &str) -> Result<String, ContextError> {
        let query = self
            .query
            .get_or_insert_with(|| parse_query(&self.request.query));
        query
            .get(key)
            .and_then(|values| values.first())
            .cloned()
            .ok_or_else(|| ContextError::key_not_found(key))
    }

    pub fn path_value(&self, key: &str) -> Result<&str, ContextError> {
        self.path_params
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ContextError::key_not_found(key))
    }

    /// Serializes `value` and only then replaces status and body, so a
    /// failed encoding leaves the response untouched.
    pub fn respond_json<T: Serialize + ?Sized>(
        &mut self,
        status: u16,
        value: &T,
    ) -> Result<(), ContextError> {
        let body = serde_json::to_vec(value).map_err(ContextError::Encode)?;
        self.response
            .status(status)
            .header("Content-Type", "application/json")
            .body(body);
        Ok(())
    }

    pub async fn render<T: Serialize + ?Sized>(
        &mut self,
        template: &str,
        data: &T,
    ) -> Result<(), ContextError> {
        let rendered = match (&self.templates, serde_json::to_value(data)) {
            (None, _) => Err(ContextError::Template(TemplateError::NoEngine)),
            (Some(_), Err(err)) => Err(ContextError::Encode(err)),
            (Some(engine), Ok(data)) => engine
                .render(&self.request, template, &data)
                .await
                .map_err(ContextError::Template),
        };

        match rendered {
            Ok(bytes) => {
                self.response.status(200).body(bytes);
                Ok(())
            }
            Err(err) => {
                self.response.status(500);
                Err(err)
            }
        }
    }

    pub fn set_user_value<T: Any + Send + Sync>(&mut self, key: &str, value: T) {
        self.user_values.insert(key.to_owned(), Box::new(value));
    }

    pub fn user_value<T: Any>(&self, key: &str) -> Result<&T, ContextError> {
        self.user_values
            .get(key)
            .ok_or_else(|| ContextError::key_not_found(key))?
            .downcast_ref::<T>()
            .ok_or_else(|| type_mismatch::<T>(key))
    }

    pub fn user_value_mut<T: Any>(&mut self, key: &str) -> Result<&mut T, ContextError> {
        self.user_values
            .get_mut(key)
            .ok_or_else(|| ContextError::key_not_found(key))?
            .downcast_mut::<T>()
            .ok_or_else(|| type_mismatch::<T>(key))
    }

    pub fn remove_user_value(&mut self, key: &str) -> bool {
        self.user_values.remove(key).is_some()
    }
}

fn type_mismatch<T>(key: &str) -> ContextError {
    ContextError::TypeMismatch {
        key: key.to_owned(),
        expected: type_name::<T>(),
    }
}
