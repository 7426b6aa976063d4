use crate::error::SessionError;
use crate::http::{Request, Response};
use crate::session::{Propagator, SessionResult};

/// Carries the session id in a cookie.
#[derive(Clone)]
pub struct CookiePropagator {
    cookie_name: String,
}

impl CookiePropagator {
    pub fn new(cookie_name: &str) -> Self {
        Self {
            cookie_name: cookie_name.to_owned(),
        }
    }
}

impl Default for CookiePropagator {
    fn default() -> Self {
        Self::new("sessid")
    }
}

impl Propagator for CookiePropagator {
    fn inject(&self, id: &str, response: &mut Response) -> SessionResult<()> {
        if id.is_empty() || id.contains(|c: char| c == ';' || c == ',' || c.is_whitespace()) {
            return Err(SessionError::InvalidValue);
        }
        response.append_header(
            "Set-Cookie",
            format!("{}={}; Path=/; HttpOnly", self.cookie_name, id),
        );
        Ok(())
    }

    fn extract(&self, request: &Request) -> SessionResult<String> {
        request
            .header("cookie")
            .into_iter()
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.trim_matches('"').to_owned())
            .filter(|value| !value.is_empty())
            .ok_or(SessionError::NoCookie)
    }

    fn remove(&self, response: &mut Response) -> SessionResult<()> {
        response.append_header(
            "Set-Cookie",
            format!("{}=; Path=/; Max-Age=0", self.cookie_name),
        );
        Ok(())
    }
}
