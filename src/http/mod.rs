pub(crate) mod multipart;
pub(crate) mod request;
pub(crate) mod response;

pub use multipart::FormFile;
pub use request::{Body, Method, Request};
pub use response::{reason_phrase, Response, ResponseSink};
