use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::io::Cursor;

#[derive(Debug, Clone)]
pub enum ServiceError {
    DocumentNotFound(String),
    /// The cloud answered, but not with success
    Upstream(String),
    InvalidDocument(String),
    NoReference,
    Engine(powerocean_rs::Error),
    FormatError,
}

impl From<powerocean_rs::Error> for ServiceError {
    fn from(error: powerocean_rs::Error) -> Self {
        ServiceError::Engine(error)
    }
}

impl ServiceError {
    fn status(&self) -> Status {
        match self {
            ServiceError::DocumentNotFound(_) | ServiceError::NoReference => Status::NotFound,
            ServiceError::Upstream(_) => Status::BadGateway,
            _ => Status::InternalServerError,
        }
    }

    fn body(&self) -> String {
        match self {
            ServiceError::DocumentNotFound(path) => format!(
                "<html><body><h3>404 Not Found</h3>No telemetry document at <code>{}</code></body></html>",
                path
            ),
            ServiceError::NoReference => {
                "<html><body><h3>404 Not Found</h3>No reference document configured (<code>PO_REFERENCE</code>)</body></html>".to_string()
            }
            ServiceError::Upstream(s) => format!(
                "<html><body><h3>502 Bad Gateway</h3>Upstream API response: <code>{}</code></body></html>",
                s
            ),
            ServiceError::Engine(e) => format!(
                "<html><body><h3>Extraction failed</h3><code>{}</code></body></html>",
                e
            ),
            _ => format!(
                "<html><body><h3>Unknown exception</h3><code>{:?}</code></body></html>",
                self
            ),
        }
    }
}

impl<'r> Responder<'r, 'static> for ServiceError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        log::error!("{:?}", self);
        let error = self.body();
        Response::build()
            .status(self.status())
            .sized_body(error.len(), Cursor::new(error))
            .header(ContentType::new("text", "html"))
            .ok()
    }
}
