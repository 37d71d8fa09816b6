use std::io::{self, Read, Write};
use bufstream::BufStream;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use super::content_manager::{Content, ContentError, ContentManager, Fallback};
use super::http::{parse_request, BadRequest, ParseOptions, Request, Status};

pub const SERVER_NAME: &str = "rust-cgi-server";
const NOT_FOUND_TEXT: &[u8] = b"Could not load 404 page.";
const NOT_SUPPORTED_TEXT: &[u8] = b"Method not supported.";

/// Why a connection ended without a complete response.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("request dropped: {0}")]
    BadRequest(#[from] BadRequest),
    #[error("no response sent: {0}")]
    Content(#[from] ContentError),
    #[error("error while writing response: {0}")]
    Write(#[source] io::Error)
}

pub struct Response {
    pub status: Status,
    pub content_type: &'static str,
    pub body: Vec<u8>
}

impl Response {
    fn ok(content: Content) -> Response {
        Response { status: Status::Ok, content_type: content.content_type, body: content.body }
    }

    /// The configured page for `which`, or a short plain-text body when that
    /// page cannot be read.
    fn fallback<M: ContentManager + ?Sized>(manager: &M, which: Fallback) -> Response {
        let (status, text) = match which {
            Fallback::NotFound => (Status::NotFound, NOT_FOUND_TEXT),
            Fallback::NotSupported => (Status::NotImplemented, NOT_SUPPORTED_TEXT)
        };
        match manager.fallback_page(which) {
            Ok(body) => Response { status, content_type: "text/html", body },
            Err(e) => {
                warn!("error loading the {} page: {}", status, e);
                Response { status, content_type: "text/plain", body: text.to_vec() }
            }
        }
    }
}

pub fn handle_client<M, S>(stream: S, manager: &M, options: &ParseOptions) -> Result<(), ConnectionError>
    where M: ContentManager + ?Sized, S: Read + Write {
    let mut buffed = BufStream::new(stream);

    let response = match parse_request(&mut buffed, options)? {
        Request::EndRequests => {
            debug!("connection closed before a request line");
            return Ok(());
        }
        Request::MethodNotSupported(method) => {
            debug!("method {} not implemented", method);
            Response::fallback(manager, Fallback::NotSupported)
        }
        Request::Supported(request) => {
            match manager.find_content(&request) {
                Ok(content) => {
                    let response = Response::ok(content);
                    info!("{} {} of type {} ({})", request.method, request.path, response.content_type, response.status);
                    response
                }
                Err(ContentError::NotFound(path)) => {
                    debug!("{} not found", path.display());
                    info!("{} {} ({})", request.method, request.path, Status::NotFound);
                    Response::fallback(manager, Fallback::NotFound)
                }
                Err(e) => return Err(e.into())
            }
        }
    };

    write_response(&mut buffed, &response).map_err(ConnectionError::Write)?;
    buffed.flush().map_err(ConnectionError::Write)
}

/// Writes the status line and headers, then the body verbatim.
pub fn write_response<W: Write>(out: &mut W, response: &Response) -> io::Result<()> {
    write!(out, "HTTP/1.1 {}\r\n", response.status)?;
    write!(out, "Server: {}\r\n", SERVER_NAME)?;
    write!(out, "Date: {}\r\n", Utc::now().format("%a, %d %b %Y %H:%M:%S GMT"))?;
    write!(out, "Content-type: {}\r\n", response.content_type)?;
    write!(out, "Content-length: {}\r\n", response.body.len())?;
    write!(out, "Connection: close\r\n")?;
    write!(out, "\r\n")?;
    out.write_all(&response.body)
}

/// Logs a handler failure at a level matching how it ended.
pub fn report(result: Result<(), ConnectionError>) {
    match result {
        Ok(()) => {},
        Err(e @ ConnectionError::BadRequest(_)) => debug!("{}", e),
        Err(e) => error!("{}", e)
    }
}
