use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Read};
use thiserror::Error;
use crate::config::Config;

const MAX_LINE_LENGTH: u64 = 8 * 1024;
const MAX_HEADERS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Method::Get => "GET",
            Method::Post => "POST"
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `name=value` (or bare `name`) token from a query string or form body.
/// No percent-decoding is done; the token is kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub value: String
}

impl Argument {
    pub fn parse(token: &str) -> Argument {
        match token.split_once('=') {
            Some((name, value)) => Argument { name: name.to_string(), value: value.to_string() },
            None => Argument { name: token.to_string(), value: String::new() }
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Splits on `&`, keeping empty tokens except trailing ones. Input without
/// any `&` is always exactly one token, even when empty.
pub fn parse_arguments(input: &str) -> Vec<Argument> {
    if !input.contains('&') {
        return vec![Argument::parse(input)];
    }
    let mut tokens: Vec<&str> = input.split('&').collect();
    while tokens.last() == Some(&"") {
        tokens.pop();
    }
    tokens.into_iter().map(Argument::parse).collect()
}

/// Header fields keyed by lower-cased name.
#[derive(Debug, Default)]
pub struct Headers {
    headers: HashMap<String, String>
}

impl Headers {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn host(&self) -> String {
        self.get("Host").map(str::to_lowercase).unwrap_or_default()
    }

    pub fn referer(&self) -> String {
        self.get("Referer").unwrap_or_default().to_string()
    }

    pub fn user_agent(&self) -> String {
        self.get("User-Agent").unwrap_or_default().to_string()
    }

    pub fn content_length(&self) -> Result<usize, BadRequest> {
        match self.get("Content-Length") {
            Some(value) => value.parse().map_err(|_| BadRequest::InvalidContentLength(value.to_string())),
            None => Ok(0)
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.headers.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    pub method: Method,
    /// Lower-cased, query stripped, default file already appended.
    pub path: String,
    pub arguments: Vec<Argument>,
    pub host: String,
    pub referer: String,
    pub user_agent: String
}

#[derive(Debug)]
pub enum Request {
    /// The peer closed the connection before sending a request line.
    EndRequests,
    Supported(InboundRequest),
    MethodNotSupported(String)
}

/// Failures that drop the connection without a response.
#[derive(Debug, Error)]
pub enum BadRequest {
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
    #[error("unsupported protocol version: {0:?}")]
    UnsupportedProtocolVersion(String),
    #[error("request line or header too long")]
    LineTooLong,
    #[error("too many header lines")]
    TooManyHeaders,
    #[error("invalid content length: {0:?}")]
    InvalidContentLength(String),
    #[error("body of {length} bytes exceeds the {max} byte limit")]
    BodyTooLarge { length: usize, max: usize },
    #[error("error reading request: {0}")]
    Io(#[from] io::Error)
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub default_file: String,
    pub max_body_bytes: usize
}

impl ParseOptions {
    pub fn from_config(config: &Config) -> ParseOptions {
        ParseOptions {
            default_file: config.default_file.clone(),
            max_body_bytes: config.max_body_bytes
        }
    }
}

pub fn parse_request<R: BufRead>(reader: &mut R, options: &ParseOptions) -> Result<Request, BadRequest> {
    let line = match read_line(reader)? {
        Some(line) => line,
        None => return Ok(Request::EndRequests)
    };
    if line.trim().is_empty() {
        return Ok(Request::EndRequests);
    }

    let (method, target) = parse_request_line(&line)?;
    let method = match method.as_str() {
        "GET" => Method::Get,
        "POST" => Method::Post,
        _ => {
            drain_headers(reader);
            return Ok(Request::MethodNotSupported(method));
        }
    };
    let headers = parse_headers(reader)?;

    let (path, mut arguments) = split_target(&target, method, &options.default_file);
    if method == Method::Post {
        let body = read_body(reader, headers.content_length()?, options.max_body_bytes)?;
        arguments = parse_arguments(&body);
    }

    Ok(Request::Supported(InboundRequest {
        method,
        path,
        arguments,
        host: headers.host(),
        referer: headers.referer(),
        user_agent: headers.user_agent()
    }))
}

/// Reads one line, decoding bytes that are not UTF-8 lossily.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, BadRequest> {
    let mut line = Vec::new();
    match reader.by_ref().take(MAX_LINE_LENGTH).read_until(b'\n', &mut line)? {
        0 => Ok(None),
        n if n as u64 == MAX_LINE_LENGTH && line.last() != Some(&b'\n') => Err(BadRequest::LineTooLong),
        _ => Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

/// Returns the upper-cased method and the raw target.
fn parse_request_line(input: &str) -> Result<(String, String), BadRequest> {
    let mut parts = input.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(target), Some(version)) => {
            if !version.eq_ignore_ascii_case("HTTP/1.1") {
                return Err(BadRequest::UnsupportedProtocolVersion(version.to_string()));
            }
            Ok((method.to_uppercase(), target.to_string()))
        },
        _ => Err(BadRequest::MalformedRequestLine(input.trim_end().to_string()))
    }
}

/// Reads header lines until one without a colon (normally the blank line
/// ending the head) or end of input.
fn parse_headers<R: BufRead>(reader: &mut R) -> Result<Headers, BadRequest> {
    let mut headers = HashMap::new();
    let mut count = 0;
    while let Some(line) = read_line(reader)? {
        let index = match line.find(':') {
            Some(index) => index,
            None => break
        };
        count += 1;
        if count > MAX_HEADERS {
            return Err(BadRequest::TooManyHeaders);
        }
        let (name, value) = line.split_at(index);
        headers.insert(name.trim().to_ascii_lowercase(), value[1..].trim().to_string());
    }
    Ok(Headers { headers })
}

/// Skips the header block of a request that is answered without looking at it,
/// so the peer reads the response instead of a reset. Never fails; anything
/// odd simply ends the drain.
fn drain_headers<R: BufRead>(reader: &mut R) {
    for _ in 0..MAX_HEADERS {
        match read_line(reader) {
            Ok(Some(ref line)) if line.contains(':') => {},
            _ => return
        }
    }
}

fn split_target(target: &str, method: Method, default_file: &str) -> (String, Vec<Argument>) {
    let (path, arguments) = match (method, target.split_once('?')) {
        (Method::Get, Some((path, query))) => (path, parse_arguments(query)),
        _ => (target, Vec::new())
    };

    let mut path = path.to_string();
    if path.ends_with('/') {
        path.push_str(default_file);
    }
    (path.to_lowercase(), arguments)
}

fn read_body<R: Read>(reader: &mut R, length: usize, max: usize) -> Result<String, BadRequest> {
    if length > max {
        return Err(BadRequest::BodyTooLarge { length, max });
    }
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    NotImplemented,
    Other(u16)
}

impl Status {
    pub fn code(&self) -> u16 {
        match *self {
            Status::Ok => 200,
            Status::NotFound => 404,
            Status::NotImplemented => 501,
            Status::Other(code) => code
        }
    }

    pub fn reason(&self) -> &'static str {
        match *self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
            Status::NotImplemented => "Not Implemented",
            Status::Other(_) => "Unknown"
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}
