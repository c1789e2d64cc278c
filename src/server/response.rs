//! Conversion between `tiny_http` requests and handler types.

use anyhow::{Result, anyhow};
use tiny_http::{Header, Request, Response, StatusCode};

use super::handler::{Incoming, Method, Reply};

/// Read the parts of a request the handler needs.
pub fn incoming(request: &Request) -> Incoming {
    let method = match request.method() {
        tiny_http::Method::Get => Method::Get,
        tiny_http::Method::Head => Method::Head,
        other => Method::Other(other.as_str().to_string()),
    };
    let accept = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Accept"))
        .map(|h| h.value.to_string());

    Incoming {
        method,
        url: request.url().to_string(),
        accept,
    }
}

/// Send a reply. HEAD replies keep their headers but carry no body.
pub fn respond(request: Request, reply: Reply) -> Result<()> {
    let headers = reply
        .headers
        .iter()
        .map(|(name, value)| make_header(name, value))
        .collect::<Result<Vec<_>>>()?;

    let mut response = Response::from_data(reply.body).with_status_code(StatusCode(reply.status));
    for header in headers {
        response.add_header(header);
    }
    request.respond(response)?;
    Ok(())
}

/// 503 sent while shutting down.
pub fn respond_unavailable(request: Request) -> Result<()> {
    let response = Response::from_string("503 Service Unavailable")
        .with_status_code(StatusCode(503))
        .with_header(make_header("Content-Type", crate::utils::mime::types::PLAIN)?);
    request.respond(response)?;
    Ok(())
}

fn make_header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|()| anyhow!("invalid header {name}: {value}"))
}
