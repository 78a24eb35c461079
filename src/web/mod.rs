//! Embedded web dashboard for custpulse.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - A single-page app for loading customers, running an analysis and
//!   browsing the dashboard
//! - JSON API endpoints over the session [`Controller`]
//!
//! Launched via `custpulse web` (default: `http://127.0.0.1:9747`).

mod api;
mod frontend;

use std::io::{Cursor, Read};

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

pub use api::{ApiReply, WebState};

use crate::config::schema::CustpulseConfig;
use crate::llm::gemini::GeminiClient;
use crate::state::Controller;

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the dashboard server on the given address.
///
/// Blocks the current thread. Requests are handled one at a time, so an
/// analysis request holds the server until the service answers.
pub fn serve(addr: &str, config: CustpulseConfig) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("custpulse dashboard running at http://{addr}");
    if config.analysis.api_key().is_none() {
        println!("warning: no API key configured; analysis requests will fail");
    }
    println!("Press Ctrl+C to stop.\n");

    let url = format!("http://{addr}");
    let _ = open_browser(&url);

    let service = GeminiClient::from_config(&config.analysis);
    let mut state = WebState {
        controller: Controller::new(),
        config,
        service: Box::new(service),
    };

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let resp = match read_body(&mut request) {
            Ok(body) => dispatch(&mut state, &method, &url, body.as_deref()),
            Err(e) => reply_response(ApiReply::error(
                400,
                &format!("failed to read request body: {e}"),
            )),
        };
        let status = resp.status_code().0;
        let _ = request.respond(resp);

        println!(
            "{} {} {} {}",
            method,
            url,
            status,
            chrono::Local::now().format("%H:%M:%S")
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Raw body of a `PUT` or `POST`; `None` for other methods.
fn read_body(request: &mut Request) -> std::io::Result<Option<Vec<u8>>> {
    if !matches!(request.method(), Method::Put | Method::Post) {
        return Ok(None);
    }
    let mut buf = Vec::new();
    request.as_reader().read_to_end(&mut buf)?;
    Ok(Some(buf))
}

/// Dispatch an incoming request to the appropriate handler.
fn dispatch(
    state: &mut WebState,
    method: &Method,
    url: &str,
    body: Option<&[u8]>,
) -> Response<Cursor<Vec<u8>>> {
    let path = url.split('?').next().unwrap_or(url);

    let body = match body.map(std::str::from_utf8).transpose() {
        Ok(body) => body,
        Err(e) => {
            return reply_response(ApiReply::error(
                400,
                &format!("request body is not valid UTF-8: {e}"),
            ));
        }
    };

    let reply = match (method, path) {
        (&Method::Get, "/") | (&Method::Get, "/index.html") => return serve_frontend(),

        (&Method::Get, "/api/state") => api::get_state(state),
        (&Method::Post, "/api/customers/csv") => api::post_customers_csv(state, body.unwrap_or("")),
        (&Method::Post, "/api/customers") => api::post_customer(state, body.unwrap_or("{}")),
        (&Method::Post, "/api/analyze") => api::post_analyze(state),
        (&Method::Post, "/api/clear") => api::post_clear(state),
        (&Method::Put, "/api/view") => api::put_view(state, body.unwrap_or("{}")),
        (&Method::Get, "/api/dashboard") => api::get_dashboard(state),
        (&Method::Get, "/api/health") => api::get_health(state),

        _ => ApiReply::error(404, "not found"),
    };

    reply_response(reply)
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn reply_response(reply: ApiReply) -> Response<Cursor<Vec<u8>>> {
    Response::from_data(reply.body.to_string().into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(reply.status))
}

/// Serve the embedded single-page frontend.
fn serve_frontend() -> Response<Cursor<Vec<u8>>> {
    Response::from_data(frontend::INDEX_HTML.as_bytes().to_vec())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8")
        .expect("static header must be valid")
}

fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8")
        .expect("static header must be valid")
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}
