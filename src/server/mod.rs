use std::io::Cursor;
use std::sync::Arc;
use std::thread;

use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::store::{StoreError, TaskStore};

/// Error type for the HTTP layer
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("could not bind {addr}: {reason}")]
    Bind { addr: String, reason: String },
}

/// The HTTP daemon: accepts requests and dispatches the GTD API to the
/// task store, one OS thread per request.
pub struct Daemon {
    server: Server,
    store: Arc<TaskStore>,
}

impl Daemon {
    pub fn bind(addr: &str, store: Arc<TaskStore>) -> Result<Daemon, ServerError> {
        let server = Server::http(addr).map_err(|e| ServerError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Daemon { server, store })
    }

    /// The port actually bound (useful when binding port 0).
    pub fn port(&self) -> u16 {
        self.server
            .server_addr()
            .to_ip()
            .map(|a| a.port())
            .unwrap_or(0)
    }

    /// Accept loop. Each request is handled on its own thread, so a
    /// slow title fetch never blocks unrelated file operations.
    pub fn run(self) {
        let Daemon { server, store } = self;
        loop {
            let request = match server.recv() {
                Ok(request) => request,
                Err(e) => {
                    log::error!("accept failed: {}", e);
                    continue;
                }
            };
            let store = Arc::clone(&store);
            thread::spawn(move || handle_request(request, &store));
        }
    }
}

fn handle_request(mut request: Request, store: &TaskStore) {
    let method = request.method().clone();
    let raw_url = request.url().to_string();
    let (path, query) = match raw_url.split_once('?') {
        Some((p, q)) => (p, q),
        None => (raw_url.as_str(), ""),
    };

    let mut body = String::new();
    if matches!(method, Method::Put | Method::Post)
        && let Err(e) = request.as_reader().read_to_string(&mut body)
    {
        // a body we could not read must never reach the store
        log::error!("reading request body for {} {}: {}", method, raw_url, e);
        let response = error_json(StatusCode(400), "could not read request body");
        log::info!("{} {} -> {}", method, raw_url, response.status_code().0);
        let _ = request.respond(response);
        return;
    }

    let wants_json = header_contains(&request, "Accept", "application/json");
    let sent_json = header_contains(&request, "Content-Type", "application/json");

    let response = match (&method, path) {
        (Method::Get, "/api/gtd/tasks") => get_tasks(store, wants_json),
        (Method::Put | Method::Post, "/api/gtd/tasks") => update_tasks(store, &body, sent_json),
        (Method::Delete, "/api/gtd/tasks") => clear_tasks(store),
        (Method::Get, "/api/gtd/title") => resolve_title(store, query),
        _ => error_json(StatusCode(404), "not found"),
    };

    log::info!("{} {} -> {}", method, raw_url, response.status_code().0);
    let _ = request.respond(response);
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn get_tasks(store: &TaskStore, wants_json: bool) -> Response<Cursor<Vec<u8>>> {
    if wants_json {
        match store.read() {
            Ok(doc) => match serde_json::to_string(&doc) {
                Ok(json) => respond_json(StatusCode(200), &json),
                Err(e) => {
                    log::error!("serializing tasks: {}", e);
                    error_json(StatusCode(500), "could not serialize tasks")
                }
            },
            Err(e) => store_failure(&e),
        }
    } else {
        match store.read_markdown() {
            Ok(text) => Response::from_string(text).with_header(markdown_header()),
            Err(e) => store_failure(&e),
        }
    }
}

fn update_tasks(store: &TaskStore, body: &str, sent_json: bool) -> Response<Cursor<Vec<u8>>> {
    let result = if sent_json {
        store.replace_json(body)
    } else {
        store.replace_markdown(body)
    };
    match result {
        Ok(_) => respond_json(StatusCode(200), r#"{"message":"Tasks updated successfully"}"#),
        Err(e) => store_failure(&e),
    }
}

fn clear_tasks(store: &TaskStore) -> Response<Cursor<Vec<u8>>> {
    match store.clear() {
        Ok(()) => respond_json(StatusCode(200), r#"{"message":"Tasks cleared successfully"}"#),
        Err(e) => store_failure(&e),
    }
}

fn resolve_title(store: &TaskStore, query: &str) -> Response<Cursor<Vec<u8>>> {
    let url = url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned());
    match url {
        Some(url) if !url.is_empty() => {
            let title = store.resolve_title(&url);
            let payload = serde_json::json!({ "title": title });
            respond_json(StatusCode(200), &payload.to_string())
        }
        _ => error_json(StatusCode(400), "missing url parameter"),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Map a store failure to a classification the client may see. The full
/// error (with paths) goes to the log only.
fn store_failure(err: &StoreError) -> Response<Cursor<Vec<u8>>> {
    log::error!("store operation failed: {}", err);
    match err {
        StoreError::InvalidDocument(reason) => {
            error_json(StatusCode(400), &format!("invalid document: {}", reason))
        }
        StoreError::Read { .. } => error_json(StatusCode(500), "could not read task file"),
        StoreError::Write { .. } => error_json(StatusCode(500), "could not write task file"),
        StoreError::Lock(_) => error_json(StatusCode(500), "task file is busy"),
    }
}

fn respond_json(status: StatusCode, body: &str) -> Response<Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(Header::from_bytes("Content-Type", "application/json").unwrap())
}

fn error_json(status: StatusCode, message: &str) -> Response<Cursor<Vec<u8>>> {
    let payload = serde_json::json!({ "error": message });
    respond_json(status, &payload.to_string())
}

fn markdown_header() -> Header {
    Header::from_bytes("Content-Type", "text/markdown; charset=utf-8").unwrap()
}

fn header_contains(request: &Request, field: &str, needle: &str) -> bool {
    request.headers().iter().any(|h| {
        h.field.as_str().as_str().eq_ignore_ascii_case(field)
            && h.value.as_str().contains(needle)
    })
}
