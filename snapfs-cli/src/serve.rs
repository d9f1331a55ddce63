//! HTTP file server over the snapshot filesystem
//!
//! Every `GET`/`HEAD` path maps onto [`VirtualFilesystem::open`]:
//! directories render as a plain HTML index, files stream their contents.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use futures::{stream, Stream, TryStreamExt};
use snapfs_core::{Context, DirectoryListing, SnapError, SnapResult};
use snapfs_vfs::{FileReader, Handle, VirtualFilesystem};
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info};

use crate::range::ByteRange;

/// Bytes read per body frame
const STREAM_BUFFER: usize = 64 * 1024;

#[derive(Clone)]
pub struct ServeState {
    fs: Arc<VirtualFilesystem>,
    ctx: Context,
}

pub fn router(fs: Arc<VirtualFilesystem>, ctx: Context) -> Router {
    Router::new()
        .route("/", get(serve_request))
        .route("/{*path}", get(serve_request))
        .with_state(ServeState { fs, ctx })
}

/// Serve until Ctrl-C or SIGTERM
pub async fn serve(fs: Arc<VirtualFilesystem>, listen: SocketAddr) -> SnapResult<()> {
    let listener = TcpListener::bind(listen).await?;
    let addr = listener.local_addr()?;
    let ctx = Context::background();

    println!("Now serving the repository at http://{addr}/");
    println!("When finished, quit with Ctrl-c here.");
    info!(%addr, snapshots = fs.catalog().len(), "serving");

    axum::serve(listener, router(fs, ctx.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ctx.cancel();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}

/// Filesystem error as an HTTP response
pub struct ServeError(SnapError);

impl From<SnapError> for ServeError {
    fn from(e: SnapError) -> Self {
        ServeError(e)
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        if self.0.is_not_found() {
            debug!(error = %self.0, "not found");
            (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
        } else {
            error!(error = %self.0, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error\n").into_response()
        }
    }
}

async fn serve_request(
    State(state): State<ServeState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ServeError> {
    let raw = uri.path();
    let decoded = urlencoding::decode(raw).map_err(|_| SnapError::InvalidPath(raw.to_string()))?;

    let relative = decoded.strip_prefix('/').unwrap_or(&decoded);
    let (path, trailing_slash) = match relative.strip_suffix('/') {
        Some(p) => (p, true),
        None => (relative, false),
    };
    let path = if path.is_empty() { "." } else { path };
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    let ctx = state.ctx.child();
    match state.fs.open(&ctx, path).await? {
        Handle::Directory(dir) => {
            if !trailing_slash && path != "." {
                return Ok(redirect(format!("{raw}/")));
            }
            Ok(directory_page(dir))
        }
        Handle::File(file) => {
            if trailing_slash {
                return Ok(redirect(raw.trim_end_matches('/').to_string()));
            }
            Ok(file_response(file, range))
        }
    }
}

fn redirect(location: String) -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

fn directory_page(dir: DirectoryListing) -> Response {
    let mut html = String::from(
        "<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n",
    );
    for entry in dir.into_entries() {
        let suffix = if entry.is_dir { "/" } else { "" };
        let _ = writeln!(
            html,
            "<a href=\"./{}{suffix}\">{}{suffix}</a>",
            urlencoding::encode(&entry.name),
            escape_html(&entry.name),
        );
    }
    html.push_str("</pre>\n");

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response()
}

fn file_response(file: FileReader, range: Option<&str>) -> Response {
    let size = file.size();
    let range = ByteRange::parse(range, size);

    let (status, start) = match range {
        ByteRange::Full => (StatusCode::OK, 0),
        ByteRange::Partial { start, .. } => (StatusCode::PARTIAL_CONTENT, start),
        ByteRange::Unsatisfiable => {
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{size}"))],
            )
                .into_response();
        }
    };
    let len = range.len(size);

    let headers = [
        (header::CONTENT_TYPE, content_type(file.name()).to_string()),
        (header::CONTENT_LENGTH, len.to_string()),
        (header::ACCEPT_RANGES, "bytes".to_string()),
    ];
    let body = Body::from_stream(body_stream(file, start, start + len));
    let mut response = (status, headers, body).into_response();

    if let Some(value) = range.content_range(size) {
        if let Ok(value) = HeaderValue::from_str(&value) {
            response.headers_mut().insert(header::CONTENT_RANGE, value);
        }
    }
    response
}

/// File bytes in `start..end`, read lazily as the client consumes them
fn body_stream(
    file: FileReader,
    start: u64,
    end: u64,
) -> impl Stream<Item = SnapResult<Bytes>> + Send + 'static {
    stream::try_unfold((file, start), move |(file, pos)| next_frame(file, pos, end))
        .inspect_err(|e| error!(error = %e, "read failed while streaming"))
}

async fn next_frame(
    file: FileReader,
    pos: u64,
    end: u64,
) -> SnapResult<Option<(Bytes, (FileReader, u64))>> {
    if pos >= end {
        return Ok(None);
    }
    let want = (end - pos).min(STREAM_BUFFER as u64) as usize;
    let mut buf = vec![0u8; want];
    let n = file.read_at(&mut buf, pos).await?;
    if n == 0 {
        // Content-Length is already sent, so a short file must fail the body
        return Err(SnapError::Corrupted(format!("{}: ended at {pos} of {end}", file.name())));
    }
    buf.truncate(n);
    Ok(Some((Bytes::from(buf), (file, pos + n as u64))))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn content_type(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("txt" | "md" | "log") => "text/plain; charset=utf-8",
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("xml") => "text/xml; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
