// =============================================================================
// server.rs — THE WORLD'S SMALLEST FREIGHT EXCHANGE
// =============================================================================
//
// Three endpoints served over raw TCP, because pulling in a web framework
// for one GET route felt like renting a warehouse to store a sandwich.
// We read one buffer, parse one request line, write one response, hang up.
// HTTP/1.1 keep-alive enthusiasts are invited to open a second connection.
//
// Every response carries Access-Control-Allow-Origin: * so the dashboard
// can fetch orders from whatever port the frontend dev server felt like
// using today.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::metrics::MetricsCollector;
use crate::models::EngineHealth;
use crate::pipeline::MatchPipeline;

/// Where a request line ends up after parsing. Everything the connection
/// handler needs to know, with the query already digested.
#[derive(Debug, PartialEq)]
pub enum Route {
    AvailableOrders {
        sample_size: usize,
        seed: Option<u64>,
    },
    Health,
    Metrics,
    NotFound,
    MethodNotAllowed,
    BadRequest(String),
}

/// Parse a method + request target into a Route.
///
/// The rules for sample_size come straight from the product contract:
/// a number that isn't positive is a valid way to ask for nothing (you
/// get an empty list), but a value that isn't a number at all is a 400.
/// Same deal for the optional seed, which must fit in a u64.
pub fn route_request(method: &str, target: &str, default_sample_size: usize) -> Route {
    if method != "GET" {
        return Route::MethodNotAllowed;
    }

    // The url crate wants absolute URLs; request targets arrive relative.
    let parsed = match Url::parse(&format!("http://orders.invalid{target}")) {
        Ok(url) => url,
        Err(_) => return Route::BadRequest("malformed request target".to_string()),
    };

    match parsed.path() {
        "/api/available-orders" => {
            let mut sample_size = default_sample_size as i64;
            let mut seed = None;

            for (key, value) in parsed.query_pairs() {
                match key.as_ref() {
                    "sample_size" => match value.parse::<i64>() {
                        Ok(n) => sample_size = n,
                        Err(_) => {
                            return Route::BadRequest(format!(
                                "sample_size must be an integer, got {value:?}"
                            ))
                        }
                    },
                    "seed" => match value.parse::<u64>() {
                        Ok(n) => seed = Some(n),
                        Err(_) => {
                            return Route::BadRequest(format!(
                                "seed must be a non-negative integer, got {value:?}"
                            ))
                        }
                    },
                    // Unknown parameters are ignored, not punished.
                    _ => {}
                }
            }

            Route::AvailableOrders {
                sample_size: sample_size.max(0) as usize,
                seed,
            }
        }
        "/health" => Route::Health,
        "/metrics" => Route::Metrics,
        _ => Route::NotFound,
    }
}

fn json_response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nAccess-Control-Allow-Origin: *\r\nContent-Length: {}\r\n\r\n{body}",
        body.len(),
    )
}

fn error_body(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// Serve orders until the shutdown flag flips.
pub async fn run_http_server(
    pipeline: Arc<MatchPipeline>,
    metrics: Arc<MetricsCollector>,
    port: u16,
    shutdown: &mut watch::Receiver<bool>,
) {
    let listener = match TcpListener::bind(("0.0.0.0", port)).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind order server on :{}: {}", port, e);
            return;
        }
    };

    info!("📡 Order server listening on http://0.0.0.0:{}", port);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _addr)) => {
                        let pipeline = Arc::clone(&pipeline);
                        let metrics = Arc::clone(&metrics);
                        tokio::spawn(async move {
                            handle_connection(stream, pipeline, metrics).await;
                        });
                    }
                    Err(e) => {
                        error!("Order server accept error: {}", e);
                    }
                }
            }
            _ = shutdown.changed() => {
                info!("Order server: shutting down");
                break;
            }
        }
    }
}

/// One connection, one request, one response. The 4 KiB read buffer is
/// more than any GET line we serve could need; anything longer gets
/// truncated and judged on its first four kilobytes.
async fn handle_connection(
    mut stream: TcpStream,
    pipeline: Arc<MatchPipeline>,
    metrics: Arc<MetricsCollector>,
) {
    let request_id = Uuid::new_v4();
    let started = Instant::now();
    metrics.increment_requests();

    let mut buf = [0u8; 4096];
    let bytes_read = match stream.read(&mut buf).await {
        Ok(0) => return,
        Ok(n) => n,
        Err(e) => {
            warn!(request_id = %request_id, "failed to read request: {}", e);
            metrics.increment_request_failures();
            return;
        }
    };

    let request = String::from_utf8_lossy(&buf[..bytes_read]);
    let mut request_line = request.lines().next().unwrap_or("").split_whitespace();
    let method = request_line.next().unwrap_or("");
    let target = request_line.next().unwrap_or("/");

    let route = route_request(method, target, pipeline.config().default_sample_size);

    let (status, body) = match route {
        Route::AvailableOrders { sample_size, seed } => {
            let views = pipeline.available_orders(sample_size, seed);
            let body = serde_json::to_string(&views).unwrap_or_else(|_| "[]".to_string());
            ("200 OK", body)
        }
        Route::Health => {
            let table = pipeline.flow_table();
            let health = EngineHealth {
                status: "operational".to_string(),
                flow_records: table.len(),
                loaded_at: table.loaded_at(),
                uptime_seconds: metrics.uptime_seconds(),
            };
            let body = serde_json::to_string(&health).unwrap_or_else(|_| "{}".to_string());
            ("200 OK", body)
        }
        Route::Metrics => {
            let body = serde_json::to_string_pretty(&metrics.snapshot())
                .unwrap_or_else(|_| "{}".to_string());
            ("200 OK", body)
        }
        Route::NotFound => {
            metrics.increment_request_failures();
            ("404 Not Found", error_body("no such endpoint"))
        }
        Route::MethodNotAllowed => {
            metrics.increment_request_failures();
            ("405 Method Not Allowed", error_body("GET only, this is a vending machine"))
        }
        Route::BadRequest(message) => {
            metrics.increment_request_failures();
            ("400 Bad Request", error_body(&message))
        }
    };

    let response = json_response(status, &body);
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        warn!(request_id = %request_id, "failed to write response: {}", e);
        metrics.increment_request_failures();
        return;
    }

    info!(
        request_id = %request_id,
        method,
        path = target,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request served"
    );
}
