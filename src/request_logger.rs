use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Fairing to log one line per HTTP request with timing
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(|| Instant::now());
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let start_time = request.local_cache(|| Instant::now());
        let duration = start_time.elapsed();

        let method = request.method();
        let uri = request.uri();
        let status = response.status();
        // Webhook senders sit behind known IPs; worth having in the log.
        let client = request
            .client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "-".to_string());

        log::info!(
            "{} {} {} -> {} ({:.2}ms)",
            client,
            method,
            uri,
            status.code,
            duration.as_secs_f64() * 1000.0
        );
    }
}
