use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

use crate::logging::LogContext;

/// Fairing that logs one line per HTTP request: method, URI, status and latency.
pub struct RequestLogger {
    log: LogContext,
}

impl RequestLogger {
    pub fn new(log: LogContext) -> Self {
        Self { log }
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new(LogContext::new("http"))
    }
}

struct RequestStart(Instant);

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(|| RequestStart(Instant::now()));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let started = request.local_cache(|| RequestStart(Instant::now()));
        let elapsed_ms = started.0.elapsed().as_secs_f64() * 1000.0;
        let status = response.status();

        let line = format!(
            "{} {} -> {} ({:.2}ms)",
            request.method(),
            request.uri(),
            status.code,
            elapsed_ms
        );
        if status.code >= 500 {
            self.log.error(format_args!("{line}"));
        } else {
            self.log.info(format_args!("{line}"));
        }
    }
}
