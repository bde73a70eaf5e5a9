use super::ApiError;
use reqwest::{Method, StatusCode};
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hooks the client calls around every request. Each `ApiClient` owns its
/// logger, so two clients can log differently.
pub trait RequestLogger: Debug + Send + Sync {
    fn on_request(&self, method: &Method, url: &str);
    fn on_response(&self, method: &Method, url: &str, status: StatusCode, elapsed: Duration);
    fn on_error(&self, method: &Method, url: &str, error: &ApiError);
}

/// Default logger: forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl RequestLogger for TracingLogger {
    fn on_request(&self, method: &Method, url: &str) {
        debug!(%method, url, "api request");
    }

    fn on_response(&self, method: &Method, url: &str, status: StatusCode, elapsed: Duration) {
        info!(
            %method,
            url,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "api response"
        );
    }

    fn on_error(&self, method: &Method, url: &str, error: &ApiError) {
        warn!(%method, url, error = %error, "api request failed");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every hook call so tests can assert on them.
    #[derive(Debug, Default)]
    pub struct RecordingLogger {
        pub events: Mutex<Vec<String>>,
    }

    impl RecordingLogger {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl RequestLogger for RecordingLogger {
        fn on_request(&self, method: &Method, url: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("request {} {}", method, url));
        }

        fn on_response(&self, method: &Method, url: &str, status: StatusCode, _: Duration) {
            self.events
                .lock()
                .unwrap()
                .push(format!("response {} {} {}", method, url, status.as_u16()));
        }

        fn on_error(&self, method: &Method, url: &str, _: &ApiError) {
            self.events
                .lock()
                .unwrap()
                .push(format!("error {} {}", method, url));
        }
    }
}
