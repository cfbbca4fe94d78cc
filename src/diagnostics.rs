// src/diagnostics.rs
use ethers::types::Address;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::types::GasParameters;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    pub message: String,
    pub chain_id: u64,
    pub wallet_address: Address,
    pub info: GasParameters,
}

/// Best-effort report channel. Implementations must not block or fail the caller.
pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, report: DiagnosticReport);
}

/// Drops every report.
pub struct NoopDiagnostics;

impl DiagnosticsSink for NoopDiagnostics {
    fn report(&self, report: DiagnosticReport) {
        debug!("Diagnostics disabled, dropping report: {}", report.message);
    }
}

/// POSTs reports as JSON from a detached task.
pub struct HttpDiagnostics {
    client: reqwest::Client,
    url: String,
}

impl HttpDiagnostics {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl HttpDiagnostics {
    /// Starts the POST for `report`; `None` when no runtime is around to run it.
    fn dispatch(&self, report: DiagnosticReport) -> Option<JoinHandle<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime available, dropping diagnostics report");
            return None;
        };
        let client = self.client.clone();
        let url = self.url.clone();
        Some(runtime.spawn(async move {
            let sent = client
                .post(&url)
                .json(&report)
                .send()
                .await
                .and_then(|response| response.error_for_status());
            if let Err(e) = sent {
                warn!("Failed to send diagnostics report to {}: {}", url, e);
            }
        }))
    }
}

impl DiagnosticsSink for HttpDiagnostics {
    fn report(&self, report: DiagnosticReport) {
        // Detached: the caller never waits on the collector.
        let _ = self.dispatch(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::serve_once;

    fn report() -> DiagnosticReport {
        DiagnosticReport {
            message: "verificationGasLimit is 0".into(),
            chain_id: 10,
            wallet_address: Address::repeat_byte(0xaa),
            info: GasParameters::default(),
        }
    }

    #[tokio::test]
    async fn posts_report_as_camel_case_json() {
        let (url, request) = serve_once("200 OK", "{}").await;
        let sink = HttpDiagnostics::new(url);

        sink.dispatch(report()).unwrap().await.unwrap();

        let request = request.await.unwrap();
        assert!(request.starts_with("POST "));
        assert!(request.contains(r#""message":"verificationGasLimit is 0""#));
        assert!(request.contains(r#""chainId":10"#));
        assert!(request.contains(r#""walletAddress":"0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa""#));
    }

    #[tokio::test]
    async fn unreachable_collector_is_swallowed() {
        let sink = HttpDiagnostics::new("http://127.0.0.1:1/log-error");

        let task = sink.dispatch(report()).unwrap();

        // The task finishes without panicking; the failure only reaches the log.
        task.await.unwrap();
    }

    #[tokio::test]
    async fn rejected_report_is_swallowed() {
        let (url, request) = serve_once("500 Internal Server Error", "{}").await;
        let sink = HttpDiagnostics::new(url);

        sink.dispatch(report()).unwrap().await.unwrap();
        assert!(request.await.unwrap().contains("walletAddress"));
    }

    #[test]
    fn report_outside_runtime_is_dropped() {
        let sink = HttpDiagnostics::new("http://127.0.0.1:1/log-error");
        assert!(sink.dispatch(report()).is_none());
        sink.report(report());
    }
}
