use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::RestError;
use crate::host::radio::SimulatedRadio;
use crate::rest::RestCall;

/// Answers the handful of REST commands the sample functions use.
///
/// `RADIO INFO` reads from the bound radio. `FRStack SPEWINDOW` drives a
/// local amplifier-window flag: `0` closes, `1` opens, `2` toggles.
pub struct LocalRest {
    radio: Option<Arc<SimulatedRadio>>,
    spe_window: AtomicBool,
    latency: Duration,
}

impl LocalRest {
    pub fn new(radio: Option<Arc<SimulatedRadio>>) -> Self {
        Self {
            radio,
            spe_window: AtomicBool::new(false),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn spe_window_open(&self) -> bool {
        self.spe_window.load(Ordering::SeqCst)
    }

    fn radio_info(&self) -> Result<Value, RestError> {
        let radio = self
            .radio
            .as_ref()
            .ok_or_else(|| RestError::Unavailable("no radio connected".to_string()))?;

        serde_json::to_value(radio.info()).map_err(|err| RestError::Unavailable(err.to_string()))
    }

    fn spe_window(&self, argument: Option<&str>) -> Result<Value, RestError> {
        let open = match argument.map(str::trim) {
            Some("0") => {
                self.spe_window.store(false, Ordering::SeqCst);
                false
            }
            Some("1") => {
                self.spe_window.store(true, Ordering::SeqCst);
                true
            }
            Some("2") | None => !self.spe_window.fetch_xor(true, Ordering::SeqCst),
            Some(other) => {
                return Err(RestError::InvalidArgument {
                    command: "SPEWINDOW".to_string(),
                    argument: other.to_string(),
                });
            }
        };

        Ok(json!({ "spe_window": open }))
    }
}

#[async_trait]
impl RestCall for LocalRest {
    async fn call(
        &self,
        category: &str,
        command: &str,
        argument: Option<&str>,
    ) -> Result<Value, RestError> {
        debug!(category, command, argument, "rest call");

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match (
            category.to_ascii_uppercase().as_str(),
            command.to_ascii_uppercase().as_str(),
        ) {
            ("RADIO", "INFO") => self.radio_info(),
            ("FRSTACK", "SPEWINDOW") => self.spe_window(argument),
            _ => Err(RestError::UnknownCommand {
                category: category.to_string(),
                command: command.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_radio_info() {
        let radio = Arc::new(SimulatedRadio::default().with_slices(1));
        let rest = LocalRest::new(Some(radio));

        let info = rest.call("RADIO", "INFO", None).await.unwrap();
        assert_eq!(info["model"], "FLEX-6600");
        assert_eq!(info["slices"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_radio_info_without_radio() {
        let rest = LocalRest::new(None);
        let err = rest.call("radio", "info", None).await.unwrap_err();
        assert!(matches!(err, RestError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_spe_window_modes() {
        let rest = LocalRest::new(None);

        rest.call("FRStack", "SPEWINDOW", Some("2")).await.unwrap();
        assert!(rest.spe_window_open());
        rest.call("FRStack", "SPEWINDOW", Some("1")).await.unwrap();
        assert!(rest.spe_window_open());
        let out = rest.call("FRStack", "SPEWINDOW", Some("0")).await.unwrap();
        assert_eq!(out, json!({ "spe_window": false }));

        let err = rest
            .call("FRStack", "SPEWINDOW", Some("9"))
            .await
            .unwrap_err();
        assert!(matches!(err, RestError::InvalidArgument { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_toggles_are_not_lost() {
        let rest = Arc::new(LocalRest::new(None));

        let mut handles = Vec::new();
        for _ in 0..64 {
            let rest = Arc::clone(&rest);
            handles.push(tokio::spawn(async move {
                rest.call("FRStack", "SPEWINDOW", Some("2")).await
            }));
        }

        let mut opened = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap()["spe_window"] == json!(true) {
                opened += 1;
            }
        }

        // Every toggle saw a distinct prior state, so half opened the window.
        assert_eq!(opened, 32);
        assert!(!rest.spe_window_open());
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let rest = LocalRest::new(None);
        let err = rest.call("SLICE", "TUNE", Some("14.074")).await.unwrap_err();
        assert_eq!(
            err,
            RestError::UnknownCommand {
                category: "SLICE".into(),
                command: "TUNE".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_awaited() {
        let rest = LocalRest::new(None).with_latency(Duration::from_millis(250));
        let started = tokio::time::Instant::now();
        rest.call("FRStack", "SPEWINDOW", None).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(250));
    }
}
