//! In-process stand-in for the FRStack host: a simulated radio session and
//! a local REST call-back.

pub mod radio;
pub mod rest;

use std::sync::Arc;

pub use radio::{RadioInfo, RadioProfile, SimulatedRadio};
pub use rest::LocalRest;

use crate::config::AppConfig;
use crate::rest::HostContext;
use crate::session::HostSession;

/// The collaborators a registry is initialised against.
pub struct HostHarness {
    pub radio: Option<Arc<SimulatedRadio>>,
    pub rest: Arc<LocalRest>,
}

impl HostHarness {
    pub fn from_config(config: &AppConfig) -> Self {
        let radio = config.radio.connected.then(|| {
            Arc::new(
                SimulatedRadio::new(config.radio_profile())
                    .with_slices(config.radio.initial_slices),
            )
        });
        let rest = Arc::new(LocalRest::new(radio.clone()).with_latency(config.rest_latency()));

        Self { radio, rest }
    }

    pub fn context(&self) -> HostContext {
        let session = self
            .radio
            .clone()
            .map(|radio| radio as Arc<dyn HostSession>);
        HostContext::new(session, self.rest.clone())
    }
}
