//! ICE candidate probe
//!
//! Drives a single peer connection through offer creation and local
//! description just far enough to start candidate gathering, then waits
//! for the first terminal event. One fixed STUN server, no trickle
//! aggregation: the first non-null candidate (or the gathering-complete
//! event, or a negotiation failure) ends the probe.

use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info};

use crate::host::{HostEnvironment, RtcConfig};
use crate::settings::ProbeSettings;
use crate::sink::{EmitOnce, RenderSink, SinkError};

/// Terminal record. All three keys are always serialized; `webRTCAvailable`
/// stays null until support has actually been determined.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IceProbeResult {
    #[serde(rename = "webRTCAvailable")]
    pub web_rtc_available: Option<bool>,
    pub candidate: Option<String>,
    pub error: Option<String>,
}

/// How the probe ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IceOutcome {
    /// No peer-connection support; emitted `webRTCAvailable: false`.
    Unavailable,
    /// First non-null candidate emitted.
    CandidateFound,
    /// Gathering completed without a candidate; emitted `candidate: null`.
    NoCandidate,
    /// Offer or local-description negotiation was rejected.
    OfferFailed,
    /// The event stream ended with no terminal event; nothing was emitted.
    NoTerminalEvent,
}

/// Run the ICE probe against `host`, rendering the terminal record into
/// `sink` at most once.
pub async fn probe_ice(
    host: &dyn HostEnvironment,
    settings: &ProbeSettings,
    sink: &mut dyn RenderSink,
) -> Result<IceOutcome, SinkError> {
    let mut sink = EmitOnce::new(sink);
    let mut result = IceProbeResult::default();

    if !host.supports_peer_connection() {
        result.web_rtc_available = Some(false);
        sink.render(&serde_json::to_value(&result)?)?;
        return Ok(IceOutcome::Unavailable);
    }
    result.web_rtc_available = Some(true);

    let config = RtcConfig {
        ice_servers: vec![settings.stun_server.clone()],
    };
    let mut peer = match host.connect_peer(&config) {
        Ok(peer) => peer,
        Err(e) => {
            result.error = Some(e.to_string());
            sink.render(&serde_json::to_value(&result)?)?;
            return Ok(IceOutcome::OfferFailed);
        }
    };

    // The channel exists only to force candidate gathering to start.
    peer.create_data_channel(&settings.data_channel_label);

    let offer = match peer.create_offer().await {
        Ok(offer) => offer,
        Err(e) => {
            result.error = Some(e.to_string());
            sink.render(&serde_json::to_value(&result)?)?;
            return Ok(IceOutcome::OfferFailed);
        }
    };
    if let Err(e) = peer.set_local_description(offer).await {
        result.error = Some(e.to_string());
        sink.render(&serde_json::to_value(&result)?)?;
        return Ok(IceOutcome::OfferFailed);
    }

    let mut events = peer.candidate_events();
    while let Some(event) = events.next().await {
        match event.candidate {
            Some(text) => {
                info!("first ICE candidate gathered");
                result.candidate = Some(text);
                sink.render(&serde_json::to_value(&result)?)?;
                return Ok(IceOutcome::CandidateFound);
            }
            None => {
                debug!("ICE gathering completed without a candidate");
                sink.render(&serde_json::to_value(&result)?)?;
                return Ok(IceOutcome::NoCandidate);
            }
        }
    }

    debug!("candidate event stream ended without a terminal event");
    Ok(IceOutcome::NoTerminalEvent)
}
