//! Connection arbitration and data requests.
//!
//! The arbiter is the only writer of a record's access address, scheme and
//! offline flag. Callers hand it a `&mut ServerRecord` and write the result
//! back to the registry afterwards.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use super::candidate::{build_candidates, select_best, ConnectionCandidate, ProbeResult};
use super::transport::{HttpMethod, HttpTransport, Prober, TransportError};
use crate::identity::ClientIdentity;
use crate::protocol_constants::{
    FALLBACK_TRANSCODE_BITRATE, OFFLINE_PAYLOAD, TRANSCODE_LOOPBACK, UNAUTHORIZED_PAYLOAD,
    UNIVERSAL_TRANSCODE_PATH, UNLIMITED_TRANSCODE_BITRATE,
};
use crate::registry::{Scheme, ServerClass, ServerRecord};
use crate::settings::Settings;
use crate::xml::XmlElement;

/// Result of one arbitration round.
#[derive(Debug, Clone, Serialize)]
pub struct ArbitrationOutcome {
    /// Every probe, in candidate order.
    pub results: Vec<ProbeResult>,
    /// Winning candidate, if any.
    pub selected: Option<ConnectionCandidate>,
}

impl ArbitrationOutcome {
    pub fn is_online(&self) -> bool {
        self.selected.is_some()
    }
}

/// A started universal transcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscodeSession {
    pub session: String,
    pub url: String,
}

/// Reduces an absolute URL to its path and query.
fn request_path(url: &str) -> String {
    let path = match url.split_once("://") {
        Some((scheme, rest)) if scheme.starts_with("http") => {
            rest.find('/').map_or("/", |idx| &rest[idx..])
        }
        _ => url,
    };
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Converts a profile bitrate (`"4Mbps"`, `"1500Kbps"`, `"unlimited"`) to kbps.
fn max_video_bitrate(bitrate: &str) -> String {
    let bitrate = bitrate.trim();
    if let Some(mbps) = bitrate.strip_suffix("Mbps") {
        match mbps.trim().parse::<f64>() {
            Ok(value) => (value * 1000.0).to_string(),
            Err(_) => FALLBACK_TRANSCODE_BITRATE.to_string(),
        }
    } else if let Some(kbps) = bitrate.strip_suffix("Kbps") {
        kbps.trim().to_string()
    } else if bitrate.ends_with("unlimited") {
        UNLIMITED_TRANSCODE_BITRATE.to_string()
    } else {
        FALLBACK_TRANSCODE_BITRATE.to_string()
    }
}

/// Probes candidates and carries data requests for server records.
pub struct ConnectionArbiter {
    identity: ClientIdentity,
    settings: Settings,
    prober: Arc<dyn Prober>,
    transport: Arc<dyn HttpTransport>,
}

impl ConnectionArbiter {
    pub fn new(
        identity: ClientIdentity,
        settings: Settings,
        prober: Arc<dyn Prober>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            identity,
            settings,
            prober,
            transport,
        }
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn identification(&self, record: &ServerRecord) -> Vec<(String, String)> {
        self.identity
            .identification(record.token.as_deref(), record.user.as_deref())
    }

    /// Probes every candidate concurrently and applies the preference order.
    ///
    /// Waits for all probes before choosing. When nothing answers the record
    /// is marked offline and its access address is left alone.
    pub async fn resolve_best_address(
        &self,
        record: &mut ServerRecord,
        user_address: Option<&str>,
    ) -> ArbitrationOutcome {
        let candidates =
            build_candidates(record, user_address, self.settings.secure_connections);
        let query = self.identification(record);

        log::debug!(
            "[Arbiter] [{}] Probing {} candidate(s)",
            record.uuid,
            candidates.len()
        );

        let probes = candidates.iter().map(|candidate| {
            let prober = Arc::clone(&self.prober);
            let query = &query;
            async move {
                let success = prober.probe(candidate, query).await;
                ProbeResult {
                    candidate: candidate.clone(),
                    success,
                }
            }
        });
        let results = join_all(probes).await;

        let selected = select_best(&results).cloned();
        match &selected {
            Some(best) => {
                record.access_address = best.location.clone();
                record.scheme = best.scheme;
                record.offline = false;
                log::info!(
                    "[Arbiter] [{}] Selected {}://{} ({:?})",
                    record.uuid,
                    best.scheme,
                    best.location,
                    best.origin
                );
            }
            None => {
                record.offline = true;
                log::info!("[Arbiter] [{}] Server appears to be offline", record.uuid);
            }
        }

        ArbitrationOutcome { results, selected }
    }

    /// Performs a data request against the record's current address.
    ///
    /// Never fails: transport problems turn into the offline payload and a
    /// 401 into the unauthorized payload. With `allow_fallback`, an https
    /// connection failure demotes the record to http and retries once.
    pub async fn talk(
        &self,
        record: &mut ServerRecord,
        path: &str,
        method: HttpMethod,
        allow_fallback: bool,
    ) -> String {
        if record.offline && !allow_fallback {
            return OFFLINE_PAYLOAD.to_string();
        }

        let path = request_path(path);
        let query = self.identification(record);

        loop {
            let url = format!("{}{}", record.url_location(), path);
            let verify = record.scheme == Scheme::Https && self.settings.verify_certificates;
            log::debug!("[Talk] {} {}", method, url);

            match self.transport.request(method, &url, &query, verify).await {
                Ok(response) => {
                    record.offline = false;
                    return match response.status {
                        200 => response.body,
                        401 => {
                            log::debug!("[Talk] 401 Unauthorized from {}", record.host());
                            UNAUTHORIZED_PAYLOAD.to_string()
                        }
                        status => {
                            log::debug!("[Talk] Unexpected response {} for {}", status, url);
                            OFFLINE_PAYLOAD.to_string()
                        }
                    };
                }
                Err(TransportError::Connect(e)) => {
                    log::error!(
                        "[Talk] Server {} is offline or uncontactable: {}",
                        record.host(),
                        e
                    );
                    if allow_fallback && record.scheme == Scheme::Https {
                        log::debug!("[Talk] Server {} switching to http", record.host());
                        record.scheme = Scheme::Http;
                        continue;
                    }
                    record.offline = true;
                    return OFFLINE_PAYLOAD.to_string();
                }
                Err(TransportError::ReadTimeout) => {
                    log::debug!("[Talk] Read timeout for {} on {}", record.host(), path);
                    return OFFLINE_PAYLOAD.to_string();
                }
                Err(e @ TransportError::Other(_)) => {
                    log::warn!("[Talk] Request to {} failed: {}", url, e);
                    record.offline = true;
                    return OFFLINE_PAYLOAD.to_string();
                }
            }
        }
    }

    /// Re-reads the server root and updates identity fields.
    ///
    /// Returns false if the server did not produce a usable root document.
    pub async fn refresh(&self, record: &mut ServerRecord) -> bool {
        let data = self.talk(record, "/", HttpMethod::Get, true).await;
        let root = match XmlElement::parse(&data) {
            Ok(root) => root,
            Err(e) => {
                log::warn!("[Arbiter] [{}] Unreadable root document: {}", record.uuid, e);
                return false;
            }
        };

        if matches!(root.attr("status"), Some("offline") | Some("unauthorized")) {
            return false;
        }

        if let Some(name) = root.attr("friendlyName") {
            record.name = name.to_string();
        }
        if let Some(id) = root.attr("machineIdentifier") {
            // A user-entered record learns its id here; a known id never changes.
            if record.uuid.is_empty() {
                record.uuid = id.to_string();
            } else if id != record.uuid {
                log::warn!(
                    "[Arbiter] Server at {} reports id {} (expected {})",
                    record.access_address,
                    id,
                    record.uuid
                );
            }
        }
        record.owned = true;
        record.master = true;
        record.class = ServerClass::parse(root.attr("serverClass"));
        record.multiuser = root.attr("multiuser") == Some("1");
        if let Some(version) = root.attr("version") {
            record.version = Some(version.to_string());
        }
        true
    }

    /// `scheme://address/path?query` with identification appended.
    ///
    /// `extra` entries override identification parameters of the same name.
    pub fn formatted_url(
        &self,
        record: &ServerRecord,
        path: &str,
        extra: &[(&str, &str)],
    ) -> String {
        let location = format!("{}{}", record.url_location(), request_path(path));
        let mut params = self.identification(record);
        for (key, value) in extra {
            match params.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value.to_string(),
                None => params.push((key.to_string(), value.to_string())),
            }
        }

        match reqwest::Url::parse(&location) {
            Ok(mut url) => {
                url.query_pairs_mut().extend_pairs(params.iter());
                url.to_string()
            }
            Err(e) => {
                log::warn!("[Arbiter] Cannot format url {}: {}", location, e);
                location
            }
        }
    }

    /// Builds a universal transcode URL for `media_path` with a fresh session.
    ///
    /// Unknown profile indexes fall back to profile 0.
    pub fn universal_transcode(
        &self,
        record: &ServerRecord,
        media_path: &str,
        profile_index: usize,
    ) -> TranscodeSession {
        let profile = self.settings.transcode_profile(profile_index);
        let (resolution, bitrate) = profile
            .resolution_and_bitrate()
            .map(|(r, b)| (r.to_string(), b.to_string()))
            .unwrap_or_default();
        let session = uuid::Uuid::new_v4().to_string();
        let loopback = format!("{}{}", TRANSCODE_LOOPBACK, media_path);
        let max_bitrate = max_video_bitrate(&bitrate);

        let settings: [(&str, &str); 13] = [
            ("protocol", "hls"),
            ("container", "mpegts"),
            ("session", &session),
            ("offset", "0"),
            ("videoResolution", &resolution),
            ("maxVideoBitrate", &max_bitrate),
            ("videoQuality", "100"),
            ("directStream", "1"),
            ("directPlay", "0"),
            ("subtitleSize", profile.subtitle_size()),
            ("audioBoost", profile.audio_boost()),
            ("fastSeek", "1"),
            ("path", &loopback),
        ];
        let query: String = reqwest::Url::parse("http://transcode.invalid/")
            .map(|mut u| {
                u.query_pairs_mut().extend_pairs(settings.iter());
                u.query().unwrap_or_default().to_string()
            })
            .unwrap_or_default();

        log::debug!(
            "[Arbiter] Transcode profile [{}] {}@{} ({}/{})",
            profile_index + 1,
            resolution,
            bitrate,
            profile.subtitle_size(),
            profile.audio_boost()
        );

        let path = format!("{}?{}", UNIVERSAL_TRANSCODE_PATH, query);
        let url = self.formatted_url(record, &path, &[("X-Plex-Device", "Plex Home Theater")]);
        TranscodeSession { session, url }
    }
}
