//! Candidate construction and preference selection.
//!
//! Both functions are pure so the ranking can be tested without a network.

use std::collections::HashSet;

use serde::Serialize;

use crate::registry::{with_default_port, Scheme, ServerRecord};

/// Where a candidate address came from, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrigin {
    /// Address typed in by the user.
    User,
    /// Host of the cloud-reported external URI.
    ExternalUri,
    /// First local (multicast-discovered) address.
    Internal,
    /// Cloud-reported external address.
    External,
}

/// One address/scheme pair to probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionCandidate {
    pub origin: CandidateOrigin,
    pub scheme: Scheme,
    /// `host:port`
    pub location: String,
}

impl ConnectionCandidate {
    /// Root URL probed for this candidate.
    pub fn url(&self) -> String {
        format!("{}://{}/", self.scheme, self.location)
    }
}

/// Outcome of probing one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub candidate: ConnectionCandidate,
    pub success: bool,
}

/// Network location (`host[:port]`) of a URI, if it has one.
fn uri_location(uri: &str) -> Option<&str> {
    let rest = uri.split_once("://").map_or(uri, |(_, rest)| rest);
    let netloc = rest.split(['/', '?', '#']).next()?;
    let netloc = netloc.rsplit_once('@').map_or(netloc, |(_, host)| host);
    (!netloc.is_empty()).then_some(netloc)
}

/// Builds the ordered candidate list for one arbitration round.
///
/// A user-supplied address is the only candidate family when present.
/// Otherwise the external URI, the first local address and the external
/// address are tried in that order. Each location yields an https candidate
/// before its http one when `secure` is set. Duplicates are dropped.
pub fn build_candidates(
    record: &ServerRecord,
    user_address: Option<&str>,
    secure: bool,
) -> Vec<ConnectionCandidate> {
    let mut origins: Vec<(CandidateOrigin, String)> = Vec::new();

    match user_address.map(str::trim).filter(|a| !a.is_empty()) {
        Some(address) => origins.push((CandidateOrigin::User, with_default_port(address))),
        None => {
            if let Some(location) = record.external_uri.as_deref().and_then(uri_location) {
                origins.push((CandidateOrigin::ExternalUri, with_default_port(location)));
            }
            if let Some(local) = record.local_addresses.first() {
                origins.push((CandidateOrigin::Internal, with_default_port(local)));
            }
            if let Some(external) = record.external_address.as_deref().filter(|a| {
                !a.get(..5)
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case("none:"))
            }) {
                origins.push((CandidateOrigin::External, with_default_port(external)));
            }
        }
    }

    let schemes: &[Scheme] = if secure {
        &[Scheme::Https, Scheme::Http]
    } else {
        &[Scheme::Http]
    };

    let mut seen: HashSet<(Scheme, String)> = HashSet::new();
    let mut candidates = Vec::new();
    for (origin, location) in origins {
        for &scheme in schemes {
            if seen.insert((scheme, location.clone())) {
                candidates.push(ConnectionCandidate {
                    origin,
                    scheme,
                    location: location.clone(),
                });
            }
        }
    }
    candidates
}

/// Preference order: every https tier ranks above every http tier, and
/// within a scheme user > external URI > internal > external.
const TIERS: [(CandidateOrigin, Scheme); 8] = [
    (CandidateOrigin::User, Scheme::Https),
    (CandidateOrigin::ExternalUri, Scheme::Https),
    (CandidateOrigin::Internal, Scheme::Https),
    (CandidateOrigin::External, Scheme::Https),
    (CandidateOrigin::User, Scheme::Http),
    (CandidateOrigin::ExternalUri, Scheme::Http),
    (CandidateOrigin::Internal, Scheme::Http),
    (CandidateOrigin::External, Scheme::Http),
];

/// Picks the winning candidate, or None if nothing succeeded.
///
/// Independent of the order in which results arrived.
pub fn select_best(results: &[ProbeResult]) -> Option<&ConnectionCandidate> {
    TIERS.iter().find_map(|&(origin, scheme)| {
        results
            .iter()
            .find(|r| r.success && r.candidate.origin == origin && r.candidate.scheme == scheme)
            .map(|r| &r.candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DiscoveryOrigin, ServerRecord};

    fn cloud_record() -> ServerRecord {
        let mut record = ServerRecord::from_cloud(
            "u1",
            "Cloud",
            "203.0.113.5:32400",
            Some("https://203-0-113-5.abc.plex.direct:32400".to_string()),
        );
        record.add_local_address("192.168.1.5:32400");
        record
    }

    fn result(origin: CandidateOrigin, scheme: Scheme, location: &str, success: bool) -> ProbeResult {
        ProbeResult {
            candidate: ConnectionCandidate {
                origin,
                scheme,
                location: location.to_string(),
            },
            success,
        }
    }

    #[test]
    fn secure_candidates_in_origin_order() {
        let candidates = build_candidates(&cloud_record(), None, true);
        let got: Vec<_> = candidates
            .iter()
            .map(|c| (c.origin, c.scheme, c.location.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (CandidateOrigin::ExternalUri, Scheme::Https, "203-0-113-5.abc.plex.direct:32400"),
                (CandidateOrigin::ExternalUri, Scheme::Http, "203-0-113-5.abc.plex.direct:32400"),
                (CandidateOrigin::Internal, Scheme::Https, "192.168.1.5:32400"),
                (CandidateOrigin::Internal, Scheme::Http, "192.168.1.5:32400"),
                (CandidateOrigin::External, Scheme::Https, "203.0.113.5:32400"),
                (CandidateOrigin::External, Scheme::Http, "203.0.113.5:32400"),
            ]
        );
    }

    #[test]
    fn insecure_candidates_are_http_only() {
        let candidates = build_candidates(&cloud_record(), None, false);
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| c.scheme == Scheme::Http));
    }

    #[test]
    fn user_address_suppresses_other_origins() {
        let candidates = build_candidates(&cloud_record(), Some("nas.lan"), true);
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.origin == CandidateOrigin::User));
        assert_eq!(candidates[0].url(), "https://nas.lan:32400/");
        assert_eq!(candidates[1].url(), "http://nas.lan:32400/");
    }

    #[test]
    fn none_placeholder_and_duplicates_skipped() {
        let mut record = ServerRecord::new("u1", "x", DiscoveryOrigin::CloudDirectory, "a");
        record.external_address = Some("NONE:32400".to_string());
        record.external_uri = Some("http://192.168.1.5:32400".to_string());
        record.add_local_address("192.168.1.5:32400");

        let candidates = build_candidates(&record, None, false);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].origin, CandidateOrigin::ExternalUri);
    }

    #[test]
    fn https_tiers_beat_http_tiers() {
        let results = vec![
            result(CandidateOrigin::ExternalUri, Scheme::Http, "uri:32400", true),
            result(CandidateOrigin::External, Scheme::Https, "ext:32400", true),
            result(CandidateOrigin::Internal, Scheme::Https, "int:32400", false),
        ];
        let best = select_best(&results).unwrap();
        assert_eq!(best.location, "ext:32400");
        assert_eq!(best.scheme, Scheme::Https);
    }

    #[test]
    fn selection_ignores_result_order() {
        let mut results = vec![
            result(CandidateOrigin::Internal, Scheme::Http, "int:32400", true),
            result(CandidateOrigin::External, Scheme::Http, "ext:32400", true),
            result(CandidateOrigin::ExternalUri, Scheme::Http, "uri:32400", true),
        ];
        assert_eq!(select_best(&results).unwrap().location, "uri:32400");
        results.reverse();
        assert_eq!(select_best(&results).unwrap().location, "uri:32400");
    }

    #[test]
    fn uri_location_keeps_explicit_port() {
        assert_eq!(uri_location("https://host.example:443/path"), Some("host.example:443"));
        assert_eq!(uri_location("http://user:pw@host.example"), Some("host.example"));
        assert_eq!(uri_location("https://"), None);
    }

    #[test]
    fn nothing_succeeds() {
        let results = vec![result(CandidateOrigin::Internal, Scheme::Http, "int:32400", false)];
        assert!(select_best(&results).is_none());
        assert!(select_best(&[]).is_none());
    }
}
