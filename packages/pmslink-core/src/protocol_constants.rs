//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the media server's GDM discovery protocol and
//! its HTTP interface. Changing them breaks interoperability with servers.

// ─────────────────────────────────────────────────────────────────────────────
// GDM (UDP multicast discovery / registration)
// ─────────────────────────────────────────────────────────────────────────────

/// Multicast group shared by discovery and registration traffic.
pub const GDM_MULTICAST_ADDR: &str = "239.0.0.250";

/// Port servers listen on for discovery searches.
pub const GDM_DISCOVERY_PORT: u16 = 32414;

/// Port servers listen on for client HELLO/BYE registrations.
pub const GDM_REGISTRATION_PORT: u16 = 32413;

/// Local port the client listens on for unicast discovery requests.
pub const GDM_CLIENT_UPDATE_PORT: u16 = 32412;

/// Search request sent to the discovery group.
pub const GDM_SEARCH_MESSAGE: &str = "M-SEARCH * HTTP/1.0";

/// Prefix that identifies an inbound client discovery request.
///
/// Matches both `HTTP/1.0` and `HTTP/1.1` variants.
pub const GDM_SEARCH_PREFIX: &str = "M-SEARCH * HTTP/1.";

/// Header appended to HELLO/BYE registration verbs.
pub const GDM_CLIENT_HEADER: &str = "* HTTP/1.0";

/// Status line servers (and this client) use for positive replies.
pub const GDM_OK_STATUS: &str = "HTTP/1.0 200 OK";

/// Content type this client advertises in its registration data.
pub const GDM_CLIENT_CONTENT_TYPE: &str = "plex/media-player";

/// Window during which discovery replies are collected (milliseconds).
pub const GDM_DISCOVERY_WINDOW_MS: u64 = 600;

/// Poll/sleep bound for one registration loop iteration (milliseconds).
pub const GDM_REGISTRATION_POLL_MS: u64 = 500;

/// Default interval between periodic discovery rounds (seconds).
pub const GDM_DISCOVERY_INTERVAL_SECS: u64 = 120;

/// Largest datagram read from a GDM socket.
pub const GDM_MAX_DATAGRAM: usize = 1024;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP
// ─────────────────────────────────────────────────────────────────────────────

/// Port assumed when an address is given without one.
pub const DEFAULT_SERVER_PORT: u16 = 32400;

/// Connect timeout for probes and data requests (seconds).
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 2;

/// Read timeout for probes and data requests (seconds).
pub const HTTP_READ_TIMEOUT_SECS: u64 = 60;

/// Payload returned by data requests against an unreachable server.
pub const OFFLINE_PAYLOAD: &str =
    r#"<?xml version="1.0" encoding="UTF-8"?><message status="offline"></message>"#;

/// Payload returned when the server answers 401.
pub const UNAUTHORIZED_PAYLOAD: &str =
    r#"<?xml version="1.0" encoding="UTF-8"?><message status="unauthorized"></message>"#;

/// Endpoint that lists clients registered with a server.
pub const CLIENTS_PATH: &str = "/clients";

/// Endpoint that starts a universal transcode session.
pub const UNIVERSAL_TRANSCODE_PATH: &str = "/video/:/transcode/universal/start.m3u8";

/// Address the server uses to reach its own library when transcoding.
pub const TRANSCODE_LOOPBACK: &str = "http://127.0.0.1:32400";

// ─────────────────────────────────────────────────────────────────────────────
// Playback
// ─────────────────────────────────────────────────────────────────────────────

/// Duration assumed when a media node carries none.
pub const DEFAULT_MEDIA_DURATION: u64 = 12 * 60 * 60;

/// Percentage of the duration past which a stopped item counts as watched.
pub const WATCHED_THRESHOLD_PERCENT: u64 = 98;

/// Max video bitrate (kbps) requested for "unlimited" transcode profiles.
pub const UNLIMITED_TRANSCODE_BITRATE: u64 = 20000;

/// Max video bitrate (kbps) used when a profile's bitrate is unreadable.
pub const FALLBACK_TRANSCODE_BITRATE: u64 = 2000;
