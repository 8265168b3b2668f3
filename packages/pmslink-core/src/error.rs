//! Centralized error types for the pmslink core library.
//!
//! Subsystems keep their own `thiserror` enums; [`PmsError`] is the
//! application-wide type callers see at the edges, with machine-readable
//! codes from [`ErrorCode`].

use serde::Serialize;
use thiserror::Error;

use crate::connection::TransportError;
use crate::gdm::GdmError;
use crate::playback::PlaybackError;
use crate::settings::SettingsError;
use crate::xml::XmlError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    fn code(&self) -> &'static str;
}

impl ErrorCode for GdmError {
    fn code(&self) -> &'static str {
        match self {
            Self::SocketBind(_) => "socket_bind_failed",
            Self::MulticastJoin(_) => "multicast_join_failed",
            Self::Send(_) => "gdm_send_failed",
            Self::RegistrationDisabled => "registration_disabled",
        }
    }
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect_failed",
            Self::ReadTimeout => "read_timeout",
            Self::Other(_) => "http_request_failed",
        }
    }
}

impl ErrorCode for PlaybackError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoPlayableItem => "no_playable_item",
            Self::NoParts => "no_media_parts",
            Self::Cancelled => "selection_cancelled",
        }
    }
}

impl ErrorCode for SettingsError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoTranscodeProfiles => "no_transcode_profiles",
            Self::MalformedQuality { .. } => "malformed_transcode_quality",
            Self::NasPasswordWithoutUser => "nas_password_without_user",
        }
    }
}

impl ErrorCode for XmlError {
    fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "xml_malformed",
            Self::Empty => "xml_empty",
        }
    }
}

/// Application-wide error type.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum PmsError {
    /// Multicast discovery or registration failed.
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// A data request could not be carried out.
    #[error("Request failed: {0}")]
    Transport(String),

    /// No server matches the requested identifier or address.
    #[error("Server not found: {0}")]
    ServerNotFound(String),

    /// Every candidate address failed its probe.
    #[error("Server offline: {0}")]
    ServerOffline(String),

    /// Media could not be resolved for playback.
    #[error("Playback failed: {0}")]
    Playback(String),

    /// The user backed out, or there was nothing to play.
    ///
    /// Callers stop without reporting this.
    #[error("Playback aborted: {0}")]
    Aborted(String),

    /// A server document could not be parsed.
    #[error("Invalid server response: {0}")]
    InvalidResponse(String),

    /// Settings failed validation.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PmsError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Discovery(_) => "discovery_failed",
            Self::Transport(_) => "request_failed",
            Self::ServerNotFound(_) => "server_not_found",
            Self::ServerOffline(_) => "server_offline",
            Self::Playback(_) => "playback_failed",
            Self::Aborted(_) => "playback_aborted",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// True for outcomes that end the operation without an error report.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}

/// Convenient Result alias for application-wide operations.
pub type PmsResult<T> = Result<T, PmsError>;

impl From<GdmError> for PmsError {
    fn from(err: GdmError) -> Self {
        Self::Discovery(err.to_string())
    }
}

impl From<TransportError> for PmsError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<PlaybackError> for PmsError {
    fn from(err: PlaybackError) -> Self {
        if err.is_silent() {
            Self::Aborted(err.to_string())
        } else {
            Self::Playback(err.to_string())
        }
    }
}

impl From<SettingsError> for PmsError {
    fn from(err: SettingsError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<XmlError> for PmsError {
    fn from(err: XmlError) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_playback_errors_become_aborts() {
        let err: PmsError = PlaybackError::Cancelled.into();
        assert!(err.is_silent());
        assert_eq!(err.code(), "playback_aborted");

        let err: PmsError = PlaybackError::NoParts.into();
        assert!(!err.is_silent());
        assert_eq!(err.code(), "playback_failed");
    }

    #[test]
    fn subsystem_codes() {
        assert_eq!(GdmError::RegistrationDisabled.code(), "registration_disabled");
        assert_eq!(TransportError::ReadTimeout.code(), "read_timeout");
        assert_eq!(SettingsError::NoTranscodeProfiles.code(), "no_transcode_profiles");
        assert_eq!(XmlError::Empty.code(), "xml_empty");
    }

    #[test]
    fn serializes_with_type_tag() {
        let err = PmsError::ServerNotFound("abc".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "ServerNotFound");
        assert_eq!(json["details"], "abc");
    }
}
