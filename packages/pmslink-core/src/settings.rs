//! Client settings consumed by the arbiter and the playback resolver.
//!
//! Settings are an explicit value handed to constructors once. Host
//! applications own persistence; this module only defines the shape,
//! defaults and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by [`Settings::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// The transcode profile list is empty; profile 0 is the fallback.
    #[error("at least one transcode profile is required")]
    NoTranscodeProfiles,

    /// A profile's quality field is not `resolution,bitrate`.
    #[error("transcode profile {index} has malformed quality '{quality}'")]
    MalformedQuality { index: usize, quality: String },

    /// NAS override is enabled with credentials but no user name.
    #[error("NAS password set without a user name")]
    NasPasswordWithoutUser,
}

/// How a media part is delivered to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamPolicy {
    /// Prefer a local file, fall back to streaming.
    #[default]
    Auto,
    /// Always stream over HTTP from the server.
    Stream,
    /// Build an SMB share path.
    Smb,
    /// Build an AFP share path.
    Afp,
}

impl StreamPolicy {
    /// URL scheme used for network-share policies.
    pub fn share_protocol(self) -> Option<&'static str> {
        match self {
            Self::Smb => Some("smb"),
            Self::Afp => Some("afp"),
            Self::Auto | Self::Stream => None,
        }
    }
}

/// Who decides audio/subtitle stream selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamControl {
    /// Use the streams the server marks as selected.
    #[default]
    Server,
    /// Leave selection to the player.
    Player,
    /// Never show subtitles.
    Never,
}

/// Network-share override used when building SMB/AFP paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NasOverride {
    /// Master switch; the fields below are ignored when off.
    pub enabled: bool,
    /// Host that replaces the media server's address.
    pub host: Option<String>,
    /// Share user name.
    pub user: Option<String>,
    /// Share password.
    pub password: Option<String>,
    /// Path component the share path is re-rooted under.
    pub root: Option<String>,
}

impl NasOverride {
    /// Returns `user:password@` when credentials are configured.
    pub fn login_string(&self) -> String {
        match (&self.user, self.enabled) {
            (Some(user), true) if !user.is_empty() => format!(
                "{}:{}@",
                user,
                self.password.as_deref().unwrap_or_default()
            ),
            _ => String::new(),
        }
    }

    /// Returns the override host when enabled and set.
    pub fn host(&self) -> Option<&str> {
        self.host
            .as_deref()
            .filter(|h| self.enabled && !h.is_empty())
    }

    /// Returns the re-root component when enabled and set.
    pub fn root(&self) -> Option<&str> {
        self.root
            .as_deref()
            .filter(|r| self.enabled && !r.is_empty())
    }
}

/// Conditions under which transcoding is forced regardless of the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeForcing {
    /// Force transcoding of HEVC video.
    pub hevc: bool,
    /// Force transcoding of 4K video.
    pub above_1080: bool,
    /// Force transcoding of video with more than 8 bits per sample.
    pub above_8bit: bool,
}

/// A named bundle of transcode targets, selected by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeProfile {
    /// `"<resolution>,<bitrate>"`, e.g. `"1280x720,4Mbps"`.
    pub quality: String,
    /// Subtitle size (percent).
    pub subtitle_size: String,
    /// Audio boost (percent).
    pub audio_boost: String,
}

impl TranscodeProfile {
    /// Splits the quality field into `(resolution, bitrate)`.
    pub fn resolution_and_bitrate(&self) -> Option<(&str, &str)> {
        let (resolution, bitrate) = self.quality.split_once(',')?;
        if bitrate.contains(',') {
            return None;
        }
        Some((resolution.trim(), bitrate.trim()))
    }

    /// Subtitle size without any fractional part (`"100.0"` → `"100"`).
    pub fn subtitle_size(&self) -> &str {
        integer_part(&self.subtitle_size)
    }

    /// Audio boost without any fractional part.
    pub fn audio_boost(&self) -> &str {
        integer_part(&self.audio_boost)
    }
}

fn integer_part(value: &str) -> &str {
    value.split('.').next().unwrap_or(value)
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            quality: "1920x1080,20Mbps".to_string(),
            subtitle_size: "100".to_string(),
            audio_boost: "100".to_string(),
        }
    }
}

/// Settings for the pmslink client.
///
/// All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Connections
    /// Probe https before http and prefer secure addresses.
    pub secure_connections: bool,

    /// Verify TLS certificates on data requests (probes never verify).
    pub verify_certificates: bool,

    // Playback
    /// Delivery policy for media parts.
    pub stream_policy: StreamPolicy,

    /// Treat `.ifo` parts as DVD images and play them over a share.
    pub force_dvd: bool,

    /// Network-share override.
    pub nas: NasOverride,

    /// Audio/subtitle selection mode.
    pub stream_control: StreamControl,

    /// Skip genre extraction when reading full metadata.
    pub skip_metadata: bool,

    // Transcoding
    /// Forced-transcode rules.
    pub transcode: TranscodeForcing,

    /// Transcode profiles; index 0 is the fallback.
    pub transcode_profiles: Vec<TranscodeProfile>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            secure_connections: true,
            verify_certificates: false,
            stream_policy: StreamPolicy::Auto,
            force_dvd: false,
            nas: NasOverride::default(),
            stream_control: StreamControl::Server,
            skip_metadata: false,
            transcode: TranscodeForcing::default(),
            transcode_profiles: vec![
                TranscodeProfile::default(),
                TranscodeProfile {
                    quality: "1280x720,4Mbps".to_string(),
                    ..TranscodeProfile::default()
                },
                TranscodeProfile {
                    quality: "720x480,1500Kbps".to_string(),
                    ..TranscodeProfile::default()
                },
            ],
        }
    }
}

impl Settings {
    /// Validates the settings values.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.transcode_profiles.is_empty() {
            return Err(SettingsError::NoTranscodeProfiles);
        }
        for (index, profile) in self.transcode_profiles.iter().enumerate() {
            if profile.resolution_and_bitrate().is_none() {
                return Err(SettingsError::MalformedQuality {
                    index,
                    quality: profile.quality.clone(),
                });
            }
        }
        if self.nas.user.as_deref().unwrap_or_default().is_empty() && self.nas.password.is_some()
        {
            return Err(SettingsError::NasPasswordWithoutUser);
        }
        Ok(())
    }

    /// Returns the requested profile, or profile 0 when the index is out of
    /// range or its quality field is unreadable.
    pub fn transcode_profile(&self, index: usize) -> TranscodeProfile {
        self.transcode_profiles
            .get(index)
            .filter(|p| p.resolution_and_bitrate().is_some())
            .or_else(|| self.transcode_profiles.first())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_validate() {
        assert_eq!(Settings::default().validate(), Ok(()));
    }

    #[test]
    fn empty_profiles_rejected() {
        let settings = Settings {
            transcode_profiles: Vec::new(),
            ..Settings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::NoTranscodeProfiles)
        );
    }

    #[test]
    fn malformed_quality_rejected() {
        let mut settings = Settings::default();
        settings.transcode_profiles[1].quality = "720p".to_string();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::MalformedQuality { index: 1, .. })
        ));
    }

    #[test]
    fn out_of_range_profile_falls_back_to_first() {
        let settings = Settings::default();
        assert_eq!(settings.transcode_profile(9), settings.transcode_profiles[0]);
    }

    #[test]
    fn profile_strips_fractional_sizes() {
        let profile = TranscodeProfile {
            quality: "1280x720,4Mbps".into(),
            subtitle_size: "125.0".into(),
            audio_boost: "200.5".into(),
        };
        assert_eq!(profile.subtitle_size(), "125");
        assert_eq!(profile.audio_boost(), "200");
        assert_eq!(profile.resolution_and_bitrate(), Some(("1280x720", "4Mbps")));
    }

    #[test]
    fn nas_login_string_requires_enabled_and_user() {
        let mut nas = NasOverride {
            enabled: false,
            user: Some("alice".into()),
            password: Some("secret".into()),
            ..NasOverride::default()
        };
        assert_eq!(nas.login_string(), "");
        nas.enabled = true;
        assert_eq!(nas.login_string(), "alice:secret@");
    }

    #[test]
    fn stream_policy_deserializes_lowercase() {
        let settings: Settings =
            serde_json::from_str(r#"{"stream_policy":"smb","force_dvd":true}"#).unwrap();
        assert_eq!(settings.stream_policy, StreamPolicy::Smb);
        assert!(settings.force_dvd);
        assert!(settings.secure_connections);
    }
}
