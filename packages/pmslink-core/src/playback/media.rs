//! Playback data model.

use serde::Serialize;
use thiserror::Error;

/// Reasons playback cannot proceed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The document is unparseable or has no video, track or photo node.
    #[error("no playable item in media document")]
    NoPlayableItem,

    /// The item has no media parts.
    #[error("media item has no parts")]
    NoParts,

    /// The user dismissed the part chooser.
    #[error("part selection cancelled")]
    Cancelled,
}

impl PlaybackError {
    /// Outcomes the caller aborts on without reporting an error.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::NoPlayableItem | Self::Cancelled)
    }
}

/// Convenient Result alias for playback resolution.
pub type PlaybackResult<T> = Result<T, PlaybackError>;

/// Kind of the top-level media node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Music,
    Picture,
}

/// Video sub-kind, from the `type` attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VideoKind {
    Movie,
    Episode {
        index: i64,
        aired: String,
        show_title: String,
        season: i64,
    },
    Other,
}

/// Presentation metadata, shaped per media kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MediaMetadata {
    Video {
        title: String,
        sort_title: String,
        plot: String,
        rating: f64,
        studio: String,
        mpaa: String,
        year: i64,
        tagline: String,
        thumb: Option<String>,
        video_kind: VideoKind,
        /// Empty when genre extraction is skipped.
        genres: Vec<String>,
    },
    Track {
        track_number: i64,
        disc_number: i64,
        /// `"NN. Title"`
        title: String,
        rating: f64,
        album: String,
        artist: String,
        duration_secs: u64,
        thumb: Option<String>,
    },
    Photo {
        title: String,
        thumb: Option<String>,
    },
}

/// Resolution class of a media version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResolutionBucket {
    #[serde(rename = "SD")]
    Sd,
    #[serde(rename = "HD 720")]
    Hd720,
    #[serde(rename = "HD 1080")]
    Hd1080,
    #[serde(rename = "4K")]
    Uhd4k,
    /// The resolution field could not be read.
    #[serde(rename = "")]
    Unknown,
}

impl ResolutionBucket {
    /// Buckets a `videoResolution` attribute.
    ///
    /// Missing means SD. Numeric values are line counts; `sd` and `4k` are
    /// accepted symbolically.
    pub fn from_attr(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim) else {
            return Self::Sd;
        };
        if value.eq_ignore_ascii_case("sd") {
            return Self::Sd;
        }
        if value.eq_ignore_ascii_case("4k") {
            return Self::Uhd4k;
        }
        match value.parse::<i64>() {
            Ok(lines) if lines > 1088 => Self::Uhd4k,
            Ok(lines) if lines >= 1080 => Self::Hd1080,
            Ok(lines) if lines >= 720 => Self::Hd720,
            Ok(_) => Self::Sd,
            Err(_) => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sd => "SD",
            Self::Hd720 => "HD 720",
            Self::Hd1080 => "HD 1080",
            Self::Uhd4k => "4K",
            Self::Unknown => "",
        }
    }
}

impl std::fmt::Display for ResolutionBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Technical details of the media version a part belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartDetails {
    /// Mbps, one decimal place.
    pub bitrate: f64,
    /// None when the attribute is not numeric.
    pub bit_depth: Option<u32>,
    pub resolution: ResolutionBucket,
    pub container: String,
    pub codec: Option<String>,
}

/// One playable file of a media item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayablePart {
    /// Server path that streams this part.
    pub key: String,
    /// Path of the file on the server's filesystem.
    pub file: Option<String>,
    pub details: PartDetails,
}

/// Attributes of one audio or subtitle stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamRef {
    pub id: Option<String>,
    pub index: Option<i64>,
    pub language: Option<String>,
    pub codec: Option<String>,
    /// Server path of an external subtitle file.
    pub key: Option<String>,
}

/// Everything extracted from one media document. Never mutated after extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamBundle {
    pub kind: MediaKind,
    /// `key` of the media node.
    pub path: Option<String>,
    /// Milliseconds.
    pub view_offset: u64,
    /// Milliseconds.
    pub duration: u64,
    pub metadata: Option<MediaMetadata>,
    pub parts: Vec<PlayablePart>,
    /// True when stream descriptors were scanned.
    pub streams_scanned: bool,
    pub audio: Option<StreamRef>,
    pub audio_count: usize,
    /// Position of the selected audio stream among audio streams.
    pub audio_offset: Option<usize>,
    pub subtitle: Option<StreamRef>,
    pub subtitle_count: usize,
    /// Index of the selected embedded subtitle relative to the lowest one.
    pub subtitle_offset: Option<i64>,
}

/// Chosen part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartChoice {
    pub index: usize,
    /// Play as a DVD image over a network share.
    pub dvd: bool,
}

/// Final stream selection handed to the player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamSelection {
    pub kind: MediaKind,
    pub part: PlayablePart,
    pub part_index: usize,
    pub resume_secs: u64,
    pub duration_secs: u64,
    pub audio: Option<StreamRef>,
    pub audio_offset: Option<usize>,
    pub subtitle: Option<StreamRef>,
    pub subtitle_offset: Option<i64>,
    /// Formatted URL of a selected external subtitle.
    pub subtitle_url: Option<String>,
    pub transcode: bool,
    pub transcode_profile: usize,
    pub session: Option<String>,
}

/// Player-ready result of resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackDescriptor {
    /// Local path, share URL or HTTP URL.
    pub url: String,
    pub kind: MediaKind,
    /// The server is reached over https.
    pub secure: bool,
    pub resume_secs: u64,
    pub duration_secs: u64,
    /// Transcode session to stop when playback ends.
    pub session: Option<String>,
    pub metadata: Option<MediaMetadata>,
    pub selection: StreamSelection,
}
