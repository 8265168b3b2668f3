//! Media document extraction.

use log::debug;

use super::media::{
    MediaKind, MediaMetadata, PartDetails, PlayablePart, PlaybackError, PlaybackResult,
    ResolutionBucket, StreamBundle, StreamRef, VideoKind,
};
use crate::protocol_constants::DEFAULT_MEDIA_DURATION;
use crate::settings::{Settings, StreamControl};
use crate::xml::{XmlElement, XmlError};

const AUDIO_STREAM_TYPE: &str = "2";
const SUBTITLE_STREAM_TYPE: &str = "3";

fn attr_string(node: &XmlElement, name: &str) -> String {
    node.attr_or(name, "").to_string()
}

fn attr_f64(node: &XmlElement, name: &str) -> f64 {
    node.attr(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_default()
}

/// Attribute from `node`, falling back to the same attribute on `root`.
fn inherited<'a>(node: &'a XmlElement, root: &'a XmlElement, name: &str) -> Option<&'a str> {
    node.attr(name).or_else(|| root.attr(name))
}

fn stream_ref(node: &XmlElement) -> StreamRef {
    StreamRef {
        id: node.attr("id").map(str::to_string),
        index: node.attr_i64("index"),
        language: node
            .attr("languageCode")
            .or_else(|| node.attr("language"))
            .map(str::to_string),
        codec: node.attr("codec").map(str::to_string),
        key: node.attr("key").map(str::to_string),
    }
}

fn part_details(media: &XmlElement) -> PartDetails {
    let bitrate = (attr_f64(media, "bitrate") / 1000.0 * 10.0).round() / 10.0;
    let bit_depth = match media.attr("bitDepth") {
        None => Some(8),
        Some(v) => v.trim().parse().ok(),
    };
    PartDetails {
        bitrate,
        bit_depth,
        resolution: ResolutionBucket::from_attr(media.attr("videoResolution")),
        container: media.attr_or("container", "unknown").to_string(),
        codec: media.attr("videoCodec").map(str::to_string),
    }
}

fn video_metadata(node: &XmlElement, root: &XmlElement, skip_genres: bool) -> MediaMetadata {
    let title = node.attr_or("title", "Unknown").to_string();
    let video_kind = match node.attr("type") {
        Some("movie") => VideoKind::Movie,
        Some("episode") => VideoKind::Episode {
            index: node.attr_i64("index").unwrap_or_default(),
            aired: attr_string(node, "originallyAvailableAt"),
            show_title: inherited(node, root, "grandparentTitle")
                .unwrap_or_default()
                .to_string(),
            season: inherited(node, root, "parentIndex")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or_default(),
        },
        _ => VideoKind::Other,
    };
    let genres = if skip_genres {
        Vec::new()
    } else {
        node.children_named("Genre")
            .filter_map(|g| g.attr("tag").map(str::to_string))
            .collect()
    };

    MediaMetadata::Video {
        sort_title: node.attr("titleSort").unwrap_or(&title).to_string(),
        title,
        plot: attr_string(node, "summary"),
        rating: attr_f64(node, "rating"),
        studio: attr_string(node, "studio"),
        mpaa: attr_string(node, "contentRating"),
        year: node.attr_i64("year").unwrap_or_default(),
        tagline: attr_string(node, "tagline"),
        thumb: node.attr("thumb").map(str::to_string),
        video_kind,
        genres,
    }
}

fn track_metadata(node: &XmlElement, root: &XmlElement) -> MediaMetadata {
    let index = node.attr_or("index", "0");
    MediaMetadata::Track {
        track_number: node.attr_i64("index").unwrap_or_default(),
        disc_number: node.attr_i64("parentIndex").unwrap_or_default(),
        title: format!("{:0>2}. {}", index, node.attr_or("title", "Unknown")),
        rating: attr_f64(node, "rating"),
        album: inherited(node, root, "parentTitle")
            .unwrap_or_default()
            .to_string(),
        artist: inherited(node, root, "grandparentTitle")
            .unwrap_or_default()
            .to_string(),
        duration_secs: node
            .attr_i64("duration")
            .map_or(0, |ms| ms.max(0) as u64 / 1000),
        thumb: node.attr("thumb").map(str::to_string),
    }
}

/// Parses a metadata document into a [`StreamBundle`].
///
/// Stream descriptors are only scanned for video when the server controls
/// stream selection.
pub fn extract_streams(
    xml: &str,
    include_full_metadata: bool,
    settings: &Settings,
) -> PlaybackResult<StreamBundle> {
    let root = XmlElement::parse(xml).map_err(|e| {
        if let XmlError::Malformed(reason) = &e {
            debug!("[Playback] Unparseable media document: {}", reason);
        }
        PlaybackError::NoPlayableItem
    })?;

    let (node, kind) = if let Some(node) = root.child("Video") {
        (node, MediaKind::Video)
    } else if let Some(node) = root.child("Track") {
        (node, MediaKind::Music)
    } else if let Some(node) = root.child("Photo") {
        (node, MediaKind::Picture)
    } else {
        return Err(PlaybackError::NoPlayableItem);
    };

    let view_offset = node.attr_i64("viewOffset").unwrap_or_default().max(0) as u64;
    let duration = node
        .attr_i64("duration")
        .map_or(DEFAULT_MEDIA_DURATION, |ms| ms.max(0) as u64);

    let metadata = include_full_metadata.then(|| match kind {
        MediaKind::Video => video_metadata(node, &root, settings.skip_metadata),
        MediaKind::Music => track_metadata(node, &root),
        MediaKind::Picture => MediaMetadata::Photo {
            title: node.attr_or("title", "Unknown").to_string(),
            thumb: node.attr("thumb").map(str::to_string),
        },
    });

    let parts: Vec<PlayablePart> = node
        .children_named("Media")
        .flat_map(|media| {
            let details = part_details(media);
            media.children_named("Part").map(move |part| PlayablePart {
                key: part.attr_or("key", "").to_string(),
                file: part.attr("file").map(str::to_string),
                details: details.clone(),
            })
        })
        .collect();

    let mut bundle = StreamBundle {
        kind,
        path: node.attr("key").map(str::to_string),
        view_offset,
        duration,
        metadata,
        parts,
        streams_scanned: false,
        audio: None,
        audio_count: 0,
        audio_offset: None,
        subtitle: None,
        subtitle_count: 0,
        subtitle_offset: None,
    };

    if kind == MediaKind::Video && settings.stream_control == StreamControl::Server {
        scan_streams(&root, &mut bundle);
    }

    debug!(
        "[Playback] Extracted {:?} with {} part(s), {} audio, {} subtitle stream(s)",
        bundle.kind,
        bundle.parts.len(),
        bundle.audio_count,
        bundle.subtitle_count
    );
    Ok(bundle)
}

fn scan_streams(root: &XmlElement, bundle: &mut StreamBundle) {
    bundle.streams_scanned = true;
    let mut lowest_subtitle: Option<i64> = None;

    for stream in root.descendants("Stream") {
        let selected = stream.attr("selected") == Some("1");
        match stream.attr("streamType") {
            Some(AUDIO_STREAM_TYPE) => {
                if selected {
                    bundle.audio = Some(stream_ref(stream));
                    bundle.audio_offset = Some(bundle.audio_count);
                }
                bundle.audio_count += 1;
            }
            Some(SUBTITLE_STREAM_TYPE) => {
                let index = stream.attr_i64("index").unwrap_or(-1);
                // The first subtitle seeds the base; later positive indexes lower it.
                let base = match lowest_subtitle {
                    None => index,
                    Some(base) if index > 0 && index < base => index,
                    Some(base) => base,
                };
                lowest_subtitle = Some(base);

                if selected {
                    let subtitle = stream_ref(stream);
                    if subtitle.key.is_none() {
                        bundle.subtitle_offset = Some(index - base);
                    }
                    bundle.subtitle = Some(subtitle);
                    bundle.subtitle_count += 1;
                }
            }
            _ => {}
        }
    }
}
