//! Transcode decision for a chosen part.

use super::media::{PartDetails, ResolutionBucket};
use crate::settings::TranscodeForcing;

/// Whether a part must be transcoded.
///
/// Forcing rules win over the request: hevc video, 4K resolution and bit
/// depths above 8 each force transcoding when their flag is set. An
/// unreadable bit depth never forces.
pub fn decide_transcode(details: &PartDetails, requested: bool, forcing: &TranscodeForcing) -> bool {
    let hevc = details
        .codec
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case("hevc"));
    if forcing.hevc && hevc {
        return true;
    }
    if forcing.above_1080 && details.resolution == ResolutionBucket::Uhd4k {
        return true;
    }
    if forcing.above_8bit && details.bit_depth.is_some_and(|depth| depth > 8) {
        return true;
    }
    requested
}
