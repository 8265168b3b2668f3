//! Part selection.

use log::debug;

use super::media::{PartChoice, PlayablePart, PlaybackError, PlaybackResult, StreamBundle};

const DVD_IMAGE_LABEL: &str = "DVD Image";

/// Asks the user to pick one entry from a list.
pub trait Chooser: Send + Sync {
    /// Returns the chosen index, or None when the user cancels.
    fn select_one(&self, prompt: &str, options: &[String]) -> Option<usize>;
}

fn is_dvd_image(path: &str) -> bool {
    path.to_ascii_lowercase().contains(".ifo")
}

fn part_label(part: &PlayablePart) -> String {
    match &part.file {
        Some(file) => file.rsplit('/').next().unwrap_or(file).to_string(),
        None => {
            let extension = part.key.rsplit('.').next().unwrap_or_default();
            format!(
                "{} {} {:.1}Mbps",
                extension, part.details.resolution, part.details.bitrate
            )
        }
    }
}

/// Picks the part to play.
///
/// A single part is chosen without asking. With `force_dvd`, DVD images are
/// labelled as such and flagged for share playback.
pub fn select_part(
    bundle: &StreamBundle,
    force_dvd: bool,
    chooser: &dyn Chooser,
) -> PlaybackResult<PartChoice> {
    match bundle.parts.as_slice() {
        [] => Err(PlaybackError::NoParts),
        [only] => Ok(PartChoice {
            index: 0,
            dvd: force_dvd && only.file.as_deref().is_some_and(is_dvd_image),
        }),
        parts => {
            let labels: Vec<String> = parts
                .iter()
                .map(|part| {
                    let label = part_label(part);
                    if force_dvd && is_dvd_image(&label) {
                        DVD_IMAGE_LABEL.to_string()
                    } else {
                        label
                    }
                })
                .collect();

            let index = chooser
                .select_one("Select a part", &labels)
                .filter(|&idx| idx < labels.len())
                .ok_or(PlaybackError::Cancelled)?;
            debug!("[Playback] Selected part {}: {}", index, labels[index]);

            Ok(PartChoice {
                index,
                dvd: labels[index] == DVD_IMAGE_LABEL,
            })
        }
    }
}
