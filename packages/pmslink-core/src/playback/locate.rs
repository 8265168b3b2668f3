//! Media location: local file, network share or server stream.

use log::debug;
use percent_encoding::percent_decode_str;

use super::media::PlayablePart;
use crate::settings::{Settings, StreamPolicy};

/// Filesystem probe used to decide local playback.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &str) -> bool;
}

/// [`FileSystem`] backed by the local machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &str) -> bool {
        std::path::Path::new(path).exists()
    }
}

/// Path flavour of a server-side file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// `\\host\share\...`
    Unc,
    /// `/...`
    Nix,
    /// `C:\...` or `C:/...`
    Win,
    Unknown,
}

impl FileType {
    pub fn detect(path: &str) -> Self {
        if path.starts_with("\\\\") {
            Self::Unc
        } else if path.starts_with('/') || path.starts_with('\\') {
            Self::Nix
        } else if matches!(path.get(1..3), Some(":\\") | Some(":/")) {
            Self::Win
        } else {
            Self::Unknown
        }
    }
}

/// Where a part will be played from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaLocation {
    /// Raw local path.
    LocalFile(String),
    /// `smb://` or `afp://` URL.
    Share(String),
    /// Server path to stream over HTTP.
    Stream(String),
}

impl MediaLocation {
    /// URL form, with `file:` marking local files.
    pub fn as_url(&self) -> String {
        match self {
            Self::LocalFile(path) => format!("file:{}", path),
            Self::Share(url) | Self::Stream(url) => url.clone(),
        }
    }
}

/// Decides how `part` is reached.
///
/// `server_host` is the media server's host, used for share URLs unless a
/// NAS override supplies one.
pub fn build_media_url(
    part: &PlayablePart,
    dvd: bool,
    settings: &Settings,
    server_host: &str,
    fs: &dyn FileSystem,
) -> MediaLocation {
    let stream = || MediaLocation::Stream(part.key.clone());
    let Some(file) = part.file.as_deref() else {
        return stream();
    };

    let protocol = match settings.stream_policy {
        StreamPolicy::Stream => return stream(),
        StreamPolicy::Auto => {
            let local = matches!(FileType::detect(file), FileType::Nix | FileType::Win);
            if local && fs.exists(file) {
                debug!("[Playback] Playing local file {}", file);
                return MediaLocation::LocalFile(file.to_string());
            }
            if !dvd {
                return stream();
            }
            StreamPolicy::Smb.share_protocol()
        }
        policy => policy.share_protocol(),
    };

    match protocol {
        Some(protocol) => {
            let url = share_url(protocol, file, settings, server_host);
            debug!("[Playback] Share location {}", url);
            MediaLocation::Share(url)
        }
        None => stream(),
    }
}

fn share_url(protocol: &str, file: &str, settings: &Settings, server_host: &str) -> String {
    let file = percent_decode_str(file).decode_utf8_lossy();

    let url = if FileType::detect(&file) == FileType::Unc {
        format!("{}:{}", protocol, file.replace('\\', "/"))
    } else {
        let server = settings.nas.host().unwrap_or(server_host);
        let login = settings.nas.login_string();
        match file.find("Volumes") {
            Some(idx) if idx > 0 => {
                let share_host = format!("{}{}", login, server);
                format!("{}:/{}", protocol, file.replace("Volumes", &share_host))
            }
            _ if FileType::detect(&file) == FileType::Win => format!(
                "{}://{}{}/{}",
                protocol,
                login,
                server,
                file.get(3..).unwrap_or_default().replace('\\', "/")
            ),
            _ => format!("{}://{}{}{}", protocol, login, server, file),
        }
    };

    match settings.nas.root() {
        Some(root) => reroot(&url, root),
        None => url,
    }
}

/// Drops the path components between the host and the `root` directory.
fn reroot(url: &str, root: &str) -> String {
    if !url.contains(&format!("/{}/", root)) {
        return url.to_string();
    }
    let mut components: Vec<&str> = url.split('/').collect();
    let directories = components.len().saturating_sub(1);
    let Some(index) = components[..directories].iter().position(|c| *c == root) else {
        return url.to_string();
    };
    if index > 3 {
        components.drain(3..index);
    }
    components.join("/")
}
