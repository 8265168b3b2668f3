//! Playback resolution.
//!
//! Turns a media metadata document into a player-ready descriptor:
//!
//! 1. extract parts and stream selections from the document
//! 2. pick a part, asking the user when there is more than one
//! 3. locate it as a local file, a network share or a server stream
//! 4. decide on transcoding and build the final URL

mod extract;
mod locate;
mod media;
mod select;
#[cfg(test)]
mod test_fixtures;
mod transcode;

use std::sync::Arc;

use log::{debug, info};

use crate::connection::{ConnectionArbiter, LibraryClient};
use crate::registry::ServerRecord;

pub use extract::extract_streams;
pub use locate::{build_media_url, FileSystem, FileType, LocalFileSystem, MediaLocation};
pub use media::{
    MediaKind, MediaMetadata, PartChoice, PartDetails, PlayablePart, PlaybackDescriptor,
    PlaybackError, PlaybackResult, ResolutionBucket, StreamBundle, StreamRef, StreamSelection,
    VideoKind,
};
pub use select::{select_part, Chooser};
pub use transcode::decide_transcode;

/// Caller options for one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackRequest {
    pub transcode: bool,
    pub transcode_profile: usize,
    /// Milliseconds. A positive value replaces the stored resume offset,
    /// anything else starts from the beginning.
    pub force_resume_ms: Option<i64>,
    pub include_full_metadata: bool,
}

/// Resolves media documents into [`PlaybackDescriptor`]s.
pub struct PlaybackResolver {
    arbiter: Arc<ConnectionArbiter>,
    chooser: Arc<dyn Chooser>,
    fs: Arc<dyn FileSystem>,
}

impl PlaybackResolver {
    pub fn new(
        arbiter: Arc<ConnectionArbiter>,
        chooser: Arc<dyn Chooser>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self { arbiter, chooser, fs }
    }

    /// Resolves an already fetched metadata document served by `record`.
    pub fn resolve(
        &self,
        record: &ServerRecord,
        xml: &str,
        request: &PlaybackRequest,
    ) -> PlaybackResult<PlaybackDescriptor> {
        let settings = self.arbiter.settings();
        let bundle = extract_streams(xml, request.include_full_metadata, settings)?;
        let choice = select_part(&bundle, settings.force_dvd, self.chooser.as_ref())?;
        let part = bundle
            .parts
            .get(choice.index)
            .cloned()
            .ok_or(PlaybackError::NoParts)?;

        let location = build_media_url(&part, choice.dvd, settings, record.host(), self.fs.as_ref());
        let wants_transcode = decide_transcode(&part.details, request.transcode, &settings.transcode);

        let resume_ms = match request.force_resume_ms {
            Some(ms) => ms.max(0) as u64,
            None => bundle.view_offset,
        };

        // Only HTTP streams can be transcoded.
        let (url, session) = match &location {
            MediaLocation::LocalFile(path) => (path.clone(), None),
            MediaLocation::Share(url) => (url.clone(), None),
            MediaLocation::Stream(key) if wants_transcode => {
                let media_path = bundle.path.as_deref().unwrap_or(key);
                let transcode =
                    self.arbiter
                        .universal_transcode(record, media_path, request.transcode_profile);
                (transcode.url, Some(transcode.session))
            }
            MediaLocation::Stream(key) => (self.arbiter.formatted_url(record, key, &[]), None),
        };

        let subtitle_url = bundle
            .subtitle
            .as_ref()
            .and_then(|s| s.key.as_deref())
            .map(|key| self.arbiter.formatted_url(record, key, &[]));

        info!(
            "[Playback] Resolved {} part {} via {}{}",
            bundle.path.as_deref().unwrap_or("<unknown>"),
            choice.index,
            match location {
                MediaLocation::LocalFile(_) => "local file",
                MediaLocation::Share(_) => "network share",
                MediaLocation::Stream(_) => "server stream",
            },
            if session.is_some() { " (transcoded)" } else { "" }
        );

        let selection = StreamSelection {
            kind: bundle.kind,
            part_index: choice.index,
            resume_secs: resume_ms / 1000,
            duration_secs: bundle.duration / 1000,
            audio: bundle.audio.clone(),
            audio_offset: bundle.audio_offset,
            subtitle: bundle.subtitle.clone(),
            subtitle_offset: bundle.subtitle_offset,
            subtitle_url,
            transcode: session.is_some(),
            transcode_profile: request.transcode_profile,
            session: session.clone(),
            part,
        };

        Ok(PlaybackDescriptor {
            url,
            kind: bundle.kind,
            secure: record.is_secure(),
            resume_secs: selection.resume_secs,
            duration_secs: selection.duration_secs,
            session,
            metadata: bundle.metadata,
            selection,
        })
    }

    /// Fetches `/library/metadata/<media_id>` from `record` and resolves it.
    ///
    /// An offline or unauthorized server yields [`PlaybackError::NoPlayableItem`].
    pub async fn play_library_media(
        &self,
        record: &mut ServerRecord,
        media_id: &str,
        request: &PlaybackRequest,
    ) -> PlaybackResult<PlaybackDescriptor> {
        let xml = LibraryClient::new(&self.arbiter)
            .metadata(record, media_id)
            .await;
        debug!("[Playback] Fetched metadata for {} ({} bytes)", media_id, xml.len());
        self.resolve(record, &xml, request)
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::{
        DVD_AND_FILE_XML, DVD_XML, EPISODE_XML, MOVIE_XML, NO_PARTS_XML, TRACK_XML,
    };
    use super::*;
    use crate::connection::ReqwestTransport;
    use crate::identity::test_identity;
    use crate::registry::{DiscoveryOrigin, Scheme};
    use crate::settings::{Settings, StreamPolicy, TranscodeForcing};
    use std::collections::HashSet;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FirstChooser;

    impl Chooser for FirstChooser {
        fn select_one(&self, _prompt: &str, _options: &[String]) -> Option<usize> {
            Some(0)
        }
    }

    struct CancelChooser;

    impl Chooser for CancelChooser {
        fn select_one(&self, _prompt: &str, _options: &[String]) -> Option<usize> {
            None
        }
    }

    struct FakeFileSystem(HashSet<String>);

    impl FileSystem for FakeFileSystem {
        fn exists(&self, path: &str) -> bool {
            self.0.contains(path)
        }
    }

    fn resolver_with(settings: Settings, chooser: Arc<dyn Chooser>, files: &[&str]) -> PlaybackResolver {
        let transport = Arc::new(ReqwestTransport::new());
        let arbiter = ConnectionArbiter::new(test_identity(), settings, transport.clone(), transport);
        let fs = FakeFileSystem(files.iter().map(|f| f.to_string()).collect());
        PlaybackResolver::new(Arc::new(arbiter), chooser, Arc::new(fs))
    }

    fn record() -> ServerRecord {
        let mut record = ServerRecord::new("u1", "Den", DiscoveryOrigin::LocalMulticast, "192.168.1.10");
        record.scheme = Scheme::Http;
        record
    }

    #[test]
    fn local_file_is_returned_as_raw_path() {
        let resolver = resolver_with(
            Settings::default(),
            Arc::new(FirstChooser),
            &["/media/movies/Heat (1995).mkv"],
        );
        let request = PlaybackRequest::default();
        let descriptor = resolver.resolve(&record(), MOVIE_XML, &request).unwrap();

        assert_eq!(descriptor.url, "/media/movies/Heat (1995).mkv");
        assert_eq!(descriptor.kind, MediaKind::Video);
        assert!(!descriptor.secure);
        assert_eq!(descriptor.resume_secs, 600);
        assert_eq!(descriptor.duration_secs, 7200);
        assert!(descriptor.session.is_none());
        assert_eq!(descriptor.selection.audio_offset, Some(1));
        assert_eq!(descriptor.selection.subtitle_offset, Some(1));
    }

    #[test]
    fn stream_url_carries_identification() {
        let resolver = resolver_with(Settings::default(), Arc::new(FirstChooser), &[]);
        let descriptor = resolver
            .resolve(&record(), MOVIE_XML, &PlaybackRequest::default())
            .unwrap();

        assert!(descriptor
            .url
            .starts_with("http://192.168.1.10:32400/library/parts/201/file.mkv?"));
        assert!(descriptor.url.contains("X-Plex-Client-Identifier=client-1234"));
        assert!(descriptor.session.is_none());
        assert!(!descriptor.selection.transcode);
    }

    #[test]
    fn forced_hevc_transcodes_with_session() {
        let settings = Settings {
            transcode: TranscodeForcing {
                hevc: true,
                ..TranscodeForcing::default()
            },
            ..Settings::default()
        };
        // Second part is the hevc one.
        struct SecondChooser;
        impl Chooser for SecondChooser {
            fn select_one(&self, _prompt: &str, _options: &[String]) -> Option<usize> {
                Some(1)
            }
        }
        let resolver = resolver_with(settings, Arc::new(SecondChooser), &[]);
        let descriptor = resolver
            .resolve(&record(), MOVIE_XML, &PlaybackRequest::default())
            .unwrap();

        let session = descriptor.session.clone().unwrap();
        assert!(descriptor.url.contains("/video/:/transcode/universal/start.m3u8?"));
        assert!(descriptor.url.contains(&format!("session={}", session)));
        assert!(descriptor.url.contains("library%2Fmetadata%2F101"));
        assert!(descriptor.selection.transcode);
        assert_eq!(descriptor.selection.part_index, 1);
    }

    #[test]
    fn share_location_is_never_transcoded() {
        let settings = Settings {
            force_dvd: true,
            ..Settings::default()
        };
        let resolver = resolver_with(settings, Arc::new(FirstChooser), &[]);
        let request = PlaybackRequest {
            transcode: true,
            ..PlaybackRequest::default()
        };
        let descriptor = resolver.resolve(&record(), DVD_XML, &request).unwrap();

        assert_eq!(
            descriptor.url,
            "smb://192.168.1.10/Media/Alien/VIDEO_TS/VIDEO_TS.IFO"
        );
        assert!(descriptor.session.is_none());
        assert!(!descriptor.selection.transcode);
    }

    #[test]
    fn chosen_dvd_image_plays_over_smb() {
        let settings = Settings {
            stream_policy: StreamPolicy::Auto,
            force_dvd: true,
            ..Settings::default()
        };
        let resolver = resolver_with(settings.clone(), Arc::new(FirstChooser), &[]);
        let descriptor = resolver
            .resolve(&record(), DVD_AND_FILE_XML, &PlaybackRequest::default())
            .unwrap();
        assert_eq!(
            descriptor.url,
            "smb://192.168.1.10/Media/Aliens/VIDEO_TS/VIDEO_TS.IFO"
        );
        assert_eq!(descriptor.selection.part_index, 0);

        struct SecondChooser;
        impl Chooser for SecondChooser {
            fn select_one(&self, _prompt: &str, _options: &[String]) -> Option<usize> {
                Some(1)
            }
        }
        let resolver = resolver_with(settings, Arc::new(SecondChooser), &[]);
        let descriptor = resolver
            .resolve(&record(), DVD_AND_FILE_XML, &PlaybackRequest::default())
            .unwrap();
        assert!(descriptor
            .url
            .starts_with("http://192.168.1.10:32400/library/parts/232/file.mkv?"));
    }

    #[test]
    fn unparseable_document_aborts_silently() {
        let resolver = resolver_with(Settings::default(), Arc::new(FirstChooser), &[]);
        let err = resolver
            .resolve(
                &record(),
                r#"<MediaContainer><Video key="/x"><Media></Video></MediaContainer>"#,
                &PlaybackRequest::default(),
            )
            .unwrap_err();
        assert_eq!(err, PlaybackError::NoPlayableItem);
        assert!(err.is_silent());
    }

    #[test]
    fn forced_resume_overrides_stored_offset() {
        let resolver = resolver_with(Settings::default(), Arc::new(FirstChooser), &[]);
        let mut request = PlaybackRequest {
            force_resume_ms: Some(90_500),
            ..PlaybackRequest::default()
        };
        let descriptor = resolver.resolve(&record(), MOVIE_XML, &request).unwrap();
        assert_eq!(descriptor.resume_secs, 90);

        request.force_resume_ms = Some(0);
        let descriptor = resolver.resolve(&record(), MOVIE_XML, &request).unwrap();
        assert_eq!(descriptor.resume_secs, 0);
    }

    #[test]
    fn external_subtitle_url_is_formatted() {
        let settings = Settings {
            stream_policy: StreamPolicy::Stream,
            ..Settings::default()
        };
        let resolver = resolver_with(settings, Arc::new(FirstChooser), &[]);
        let descriptor = resolver
            .resolve(&record(), EPISODE_XML, &PlaybackRequest::default())
            .unwrap();
        let subtitle_url = descriptor.selection.subtitle_url.unwrap();
        assert!(subtitle_url.starts_with("http://192.168.1.10:32400/library/streams/900?"));
    }

    #[test]
    fn music_carries_track_metadata() {
        let resolver = resolver_with(Settings::default(), Arc::new(FirstChooser), &[]);
        let request = PlaybackRequest {
            include_full_metadata: true,
            ..PlaybackRequest::default()
        };
        let descriptor = resolver.resolve(&record(), TRACK_XML, &request).unwrap();
        assert_eq!(descriptor.kind, MediaKind::Music);
        assert!(matches!(descriptor.metadata, Some(MediaMetadata::Track { .. })));
    }

    #[test]
    fn cancel_and_missing_parts_abort() {
        let resolver = resolver_with(Settings::default(), Arc::new(CancelChooser), &[]);
        let request = PlaybackRequest::default();
        let cancelled = resolver.resolve(&record(), MOVIE_XML, &request).unwrap_err();
        assert_eq!(cancelled, PlaybackError::Cancelled);
        assert!(cancelled.is_silent());

        let empty = resolver.resolve(&record(), NO_PARTS_XML, &request).unwrap_err();
        assert_eq!(empty, PlaybackError::NoParts);
        assert!(!empty.is_silent());
    }

    #[tokio::test]
    async fn library_media_is_fetched_then_resolved() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/metadata/101"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MOVIE_XML))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = resolver_with(Settings::default(), Arc::new(FirstChooser), &[]);
        let mut record = ServerRecord::new(
            "u1",
            "Mock",
            DiscoveryOrigin::UserEntered,
            server.address().to_string(),
        );
        record.scheme = Scheme::Http;

        let descriptor = resolver
            .play_library_media(&mut record, "101", &PlaybackRequest::default())
            .await
            .unwrap();
        assert!(descriptor.url.contains("/library/parts/201/file.mkv"));
    }

    #[tokio::test]
    async fn unauthorized_server_has_nothing_to_play() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let resolver = resolver_with(Settings::default(), Arc::new(FirstChooser), &[]);
        let mut record = ServerRecord::new(
            "u1",
            "Mock",
            DiscoveryOrigin::UserEntered,
            server.address().to_string(),
        );
        record.scheme = Scheme::Http;

        let err = resolver
            .play_library_media(&mut record, "101", &PlaybackRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err, PlaybackError::NoPlayableItem);
    }
}
