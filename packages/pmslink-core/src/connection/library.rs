//! Library side-effect requests built on [`ConnectionArbiter::talk`].

use super::arbiter::ConnectionArbiter;
use super::transport::HttpMethod;
use crate::protocol_constants::WATCHED_THRESHOLD_PERCENT;
use crate::registry::ServerRecord;

/// Playback state reported to the server timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

impl PlaybackState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

const LIBRARY_IDENTIFIER: &str = "com.plexapp.plugins.library";

/// Thin wrapper issuing library requests for one server record.
pub struct LibraryClient<'a> {
    arbiter: &'a ConnectionArbiter,
}

impl<'a> LibraryClient<'a> {
    pub fn new(arbiter: &'a ConnectionArbiter) -> Self {
        Self { arbiter }
    }

    pub async fn stop_transcode_session(&self, record: &mut ServerRecord, session: &str) {
        let path = format!("/video/:/transcode/segmented/stop?session={}", session);
        self.arbiter
            .talk(record, &path, HttpMethod::Get, false)
            .await;
    }

    /// Reports playback position. Times are in milliseconds.
    ///
    /// Stopping past the watched threshold reports the full duration and
    /// marks the item watched. A zero duration reports nothing.
    pub async fn report_progress(
        &self,
        record: &mut ServerRecord,
        media_id: &str,
        time_ms: u64,
        state: PlaybackState,
        duration_ms: u64,
    ) {
        if duration_ms == 0 {
            return;
        }

        let mut time_ms = time_ms;
        let mut mark_watched = false;
        if state == PlaybackState::Stopped
            && time_ms.saturating_mul(100) / duration_ms >= WATCHED_THRESHOLD_PERCENT
        {
            time_ms = duration_ms;
            mark_watched = true;
        }

        let path = format!(
            "/:/timeline?duration={}&guid={}&key=/library/metadata/{}&ratingKey={}&state={}&time={}",
            duration_ms,
            LIBRARY_IDENTIFIER,
            media_id,
            media_id,
            state.as_str(),
            time_ms
        );
        self.arbiter
            .talk(record, &path, HttpMethod::Get, false)
            .await;

        if mark_watched {
            self.mark_watched(record, media_id).await;
        }
    }

    pub async fn mark_watched(&self, record: &mut ServerRecord, media_id: &str) {
        let path = format!("/:/scrobble?key={}&identifier={}", media_id, LIBRARY_IDENTIFIER);
        self.arbiter
            .talk(record, &path, HttpMethod::Get, false)
            .await;
    }

    pub async fn mark_unwatched(&self, record: &mut ServerRecord, media_id: &str) {
        let path = format!(
            "/:/unscrobble?key={}&identifier={}",
            media_id, LIBRARY_IDENTIFIER
        );
        self.arbiter
            .talk(record, &path, HttpMethod::Get, false)
            .await;
    }

    /// Metadata document for one item.
    pub async fn metadata(&self, record: &mut ServerRecord, media_id: &str) -> String {
        let path = format!("/library/metadata/{}", media_id);
        self.arbiter
            .talk(record, &path, HttpMethod::Get, false)
            .await
    }

    pub async fn set_audio_stream(
        &self,
        record: &mut ServerRecord,
        part_id: &str,
        stream_id: &str,
    ) -> String {
        let path = format!("/library/parts/{}?audioStreamID={}", part_id, stream_id);
        self.arbiter
            .talk(record, &path, HttpMethod::Put, false)
            .await
    }

    pub async fn set_subtitle_stream(
        &self,
        record: &mut ServerRecord,
        part_id: &str,
        stream_id: &str,
    ) -> String {
        let path = format!("/library/parts/{}?subtitleStreamID={}", part_id, stream_id);
        self.arbiter
            .talk(record, &path, HttpMethod::Put, false)
            .await
    }

    pub async fn delete_metadata(&self, record: &mut ServerRecord, media_id: &str) -> String {
        let path = format!("/library/metadata/{}", media_id);
        self.arbiter
            .talk(record, &path, HttpMethod::Delete, false)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::transport::ReqwestTransport;
    use crate::identity::test_identity;
    use crate::registry::{DiscoveryOrigin, Scheme};
    use crate::settings::Settings;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn arbiter() -> ConnectionArbiter {
        let transport = Arc::new(ReqwestTransport::new());
        ConnectionArbiter::new(
            test_identity(),
            Settings::default(),
            transport.clone(),
            transport,
        )
    }

    fn record_for(server: &MockServer) -> ServerRecord {
        let mut record = ServerRecord::new(
            "u1",
            "Mock",
            DiscoveryOrigin::UserEntered,
            server.address().to_string(),
        );
        record.scheme = Scheme::Http;
        record
    }

    #[tokio::test]
    async fn stopping_near_the_end_scrobbles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/:/timeline"))
            .and(query_param("state", "stopped"))
            .and(query_param("time", "100000"))
            .and(query_param("ratingKey", "42"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/:/scrobble"))
            .and(query_param("key", "42"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let arbiter = arbiter();
        let mut record = record_for(&server);
        LibraryClient::new(&arbiter)
            .report_progress(&mut record, "42", 98_500, PlaybackState::Stopped, 100_000)
            .await;
    }

    #[tokio::test]
    async fn playing_progress_does_not_scrobble() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/:/timeline"))
            .and(query_param("time", "99000"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/:/scrobble"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let arbiter = arbiter();
        let mut record = record_for(&server);
        LibraryClient::new(&arbiter)
            .report_progress(&mut record, "42", 99_000, PlaybackState::Playing, 100_000)
            .await;
    }

    #[tokio::test]
    async fn stream_selection_uses_put() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/library/parts/7"))
            .and(query_param("subtitleStreamID", "11"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let arbiter = arbiter();
        let mut record = record_for(&server);
        let body = LibraryClient::new(&arbiter)
            .set_subtitle_stream(&mut record, "7", "11")
            .await;
        assert_eq!(body, "ok");
    }
}
