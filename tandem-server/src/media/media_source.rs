use async_trait::async_trait;
use tandem_core::{MediaConstraints, MediaTrack, Result, TrackKind};
use uuid::Uuid;

/// Produces the local tracks a session sends.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<Vec<MediaTrack>>;
}

/// Hands out one Opus audio and one VP8 video track descriptor per call,
/// each with a fresh id and stream id. Nothing is written to them.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticMediaSource;

#[async_trait]
impl MediaSource for StaticMediaSource {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<Vec<MediaTrack>> {
        let mut tracks = Vec::with_capacity(2);
        if constraints.audio {
            tracks.push(fresh_track(TrackKind::Audio));
        }
        if constraints.video {
            tracks.push(fresh_track(TrackKind::Video));
        }
        Ok(tracks)
    }
}

fn fresh_track(kind: TrackKind) -> MediaTrack {
    MediaTrack::new(
        Uuid::new_v4().to_string(),
        Uuid::new_v4().to_string(),
        kind,
    )
}
