use crate::transport::peer_connection::{PeerConnection, PeerConnectionFactory};
use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_event::TransportEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::{
    ConnectionState, IceCandidate, MediaTrack, Result, Role, SdpType, SessionDescription,
    SessionError, TrackKind,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::api::setting_engine::SettingEngine;
use webrtc::ice::udp_network::{EphemeralUDP, UDPNetwork};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_candidate_type::RTCIceCandidateType;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use webrtc::track::track_remote::TrackRemote;

/// Opens `webrtc` crate peer connections configured from a [`TransportConfig`].
#[derive(Clone, Default)]
pub struct WebRtcPeerConnectionFactory {
    config: TransportConfig,
}

impl WebRtcPeerConnectionFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    fn setting_engine(&self) -> Result<SettingEngine> {
        let mut settings = SettingEngine::default();

        if !self.config.nat_1to1_ips.is_empty() {
            settings.set_nat_1to1_ips(
                self.config.nat_1to1_ips.clone(),
                RTCIceCandidateType::Host,
            );
        }

        if let Some((min, max)) = self.config.udp_port_range {
            let ephemeral = EphemeralUDP::new(min, max).map_err(|e| {
                SessionError::configuration(format!("udp port range {min}-{max}: {e}"))
            })?;
            settings.set_udp_network(UDPNetwork::Ephemeral(ephemeral));
        }

        Ok(settings)
    }
}

#[async_trait]
impl PeerConnectionFactory for WebRtcPeerConnectionFactory {
    async fn create(
        &self,
        role: Role,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn PeerConnection>> {
        let connection = WebRtcConnection::new(role, &self.config, self.setting_engine()?, events)
            .await?;
        Ok(Arc::new(connection))
    }
}

pub struct WebRtcConnection {
    role: Role,
    peer_connection: Arc<RTCPeerConnection>,
}

impl WebRtcConnection {
    pub async fn new(
        role: Role,
        config: &TransportConfig,
        settings: SettingEngine,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self> {
        let config_err = |e: webrtc::Error| SessionError::configuration(e.to_string());

        // 1. Codecs and interceptors (NACK, RTCP reports, TWCC)
        let mut m = MediaEngine::default();
        m.register_default_codecs().map_err(config_err)?;
        let registry = register_default_interceptors(Registry::new(), &mut m).map_err(config_err)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .with_setting_engine(settings)
            .build();

        // 2. STUN/TURN servers
        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(config_err)?,
        );

        // 3. Callbacks, each forwarding into the single event channel
        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                Box::pin(async move {
                    let _ = tx.send(TransportEvent::StateChanged(role, connection_state(s)));
                })
            },
        ));

        let ice_state_tx = events.clone();
        peer_connection.on_ice_connection_state_change(Box::new(
            move |s: RTCIceConnectionState| {
                let tx = ice_state_tx.clone();
                Box::pin(async move {
                    let _ = tx.send(TransportEvent::IceStateChanged(role, s.to_string()));
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                match candidate.to_json() {
                    Ok(init) => {
                        let _ = tx.send(TransportEvent::CandidateDiscovered(
                            role,
                            IceCandidate {
                                candidate: init.candidate,
                                sdp_mid: init.sdp_mid,
                                sdp_m_line_index: init.sdp_mline_index,
                                username_fragment: init.username_fragment,
                            },
                        ));
                    }
                    Err(e) => warn!("{} failed to serialize local candidate: {}", role, e),
                }
            })
        }));

        let track_tx = events;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Audio => TrackKind::Audio,
                        RTPCodecType::Video => TrackKind::Video,
                        other => {
                            warn!("{} received track of unknown kind {}", role, other);
                            return;
                        }
                    };
                    let _ = tx.send(TransportEvent::TrackReceived(role, kind));
                    drain_remote_track(role, track, receiver);
                })
            },
        ));

        Ok(Self {
            role,
            peer_connection,
        })
    }

    fn negotiation_err(&self) -> impl Fn(webrtc::Error) -> SessionError + '_ {
        move |e| SessionError::negotiation(self.role, e.to_string())
    }
}

#[async_trait]
impl PeerConnection for WebRtcConnection {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(self.negotiation_err())?;
        from_rtc(self.role, offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(self.negotiation_err())?;
        from_rtc(self.role, answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = to_rtc(self.role, desc)?;
        self.peer_connection
            .set_local_description(desc)
            .await
            .map_err(self.negotiation_err())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = to_rtc(self.role, desc)?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .map_err(self.negotiation_err())
    }

    async fn add_track(&self, track: MediaTrack) -> Result<()> {
        let mime_type = match track.kind {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video => MIME_TYPE_VP8,
        };
        let local: Arc<dyn TrackLocal + Send + Sync> = Arc::new(TrackLocalStaticRTP::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            track.id.clone(),
            track.stream_id.clone(),
        ));

        let rtp_sender = self
            .peer_connection
            .add_track(local)
            .await
            .map_err(self.negotiation_err())?;

        // RTCP has to be read for the interceptors to process it.
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtp_sender.read(&mut buf).await.is_ok() {}
        });

        debug!("{} attached {} track {}", self.role, track.kind, track.id);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(self.negotiation_err())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection
            .close()
            .await
            .map_err(self.negotiation_err())
    }
}

/// Reads remote RTP and RTCP until the track ends so receive buffers never
/// fill up. The media itself is not consumed.
fn drain_remote_track(role: Role, track: Arc<TrackRemote>, receiver: Arc<RTCRtpReceiver>) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = receiver.read_rtcp().await {
                debug!("{} stopped reading RTCP: {}", role, e);
                break;
            }
        }
    });

    tokio::spawn(async move {
        info!("{} receiving {} track {}", role, track.kind(), track.id());
        loop {
            if let Err(e) = track.read_rtp().await {
                debug!("{} stopped reading track {}: {}", role, track.id(), e);
                break;
            }
        }
    });
}

fn connection_state(s: RTCPeerConnectionState) -> ConnectionState {
    match s {
        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed => ConnectionState::Closed,
        _ => ConnectionState::New,
    }
}

fn to_rtc(role: Role, desc: SessionDescription) -> Result<RTCSessionDescription> {
    let converted = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp),
        SdpType::PrAnswer => RTCSessionDescription::pranswer(desc.sdp),
        SdpType::Rollback => {
            return Err(SessionError::negotiation(role, "rollback is not supported"));
        }
    };
    converted.map_err(|e| SessionError::negotiation(role, e.to_string()))
}

fn from_rtc(role: Role, desc: RTCSessionDescription) -> Result<SessionDescription> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::PrAnswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        other => {
            return Err(SessionError::negotiation(
                role,
                format!("platform produced a {other} description"),
            ));
        }
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    })
}
