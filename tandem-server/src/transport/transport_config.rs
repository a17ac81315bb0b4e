use tandem_core::IceServerConfig;

/// Platform configuration shared by every peer connection a session opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// Public addresses advertised as host candidates instead of the local ones.
    pub nat_1to1_ips: Vec<String>,
    /// Inclusive UDP port range for ICE; any free port when `None`.
    pub udp_port_range: Option<(u16, u16)>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::default_stun()],
            nat_1to1_ips: Vec::new(),
            udp_port_range: None,
        }
    }
}
