use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tandem_core::{DEFAULT_STUN_ADDRS, IceServerConfig, MediaConstraints};
use tandem_server::{SignalingService, TransportConfig, router};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Two-connection WebRTC media session server", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept signaling connections and negotiate a media session on each.
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// STUN/TURN URL, repeatable. Defaults to the public Google STUN servers.
    #[arg(long = "ice-server")]
    ice_servers: Vec<String>,

    #[arg(long)]
    ice_username: Option<String>,

    #[arg(long)]
    ice_credential: Option<String>,

    /// Public IP advertised in host candidates, repeatable.
    #[arg(long = "nat-ip")]
    nat_ips: Vec<String>,

    /// UDP port range for ICE, e.g. `50000-60000`.
    #[arg(long)]
    udp_ports: Option<PortRange>,

    /// Directory with a browser client to serve next to `/websocket`.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    #[arg(long)]
    no_audio: bool,

    #[arg(long)]
    no_video: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PortRange {
    min: u16,
    max: u16,
}

impl FromStr for PortRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| format!("expected MIN-MAX, got {s:?}"))?;
        let min: u16 = min.trim().parse().map_err(|e| format!("bad port {min:?}: {e}"))?;
        let max: u16 = max.trim().parse().map_err(|e| format!("bad port {max:?}: {e}"))?;
        if min == 0 || min > max {
            return Err(format!("invalid port range {min}-{max}"));
        }
        Ok(Self { min, max })
    }
}

impl ServeArgs {
    fn transport_config(&self) -> TransportConfig {
        let urls = if self.ice_servers.is_empty() {
            DEFAULT_STUN_ADDRS.iter().map(|s| s.to_string()).collect()
        } else {
            self.ice_servers.clone()
        };

        TransportConfig {
            ice_servers: vec![IceServerConfig {
                urls,
                username: self.ice_username.clone(),
                credential: self.ice_credential.clone(),
            }],
            nat_1to1_ips: self.nat_ips.clone(),
            udp_port_range: self.udp_ports.map(|r| (r.min, r.max)),
        }
    }

    fn media_constraints(&self) -> MediaConstraints {
        MediaConstraints {
            video: !self.no_video,
            audio: !self.no_audio,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let service = SignalingService::with_webrtc(args.transport_config(), args.media_constraints());
    let app = router(service.clone(), args.static_dir.clone());

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;

    println!(
        "{}",
        format!("Starting server... on http://{}", args.bind).green().bold()
    );
    info!("Signaling endpoint at ws://{}/websocket", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(service))
        .await
        .context("Server error")?;

    println!("{}", "Server stopped".yellow());
    Ok(())
}

async fn shutdown_signal(service: SignalingService) {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down {} live sessions", service.sessions().len());
    service.sessions().teardown_all().await;
}
