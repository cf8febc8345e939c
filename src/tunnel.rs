//! Public URL discovery through a local ngrok-compatible agent.
//!
//! When a tunnel agent is running it exposes its active tunnels on a local
//! inspection API; the daemon asks it for the public URL and announces the
//! feed endpoints over the alert channel so operators can open the streams
//! from anywhere.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::alert::Notifier;

pub const DEFAULT_TUNNEL_API_URL: &str = "http://127.0.0.1:4040/api/tunnels";

#[derive(Debug, Deserialize)]
struct TunnelList {
    tunnels: Vec<Tunnel>,
}

#[derive(Debug, Deserialize)]
struct Tunnel {
    public_url: String,
    proto: String,
}

/// Ask the local tunnel agent for the public URL of the forwarded server,
/// preferring an https tunnel when both protocols are active.
pub fn discover_public_url(api_url: &str) -> Result<Url> {
    let response = ureq::get(api_url)
        .call()
        .with_context(|| format!("query tunnel agent at {}", api_url))?;
    let list: TunnelList = serde_json::from_reader(response.into_reader())
        .context("parse tunnel agent response")?;

    let tunnel = list
        .tunnels
        .iter()
        .find(|t| t.proto == "https")
        .or_else(|| list.tunnels.first())
        .ok_or_else(|| anyhow!("tunnel agent reports no active tunnels"))?;

    Url::parse(&tunnel.public_url)
        .with_context(|| format!("parse tunnel public url '{}'", tunnel.public_url))
}

/// Announce the feed URLs over the alert channel. Discovery and delivery
/// failures are logged, not fatal: the daemon serves locally either way.
pub fn announce_feeds(api_url: &str, notifier: &dyn Notifier) {
    let public_url = match discover_public_url(api_url) {
        Ok(url) => url,
        Err(err) => {
            log::info!("tunnel: no public url available: {:#}", err);
            return;
        }
    };

    let base = public_url.as_str().trim_end_matches('/');
    let message = format!(
        "Live camera feed (raw): {base}/raw_feed\nLive video feed (with detection): {base}/video_feed",
        base = base
    );
    match notifier.send_message(&message) {
        Ok(()) => log::info!("tunnel: announced feeds at {}", base),
        Err(err) => log::warn!("tunnel: failed to announce feeds: {:#}", err),
    }
}
