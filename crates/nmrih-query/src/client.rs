//! UDP client for the `A2S_PLAYER` exchange.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use nmrih_types::PlayersInfo;
use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::QueryError;
use crate::protocol::{NO_CHALLENGE, Response, parse_response, player_request};

/// Largest single-packet response a Source server sends.
const MAX_PACKET: usize = 1400;

/// Challenges accepted before giving up on a server.
const MAX_CHALLENGES: usize = 3;

/// Queries one game server for its live roster.
#[derive(Debug, Clone)]
pub struct A2sClient {
    addr: String,
    timeout: Duration,
}

impl A2sClient {
    /// Create a client for `host:port`. `timeout` bounds the whole exchange,
    /// name resolution included.
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            timeout,
        }
    }

    /// The `host:port` this client queries.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Ask the server who is online.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Timeout`] if the server does not answer in time
    /// and other [`QueryError`] variants for socket or decoding failures.
    pub async fn players(&self) -> Result<PlayersInfo, QueryError> {
        tokio::time::timeout(self.timeout, self.exchange()).await?
    }

    async fn exchange(&self) -> Result<PlayersInfo, QueryError> {
        let target = self.resolve().await?;
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;

        let mut challenge = NO_CHALLENGE;
        let mut buffer = vec![0_u8; MAX_PACKET];
        for _ in 0..MAX_CHALLENGES {
            socket.send(&player_request(challenge)).await?;
            let len = socket.recv(&mut buffer).await?;
            match parse_response(buffer.get(..len).unwrap_or_default())? {
                Response::Players(info) => {
                    debug!(server = %target, players = info.count, "roster received");
                    return Ok(info);
                }
                Response::Challenge(next) => {
                    debug!(server = %target, "challenge received");
                    challenge = next;
                }
            }
        }
        Err(QueryError::ChallengeRejected)
    }

    async fn resolve(&self) -> Result<SocketAddr, QueryError> {
        let resolve_error = |reason: String| QueryError::Resolve {
            addr: self.addr.clone(),
            reason,
        };
        tokio::net::lookup_host(&self.addr)
            .await
            .map_err(|e| resolve_error(e.to_string()))?
            .next()
            .ok_or_else(|| resolve_error(String::from("no addresses found")))
    }
}
