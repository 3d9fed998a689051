//! Wire format of the `A2S_PLAYER` query.
//!
//! All packets start with the single-packet prefix `FF FF FF FF`:
//!
//! | Direction | Header | Body |
//! |-----------|--------|------|
//! | request   | `0x55` | challenge (4 bytes, `FF FF FF FF` to ask for one) |
//! | response  | `0x41` | challenge to echo back |
//! | response  | `0x44` | count (u8), then per player: index (u8), name (NUL-terminated), score (i32 LE), duration (f32 LE) |
//!
//! Split responses (prefix `FE FF FF FF`) are not supported.

use nmrih_types::{PlayerInfo, PlayersInfo};

use crate::error::QueryError;

/// Prefix of every single-packet message.
pub const SINGLE_PACKET: [u8; 4] = [0xFF; 4];

/// Challenge value that asks the server to issue a challenge.
pub const NO_CHALLENGE: [u8; 4] = [0xFF; 4];

/// Header of the player request.
pub const PLAYER_REQUEST: u8 = 0x55;

/// Header of a challenge response.
pub const CHALLENGE_RESPONSE: u8 = 0x41;

/// Header of a player list response.
pub const PLAYER_RESPONSE: u8 = 0x44;

/// A decoded server response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The server wants the request repeated with this challenge.
    Challenge([u8; 4]),
    /// The roster.
    Players(PlayersInfo),
}

/// Build an `A2S_PLAYER` request carrying `challenge`.
pub const fn player_request(challenge: [u8; 4]) -> [u8; 9] {
    let [p0, p1, p2, p3] = SINGLE_PACKET;
    let [c0, c1, c2, c3] = challenge;
    [p0, p1, p2, p3, PLAYER_REQUEST, c0, c1, c2, c3]
}

/// Decode a single-packet response.
///
/// # Errors
///
/// Returns [`QueryError`] for unknown prefixes or headers and for bodies
/// that end early.
pub fn parse_response(packet: &[u8]) -> Result<Response, QueryError> {
    let mut reader = Reader::new(packet);
    let prefix = reader.array::<4>("packet prefix")?;
    if prefix != SINGLE_PACKET {
        return Err(QueryError::UnsupportedPrefix(u32::from_le_bytes(prefix)));
    }

    match reader.u8("header")? {
        CHALLENGE_RESPONSE => Ok(Response::Challenge(reader.array::<4>("challenge")?)),
        PLAYER_RESPONSE => parse_players(&mut reader).map(Response::Players),
        other => Err(QueryError::UnexpectedHeader(other)),
    }
}

fn parse_players(reader: &mut Reader<'_>) -> Result<PlayersInfo, QueryError> {
    let count = reader.u8("player count")?;
    let mut players = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let _index = reader.u8("player index")?;
        let name = reader.c_string("player name")?;
        let score = i32::from_le_bytes(reader.array::<4>("player score")?);
        let duration = f32::from_le_bytes(reader.array::<4>("player duration")?);
        players.push(PlayerInfo {
            name,
            score,
            duration,
        });
    }
    Ok(PlayersInfo { count, players })
}

/// Forward-only cursor over a response body.
struct Reader<'a> {
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes }
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, QueryError> {
        let (first, rest) = self
            .rest
            .split_first()
            .ok_or(QueryError::Truncated(field))?;
        self.rest = rest;
        Ok(*first)
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], QueryError> {
        let (head, rest) = self
            .rest
            .split_first_chunk::<N>()
            .ok_or(QueryError::Truncated(field))?;
        self.rest = rest;
        Ok(*head)
    }

    /// NUL-terminated string; invalid UTF-8 is replaced, not rejected.
    fn c_string(&mut self, field: &'static str) -> Result<String, QueryError> {
        let end = self
            .rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(QueryError::Truncated(field))?;
        let (text, rest) = self.rest.split_at_checked(end).ok_or(QueryError::Truncated(field))?;
        self.rest = rest.get(1..).unwrap_or_default();
        Ok(String::from_utf8_lossy(text).into_owned())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::unreachable,
    clippy::arithmetic_side_effects
)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn player_packet(players: &[(&str, i32, f32)]) -> Vec<u8> {
        let mut packet = vec![0xFF, 0xFF, 0xFF, 0xFF, PLAYER_RESPONSE];
        packet.push(u8::try_from(players.len()).unwrap());
        for (index, (name, score, duration)) in players.iter().enumerate() {
            packet.push(u8::try_from(index).unwrap());
            packet.extend_from_slice(name.as_bytes());
            packet.push(0);
            packet.extend_from_slice(&score.to_le_bytes());
            packet.extend_from_slice(&duration.to_le_bytes());
        }
        packet
    }

    #[test]
    fn request_layout() {
        assert_eq!(
            player_request(NO_CHALLENGE),
            [0xFF, 0xFF, 0xFF, 0xFF, 0x55, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            player_request([1, 2, 3, 4]),
            [0xFF, 0xFF, 0xFF, 0xFF, 0x55, 1, 2, 3, 4]
        );
    }

    #[test]
    fn parses_challenge() {
        let packet = [0xFF, 0xFF, 0xFF, 0xFF, 0x41, 0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(
            parse_response(&packet).unwrap(),
            Response::Challenge([0xDE, 0xAD, 0xBE, 0xEF])
        );
    }

    #[test]
    fn parses_players() {
        let packet = player_packet(&[("Bob", 12, 65.5), ("Alice", -1, 3.25)]);
        let Response::Players(info) = parse_response(&packet).unwrap() else {
            unreachable!("expected players");
        };
        assert_eq!(info.count, 2);
        assert_eq!(info.players[0].name, "Bob");
        assert_eq!(info.players[0].score, 12);
        assert_eq!(info.players[0].duration, 65.5);
        assert_eq!(info.players[1].name, "Alice");
        assert_eq!(info.players[1].score, -1);
    }

    #[test]
    fn empty_server() {
        let Response::Players(info) = parse_response(&player_packet(&[])).unwrap() else {
            unreachable!("expected players");
        };
        assert_eq!(info.count, 0);
        assert!(info.players.is_empty());
    }

    #[test]
    fn truncated_player_is_error() {
        let mut packet = player_packet(&[("Bob", 12, 65.5)]);
        packet.truncate(packet.len() - 2);
        assert!(matches!(
            parse_response(&packet),
            Err(QueryError::Truncated("player duration"))
        ));
    }

    #[test]
    fn split_packets_are_rejected() {
        let packet = [0xFE, 0xFF, 0xFF, 0xFF, 0x44, 0];
        assert!(matches!(
            parse_response(&packet),
            Err(QueryError::UnsupportedPrefix(_))
        ));
    }

    #[test]
    fn unknown_header_is_rejected() {
        let packet = [0xFF, 0xFF, 0xFF, 0xFF, 0x49, 0];
        assert!(matches!(
            parse_response(&packet),
            Err(QueryError::UnexpectedHeader(0x49))
        ));
    }
}
