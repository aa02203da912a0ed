//! Wire payloads for the HTTP request surface and the push channel.

use crate::{Bet, BetId, BetStatus, CoinSide};
use serde::{Deserialize, Serialize};

/// Body of `POST /bets`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBet {
    pub title: String,
    pub amount: f64,
    pub creator: String,
    pub creator_choice: CoinSide,
}

/// Body of `PUT /bets/{id}`.
///
/// Exactly one of three shapes is legal: `{status: "accepted", opponent}`,
/// `{status: "resolved", winner}`, or `{gamePlayed: true}` (which asks the
/// server to perform the coin flip). Anything else is rejected.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateBet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BetStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_played: Option<bool>,
}

impl UpdateBet {
    /// Request accepting the bet as `opponent`.
    pub fn accept(opponent: impl Into<String>) -> Self {
        Self {
            status: Some(BetStatus::Accepted),
            opponent: Some(opponent.into()),
            ..Self::default()
        }
    }

    /// Request direct resolution in favor of `winner`.
    pub fn resolve(winner: impl Into<String>) -> Self {
        Self {
            status: Some(BetStatus::Resolved),
            winner: Some(winner.into()),
            ..Self::default()
        }
    }

    /// Request a server-side coin flip.
    pub fn play() -> Self {
        Self {
            game_played: Some(true),
            ..Self::default()
        }
    }
}

/// Event broadcast to every connected subscriber after a mutation commits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BetEvent {
    Created { bet: Bet },
    Updated { bet: Bet },
    Deleted { id: BetId },
}

impl BetEvent {
    /// Event kind as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            BetEvent::Created { .. } => "created",
            BetEvent::Updated { .. } => "updated",
            BetEvent::Deleted { .. } => "deleted",
        }
    }
}

/// JSON envelope carried by every error response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
