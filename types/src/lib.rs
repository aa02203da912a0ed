pub mod api;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a bet, assigned by the store at creation.
pub type BetId = Uuid;

/// Lifecycle state of a bet. Progression is strictly
/// `Open -> Accepted -> Resolved`; no state is ever skipped or revisited.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Open,
    Accepted,
    Resolved,
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetStatus::Open => write!(f, "open"),
            BetStatus::Accepted => write!(f, "accepted"),
            BetStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// One face of the coin.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl CoinSide {
    /// The opposite face.
    pub fn other(&self) -> Self {
        match self {
            CoinSide::Heads => CoinSide::Tails,
            CoinSide::Tails => CoinSide::Heads,
        }
    }
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinSide::Heads => write!(f, "heads"),
            CoinSide::Tails => write!(f, "tails"),
        }
    }
}

/// The wager entity tracked through open/accepted/resolved states.
///
/// `title`, `amount`, `creator`, and `creator_choice` are fixed at creation.
/// `opponent` is set once on accept, `winner` once on resolution, and
/// `game_played` flips to true when the coin flip produces a result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: BetId,
    pub title: String,
    pub amount: f64,
    pub status: BetStatus,
    pub creator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent: Option<String>,
    pub creator_choice: CoinSide,
    pub game_played: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    /// Milliseconds since the Unix epoch; used only for ordering.
    pub created_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bet_wire_format() {
        let bet = Bet {
            id: Uuid::nil(),
            title: "Coin flip".to_string(),
            amount: 10.0,
            status: BetStatus::Open,
            creator: "Alice".to_string(),
            opponent: None,
            creator_choice: CoinSide::Heads,
            game_played: false,
            winner: None,
            created_at: 1,
        };

        let json = serde_json::to_value(&bet).unwrap();
        assert_eq!(json["status"], "open");
        assert_eq!(json["creatorChoice"], "heads");
        assert_eq!(json["gamePlayed"], false);
        assert_eq!(json["createdAt"], 1);
        // Absent participants are omitted entirely, not serialized as null.
        assert!(json.get("opponent").is_none());
        assert!(json.get("winner").is_none());

        let decoded: Bet = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, bet);
    }

    #[test]
    fn test_coin_side_other() {
        assert_eq!(CoinSide::Heads.other(), CoinSide::Tails);
        assert_eq!(CoinSide::Tails.other(), CoinSide::Heads);
    }
}
