use flipboard_types::{api::CreateBet, Bet, BetId, BetStatus};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Error surfaced by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Partial update applied to a single bet in one atomic read-modify-write.
/// Only `Some` fields are written; unrelated fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct BetUpdate {
    /// When set, the update applies only if the bet's current status matches.
    /// This compare-and-set is the sole serialization point for concurrent
    /// transitions on one bet.
    pub guard: Option<BetStatus>,
    pub status: Option<BetStatus>,
    pub opponent: Option<String>,
    pub winner: Option<String>,
    pub game_played: Option<bool>,
}

/// Outcome of a conditional field update.
#[derive(Clone, Debug)]
pub enum UpdateOutcome {
    /// The update applied; carries the post-mutation record.
    Applied(Bet),
    /// No bet with that id.
    Missing,
    /// The status guard did not hold; carries the actual status.
    Guarded(BetStatus),
}

/// Keyed collection of bet records.
///
/// Implementations must provide single-key atomicity: no two concurrent
/// `update_fields` calls on the same id may interleave, and a guard check
/// plus its write happen under one critical section.
pub trait BetStore: Send + Sync {
    /// Persist a new bet, assigning its id and creation timestamp.
    fn insert(&self, new: CreateBet) -> Result<Bet, StoreError>;

    fn find_by_id(&self, id: &BetId) -> Result<Option<Bet>, StoreError>;

    /// All bets ordered by creation time, newest first.
    fn find_all(&self) -> Result<Vec<Bet>, StoreError>;

    fn update_fields(&self, id: &BetId, update: BetUpdate) -> Result<UpdateOutcome, StoreError>;

    /// Returns whether a record was removed.
    fn delete_by_id(&self, id: &BetId) -> Result<bool, StoreError>;
}

/// In-memory bet store.
#[derive(Default)]
pub struct MemoryStore {
    bets: RwLock<HashMap<BetId, Bet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn now_millis() -> u64 {
        // A clock before the epoch would mean a badly misconfigured host;
        // order-only timestamps degrade to zero rather than failing writes.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

// A poisoned lock means a writer panicked mid-mutation; surface it as a
// backend failure instead of propagating the panic to every request.
fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("store lock poisoned".to_string())
}

impl BetStore for MemoryStore {
    fn insert(&self, new: CreateBet) -> Result<Bet, StoreError> {
        let bet = Bet {
            id: Uuid::new_v4(),
            title: new.title,
            amount: new.amount,
            status: BetStatus::Open,
            creator: new.creator,
            opponent: None,
            creator_choice: new.creator_choice,
            game_played: false,
            winner: None,
            created_at: Self::now_millis(),
        };
        let mut bets = self.bets.write().map_err(poisoned)?;
        bets.insert(bet.id, bet.clone());
        Ok(bet)
    }

    fn find_by_id(&self, id: &BetId) -> Result<Option<Bet>, StoreError> {
        let bets = self.bets.read().map_err(poisoned)?;
        Ok(bets.get(id).cloned())
    }

    fn find_all(&self) -> Result<Vec<Bet>, StoreError> {
        let bets = self.bets.read().map_err(poisoned)?;
        let mut all: Vec<Bet> = bets.values().cloned().collect();
        // Newest first; ties broken by id so the order is deterministic.
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(all)
    }

    fn update_fields(&self, id: &BetId, update: BetUpdate) -> Result<UpdateOutcome, StoreError> {
        let mut bets = self.bets.write().map_err(poisoned)?;
        let Some(bet) = bets.get_mut(id) else {
            return Ok(UpdateOutcome::Missing);
        };
        if let Some(expected) = update.guard {
            if bet.status != expected {
                return Ok(UpdateOutcome::Guarded(bet.status));
            }
        }
        if let Some(status) = update.status {
            bet.status = status;
        }
        if let Some(opponent) = update.opponent {
            bet.opponent = Some(opponent);
        }
        if let Some(winner) = update.winner {
            bet.winner = Some(winner);
        }
        if let Some(game_played) = update.game_played {
            bet.game_played = game_played;
        }
        Ok(UpdateOutcome::Applied(bet.clone()))
    }

    fn delete_by_id(&self, id: &BetId) -> Result<bool, StoreError> {
        let mut bets = self.bets.write().map_err(poisoned)?;
        Ok(bets.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipboard_types::CoinSide;

    fn new_bet(title: &str) -> CreateBet {
        CreateBet {
            title: title.to_string(),
            amount: 10.0,
            creator: "Alice".to_string(),
            creator_choice: CoinSide::Heads,
        }
    }

    #[test]
    fn test_insert_assigns_identity() {
        let store = MemoryStore::new();
        let first = store.insert(new_bet("first")).unwrap();
        let second = store.insert(new_bet("second")).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.status, BetStatus::Open);
        assert!(!first.game_played);
        assert!(first.created_at > 0);
        assert_eq!(store.find_by_id(&first.id).unwrap().unwrap(), first);
    }

    #[test]
    fn test_find_all_is_newest_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.insert(new_bet(&format!("bet {i}"))).unwrap();
        }
        let all = store.find_all().unwrap();
        assert_eq!(all.len(), 5);
        for pair in all.windows(2) {
            assert!(
                pair[0].created_at > pair[1].created_at
                    || (pair[0].created_at == pair[1].created_at && pair[0].id > pair[1].id)
            );
        }
    }

    #[test]
    fn test_update_merges_fields() {
        let store = MemoryStore::new();
        let bet = store.insert(new_bet("merge")).unwrap();

        let outcome = store
            .update_fields(
                &bet.id,
                BetUpdate {
                    guard: Some(BetStatus::Open),
                    status: Some(BetStatus::Accepted),
                    opponent: Some("Bob".to_string()),
                    ..BetUpdate::default()
                },
            )
            .unwrap();

        let UpdateOutcome::Applied(updated) = outcome else {
            panic!("update did not apply");
        };
        assert_eq!(updated.status, BetStatus::Accepted);
        assert_eq!(updated.opponent.as_deref(), Some("Bob"));
        // Unrelated fields survive the merge.
        assert_eq!(updated.title, bet.title);
        assert_eq!(updated.amount, bet.amount);
        assert_eq!(updated.creator, bet.creator);
        assert_eq!(updated.created_at, bet.created_at);
        assert!(updated.winner.is_none());
    }

    #[test]
    fn test_update_guard_reports_actual_status() {
        let store = MemoryStore::new();
        let bet = store.insert(new_bet("guarded")).unwrap();
        store
            .update_fields(
                &bet.id,
                BetUpdate {
                    guard: Some(BetStatus::Open),
                    status: Some(BetStatus::Accepted),
                    opponent: Some("Bob".to_string()),
                    ..BetUpdate::default()
                },
            )
            .unwrap();

        // A second guarded transition loses and mutates nothing.
        let outcome = store
            .update_fields(
                &bet.id,
                BetUpdate {
                    guard: Some(BetStatus::Open),
                    status: Some(BetStatus::Accepted),
                    opponent: Some("Carol".to_string()),
                    ..BetUpdate::default()
                },
            )
            .unwrap();
        let UpdateOutcome::Guarded(actual) = outcome else {
            panic!("guard should have failed");
        };
        assert_eq!(actual, BetStatus::Accepted);
        let current = store.find_by_id(&bet.id).unwrap().unwrap();
        assert_eq!(current.opponent.as_deref(), Some("Bob"));
    }

    #[test]
    fn test_update_missing() {
        let store = MemoryStore::new();
        let outcome = store
            .update_fields(&Uuid::new_v4(), BetUpdate::default())
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Missing));
    }

    #[test]
    fn test_delete_twice() {
        let store = MemoryStore::new();
        let bet = store.insert(new_bet("gone")).unwrap();
        assert!(store.delete_by_id(&bet.id).unwrap());
        assert!(!store.delete_by_id(&bet.id).unwrap());
        assert!(store.find_by_id(&bet.id).unwrap().is_none());
    }
}
