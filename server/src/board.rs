use crate::channel::EventChannel;
use crate::store::{BetStore, BetUpdate, MemoryStore, StoreError, UpdateOutcome};
use flipboard_types::api::{BetEvent, CreateBet};
use flipboard_types::{Bet, BetId, BetStatus, CoinSide};
use rand::Rng;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;

/// Error returned by a lifecycle operation. Every rejected mutation leaves
/// the persisted bet unchanged.
#[derive(Debug, Error)]
pub enum BoardError {
    /// Malformed or missing input; user-correctable.
    #[error("{0}")]
    Validation(String),
    /// No bet with the given id.
    #[error("bet {0} not found")]
    NotFound(BetId),
    /// A state precondition no longer holds (e.g. accepting an already
    /// accepted bet, or accepting one's own bet).
    #[error("{0}")]
    InvalidTransition(String),
    /// The underlying store failed; not retried.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The bet lifecycle service.
///
/// Validates and applies state transitions against the store, then publishes
/// the resulting event on the injected channel. The service holds no lock of
/// its own across requests: the store's single-key compare-and-set is the
/// sole serialization point, so of two racing transitions exactly one
/// applies and the loser gets [`BoardError::InvalidTransition`]. Events are
/// published only after the store mutation commits, never before.
pub struct Board<S: BetStore = MemoryStore> {
    store: S,
    channel: EventChannel,
}

impl<S: BetStore> Board<S> {
    pub fn new(store: S, channel: EventChannel) -> Self {
        Self { store, channel }
    }

    /// Subscribe to the event fan-out. A fresh subscriber must reconcile via
    /// [`Board::list`] before trusting incremental events.
    pub fn subscribe(&self) -> broadcast::Receiver<BetEvent> {
        self.channel.subscribe()
    }

    /// Create a new bet in the `Open` state.
    pub fn create(&self, request: CreateBet) -> Result<Bet, BoardError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(BoardError::Validation("title must not be empty".to_string()));
        }
        if !request.amount.is_finite() || request.amount <= 0.0 {
            return Err(BoardError::Validation("amount must be positive".to_string()));
        }
        let creator = request.creator.trim();
        if creator.is_empty() {
            return Err(BoardError::Validation(
                "creator must not be empty".to_string(),
            ));
        }

        let bet = self.store.insert(CreateBet {
            title: title.to_string(),
            amount: request.amount,
            creator: creator.to_string(),
            creator_choice: request.creator_choice,
        })?;
        info!(id = %bet.id, creator = %bet.creator, amount = bet.amount, "bet created");
        self.channel.publish(BetEvent::Created { bet: bet.clone() });
        Ok(bet)
    }

    /// Accept an open bet as `opponent`.
    pub fn accept(&self, id: &BetId, opponent: &str) -> Result<Bet, BoardError> {
        let opponent = opponent.trim();
        if opponent.is_empty() {
            return Err(BoardError::Validation(
                "opponent must not be empty".to_string(),
            ));
        }

        // Checked here regardless of what the client claims to have checked.
        let bet = self.store.find_by_id(id)?.ok_or(BoardError::NotFound(*id))?;
        if bet.creator == opponent {
            return Err(BoardError::InvalidTransition(
                "a user may not accept their own bet".to_string(),
            ));
        }
        if bet.status != BetStatus::Open {
            return Err(BoardError::InvalidTransition(format!(
                "only open bets can be accepted (bet is {})",
                bet.status
            )));
        }

        let bet = self.apply(
            id,
            BetUpdate {
                guard: Some(BetStatus::Open),
                status: Some(BetStatus::Accepted),
                opponent: Some(opponent.to_string()),
                ..BetUpdate::default()
            },
        )?;
        info!(id = %bet.id, opponent, "bet accepted");
        self.channel.publish(BetEvent::Updated { bet: bet.clone() });
        Ok(bet)
    }

    /// Perform the server-authoritative coin flip and resolve the bet.
    ///
    /// The draw is fair (p = 0.5 per side) and happens here; clients never
    /// submit an outcome.
    pub fn play(&self, id: &BetId) -> Result<Bet, BoardError> {
        let outcome = if rand::thread_rng().gen::<bool>() {
            CoinSide::Heads
        } else {
            CoinSide::Tails
        };
        self.record_game_result(id, outcome)
    }

    /// Apply a coin-flip outcome to an accepted bet.
    ///
    /// The winner is the creator when the outcome matches their chosen side,
    /// the opponent otherwise. "Played" and "resolved" commit as one atomic
    /// transition; there is no persisted played-but-unresolved state.
    pub fn record_game_result(&self, id: &BetId, outcome: CoinSide) -> Result<Bet, BoardError> {
        let bet = self.store.find_by_id(id)?.ok_or(BoardError::NotFound(*id))?;
        if bet.status != BetStatus::Accepted {
            return Err(BoardError::InvalidTransition(format!(
                "only accepted bets can be played (bet is {})",
                bet.status
            )));
        }
        if bet.game_played {
            return Err(BoardError::InvalidTransition(
                "game already played".to_string(),
            ));
        }
        let Some(opponent) = bet.opponent else {
            // Accepted implies an opponent; anything else is a broken record.
            return Err(BoardError::Store(StoreError::Corrupt(format!(
                "accepted bet {id} has no opponent"
            ))));
        };

        let winner = if outcome == bet.creator_choice {
            bet.creator
        } else {
            opponent
        };
        let bet = self.apply(
            id,
            BetUpdate {
                guard: Some(BetStatus::Accepted),
                status: Some(BetStatus::Resolved),
                winner: Some(winner),
                game_played: Some(true),
                ..BetUpdate::default()
            },
        )?;
        info!(
            id = %bet.id,
            %outcome,
            winner = bet.winner.as_deref().unwrap_or_default(),
            "bet resolved by coin flip"
        );
        self.channel.publish(BetEvent::Updated { bet: bet.clone() });
        Ok(bet)
    }

    /// Resolve an accepted bet directly in favor of `winner`, without the
    /// coin-flip path. The declared winner must be one of the participants.
    pub fn resolve(&self, id: &BetId, winner: &str) -> Result<Bet, BoardError> {
        let bet = self.store.find_by_id(id)?.ok_or(BoardError::NotFound(*id))?;
        if bet.status != BetStatus::Accepted {
            return Err(BoardError::InvalidTransition(format!(
                "only accepted bets can be resolved (bet is {})",
                bet.status
            )));
        }
        if winner != bet.creator && Some(winner) != bet.opponent.as_deref() {
            return Err(BoardError::Validation(
                "winner must be one of the participants".to_string(),
            ));
        }

        let bet = self.apply(
            id,
            BetUpdate {
                guard: Some(BetStatus::Accepted),
                status: Some(BetStatus::Resolved),
                winner: Some(winner.to_string()),
                ..BetUpdate::default()
            },
        )?;
        info!(id = %bet.id, winner, "bet resolved");
        self.channel.publish(BetEvent::Updated { bet: bet.clone() });
        Ok(bet)
    }

    /// Remove a bet unconditionally. Terminal and irrecoverable.
    pub fn delete(&self, id: &BetId) -> Result<(), BoardError> {
        if !self.store.delete_by_id(id)? {
            return Err(BoardError::NotFound(*id));
        }
        info!(id = %id, "bet deleted");
        self.channel.publish(BetEvent::Deleted { id: *id });
        Ok(())
    }

    /// All bets, newest first. Unbounded; there is no pagination.
    pub fn list(&self) -> Result<Vec<Bet>, BoardError> {
        Ok(self.store.find_all()?)
    }

    pub fn get(&self, id: &BetId) -> Result<Bet, BoardError> {
        self.store.find_by_id(id)?.ok_or(BoardError::NotFound(*id))
    }

    fn apply(&self, id: &BetId, update: BetUpdate) -> Result<Bet, BoardError> {
        match self.store.update_fields(id, update)? {
            UpdateOutcome::Applied(bet) => Ok(bet),
            UpdateOutcome::Missing => Err(BoardError::NotFound(*id)),
            UpdateOutcome::Guarded(actual) => Err(BoardError::InvalidTransition(format!(
                "bet is {actual}, the transition no longer applies"
            ))),
        }
    }
}
