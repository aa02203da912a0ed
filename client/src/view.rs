use crate::{Client, Result};
use flipboard_types::{api::BetEvent, Bet, BetId};
use std::collections::HashMap;

/// Client-local view of the board, reconciled against authoritative server
/// state.
///
/// The view only trusts incremental events after an initial full [`sync`];
/// an authoritative `updated` event always overwrites whatever the view
/// holds for that bet, so speculative local state never survives it.
///
/// [`sync`]: BoardView::sync
#[derive(Debug, Default)]
pub struct BoardView {
    bets: HashMap<BetId, Bet>,
}

impl BoardView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the view with a full fetch from the server.
    pub async fn sync(&mut self, client: &Client) -> Result<()> {
        let bets = client.list_bets().await?;
        self.bets = bets.into_iter().map(|bet| (bet.id, bet)).collect();
        Ok(())
    }

    /// Fold one event into the view.
    pub fn apply(&mut self, event: BetEvent) {
        match event {
            BetEvent::Created { bet } | BetEvent::Updated { bet } => {
                self.bets.insert(bet.id, bet);
            }
            BetEvent::Deleted { id } => {
                self.bets.remove(&id);
            }
        }
    }

    pub fn get(&self, id: &BetId) -> Option<&Bet> {
        self.bets.get(id)
    }

    /// All bets, newest first.
    pub fn bets(&self) -> Vec<&Bet> {
        let mut bets: Vec<&Bet> = self.bets.values().collect();
        bets.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        bets
    }

    pub fn len(&self) -> usize {
        self.bets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }
}
