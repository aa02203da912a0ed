pub mod api;
mod board;
mod channel;
mod store;

pub use api::Api;
pub use board::{Board, BoardError};
pub use channel::{EventChannel, DEFAULT_CHANNEL_CAPACITY};
pub use store::{BetStore, BetUpdate, MemoryStore, StoreError, UpdateOutcome};
