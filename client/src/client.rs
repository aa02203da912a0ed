use crate::{events::Stream, Error, Result};
use flipboard_types::{
    api::{CreateBet, UpdateBet},
    Bet, BetId, CoinSide,
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use url::Url;

/// Timeout for connections and requests
const TIMEOUT: Duration = Duration::from_secs(30);

/// Flipboard API client
#[derive(Clone)]
pub struct Client {
    pub base_url: Url,
    pub ws_url: Url,
    pub http_client: HttpClient,
}

impl Client {
    /// Create a new client
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;

        // Convert http(s) to ws(s) for WebSocket URL
        let ws_scheme = match base_url.scheme() {
            "http" => "ws",
            "https" => "wss",
            scheme => {
                return Err(Error::InvalidScheme(scheme.to_string()));
            }
        };

        let mut ws_url = base_url.clone();
        ws_url
            .set_scheme(ws_scheme)
            .map_err(|_| Error::InvalidScheme(ws_scheme.to_string()))?;

        let http_client = HttpClient::builder().timeout(TIMEOUT).build()?;

        Ok(Self {
            base_url,
            ws_url,
            http_client,
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(Error::Failed(response.status()));
        }
        Ok(response.json().await?)
    }

    /// Fetch every bet, newest first. This is the reconciliation fetch a
    /// fresh subscriber must perform before trusting incremental events.
    pub async fn list_bets(&self) -> Result<Vec<Bet>> {
        let url = self.base_url.join("bets")?;
        Self::decode(self.http_client.get(url).send().await?).await
    }

    pub async fn get_bet(&self, id: &BetId) -> Result<Bet> {
        let url = self.base_url.join(&format!("bets/{id}"))?;
        Self::decode(self.http_client.get(url).send().await?).await
    }

    /// Create a new open bet.
    pub async fn create_bet(
        &self,
        title: &str,
        amount: f64,
        creator: &str,
        creator_choice: CoinSide,
    ) -> Result<Bet> {
        let url = self.base_url.join("bets")?;
        let request = CreateBet {
            title: title.to_string(),
            amount,
            creator: creator.to_string(),
            creator_choice,
        };
        Self::decode(self.http_client.post(url).json(&request).send().await?).await
    }

    /// Accept an open bet as `opponent`.
    pub async fn accept_bet(&self, id: &BetId, opponent: &str) -> Result<Bet> {
        self.update_bet(id, &UpdateBet::accept(opponent)).await
    }

    /// Ask the server to flip the coin and resolve the bet.
    pub async fn play_bet(&self, id: &BetId) -> Result<Bet> {
        self.update_bet(id, &UpdateBet::play()).await
    }

    /// Resolve an accepted bet directly in favor of `winner`.
    pub async fn resolve_bet(&self, id: &BetId, winner: &str) -> Result<Bet> {
        self.update_bet(id, &UpdateBet::resolve(winner)).await
    }

    async fn update_bet(&self, id: &BetId, update: &UpdateBet) -> Result<Bet> {
        let url = self.base_url.join(&format!("bets/{id}"))?;
        Self::decode(self.http_client.put(url).json(update).send().await?).await
    }

    pub async fn delete_bet(&self, id: &BetId) -> Result<()> {
        let url = self.base_url.join(&format!("bets/{id}"))?;
        let response = self.http_client.delete(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Failed(response.status()));
        }
        Ok(())
    }

    /// Open the push channel and stream bet events.
    pub async fn updates(&self) -> Result<Stream> {
        let url = self.ws_url.join("updates")?;
        let (ws, _) = connect_async(url.as_str()).await?;
        Ok(Stream::new(ws))
    }
}
