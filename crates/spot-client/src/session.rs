//! Session management: refresh token in, short-lived bearer tokens out.
//!
//! The [`SessionManager`] owns the credential and the cached [`Session`].
//! Staleness is corrected lazily: a token is only refreshed when a caller
//! asks for one and the cached session is missing or inside the safety
//! margin of its expiry.
//!
//! Concurrent callers that all find the session stale share one exchange.
//! The in-flight exchange future itself is cached, so every waiter observes
//! the same outcome. Failures are not cached; the next call after a failed
//! exchange starts a fresh one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SpotConfig;
use crate::error::{SpotError, SpotResult};
use crate::types::{RefreshToken, TokenResponse};

/// Upper bound on a reported token lifetime (one year).
const MAX_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

type ExchangeFuture = Shared<BoxFuture<'static, SpotResult<Session>>>;

/// A short-lived access token and its expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Valid iff `now < expires_at - margin`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        now < self.expires_at - margin
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Performs the refresh-token grant against the token endpoint.
struct TokenExchanger {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    refresh_token: RefreshToken,
}

impl TokenExchanger {
    async fn exchange(&self) -> SpotResult<Session> {
        debug!(url = %self.token_url, "exchanging refresh token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", self.refresh_token.expose()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "token exchange rejected");
            return Err(SpotError::Auth {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| SpotError::InvalidResponse {
                    message: format!("failed to parse token response: {}", e),
                })?;

        let lifetime = token.expires_in.min(MAX_TOKEN_LIFETIME_SECS) as i64;
        let expires_at = Utc::now() + chrono::Duration::seconds(lifetime);

        info!(
            expires_in = token.expires_in,
            token_type = token.token_type.as_deref().unwrap_or("Bearer"),
            "obtained access token"
        );

        Ok(Session::new(token.access_token, expires_at))
    }
}

struct InFlight {
    generation: u64,
    future: ExchangeFuture,
}

#[derive(Default)]
struct SessionState {
    session: Option<Session>,
    in_flight: Option<InFlight>,
    generation: u64,
}

struct Inner {
    exchanger: Arc<TokenExchanger>,
    state: Mutex<SessionState>,
    safety_margin: chrono::Duration,
}

/// Owns the credential and the cached session.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a session manager. Fails if the config carries no refresh token.
    pub fn new(http: reqwest::Client, config: &SpotConfig) -> SpotResult<Self> {
        let refresh_token = config
            .refresh_token
            .clone()
            .filter(|t| !t.expose().trim().is_empty())
            .ok_or_else(|| SpotError::Config {
                message: "refresh token is required".into(),
            })?;

        let margin_secs = config.token_safety_margin_secs.min(MAX_TOKEN_LIFETIME_SECS) as i64;

        Ok(Self {
            inner: Arc::new(Inner {
                exchanger: Arc::new(TokenExchanger {
                    http,
                    token_url: config.token_url(),
                    client_id: config.client_id.clone(),
                    refresh_token,
                }),
                state: Mutex::new(SessionState::default()),
                safety_margin: chrono::Duration::seconds(margin_secs),
            }),
        })
    }

    /// The credential, for endpoints that accept it directly.
    pub fn refresh_token(&self) -> &RefreshToken {
        &self.inner.exchanger.refresh_token
    }

    /// Return an access token that is valid right now, authenticating first
    /// if there is no session or the cached one is stale.
    pub async fn ensure_valid(&self) -> SpotResult<String> {
        let (generation, exchange) = {
            let mut state = self.inner.state.lock().await;
            if let Some(session) = &state.session {
                if session.is_valid_at(Utc::now(), self.inner.safety_margin) {
                    debug!("using cached access token");
                    return Ok(session.access_token.clone());
                }
                debug!(expires_at = %session.expires_at, "cached access token is stale");
            }
            self.join_or_start(&mut state)
        };

        let session = self.complete(generation, exchange).await?;
        Ok(session.access_token)
    }

    /// Exchange the credential for a new session.
    ///
    /// Joins an exchange that is already running instead of starting a
    /// second one. On failure the previous session, if any, is kept.
    pub async fn authenticate(&self) -> SpotResult<()> {
        let (generation, exchange) = {
            let mut state = self.inner.state.lock().await;
            self.join_or_start(&mut state)
        };
        self.complete(generation, exchange).await.map(|_| ())
    }

    /// Drop the cached session; the next call re-authenticates.
    pub async fn invalidate(&self) {
        let mut state = self.inner.state.lock().await;
        state.session = None;
    }

    /// Snapshot of the cached session.
    pub async fn session(&self) -> Option<Session> {
        self.inner.state.lock().await.session.clone()
    }

    fn join_or_start(&self, state: &mut SessionState) -> (u64, ExchangeFuture) {
        if let Some(in_flight) = &state.in_flight {
            debug!(
                generation = in_flight.generation,
                "joining in-flight token exchange"
            );
            return (in_flight.generation, in_flight.future.clone());
        }

        state.generation += 1;
        let exchanger = Arc::clone(&self.inner.exchanger);
        let future = async move { exchanger.exchange().await }.boxed().shared();
        state.in_flight = Some(InFlight {
            generation: state.generation,
            future: future.clone(),
        });
        debug!(generation = state.generation, "started token exchange");
        (state.generation, future)
    }

    async fn complete(&self, generation: u64, exchange: ExchangeFuture) -> SpotResult<Session> {
        let outcome = exchange.await;

        let mut state = self.inner.state.lock().await;
        let current = state.in_flight.as_ref().map(|f| f.generation) == Some(generation);
        if current {
            state.in_flight = None;
            if let Ok(session) = &outcome {
                state.session = Some(session.clone());
            }
        }
        outcome
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("token_url", &self.inner.exchanger.token_url)
            .field("safety_margin", &self.inner.safety_margin)
            .finish_non_exhaustive()
    }
}
