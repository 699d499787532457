//! APNs pushes for Wallet pass updates
//!
//! Wallet passes use an empty `{}` payload on the pass type topic. The device
//! then calls back into the PassKit web service to fetch what changed.

use std::time::{Duration, Instant};

use futures::future::join_all;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::config::ApnsConfig;
use crate::db;
use crate::error::BoxError;

const PRODUCTION_HOST: &str = "https://api.push.apple.com";
const SANDBOX_HOST: &str = "https://api.sandbox.push.apple.com";

/// APNs rejects provider tokens older than an hour.
const PROVIDER_TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

/// Result of one push attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Sent,
    /// The device token is no longer valid; its registration should go.
    Unregistered,
    Failed(String),
}

/// Map an APNs response to an outcome.
pub fn classify(status: u16, reason: Option<&str>) -> PushOutcome {
    match (status, reason) {
        (200, _) => PushOutcome::Sent,
        (410, _) | (400, Some("BadDeviceToken")) => PushOutcome::Unregistered,
        (_, Some(reason)) => PushOutcome::Failed(format!("{status} {reason}")),
        (_, None) => PushOutcome::Failed(status.to_string()),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushSummary {
    pub sent: usize,
    pub failed: usize,
    pub removed: usize,
}

/// Count sent and failed pushes, and collect the tokens APNs reported dead.
fn tally<'a>(
    serial_number: &str,
    tokens: &[&'a str],
    outcomes: Vec<PushOutcome>,
) -> (PushSummary, Vec<&'a str>) {
    let mut summary = PushSummary::default();
    let mut dead = Vec::new();
    for (token, outcome) in tokens.iter().zip(outcomes) {
        match outcome {
            PushOutcome::Sent => summary.sent += 1,
            PushOutcome::Unregistered => dead.push(*token),
            PushOutcome::Failed(reason) => {
                tracing::warn!(serial_number, %reason, "APNs push failed");
                summary.failed += 1;
            }
        }
    }
    (summary, dead)
}

#[derive(Serialize)]
struct ProviderClaims<'a> {
    iss: &'a str,
    iat: i64,
}

struct ProviderToken {
    value: String,
    issued: Instant,
}

pub struct ApnsClient {
    host: &'static str,
    team_id: String,
    key_id: String,
    key: EncodingKey,
    http: reqwest::Client,
    token: Mutex<Option<ProviderToken>>,
}

impl ApnsClient {
    pub fn new(config: &ApnsConfig, key_pem: &[u8]) -> Result<Self, BoxError> {
        let http = reqwest::Client::builder()
            .http2_prior_knowledge()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            host: if config.production {
                PRODUCTION_HOST
            } else {
                SANDBOX_HOST
            },
            team_id: config.team_id.clone(),
            key_id: config.key_id.clone(),
            key: EncodingKey::from_ec_pem(key_pem)?,
            http,
            token: Mutex::new(None),
        })
    }

    pub fn load(config: &ApnsConfig) -> Result<Self, BoxError> {
        Self::new(config, &std::fs::read(&config.key_path)?)
    }

    /// ES256 provider token, re-signed once it is older than 50 minutes.
    async fn provider_token(&self) -> Result<String, BoxError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.issued.elapsed() < PROVIDER_TOKEN_TTL
        {
            return Ok(token.value.clone());
        }

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());
        let value = jsonwebtoken::encode(
            &header,
            &ProviderClaims {
                iss: &self.team_id,
                iat: chrono::Utc::now().timestamp(),
            },
            &self.key,
        )?;

        *cached = Some(ProviderToken {
            value: value.clone(),
            issued: Instant::now(),
        });
        Ok(value)
    }

    pub async fn send(&self, topic: &str, push_token: &str) -> PushOutcome {
        let token = match self.provider_token().await {
            Ok(token) => token,
            Err(e) => return PushOutcome::Failed(format!("provider token: {e}")),
        };

        let resp = self
            .http
            .post(format!("{}/3/device/{push_token}", self.host))
            .header("authorization", format!("bearer {token}"))
            .header("apns-topic", topic)
            .header("apns-push-type", "background")
            .header("apns-priority", "5")
            .header("content-type", "application/json")
            .body("{}")
            .send()
            .await;

        match resp {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if status == 200 {
                    return PushOutcome::Sent;
                }
                let body: serde_json::Value = resp.json().await.unwrap_or_default();
                classify(status, body["reason"].as_str())
            }
            Err(e) => PushOutcome::Failed(e.to_string()),
        }
    }

    /// Push to every device holding a pass and drop registrations APNs reports dead.
    pub async fn notify_pass_updated(
        &self,
        pool: &PgPool,
        pass_type_identifier: &str,
        serial_number: &str,
    ) -> Result<PushSummary, BoxError> {
        let registrations =
            db::passes::registrations_for_pass(pool, pass_type_identifier, serial_number).await?;

        let mut tokens: Vec<&str> = registrations.iter().map(|r| r.push_token.as_str()).collect();
        tokens.sort_unstable();
        tokens.dedup();

        let outcomes = join_all(
            tokens
                .iter()
                .map(|token| self.send(pass_type_identifier, token)),
        )
        .await;

        let (mut summary, dead) = tally(serial_number, &tokens, outcomes);
        for token in dead {
            match db::passes::remove_push_token(pool, token).await {
                Ok(removed) => summary.removed += removed as usize,
                Err(e) => {
                    tracing::warn!(serial_number, error = %e, "Failed to remove dead push token");
                }
            }
        }

        tracing::info!(
            serial_number,
            sent = summary.sent,
            failed = summary.failed,
            removed = summary.removed,
            "Pass update pushed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(200, None), PushOutcome::Sent);
        assert_eq!(classify(410, Some("Unregistered")), PushOutcome::Unregistered);
        assert_eq!(classify(400, Some("BadDeviceToken")), PushOutcome::Unregistered);
        assert_eq!(
            classify(403, Some("ExpiredProviderToken")),
            PushOutcome::Failed("403 ExpiredProviderToken".into())
        );
        assert_eq!(classify(500, None), PushOutcome::Failed("500".into()));
    }

    #[test]
    fn test_tally_collects_dead_tokens() {
        let tokens = ["a", "b", "c", "d"];
        let outcomes = vec![
            PushOutcome::Sent,
            PushOutcome::Unregistered,
            PushOutcome::Failed("500".into()),
            PushOutcome::Unregistered,
        ];
        let (summary, dead) = tally("L-1", &tokens, outcomes);
        assert_eq!(
            summary,
            PushSummary {
                sent: 1,
                failed: 1,
                removed: 0,
            }
        );
        assert_eq!(dead, vec!["b", "d"]);
    }

    #[test]
    fn test_tally_empty() {
        let (summary, dead) = tally("L-1", &[], Vec::new());
        assert_eq!(summary, PushSummary::default());
        assert!(dead.is_empty());
    }

    #[test]
    fn test_rejects_non_ec_key() {
        let config = ApnsConfig {
            key_path: String::new(),
            key_id: "KEY123".into(),
            team_id: "TEAM123".into(),
            production: false,
        };
        assert!(ApnsClient::new(&config, b"not a key").is_err());
    }
}
