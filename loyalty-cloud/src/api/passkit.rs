//! Apple Wallet web service
//!
//! Devices call these routes after installing a pass (registration) and
//! after an APNs push (fetch changed serials, then the latest pass).
//! Requests carry `Authorization: ApplePass <authenticationToken>`.

use axum::routing::{get, post};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use shared::models::{
    DeviceRegistrationBody, PassLogBody, SerialNumbersResponse, parse_gift_card_pass_serial,
    parse_loyalty_pass_serial,
};
use shared::util::now_millis;

use crate::db;
use crate::state::AppState;
use crate::wallet::apple::{AppleWallet, PKPASS_CONTENT_TYPE};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/passkit/v1/devices/{device}/registrations/{pass_type}/{serial}",
            post(register_device).delete(unregister_device),
        )
        .route(
            "/api/passkit/v1/devices/{device}/registrations/{pass_type}",
            get(serial_numbers),
        )
        .route("/api/passkit/v1/passes/{pass_type}/{serial}", get(latest_pass))
        .route("/api/passkit/v1/log", post(log))
}

/// Wallet expects bare status codes from this service, not JSON envelopes.
fn db_failure(e: sqlx::Error) -> StatusCode {
    tracing::error!(error = %e, "PassKit database error");
    StatusCode::INTERNAL_SERVER_ERROR
}

fn apple_for(state: &AppState, pass_type: &str) -> Result<std::sync::Arc<AppleWallet>, StatusCode> {
    state
        .apple
        .clone()
        .filter(|apple| apple.pass_type_identifier() == pass_type)
        .ok_or(StatusCode::NOT_FOUND)
}

fn apple_pass_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("ApplePass ")
        .map(str::trim)
}

/// The pass a serial number refers to, loaded fresh from the database.
enum IssuedPass {
    Loyalty {
        customer: shared::models::Customer,
        auth_token: String,
        updated_at: i64,
    },
    GiftCard(shared::models::GiftCard),
}

impl IssuedPass {
    fn auth_token(&self) -> &str {
        match self {
            Self::Loyalty { auth_token, .. } => auth_token,
            Self::GiftCard(card) => &card.pass_auth_token,
        }
    }

    fn updated_at(&self) -> i64 {
        match self {
            Self::Loyalty { updated_at, .. } => *updated_at,
            Self::GiftCard(card) => card.updated_at,
        }
    }
}

async fn load_pass(state: &AppState, serial: &str) -> Result<Option<IssuedPass>, sqlx::Error> {
    if let Some(profile_id) = parse_loyalty_pass_serial(serial) {
        let (customer, auth_token) = tokio::try_join!(
            db::profiles::find(&state.pool, profile_id),
            db::profiles::find_pass_auth_token(&state.pool, profile_id),
        )?;
        return Ok(customer.zip(auth_token).map(|(customer, auth_token)| {
            IssuedPass::Loyalty {
                updated_at: customer.updated_at,
                customer,
                auth_token,
            }
        }));
    }
    if let Some(card_serial) = parse_gift_card_pass_serial(serial) {
        return Ok(db::gift_cards::find_by_serial(&state.pool, card_serial)
            .await?
            .map(IssuedPass::GiftCard));
    }
    Ok(None)
}

/// Load the pass and check the `ApplePass` token against it.
async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    serial: &str,
) -> Result<IssuedPass, StatusCode> {
    let token = apple_pass_token(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let pass = load_pass(state, serial)
        .await
        .map_err(db_failure)?
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if pass.auth_token() != token {
        tracing::warn!(serial, "PassKit request with wrong authentication token");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(pass)
}

/// POST devices/{device}/registrations/{pass_type}/{serial}
pub async fn register_device(
    State(state): State<AppState>,
    Path((device, pass_type, serial)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<DeviceRegistrationBody>,
) -> Result<StatusCode, StatusCode> {
    apple_for(&state, &pass_type)?;
    authorize(&state, &headers, &serial).await?;
    if body.push_token.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let created = db::passes::register(
        &state.pool,
        &device,
        body.push_token.trim(),
        &pass_type,
        &serial,
        now_millis(),
    )
    .await
    .map_err(db_failure)?;

    tracing::info!(%device, %serial, created, "Wallet device registered");
    Ok(if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    })
}

/// DELETE devices/{device}/registrations/{pass_type}/{serial}
pub async fn unregister_device(
    State(state): State<AppState>,
    Path((device, pass_type, serial)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    apple_for(&state, &pass_type)?;
    authorize(&state, &headers, &serial).await?;

    db::passes::unregister(&state.pool, &device, &pass_type, &serial)
        .await
        .map_err(db_failure)?;
    tracing::info!(%device, %serial, "Wallet device unregistered");
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedSinceQuery {
    pub passes_updated_since: Option<String>,
}

/// GET devices/{device}/registrations/{pass_type}?passesUpdatedSince=
pub async fn serial_numbers(
    State(state): State<AppState>,
    Path((device, pass_type)): Path<(String, String)>,
    Query(query): Query<UpdatedSinceQuery>,
) -> Result<Response, StatusCode> {
    apple_for(&state, &pass_type)?;
    // The tag is whatever we returned as lastUpdated: Unix millis.
    let since = query
        .passes_updated_since
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok());

    let rows = db::passes::serials_for_device(&state.pool, &device, &pass_type, since)
        .await
        .map_err(db_failure)?;
    let Some(last_updated) = rows.iter().map(|r| r.updated_at).max() else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    Ok(Json(SerialNumbersResponse {
        serial_numbers: rows.into_iter().map(|r| r.serial_number).collect(),
        last_updated: last_updated.to_string(),
    })
    .into_response())
}

/// RFC 7231 date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn http_date(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .unwrap_or_default()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Parse an HTTP date into Unix seconds.
pub fn parse_http_date(value: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.timestamp())
}

/// True when the client's copy (`If-Modified-Since`) is at least as new.
fn not_modified(headers: &HeaderMap, modified_millis: i64) -> bool {
    headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date)
        .is_some_and(|since| since >= modified_millis.div_euclid(1000))
}

/// GET passes/{pass_type}/{serial}
pub async fn latest_pass(
    State(state): State<AppState>,
    Path((pass_type, serial)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    let apple = apple_for(&state, &pass_type)?;
    let pass = authorize(&state, &headers, &serial).await?;

    let stamped = db::passes::last_updated(&state.pool, &pass_type, &serial)
        .await
        .map_err(db_failure)?;
    let modified = stamped.unwrap_or_default().max(pass.updated_at());
    let last_modified = http_date(modified);

    if not_modified(&headers, modified) {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [(header::LAST_MODIFIED, last_modified)],
        )
            .into_response());
    }

    let pkpass = match &pass {
        IssuedPass::Loyalty {
            customer,
            auth_token,
            ..
        } => apple.loyalty_pkpass(customer, &state.config.rewards, auth_token),
        IssuedPass::GiftCard(card) => apple.gift_card_pkpass(card),
    }
    .map_err(|e| {
        tracing::error!(%serial, error = %e, "Pass generation failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, PKPASS_CONTENT_TYPE.to_string()),
            (header::LAST_MODIFIED, last_modified),
        ],
        pkpass,
    )
        .into_response())
}

/// POST log
pub async fn log(Json(body): Json<PassLogBody>) -> StatusCode {
    for line in body.logs.iter().take(100) {
        tracing::warn!(target: "passkit", "{line}");
    }
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_date_round_trip() {
        let millis = 784_111_777_000;
        let formatted = http_date(millis);
        assert_eq!(formatted, "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(parse_http_date(&formatted), Some(784_111_777));
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[test]
    fn test_not_modified() {
        let mut headers = HeaderMap::new();
        assert!(!not_modified(&headers, 784_111_777_000));

        headers.insert(
            header::IF_MODIFIED_SINCE,
            "Sun, 06 Nov 1994 08:49:37 GMT".parse().unwrap(),
        );
        assert!(not_modified(&headers, 784_111_777_999));
        assert!(!not_modified(&headers, 784_111_778_000));
    }

    #[test]
    fn test_apple_pass_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(apple_pass_token(&headers), None);
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(apple_pass_token(&headers), None);
        headers.insert(header::AUTHORIZATION, "ApplePass abc".parse().unwrap());
        assert_eq!(apple_pass_token(&headers), Some("abc"));
    }

    #[tokio::test]
    async fn test_log_accepts_messages() {
        let body = PassLogBody {
            logs: vec!["Register failed".into()],
        };
        assert_eq!(log(Json(body)).await, StatusCode::OK);
    }
}
