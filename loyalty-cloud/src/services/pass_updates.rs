//! Keep issued wallet passes in sync after a balance change
//!
//! The change stamp is written before returning so a device syncing right
//! away sees it. Pushes and Google REST updates run in the background and
//! their failures are only logged.

use shared::models::{Customer, GiftCard};
use shared::util::now_millis;

use crate::db;
use crate::state::AppState;

async fn stamp_and_push(state: &AppState, serial_number: String) {
    let Some(apple) = state.apple.clone() else {
        return;
    };
    let pass_type = apple.pass_type_identifier().to_string();

    if let Err(e) = db::passes::touch(&state.pool, &pass_type, &serial_number, now_millis()).await
    {
        tracing::error!(%serial_number, error = %e, "Failed to record pass update");
        return;
    }

    if let Some(apns) = state.apns.clone() {
        let pool = state.pool.clone();
        tokio::spawn(async move {
            if let Err(e) = apns
                .notify_pass_updated(&pool, &pass_type, &serial_number)
                .await
            {
                tracing::error!(%serial_number, error = %e, "Pass update push failed");
            }
        });
    }
}

pub async fn loyalty_pass_changed(state: &AppState, customer: &Customer) {
    stamp_and_push(state, customer.pass_serial()).await;

    if let Some(google) = state.google.clone() {
        let customer = customer.clone();
        let rules = state.config.rewards;
        tokio::spawn(async move {
            if let Err(e) = google.update_loyalty_object(&customer, &rules).await {
                tracing::warn!(customer_id = %customer.id, error = %e, "Google Wallet update failed");
            }
        });
    }
}

pub async fn gift_card_pass_changed(state: &AppState, card: &GiftCard) {
    stamp_and_push(state, card.pass_serial()).await;

    if let Some(google) = state.google.clone() {
        let card = card.clone();
        tokio::spawn(async move {
            if let Err(e) = google.update_gift_card_object(&card).await {
                tracing::warn!(serial = %card.serial_number, error = %e, "Google Wallet update failed");
            }
        });
    }
}
