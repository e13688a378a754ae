//! Stripe checkout and billing webhook.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use stripe_client::webhook::{self, WebhookEvent};
use stripe_client::{CheckoutParams, CheckoutSession, Subscription};
use synthia_db::users::{Tier, User};
use synthia_db::{Database, DbError};

use crate::app::SharedState;
use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::services::{ServiceError, providers, tiers};

use super::{ApiResult, err_json, map_service_error, map_stripe_error, storage_error};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    tier: Option<String>,
}

/// POST /api/stripe/checkout – start a hosted subscription checkout
pub async fn checkout(
    State(state): State<SharedState>,
    user: AuthUser,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body.map_err(|e| err_json(400, &format!("Invalid request body: {e}")))?;
    let tier: Tier = req
        .tier
        .as_deref()
        .and_then(|t| t.parse().ok())
        .filter(|t: &Tier| t.is_paid())
        .ok_or_else(|| err_json(400, "Invalid tier"))?;

    let config = state.config_snapshot().await;
    let price_id = config
        .stripe_price_id(tier)
        .ok_or_else(|| err_json(400, "Tier not configured"))?
        .to_string();
    let stripe = providers::stripe(&config).map_err(map_service_error)?;

    let db = state.db();
    let account = user
        .resolve_or_create(db, Utc::now())
        .map_err(storage_error)?;

    let customer_id = match account.stripe_customer_id.clone() {
        Some(id) => id,
        None => {
            let customer = stripe
                .create_customer(&account.email, account.name.as_deref(), &account.id)
                .await
                .map_err(map_stripe_error)?;
            db.set_stripe_customer_id(&account.id, &customer.id)
                .map_err(storage_error)?;
            tracing::info!(user_id = %account.id, "Created Stripe customer");
            customer.id
        }
    };

    let params = CheckoutParams {
        customer_id,
        price_id,
        success_url: format!("{}/chat?upgraded=true", config.public_url),
        cancel_url: format!("{}/pricing?canceled=true", config.public_url),
        metadata: vec![
            ("userId".to_string(), account.id.clone()),
            ("tier".to_string(), tier.as_str().to_string()),
        ],
    };
    let session = stripe
        .create_checkout_session(&params)
        .await
        .map_err(map_stripe_error)?;
    let url = session
        .url
        .ok_or_else(|| err_json(502, "Stripe returned a session without a URL"))?;

    tracing::info!(user_id = %account.id, tier = %tier, session_id = %session.id, "Checkout session created");
    Ok(Json(json!({ "url": url })))
}

/// POST /api/stripe/webhook – apply subscription lifecycle events
pub async fn webhook(State(state): State<SharedState>, headers: HeaderMap, body: Bytes) -> ApiResult {
    let config = state.config_snapshot().await;
    if config.stripe_webhook_secret.is_empty() {
        tracing::error!("STRIPE_WEBHOOK_SECRET is not set, rejecting billing webhook");
        return Err(err_json(400, "Invalid signature"));
    }
    let signature = headers
        .get(webhook::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| err_json(400, "Invalid signature"))?;

    let event = webhook::construct_event(
        &body,
        signature,
        &config.stripe_webhook_secret,
        Utc::now().timestamp(),
    )
    .map_err(|e| {
        tracing::warn!("Stripe webhook verification failed: {e}");
        err_json(400, "Invalid signature")
    })?;

    let event_id = event.id.clone();
    let typed = event.into_typed().map_err(|e| {
        tracing::warn!(event_id = %event_id, "Malformed Stripe event: {e}");
        err_json(400, "Malformed event")
    })?;

    handle_event(&state, &config, typed).await.map_err(|e| {
        tracing::error!(event_id = %event_id, "Webhook handler failed: {e}");
        match e {
            ServiceError::Storage(_) => err_json(500, "Webhook handler failed"),
            other => map_service_error(other),
        }
    })?;

    Ok(Json(json!({ "received": true })))
}

async fn handle_event(
    state: &SharedState,
    config: &AppConfig,
    event: WebhookEvent,
) -> Result<(), ServiceError> {
    let db = state.db();
    match event {
        WebhookEvent::CheckoutCompleted(session) => checkout_completed(db, config, session).await,
        WebhookEvent::SubscriptionUpdated(sub) => {
            let Some(user) = subscription_owner(db, &sub)? else {
                tracing::warn!(subscription_id = %sub.id, "Subscription update for unknown user");
                return Ok(());
            };
            let tier = sub
                .price_id()
                .and_then(|price| tiers::tier_for_price_id(config, price))
                .unwrap_or(Tier::Observer);
            ignore_missing_user(db.apply_subscription(
                &user.id,
                tier,
                sub.customer.as_deref(),
                &sub.id,
                period_end(&sub),
            ))?;
            tracing::info!(user_id = %user.id, tier = %tier, "Subscription updated");
            Ok(())
        }
        WebhookEvent::SubscriptionDeleted(sub) => {
            let Some(user) = subscription_owner(db, &sub)? else {
                tracing::warn!(subscription_id = %sub.id, "Subscription deletion for unknown user");
                return Ok(());
            };
            db.cancel_subscription(&user.id)?;
            tracing::info!(user_id = %user.id, "Subscription canceled");
            Ok(())
        }
        WebhookEvent::PaymentFailed(invoice) => {
            tracing::warn!(
                customer = invoice.customer.as_deref().unwrap_or("unknown"),
                "Payment failed"
            );
            Ok(())
        }
        WebhookEvent::Other(event_type) => {
            tracing::debug!(event_type = %event_type, "Unhandled Stripe event type");
            Ok(())
        }
    }
}

async fn checkout_completed(
    db: &Database,
    config: &AppConfig,
    session: CheckoutSession,
) -> Result<(), ServiceError> {
    let user_id = session.metadata.get("userId");
    let tier = session
        .metadata
        .get("tier")
        .and_then(|t| t.parse::<Tier>().ok());
    let (Some(user_id), Some(tier), Some(subscription_id)) =
        (user_id, tier, session.subscription.as_deref())
    else {
        tracing::warn!(session_id = %session.id, "Checkout session without user, tier or subscription");
        return Ok(());
    };

    let stripe = providers::stripe(config)?;
    let sub = stripe.retrieve_subscription(subscription_id).await?;
    ignore_missing_user(db.apply_subscription(
        user_id,
        tier,
        session.customer.as_deref().or(sub.customer.as_deref()),
        &sub.id,
        period_end(&sub),
    ))?;
    tracing::info!(user_id = %user_id, tier = %tier, "User upgraded");
    Ok(())
}

/// The user a subscription belongs to: its `userId` metadata, else the
/// stored subscription id.
fn subscription_owner(db: &Database, sub: &Subscription) -> Result<Option<User>, DbError> {
    if let Some(user_id) = sub.metadata.get("userId") {
        if let Some(user) = db.get_user(user_id)? {
            return Ok(Some(user));
        }
    }
    db.get_user_by_subscription_id(&sub.id)
}

fn period_end(sub: &Subscription) -> Option<DateTime<Utc>> {
    sub.period_end().and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Events for users that no longer exist are acknowledged, not retried.
fn ignore_missing_user(result: Result<(), DbError>) -> Result<(), DbError> {
    match result {
        Err(DbError::NotFound(what)) => {
            tracing::warn!("Billing event for missing {what}");
            Ok(())
        }
        other => other,
    }
}
