//! Stripe integration via REST API (no SDK dependency)

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::BoxError;

const STRIPE_API: &str = "https://api.stripe.com/v1";

/// Stripe rejects webhook deliveries older than this (replay protection)
const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Stripe accepts a Checkout Session `expires_at` between 30 minutes and 24
/// hours after creation.
const CHECKOUT_MIN_EXPIRY_SECS: i64 = 30 * 60;
const CHECKOUT_MAX_EXPIRY_SECS: i64 = 24 * 60 * 60;
/// Allowance for the request reaching Stripe after `now` was read
const CHECKOUT_EXPIRY_MARGIN_SECS: i64 = 60;

/// Session expiry (Unix seconds) for a reservation held until
/// `reserved_until` (ms), computed right before the Stripe call.
///
/// The hold is rounded up to whole seconds and pushed into Stripe's window;
/// callers store the result back on the registration so both expire together.
pub fn checkout_expires_at(reserved_until: i64, now: i64) -> i64 {
    let now_secs = now.div_euclid(1000);
    let wanted = reserved_until.div_euclid(1000) + i64::from(reserved_until.rem_euclid(1000) > 0);
    wanted.clamp(
        now_secs + CHECKOUT_MIN_EXPIRY_SECS + CHECKOUT_EXPIRY_MARGIN_SECS,
        now_secs + CHECKOUT_MAX_EXPIRY_SECS - CHECKOUT_EXPIRY_MARGIN_SECS,
    )
}

/// Line item and metadata for one registration checkout
pub struct CheckoutRequest<'a> {
    pub registration_id: i64,
    pub customer_email: &'a str,
    /// e.g. "Visitor Pass x 3"
    pub description: &'a str,
    /// Order total in minor units (cents)
    pub amount_minor: i64,
    pub currency: &'a str,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
    /// Unix seconds
    pub expires_at: i64,
}

/// Created Checkout Session
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Thin Stripe REST client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
        }
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, String)],
        idempotency_key: Option<&str>,
    ) -> Result<serde_json::Value, BoxError> {
        let mut req = self
            .http
            .post(format!("{STRIPE_API}{path}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form);
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body: serde_json::Value = resp.json().await?;

        if !status.is_success() {
            let message = body["error"]["message"].as_str().unwrap_or("unknown error");
            return Err(format!("Stripe {path} failed ({status}): {message}").into());
        }
        Ok(body)
    }

    /// Create a Checkout Session (payment mode) for a pending registration
    pub async fn create_checkout_session(
        &self,
        req: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession, BoxError> {
        let registration_id = req.registration_id.to_string();
        let form = [
            ("mode", "payment".to_string()),
            ("customer_email", req.customer_email.to_string()),
            ("client_reference_id", registration_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", req.currency.to_string()),
            (
                "line_items[0][price_data][unit_amount]",
                req.amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                req.description.to_string(),
            ),
            ("metadata[registration_id]", registration_id.clone()),
            (
                "payment_intent_data[metadata][registration_id]",
                registration_id,
            ),
            ("success_url", req.success_url.to_string()),
            ("cancel_url", req.cancel_url.to_string()),
            ("expires_at", req.expires_at.to_string()),
        ];

        let idempotency_key = uuid::Uuid::new_v4().to_string();
        let resp = self
            .post_form("/checkout/sessions", &form, Some(&idempotency_key))
            .await?;

        match (resp["id"].as_str(), resp["url"].as_str()) {
            (Some(id), Some(url)) => Ok(CheckoutSession {
                id: id.to_string(),
                url: url.to_string(),
            }),
            _ => Err(format!("Stripe create_checkout_session failed: {resp}").into()),
        }
    }

    /// Expire an open Checkout Session so it can no longer be paid
    pub async fn expire_checkout_session(&self, session_id: &str) -> Result<(), BoxError> {
        self.post_form(&format!("/checkout/sessions/{session_id}/expire"), &[], None)
            .await?;
        Ok(())
    }

    /// Refund a payment in full. Returns the refund id.
    pub async fn create_refund(
        &self,
        payment_intent: &str,
        registration_id: i64,
    ) -> Result<String, BoxError> {
        let form = [
            ("payment_intent", payment_intent.to_string()),
            ("metadata[registration_id]", registration_id.to_string()),
        ];
        let idempotency_key = format!("refund-{registration_id}");
        let resp = self
            .post_form("/refunds", &form, Some(&idempotency_key))
            .await?;

        resp["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| format!("Stripe create_refund failed: {resp}").into())
    }
}

/// Verify Stripe webhook signature (HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    verify_webhook_signature_at(payload, sig_header, secret, chrono::Utc::now().timestamp())
}

fn verify_webhook_signature_at(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Stripe sends one v1 entry per active secret during rotation
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err("Webhook signature mismatch");
    }

    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now - ts).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

/// Build a valid `Stripe-Signature` header. Used by tests.
#[doc(hidden)]
pub fn sign_webhook_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let sig = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={sig}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_760_000_000;
    const BODY: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    #[test]
    fn valid_signature_accepted() {
        let header = sign_webhook_payload(BODY, SECRET, NOW);
        assert_eq!(verify_webhook_signature_at(BODY, &header, SECRET, NOW), Ok(()));
        assert_eq!(
            verify_webhook_signature_at(BODY, &header, SECRET, NOW + 299),
            Ok(())
        );
    }

    #[test]
    fn tampered_body_rejected() {
        let header = sign_webhook_payload(BODY, SECRET, NOW);
        let tampered = br#"{"id":"evt_2","type":"checkout.session.completed"}"#;
        assert_eq!(
            verify_webhook_signature_at(tampered, &header, SECRET, NOW),
            Err("Webhook signature mismatch")
        );
    }

    #[test]
    fn wrong_secret_rejected() {
        let header = sign_webhook_payload(BODY, "whsec_other", NOW);
        assert!(verify_webhook_signature_at(BODY, &header, SECRET, NOW).is_err());
    }

    #[test]
    fn stale_timestamp_rejected() {
        let header = sign_webhook_payload(BODY, SECRET, NOW - 301);
        assert_eq!(
            verify_webhook_signature_at(BODY, &header, SECRET, NOW),
            Err("Webhook timestamp too old")
        );
    }

    #[test]
    fn any_matching_v1_entry_is_enough() {
        let good = sign_webhook_payload(BODY, SECRET, NOW);
        let sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v1={},v1={sig}", "00".repeat(32));
        assert_eq!(verify_webhook_signature_at(BODY, &header, SECRET, NOW), Ok(()));
    }

    #[test]
    fn malformed_header_rejected() {
        assert_eq!(
            verify_webhook_signature_at(BODY, "garbage", SECRET, NOW),
            Err("Invalid Stripe-Signature header")
        );
        assert_eq!(
            verify_webhook_signature_at(BODY, &format!("t={NOW}"), SECRET, NOW),
            Err("Invalid Stripe-Signature header")
        );
    }

    const MIN: i64 = 60 * 1000;

    #[test]
    fn expiry_keeps_a_margin_past_stripe_minimum() {
        // Hold computed before the transaction: exactly 30 minutes from an
        // earlier instant, reaching Stripe 1.2 s later
        let reserved_at = 1_760_000_000_000;
        let reserved_until = reserved_at + 30 * MIN;
        let now = reserved_at + 1_200;

        let expires_at = checkout_expires_at(reserved_until, now);
        assert!(expires_at - now / 1000 >= CHECKOUT_MIN_EXPIRY_SECS + CHECKOUT_EXPIRY_MARGIN_SECS);
    }

    #[test]
    fn longer_hold_is_kept_and_rounded_up() {
        let now = 1_760_000_000_000;
        assert_eq!(checkout_expires_at(now + 45 * MIN + 1, now), (now + 45 * MIN) / 1000 + 1);
        assert_eq!(checkout_expires_at(now + 45 * MIN, now), (now + 45 * MIN) / 1000);
    }

    #[test]
    fn expiry_capped_below_a_day() {
        let now = 1_760_000_000_000;
        let expires_at = checkout_expires_at(now + 48 * 60 * MIN, now);
        assert!(expires_at - now / 1000 < CHECKOUT_MAX_EXPIRY_SECS);
    }
}
