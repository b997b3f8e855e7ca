//! Configuration health report.

use axum::{Json, extract::State};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use crate::state::AppState;

const NOTE: &str = "This endpoint only reports presence/format hints for Firebase env vars. \
                    It does not attempt to initialize admin SDK.";

/// Report which integrations are configured.
///
/// Never connects to anything and never initializes Firebase.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let config = state.config();
    let firebase = &config.firebase;
    let private_key = firebase.private_key.as_ref().map(|k| k.expose_secret());

    Json(json!({
        "ok": true,
        "time": kaalika_core::timestamp::format(&Utc::now()),
        "firebase": {
            "configured": firebase.discrete_fields_present() || firebase.service_account_json.is_some(),
            "projectId": firebase.project_id,
            "clientEmailPresent": firebase.client_email.is_some(),
            "privateKeyPresent": private_key.is_some(),
            "privateKeyLooksEscaped": private_key.is_some_and(|k| k.contains("\\n")),
            "privateKeyLooksPEM": private_key.is_some_and(|k| k.contains("-----BEGIN")),
            "serviceAccountJsonPresent": firebase.service_account_json.is_some(),
        },
        "razorpay": {
            "keysPresent": config.razorpay.credentials().is_some(),
            "webhookSecretPresent": config.razorpay.webhook_secret.is_some(),
        },
        "adminSecretPresent": config.admin_secret.is_some(),
        "orderBackendConfigured": config.order_backend.is_some(),
        "email": {
            "apiKeyPresent": config.email.api_key.is_some(),
            "templateIdPresent": config.email.template_id.is_some(),
            "adminTemplateIdPresent": config.email.admin_template_id.is_some(),
        },
        "webhookTestMode": config.diagnostics.test_mode,
        "note": NOTE,
    }))
}
