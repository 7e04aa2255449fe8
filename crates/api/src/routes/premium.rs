//! Premium accounts: login sessions and password reset by email code or SMS.
use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Duration, Utc};
use memoria_core::auth::{hash_password, verify_password, ResetError, ResetState, SessionToken};
use memoria_core::document::validate::{optional_str, require_str};
use memoria_core::document::{Collection, Document};
use memoria_core::mutation::Patch;
use memoria_core::query::Filter;
use serde::Deserialize;
use serde_json::{json, Value};

use super::into_object;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::gateways::OtpCheck;
use crate::state::AppState;

const RESET_EMAIL_SUBJECT: &str = "Код відновлення пароля";

/// The parts of a person's `premium` sub-document this module reads. Writes
/// go through dotted patches so other fields of the sub-document survive.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PremiumAccount {
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub session_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reset: Option<ResetState>,
}

impl PremiumAccount {
    pub fn of(doc: &Document) -> Option<Self> {
        let premium = doc.get("premium")?;
        match serde_json::from_value(premium.clone()) {
            Ok(account) => Some(account),
            Err(e) => {
                tracing::warn!(person = %doc.id, "unreadable premium sub-document: {e}");
                None
            }
        }
    }

    pub fn session(&self) -> Option<SessionToken> {
        Some(SessionToken {
            token: self.session_token.clone()?,
            expires_at: self.session_expires_at?,
        })
    }
}

/// Gate edits of a person that owns a premium session: the bearer token must
/// be that session. Persons without one stay openly editable.
pub(crate) fn authorize_owner(
    person: &Document,
    bearer: Option<&str>,
    now: DateTime<Utc>,
) -> ApiResult<()> {
    let Some(session) = PremiumAccount::of(person).and_then(|account| account.session()) else {
        return Ok(());
    };
    match bearer {
        Some(token) if session.accepts(token, now) => Ok(()),
        Some(_) => Err(ApiError::Unauthorized("Invalid or expired session".into())),
        None => Err(ApiError::Unauthorized("Session token required".into())),
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/people/login", post(login))
        .route("/api/premium/request-reset", post(request_reset))
        .route("/api/premium/reset", post(reset_password))
}

async fn find_account(state: &AppState, field: &str, value: &str) -> ApiResult<(Document, PremiumAccount)> {
    let person = state
        .store()
        .find_one(Collection::People, &Filter::eq(&format!("premium.{field}"), value))
        .await?
        .ok_or_else(|| ApiError::NotFound("Premium account not found".into()))?;
    let account = PremiumAccount::of(&person)
        .ok_or_else(|| ApiError::NotFound("Premium account not found".into()))?;
    Ok((person, account))
}

async fn save(state: &AppState, person: &Document, patch: Patch) -> ApiResult<()> {
    state
        .store()
        .update(Collection::People, person.id, &patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Person not found".into()))?;
    Ok(())
}

/// New password in, pending reset code and live session out.
fn password_patch(password_hash: String) -> Patch {
    Patch::new()
        .set("premium.passwordHash", password_hash)
        .unset("premium.reset")
        .unset("premium.sessionToken")
        .unset("premium.sessionExpiresAt")
}

fn to_value(reset: &ResetState) -> ApiResult<Value> {
    serde_json::to_value(reset)
        .map_err(|e| ApiError::Internal(format!("reset state serialization: {e}")))
}

/// Exchange login and password for a fresh session token.
async fn login(State(state): State<AppState>, ApiJson(body): ApiJson<Value>) -> ApiResult<Json<Value>> {
    let body = into_object(body)?;
    let login = require_str(&body, "login")?;
    let password = require_str(&body, "password")?;
    let invalid = || ApiError::Unauthorized("Invalid login or password".into());

    let (person, account) = find_account(&state, "login", &login).await.map_err(|e| match e {
        ApiError::NotFound(_) => invalid(),
        other => other,
    })?;
    let verified = account
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(hash, &password));
    if !verified {
        tracing::info!(person = %person.id, "premium login rejected");
        return Err(invalid());
    }

    let now = Utc::now();
    let session = SessionToken::issue(now, Duration::days(state.config().session_ttl_days));
    let patch = Patch::new()
        .set("premium.sessionToken", session.token.clone())
        .set("premium.sessionExpiresAt", json!(session.expires_at));
    save(&state, &person, patch).await?;

    tracing::info!(person = %person.id, "premium session issued");
    Ok(Json(json!({
        "personId": person.id.to_string(),
        "token": session.token,
        "expiresAt": session.expires_at,
    })))
}

/// Send a reset code by email, or an OTP by SMS when a phone is given.
async fn request_reset(State(state): State<AppState>, ApiJson(body): ApiJson<Value>) -> ApiResult<Json<Value>> {
    let body = into_object(body)?;

    if let Some(email) = optional_str(&body, "email")? {
        let (person, _) = find_account(&state, "email", &email).await?;
        let (code, reset) = ResetState::issue(Utc::now())?;
        save(&state, &person, Patch::new().set("premium.reset", to_value(&reset)?)).await?;

        let message = format!("Ваш код для відновлення пароля: {code}. Код дійсний 15 хвилин.");
        state
            .gateways()
            .mailer
            .send(&email, RESET_EMAIL_SUBJECT, &message)
            .await?;
        tracing::info!(person = %person.id, "reset code emailed");
        return Ok(Json(json!({ "sent": true, "channel": "email" })));
    }

    let phone = require_str(&body, "phone").map_err(|_| {
        ApiError::BadRequest("email or phone is required".into())
    })?;
    let (person, _) = find_account(&state, "phone", &phone).await?;
    let status = state.gateways().otp.send_code(&phone).await?;
    tracing::info!(person = %person.id, %status, "reset OTP sent");
    Ok(Json(json!({ "sent": true, "channel": "sms", "status": status })))
}

/// Check an emailed code against the stored reset state and count a
/// mismatch. Both happen under the person's lock.
async fn redeem_email_code(
    state: &AppState,
    person: &Document,
    code: &str,
    password_hash: String,
) -> ApiResult<()> {
    let now = Utc::now();
    let mut outcome: ApiResult<()> =
        Err(ApiError::Unauthorized("No reset code was requested".into()));
    let mut password_hash = Some(password_hash);

    state
        .store()
        .modify(Collection::People, person.id, &mut |current: &Document| {
            let mut reset = PremiumAccount::of(current)?.reset?;
            match reset.check(code, now) {
                Ok(()) => {
                    outcome = Ok(());
                    password_hash.take().map(password_patch)
                }
                Err(err) => {
                    let counted = matches!(err, ResetError::Mismatch { .. });
                    outcome = Err(err.into());
                    counted.then(|| Patch::new().set("premium.reset.attempts", reset.attempts))
                }
            }
        })
        .await?
        .ok_or_else(|| ApiError::NotFound("Person not found".into()))?;

    if let Err(err) = &outcome {
        tracing::info!(person = %person.id, "reset code rejected: {err}");
    }
    outcome
}

/// Set a new password after proving the email code or the SMS OTP.
async fn reset_password(State(state): State<AppState>, ApiJson(body): ApiJson<Value>) -> ApiResult<Json<Value>> {
    let body = into_object(body)?;
    let code = require_str(&body, "code")?;
    let new_password = require_str(&body, "newPassword")?;
    let password_hash = hash_password(&new_password)?;

    let person = if let Some(email) = optional_str(&body, "email")? {
        let (person, _) = find_account(&state, "email", &email).await?;
        redeem_email_code(&state, &person, &code, password_hash).await?;
        person
    } else {
        let phone = require_str(&body, "phone")
            .map_err(|_| ApiError::BadRequest("email or phone is required".into()))?;
        let (person, _) = find_account(&state, "phone", &phone).await?;
        if state.gateways().otp.check_code(&phone, &code).await? != OtpCheck::Approved {
            return Err(ApiError::Unauthorized("Invalid or expired code".into()));
        }
        save(&state, &person, password_patch(password_hash)).await?;
        person
    };

    tracing::info!(person = %person.id, "premium password reset");
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use memoria_core::document::DocumentId;
    use std::sync::Arc;

    use crate::test_support::TestApp;

    async fn seed_account(app: &TestApp) -> DocumentId {
        app.seed(
            Collection::People,
            json!({
                "name": "Іван Франко",
                "premium": {
                    "login": "ivan",
                    "email": "ivan@example.com",
                    "phone": "+380501112233",
                    "passwordHash": hash_password("old-secret").unwrap(),
                    "plan": "family"
                }
            }),
        )
        .await
    }

    fn mailed_code(app: &TestApp) -> String {
        let body = app.fakes.last_mail_body().unwrap();
        body.chars().filter(char::is_ascii_digit).take(6).collect()
    }

    fn wrong(code: &str) -> String {
        let n: u32 = code.parse().unwrap();
        format!("{:06}", (n + 1) % 1_000_000)
    }

    #[tokio::test]
    async fn login_issues_session_and_keeps_unknown_fields() {
        let app = TestApp::new();
        let id = seed_account(&app).await;

        let (status, body) = app
            .post("/api/people/login", json!({"login": "ivan", "password": "old-secret"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["personId"], id.to_string());
        let token = body["token"].as_str().unwrap();
        assert_eq!(token.len(), 64);

        let stored = app.stored(Collection::People, id).await;
        assert_eq!(stored["premium"]["sessionToken"], token);
        assert_eq!(stored["premium"]["plan"], "family");
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let app = TestApp::new();
        seed_account(&app).await;
        let (status, _) = app
            .post("/api/people/login", json!({"login": "ivan", "password": "nope"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app
            .post("/api/people/login", json!({"login": "nobody", "password": "x"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn email_reset_sets_new_password_and_ends_session() {
        let app = TestApp::new();
        let id = seed_account(&app).await;
        app.post("/api/people/login", json!({"login": "ivan", "password": "old-secret"}))
            .await;

        let (status, body) = app
            .post("/api/premium/request-reset", json!({"email": "ivan@example.com"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["channel"], "email");
        let code = mailed_code(&app);

        let (status, _) = app
            .post(
                "/api/premium/reset",
                json!({"email": "ivan@example.com", "code": code, "newPassword": "new-secret"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let stored = app.stored(Collection::People, id).await;
        assert!(stored["premium"].get("reset").is_none());
        assert!(stored["premium"].get("sessionToken").is_none());
        let (status, _) = app
            .post("/api/people/login", json!({"login": "ivan", "password": "new-secret"}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn reset_locks_after_five_mismatches() {
        let app = TestApp::new();
        let id = seed_account(&app).await;
        app.post("/api/premium/request-reset", json!({"email": "ivan@example.com"}))
            .await;
        let code = mailed_code(&app);
        let attempt = |code: String| {
            json!({"email": "ivan@example.com", "code": code, "newPassword": "new-secret"})
        };

        for expected in 1..=5 {
            let (status, _) = app.post("/api/premium/reset", attempt(wrong(&code))).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            let stored = app.stored(Collection::People, id).await;
            assert_eq!(stored["premium"]["reset"]["attempts"], expected);
        }

        let (status, body) = app.post("/api/premium/reset", attempt(code)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["description"].as_str().unwrap().contains("too many"));
        let stored = app.stored(Collection::People, id).await;
        assert_eq!(stored["premium"]["reset"]["attempts"], 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_wrong_codes_still_lock_at_five() {
        let app = Arc::new(TestApp::new());
        let id = seed_account(&app).await;
        app.post("/api/premium/request-reset", json!({"email": "ivan@example.com"}))
            .await;
        let code: u32 = mailed_code(&app).parse().unwrap();

        let guesses: Vec<_> = (1..=10)
            .map(|offset| {
                let app = app.clone();
                let guess = format!("{:06}", (code + offset) % 1_000_000);
                tokio::spawn(async move {
                    app.post(
                        "/api/premium/reset",
                        json!({"email": "ivan@example.com", "code": guess, "newPassword": "x"}),
                    )
                    .await
                    .0
                })
            })
            .collect();
        for guess in guesses {
            assert_eq!(guess.await.unwrap(), StatusCode::UNAUTHORIZED);
        }

        let stored = app.stored(Collection::People, id).await;
        assert_eq!(stored["premium"]["reset"]["attempts"], 5);

        let (status, _) = app
            .post(
                "/api/premium/reset",
                json!({"email": "ivan@example.com", "code": format!("{code:06}"), "newPassword": "x"}),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app
            .post("/api/people/login", json!({"login": "ivan", "password": "old-secret"}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn mismatch_keeps_a_session_issued_meanwhile() {
        let app = TestApp::new();
        let id = seed_account(&app).await;
        app.post("/api/premium/request-reset", json!({"email": "ivan@example.com"}))
            .await;
        let code = mailed_code(&app);
        let (_, body) = app
            .post("/api/people/login", json!({"login": "ivan", "password": "old-secret"}))
            .await;
        let token = body["token"].as_str().unwrap().to_string();

        app.post(
            "/api/premium/reset",
            json!({"email": "ivan@example.com", "code": wrong(&code), "newPassword": "x"}),
        )
        .await;

        let stored = app.stored(Collection::People, id).await;
        assert_eq!(stored["premium"]["sessionToken"], token);
        assert_eq!(stored["premium"]["reset"]["attempts"], 1);
        assert_eq!(stored["premium"]["plan"], "family");
    }

    #[tokio::test]
    async fn phone_reset_goes_through_otp() {
        let app = TestApp::new();
        seed_account(&app).await;
        *app.fakes.otp_code.lock().unwrap() = "4321".into();

        let (status, body) = app
            .post("/api/premium/request-reset", json!({"phone": "+380501112233"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending");

        let reset = |code: &str| {
            json!({"phone": "+380501112233", "code": code, "newPassword": "by-sms"})
        };
        let (status, _) = app.post("/api/premium/reset", reset("0000")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app.post("/api/premium/reset", reset("4321")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let app = TestApp::new();
        let (status, _) = app
            .post("/api/premium/request-reset", json!({"email": "ghost@example.com"}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn owner_gate_only_applies_with_a_session() {
        let now = Utc::now();
        let open = Document::new(json!({"name": "A"}).as_object().unwrap().clone());
        assert!(authorize_owner(&open, None, now).is_ok());

        let session = SessionToken::issue(now, Duration::days(1));
        let owned = Document::new(
            json!({"premium": {"sessionToken": session.token, "sessionExpiresAt": session.expires_at}})
                .as_object()
                .unwrap()
                .clone(),
        );
        assert!(authorize_owner(&owned, None, now).is_err());
        assert!(authorize_owner(&owned, Some("wrong"), now).is_err());
        assert!(authorize_owner(&owned, Some(&session.token), now).is_ok());
    }
}
