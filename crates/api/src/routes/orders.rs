//! Orders and their Monobank payment lifecycle.
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::Utc;
use memoria_core::document::validate::{optional_str, pick_fields, require_str, FieldKind, ValidationError};
use memoria_core::document::{Collection, Document};
use memoria_core::mutation::Patch;
use memoria_core::query::Filter;
use serde_json::{json, Map, Value};

use super::into_object;
use crate::error::{parse_id, ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::gateways::{monobank::UAH, InvoiceRequest, MerchantPaymInfo};
use crate::state::AppState;

const ORDER_FIELDS: &[(&str, FieldKind)] = &[
    ("personName", FieldKind::Text),
    ("cityName", FieldKind::Text),
    ("branchName", FieldKind::Text),
    ("email", FieldKind::Text),
    ("paymentMethod", FieldKind::Text),
    ("amount", FieldKind::Integer),
];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(create_order))
        .route("/api/merchant/invoice/create", post(create_invoice))
        .route("/api/monopay/webhook", post(payment_webhook))
}

fn order_view(doc: &Document) -> Value {
    let mut view = Map::new();
    view.insert("id".into(), json!(doc.id.to_string()));
    for (field, value) in &doc.content {
        if field != "webhook" {
            view.insert(field.clone(), value.clone());
        }
    }
    Value::Object(view)
}

async fn create_order(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = into_object(body)?;
    let person_id = parse_id(&require_str(&body, "personId")?, "person")?;
    let phone = require_str(&body, "phone")?;

    let mut content = pick_fields(&body, ORDER_FIELDS)?;
    content.insert("personId".into(), json!(person_id.to_string()));
    content.insert("phone".into(), json!(phone));
    content.insert("paymentStatus".into(), json!("pending"));
    content.insert("createdAt".into(), json!(Utc::now().to_rfc3339()));

    let order = state.store().insert(Collection::Orders, content).await?;
    tracing::info!(order = %order.id, person = %person_id, "order created");
    Ok((StatusCode::CREATED, Json(order_view(&order))))
}

/// Create a Monobank invoice. With `orderId` the order is linked to the
/// invoice so the webhook can find it later.
async fn create_invoice(State(state): State<AppState>, ApiJson(body): ApiJson<Value>) -> ApiResult<Json<Value>> {
    let body = into_object(body)?;
    let amount = match body.get("amount").and_then(Value::as_i64) {
        Some(amount) if amount > 0 => amount,
        Some(_) => return Err(ApiError::BadRequest("amount must be positive".into())),
        None => {
            return Err(ValidationError::WrongType {
                field: "amount".into(),
                expected: "an integer amount in kopecks",
            }
            .into())
        }
    };
    let order_id = optional_str(&body, "orderId")?
        .map(|raw| parse_id(&raw, "order"))
        .transpose()?;

    let reference = optional_str(&body, "reference")?.or_else(|| order_id.map(|id| id.to_string()));
    let destination = optional_str(&body, "destination")?;
    let request = InvoiceRequest {
        amount,
        ccy: UAH,
        merchant_paym_info: (reference.is_some() || destination.is_some()).then(|| MerchantPaymInfo {
            reference,
            destination,
        }),
        redirect_url: optional_str(&body, "redirectUrl")?,
        web_hook_url: optional_str(&body, "webHookUrl")?,
    };
    let invoice = state.gateways().payments.create_invoice(&request).await?;

    if let Some(order_id) = order_id {
        let patch = Patch::new()
            .set("invoiceId", invoice.invoice_id.as_str())
            .set("paymentStatus", "created");
        state
            .store()
            .update(Collection::Orders, order_id, &patch)
            .await?
            .ok_or_else(|| ApiError::NotFound("Order not found".into()))?;
    }
    tracing::info!(invoice = %invoice.invoice_id, amount, "invoice created");
    Ok(Json(json!({ "invoiceId": invoice.invoice_id, "pageUrl": invoice.page_url })))
}

/// Payment status callback. Upserts the order by invoice id and keeps the raw
/// payload; replays simply overwrite.
async fn payment_webhook(State(state): State<AppState>, ApiJson(body): ApiJson<Value>) -> ApiResult<Json<Value>> {
    let payload = into_object(body)?;
    let invoice_id = require_str(&payload, "invoiceId")?;
    let status = optional_str(&payload, "status")?.unwrap_or_else(|| "unknown".to_string());

    let patch = Patch::new()
        .set("paymentStatus", status.as_str())
        .set("webhook", Value::Object(payload))
        .set("webhookReceivedAt", Utc::now().to_rfc3339());
    let order = state
        .store()
        .upsert(Collection::Orders, &Filter::eq("invoiceId", invoice_id.as_str()), &patch)
        .await?;
    tracing::info!(order = %order.id, invoice = %invoice_id, %status, "payment webhook applied");
    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoria_core::document::DocumentId;

    use crate::test_support::TestApp;

    async fn place_order(app: &TestApp) -> DocumentId {
        let person = app.seed(Collection::People, json!({"name": "Марія"})).await;
        let (status, body) = app
            .post(
                "/api/orders",
                json!({
                    "personId": person.to_string(),
                    "personName": "Марія",
                    "cityName": "Львів",
                    "branchName": "Відділення №1",
                    "phone": "+380501112233",
                    "paymentMethod": "card"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["paymentStatus"], "pending");
        DocumentId::parse(body["id"].as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn order_requires_person_and_phone() {
        let app = TestApp::new();
        let (status, body) = app.post("/api/orders", json!({"phone": "+380"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["description"], "personId is required");

        let (status, body) = app
            .post("/api/orders", json!({"personId": "nope", "phone": "+380"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["description"], "Invalid person id");
    }

    #[tokio::test]
    async fn invoice_links_order_and_webhook_updates_it() {
        let app = TestApp::new();
        let order = place_order(&app).await;

        let (status, body) = app
            .post(
                "/api/merchant/invoice/create",
                json!({"amount": 150000, "orderId": order.to_string(), "destination": "Замовлення"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["invoiceId"], "inv-1");
        let sent = app.fakes.invoices.lock().unwrap()[0].clone();
        assert_eq!(sent.ccy, 980);
        assert_eq!(
            sent.merchant_paym_info.unwrap().reference,
            Some(order.to_string())
        );

        let (status, _) = app
            .post("/api/monopay/webhook", json!({"invoiceId": "inv-1", "status": "success", "amount": 150000}))
            .await;
        assert_eq!(status, StatusCode::OK);
        let stored = app.stored(Collection::Orders, order).await;
        assert_eq!(stored["paymentStatus"], "success");
        assert_eq!(stored["webhook"]["amount"], 150000);
    }

    #[tokio::test]
    async fn webhook_for_unknown_invoice_creates_order() {
        let app = TestApp::new();
        let (status, _) = app
            .post("/api/monopay/webhook", json!({"invoiceId": "inv-x", "status": "processing"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app
            .post("/api/monopay/webhook", json!({"invoiceId": "inv-x", "status": "failure"}))
            .await;
        assert_eq!(status, StatusCode::OK);

        let orders = app
            .state
            .store()
            .find(Collection::Orders, &Filter::eq("invoiceId", "inv-x"), Default::default())
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].str_field("paymentStatus"), Some("failure"));
    }

    #[tokio::test]
    async fn invoice_provider_failure_is_bad_gateway() {
        let app = TestApp::new();
        app.fakes.set_down(true);
        let (status, body) = app
            .post("/api/merchant/invoice/create", json!({"amount": 100}))
            .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["details"]["provider"], "monobank");

        let (status, _) = app
            .post("/api/merchant/invoice/create", json!({"amount": 0}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
