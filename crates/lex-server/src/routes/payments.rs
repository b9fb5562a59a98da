//! Paid enrollment through the payment gateway, the gateway webhook, and
//! the purchase ledger.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use lex_core::entities::{Payment, Transaction};
use lex_core::enums::{PaymentStatus, Role};
use lex_core::errors::CoreError;
use lex_core::responses::Page;
use lex_db::error::DatabaseError;
use lex_payments::{PaymentLinkRequest, WebhookPayload};

use crate::error::{ApiError, ApiResult};
use crate::extract::{AuthUser, JsonBody, PageQuery};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/payments", post(create).get(list))
        .route("/payments/webhook", post(webhook))
        .route("/payments/:id", get(get_one))
        .route("/payments/:id/cancel", post(cancel))
        .route("/transactions", get(transactions))
}

#[derive(Debug, Deserialize)]
struct CreatePaymentRequest {
    classroom_id: String,
}

/// Open a pending payment for a paid classroom and a checkout link for it.
async fn create(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    user.require(&[Role::Student])?;
    let gateway = state.gateway()?;
    let payment = state
        .svc
        .create_classroom_payment(user.id(), &req.classroom_id)
        .await?;

    let request = PaymentLinkRequest {
        order_code: payment.order_code,
        amount: payment.amount,
        description: payment.description.clone(),
        return_url: None,
        cancel_url: None,
    };
    let link = match gateway.create_link(request).await {
        Ok(link) => link,
        Err(error) => {
            tracing::warn!(payment_id = %payment.id, %error, "checkout link creation failed");
            if let Err(db_error) = state
                .svc
                .transition_payment(payment.order_code, PaymentStatus::Failed)
                .await
            {
                tracing::error!(payment_id = %payment.id, error = %db_error, "failed to mark payment failed");
            }
            return Err(error.into());
        }
    };

    let payment = state
        .svc
        .set_checkout_url(&payment.id, &link.checkout_url)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Own payments; admins see everyone's.
async fn list(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<Payment>>> {
    let paging = state.paging(page.page, page.page_size);
    let scope = (!user.identity().is_admin()).then(|| user.id());
    Ok(Json(state.svc.list_payments(scope, paging).await?))
}

async fn get_one(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Payment>> {
    Ok(Json(state.svc.get_payment_for(user.identity(), &id).await?))
}

/// Cancel locally first; the gateway link is closed on a best-effort basis.
async fn cancel(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Payment>> {
    let payment = state.svc.cancel_payment(user.identity(), &id).await?;
    if let Some(gateway) = state.gateway.as_ref() {
        if let Err(error) = gateway
            .cancel_link(payment.order_code, "cancelled by buyer")
            .await
        {
            tracing::warn!(payment_id = %payment.id, %error, "gateway cancel failed");
        }
    }
    Ok(Json(payment))
}

#[derive(Debug, Serialize)]
struct WebhookAck {
    success: bool,
    /// False for re-deliveries and unknown orders.
    changed: bool,
}

/// Gateway callback. Unauthenticated; trust comes from the signature.
async fn webhook(
    State(state): State<SharedState>,
    JsonBody(payload): JsonBody<WebhookPayload>,
) -> ApiResult<Json<WebhookAck>> {
    let gateway = state.gateway()?;
    let data = gateway.verify_webhook(&payload)?;

    let payment = match state.svc.get_payment_by_order_code(data.order_code).await {
        Ok(payment) => payment,
        Err(DatabaseError::Core(CoreError::NotFound { .. })) => {
            // The gateway pings the endpoint with a sample order on setup.
            tracing::warn!(order_code = data.order_code, "webhook for unknown order");
            return Ok(Json(WebhookAck {
                success: true,
                changed: false,
            }));
        }
        Err(error) => return Err(error.into()),
    };

    if payment.amount != data.amount {
        tracing::warn!(
            payment_id = %payment.id,
            expected = payment.amount,
            received = data.amount,
            "webhook amount mismatch"
        );
        return Err(ApiError::bad_request("amount does not match the order"));
    }

    let (payment, changed) = state
        .svc
        .transition_payment(data.order_code, data.status)
        .await?;
    tracing::info!(
        payment_id = %payment.id,
        status = %payment.status,
        changed,
        reference = data.reference.as_deref().unwrap_or(""),
        "webhook processed"
    );
    Ok(Json(WebhookAck {
        success: true,
        changed,
    }))
}

async fn transactions(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<Transaction>>> {
    let paging = state.paging(page.page, page.page_size);
    let scope = (!user.identity().is_admin()).then(|| user.id());
    Ok(Json(state.svc.list_transactions(scope, paging).await?))
}
