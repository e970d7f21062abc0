use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use charges::{
    domain::{
        repositories::{charges::ChargeRepository, customers::CustomerRepository},
        services::{
            id_generator::{IdGenerator, UuidIdGenerator},
            payment_details::{GeneratorSettings, PaymentDetailGenerator},
        },
        value_objects::{
            charges::{
                ChargeResponse, CreateChargeCommand, CreateChargeRequest, ExpireOverdueResponse,
                FailChargeRequest, ListChargesQuery, RefundChargeRequest, StatisticsQuery,
                UpdateChargeRequest,
            },
            enums::payment_methods::PaymentMethod,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{charges::ChargePostgres, customers::CustomerPostgres},
    },
};

use crate::{
    axum_http::{error_responses::AppError, merchant_context::MerchantContext},
    config::config_model::PaymentDetailSettings,
    usecases::{charges::ChargeUseCase, create_charge::CreateChargeUseCase},
};

pub struct ChargesState<C, Cu>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    pub create_charge: CreateChargeUseCase<C, Cu>,
    pub charges: ChargeUseCase<C>,
}

impl<C, Cu> ChargesState<C, Cu>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    pub fn new(
        charge_repository: Arc<C>,
        customer_repository: Arc<Cu>,
        detail_generator: Arc<PaymentDetailGenerator>,
        id_generator: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            create_charge: CreateChargeUseCase::new(
                Arc::clone(&charge_repository),
                customer_repository,
                detail_generator,
                id_generator,
            ),
            charges: ChargeUseCase::new(charge_repository),
        }
    }
}

pub fn routes(db_pool: Arc<PgPoolSquad>, settings: &PaymentDetailSettings) -> Router {
    let id_generator: Arc<dyn IdGenerator> = Arc::new(UuidIdGenerator);
    let charge_repository = ChargePostgres::new(Arc::clone(&db_pool), Arc::clone(&id_generator));
    let customer_repository = CustomerPostgres::new(Arc::clone(&db_pool));
    let detail_generator = PaymentDetailGenerator::new(
        GeneratorSettings::new(
            settings.pix_expiration_hours,
            settings.boleto_due_hours,
            settings.boleto_base_url.clone(),
        ),
        Arc::clone(&id_generator),
    );

    router(Arc::new(ChargesState::new(
        Arc::new(charge_repository),
        Arc::new(customer_repository),
        Arc::new(detail_generator),
        id_generator,
    )))
}

pub fn router<C, Cu>(state: Arc<ChargesState<C, Cu>>) -> Router
where
    C: ChargeRepository + Send + Sync + 'static,
    Cu: CustomerRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", post(create_charge).get(list_charges))
        .route("/statistics", get(statistics))
        .route("/expire-overdue", post(expire_overdue))
        .route(
            "/:id",
            get(get_charge).patch(update_charge).delete(delete_charge),
        )
        .route("/:id/pay", post(pay_charge))
        .route("/:id/refund", post(refund_charge))
        .route("/:id/cancel", post(cancel_charge))
        .route("/:id/fail", post(fail_charge))
        .route("/:id/expire", post(expire_charge))
        .with_state(state)
}

pub async fn create_charge<C, Cu>(
    State(state): State<Arc<ChargesState<C, Cu>>>,
    merchant: MerchantContext,
    Json(request): Json<CreateChargeRequest>,
) -> Result<impl IntoResponse, AppError>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    PaymentMethod::from_str(&request.payment_method).map_err(|_| {
        AppError::BadRequest(format!(
            "paymentMethod must be one of PIX, CREDIT_CARD, BOLETO (got {})",
            request.payment_method
        ))
    })?;

    let charge = state
        .create_charge
        .execute(CreateChargeCommand::new(merchant.merchant_id, request))
        .await?;

    Ok((StatusCode::CREATED, Json(ChargeResponse::from(charge))))
}

pub async fn list_charges<C, Cu>(
    State(state): State<Arc<ChargesState<C, Cu>>>,
    merchant: MerchantContext,
    Query(query): Query<ListChargesQuery>,
) -> Result<impl IntoResponse, AppError>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    let response = state.charges.list(&merchant.merchant_id, query).await?;

    Ok(Json(response))
}

pub async fn statistics<C, Cu>(
    State(state): State<Arc<ChargesState<C, Cu>>>,
    merchant: MerchantContext,
    Query(query): Query<StatisticsQuery>,
) -> Result<impl IntoResponse, AppError>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    let statistics = state
        .charges
        .statistics(&merchant.merchant_id, query)
        .await?;

    Ok(Json(statistics))
}

pub async fn expire_overdue<C, Cu>(
    State(state): State<Arc<ChargesState<C, Cu>>>,
    merchant: MerchantContext,
) -> Result<impl IntoResponse, AppError>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    let expired_charges = state
        .charges
        .expire_overdue(&merchant.merchant_id, Utc::now())
        .await?;

    Ok(Json(ExpireOverdueResponse { expired_charges }))
}

pub async fn get_charge<C, Cu>(
    State(state): State<Arc<ChargesState<C, Cu>>>,
    merchant: MerchantContext,
    Path(charge_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    let charge = state.charges.get(&merchant.merchant_id, &charge_id).await?;

    Ok(Json(ChargeResponse::from(charge)))
}

pub async fn update_charge<C, Cu>(
    State(state): State<Arc<ChargesState<C, Cu>>>,
    merchant: MerchantContext,
    Path(charge_id): Path<String>,
    Json(request): Json<UpdateChargeRequest>,
) -> Result<impl IntoResponse, AppError>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    let charge = state
        .charges
        .update(&merchant.merchant_id, &charge_id, request)
        .await?;

    Ok(Json(ChargeResponse::from(charge)))
}

pub async fn delete_charge<C, Cu>(
    State(state): State<Arc<ChargesState<C, Cu>>>,
    merchant: MerchantContext,
    Path(charge_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    state
        .charges
        .delete(&merchant.merchant_id, &charge_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn pay_charge<C, Cu>(
    State(state): State<Arc<ChargesState<C, Cu>>>,
    merchant: MerchantContext,
    Path(charge_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    let charge = state.charges.pay(&merchant.merchant_id, &charge_id).await?;

    Ok(Json(ChargeResponse::from(charge)))
}

pub async fn refund_charge<C, Cu>(
    State(state): State<Arc<ChargesState<C, Cu>>>,
    merchant: MerchantContext,
    Path(charge_id): Path<String>,
    request: Option<Json<RefundChargeRequest>>,
) -> Result<impl IntoResponse, AppError>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    let reason = request.and_then(|Json(request)| request.reason);
    let charge = state
        .charges
        .refund(&merchant.merchant_id, &charge_id, reason)
        .await?;

    Ok(Json(ChargeResponse::from(charge)))
}

pub async fn cancel_charge<C, Cu>(
    State(state): State<Arc<ChargesState<C, Cu>>>,
    merchant: MerchantContext,
    Path(charge_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    let charge = state
        .charges
        .cancel(&merchant.merchant_id, &charge_id)
        .await?;

    Ok(Json(ChargeResponse::from(charge)))
}

pub async fn fail_charge<C, Cu>(
    State(state): State<Arc<ChargesState<C, Cu>>>,
    merchant: MerchantContext,
    Path(charge_id): Path<String>,
    Json(request): Json<FailChargeRequest>,
) -> Result<impl IntoResponse, AppError>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    let charge = state
        .charges
        .fail(&merchant.merchant_id, &charge_id, request.reason)
        .await?;

    Ok(Json(ChargeResponse::from(charge)))
}

pub async fn expire_charge<C, Cu>(
    State(state): State<Arc<ChargesState<C, Cu>>>,
    merchant: MerchantContext,
    Path(charge_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    let charge = state
        .charges
        .expire(&merchant.merchant_id, &charge_id)
        .await?;

    Ok(Json(ChargeResponse::from(charge)))
}
