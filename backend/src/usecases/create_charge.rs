use std::sync::Arc;

use charges::domain::{
    aggregates::charge::{Charge, NewCharge, validate_amount},
    errors::{ChargeError, ChargeResult},
    repositories::{charges::ChargeRepository, customers::CustomerRepository},
    services::{
        id_generator::IdGenerator,
        payment_details::{DetailRequest, PaymentDetailGenerator},
    },
    value_objects::{charges::CreateChargeCommand, enums::payment_methods::PaymentMethod},
};
use tracing::{error, info, warn};

use super::idempotency::IdempotencyGuard;

/// Idempotent charge creation: customer check, key replay, detail
/// generation, validation, then a single transactional write.
pub struct CreateChargeUseCase<C, Cu>
where
    C: ChargeRepository + Send + Sync,
    Cu: CustomerRepository + Send + Sync,
{
    charge_repository: Arc<C>,
    customer_repository: Arc<Cu>,
    idempotency_guard: IdempotencyGuard<C>,
    detail_generator: Arc<PaymentDetailGenerator>,
    id_generator: Arc<dyn IdGenerator>,
}

impl<C, Cu> CreateChargeUseCase<C, Cu>
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
            idempotency_guard: IdempotencyGuard::new(Arc::clone(&charge_repository)),
            charge_repository,
            customer_repository,
            detail_generator,
            id_generator,
        }
    }

    pub async fn execute(&self, command: CreateChargeCommand) -> ChargeResult<Charge> {
        info!(
            merchant_id = %command.merchant_id,
            customer_id = %command.customer_id,
            payment_method = %command.payment_method,
            "charges: create requested"
        );

        let customer = self
            .customer_repository
            .find_by_id(command.customer_id.clone())
            .await
            .map_err(|err| {
                error!(
                    customer_id = %command.customer_id,
                    db_error = ?err,
                    "charges: failed to load customer"
                );
                ChargeError::Internal(err)
            })?;

        if customer.is_none() {
            warn!(customer_id = %command.customer_id, "charges: customer not found");
            return Err(ChargeError::CustomerNotFound(command.customer_id));
        }

        if let Some(existing) = self
            .idempotency_guard
            .replay(&command.merchant_id, command.idempotency_key())
            .await?
        {
            return Ok(existing);
        }

        let payment_method = PaymentMethod::from_str(&command.payment_method)?;
        validate_amount(command.amount)?;

        let payment_details = self.detail_generator.generate(&DetailRequest {
            payment_method,
            amount: command.amount,
            customer_id: &command.customer_id,
            merchant_id: &command.merchant_id,
            description: command.description.as_deref(),
            details: command.payment_details.as_ref(),
        })?;

        let charge = Charge::create(NewCharge {
            id: Some(self.id_generator.next_id()),
            customer_id: command.customer_id,
            merchant_id: command.merchant_id,
            amount: command.amount,
            currency: command.currency,
            payment_method,
            description: command.description,
            payment_details: Some(payment_details),
            metadata: command.metadata,
        })?;

        let charge_id = charge.id().to_string();
        let persisted = self.charge_repository.create(charge).await.map_err(|err| {
            error!(%charge_id, db_error = ?err, "charges: failed to persist charge");
            ChargeError::Internal(err)
        })?;

        info!(
            charge_id = %persisted.id(),
            status = %persisted.status(),
            "charges: create completed"
        );

        Ok(persisted)
    }
}
