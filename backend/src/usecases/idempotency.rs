use std::sync::Arc;

use charges::domain::{
    aggregates::charge::Charge,
    errors::{ChargeError, ChargeResult},
    repositories::charges::ChargeRepository,
};
use tracing::{error, info, warn};

/// Short-circuits creation requests whose idempotency key already produced a
/// charge.
pub struct IdempotencyGuard<C>
where
    C: ChargeRepository + Send + Sync,
{
    charge_repository: Arc<C>,
}

impl<C> IdempotencyGuard<C>
where
    C: ChargeRepository + Send + Sync,
{
    pub fn new(charge_repository: Arc<C>) -> Self {
        Self { charge_repository }
    }

    /// Charge `merchant_id` previously created under `key`, if any. No key
    /// means no lookup. A charge owned by another merchant is never replayed.
    pub async fn replay(
        &self,
        merchant_id: &str,
        key: Option<&str>,
    ) -> ChargeResult<Option<Charge>> {
        let Some(key) = key else {
            return Ok(None);
        };

        let existing = self
            .charge_repository
            .find_by_idempotency_key(merchant_id.to_string(), key.to_string())
            .await
            .map_err(|err| {
                error!(
                    %merchant_id,
                    idempotency_key = %key,
                    db_error = ?err,
                    "idempotency: failed to look up key"
                );
                ChargeError::Internal(err)
            })?
            .filter(|charge| {
                let owned = charge.merchant_id() == merchant_id;
                if !owned {
                    warn!(
                        %merchant_id,
                        idempotency_key = %key,
                        charge_id = %charge.id(),
                        "idempotency: key resolved to another merchant's charge, ignoring"
                    );
                }
                owned
            });

        if let Some(charge) = &existing {
            info!(
                idempotency_key = %key,
                charge_id = %charge.id(),
                "idempotency: replaying existing charge"
            );
        }

        Ok(existing)
    }
}
