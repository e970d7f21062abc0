use std::sync::Arc;

use chrono::{DateTime, Utc};
use charges::domain::{
    aggregates::charge::Charge,
    errors::{ChargeError, ChargeResult},
    repositories::charges::ChargeRepository,
    value_objects::charges::{
        ChargeResponse, ChargeStatistics, ListChargesQuery, ListChargesResponse, Pagination,
        StatisticsQuery, UpdateChargeRequest,
    },
};
use tracing::{error, info, warn};

/// Read, lifecycle and reporting operations over charges, always scoped to
/// the calling merchant.
pub struct ChargeUseCase<C>
where
    C: ChargeRepository + Send + Sync,
{
    charge_repository: Arc<C>,
}

impl<C> ChargeUseCase<C>
where
    C: ChargeRepository + Send + Sync,
{
    pub fn new(charge_repository: Arc<C>) -> Self {
        Self { charge_repository }
    }

    pub async fn get(&self, merchant_id: &str, charge_id: &str) -> ChargeResult<Charge> {
        self.load_owned(merchant_id, charge_id).await
    }

    pub async fn list(
        &self,
        merchant_id: &str,
        query: ListChargesQuery,
    ) -> ChargeResult<ListChargesResponse> {
        let mut filter = query.to_filter();
        filter.merchant_id = Some(merchant_id.to_string());
        let (page, limit) = (filter.page(), filter.limit());

        info!(
            %merchant_id,
            customer_id = ?query.customer_id,
            page,
            limit,
            "charges: listing"
        );

        let result = match query.customer_id {
            Some(customer_id) => {
                self.charge_repository
                    .find_by_customer_id(customer_id, filter)
                    .await
            }
            None => {
                self.charge_repository
                    .find_by_merchant_id(merchant_id.to_string(), filter)
                    .await
            }
        };

        let charge_page = result.map_err(|err| {
            error!(%merchant_id, db_error = ?err, "charges: failed to list charges");
            ChargeError::Internal(err)
        })?;

        Ok(ListChargesResponse {
            charges: charge_page
                .charges
                .iter()
                .map(ChargeResponse::from)
                .collect(),
            pagination: Pagination::new(page, limit, charge_page.total),
        })
    }

    pub async fn update(
        &self,
        merchant_id: &str,
        charge_id: &str,
        request: UpdateChargeRequest,
    ) -> ChargeResult<Charge> {
        let mut charge = self.load_owned(merchant_id, charge_id).await?;

        if let Some(amount) = request.amount {
            charge.update_amount(amount)?;
        }

        if let Some(description) = request.description {
            charge.update_description(Some(description));
        }

        if let Some(metadata) = request.metadata {
            charge.merge_metadata(metadata)?;
        }

        self.persist(charge, "update").await
    }

    pub async fn pay(&self, merchant_id: &str, charge_id: &str) -> ChargeResult<Charge> {
        let mut charge = self.load_owned(merchant_id, charge_id).await?;

        if !charge.can_be_paid() {
            return Err(Self::rejected(&charge, "pay"));
        }
        charge.pay()?;

        self.persist(charge, "pay").await
    }

    pub async fn refund(
        &self,
        merchant_id: &str,
        charge_id: &str,
        reason: Option<String>,
    ) -> ChargeResult<Charge> {
        let mut charge = self.load_owned(merchant_id, charge_id).await?;

        if !charge.can_be_refunded() {
            return Err(Self::rejected(&charge, "refund"));
        }
        charge.refund(reason)?;

        self.persist(charge, "refund").await
    }

    pub async fn cancel(&self, merchant_id: &str, charge_id: &str) -> ChargeResult<Charge> {
        let mut charge = self.load_owned(merchant_id, charge_id).await?;

        if !charge.can_be_cancelled() {
            return Err(Self::rejected(&charge, "cancel"));
        }
        charge.cancel()?;

        self.persist(charge, "cancel").await
    }

    pub async fn fail(
        &self,
        merchant_id: &str,
        charge_id: &str,
        reason: String,
    ) -> ChargeResult<Charge> {
        if reason.trim().is_empty() {
            return Err(ChargeError::validation("failure reason is required"));
        }

        let mut charge = self.load_owned(merchant_id, charge_id).await?;
        charge.fail(reason)?;

        self.persist(charge, "fail").await
    }

    pub async fn expire(&self, merchant_id: &str, charge_id: &str) -> ChargeResult<Charge> {
        let mut charge = self.load_owned(merchant_id, charge_id).await?;
        charge.expire()?;

        self.persist(charge, "expire").await
    }

    pub async fn delete(&self, merchant_id: &str, charge_id: &str) -> ChargeResult<()> {
        self.load_owned(merchant_id, charge_id).await?;

        self.charge_repository
            .delete(charge_id.to_string())
            .await
            .map_err(|err| {
                error!(%charge_id, db_error = ?err, "charges: failed to delete charge");
                ChargeError::Internal(err)
            })?;

        info!(%merchant_id, %charge_id, "charges: deleted");
        Ok(())
    }

    pub async fn statistics(
        &self,
        merchant_id: &str,
        query: StatisticsQuery,
    ) -> ChargeResult<ChargeStatistics> {
        info!(%merchant_id, "charges: computing statistics");

        self.charge_repository
            .get_statistics(Some(merchant_id.to_string()), query.start_date, query.end_date)
            .await
            .map_err(|err| {
                error!(%merchant_id, db_error = ?err, "charges: failed to compute statistics");
                ChargeError::Internal(err)
            })
    }

    /// Expires the merchant's pending PIX and boleto charges whose deadline is
    /// at or before `now`. Returns how many were expired.
    pub async fn expire_overdue(&self, merchant_id: &str, now: DateTime<Utc>) -> ChargeResult<usize> {
        let pending = self
            .charge_repository
            .find_pending_charges(merchant_id.to_string())
            .await
            .map_err(|err| {
                error!(%merchant_id, db_error = ?err, "charges: failed to load pending charges");
                ChargeError::Internal(err)
            })?;

        let mut expired = 0;
        for mut charge in pending
            .into_iter()
            .filter(|charge| charge.merchant_id() == merchant_id && charge.is_overdue(now))
        {
            charge.expire()?;
            self.persist(charge, "expire").await?;
            expired += 1;
        }

        info!(%merchant_id, expired, "charges: overdue charges expired");
        Ok(expired)
    }

    async fn load_owned(&self, merchant_id: &str, charge_id: &str) -> ChargeResult<Charge> {
        let charge = self
            .charge_repository
            .find_by_id(charge_id.to_string())
            .await
            .map_err(|err| {
                error!(%charge_id, db_error = ?err, "charges: failed to load charge");
                ChargeError::Internal(err)
            })?;

        match charge {
            Some(charge) if charge.merchant_id() == merchant_id => Ok(charge),
            Some(_) => {
                warn!(%merchant_id, %charge_id, "charges: charge belongs to another merchant");
                Err(ChargeError::ChargeNotFound(charge_id.to_string()))
            }
            None => Err(ChargeError::ChargeNotFound(charge_id.to_string())),
        }
    }

    async fn persist(&self, charge: Charge, operation: &'static str) -> ChargeResult<Charge> {
        let charge_id = charge.id().to_string();
        let persisted = self.charge_repository.update(charge).await.map_err(|err| {
            error!(%charge_id, operation, db_error = ?err, "charges: failed to persist charge");
            ChargeError::Internal(err)
        })?;

        info!(
            %charge_id,
            operation,
            status = %persisted.status(),
            "charges: transition persisted"
        );
        Ok(persisted)
    }

    fn rejected(charge: &Charge, operation: &'static str) -> ChargeError {
        warn!(
            charge_id = %charge.id(),
            status = %charge.status(),
            operation,
            "charges: transition rejected"
        );
        ChargeError::Operation {
            operation,
            status: charge.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::fixtures::{
        CUSTOMER_ID, MERCHANT_ID, OTHER_MERCHANT_ID, overdue_boleto_charge, paid_charge,
        pix_charge,
    };
    use anyhow::anyhow;
    use charges::domain::{
        repositories::charges::MockChargeRepository,
        value_objects::{
            charges::{ChargePage, ListChargesFilter},
            enums::charge_statuses::ChargeStatus,
        },
    };
    use mockall::predicate::{always, eq};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn repo_returning(charge: Charge) -> MockChargeRepository {
        let mut charge_repo = MockChargeRepository::new();
        let charge_id = charge.id().to_string();
        charge_repo
            .expect_find_by_id()
            .with(eq(charge_id))
            .returning(move |_| {
                let charge = charge.clone();
                Box::pin(async move { Ok(Some(charge)) })
            });
        charge_repo
    }

    fn accept_updates(charge_repo: &mut MockChargeRepository) {
        charge_repo
            .expect_update()
            .returning(|charge| Box::pin(async move { Ok(charge) }));
    }

    #[tokio::test]
    async fn charge_of_other_merchant_is_not_found() {
        let charge_repo = repo_returning(pix_charge("ch_1", OTHER_MERCHANT_ID));
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        let err = usecase.get(MERCHANT_ID, "ch_1").await.unwrap_err();

        assert!(matches!(err, ChargeError::ChargeNotFound(id) if id == "ch_1"));
    }

    #[tokio::test]
    async fn missing_charge_is_not_found() {
        let mut charge_repo = MockChargeRepository::new();
        charge_repo
            .expect_find_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        let err = usecase.pay(MERCHANT_ID, "ch_missing").await.unwrap_err();

        assert!(matches!(err, ChargeError::ChargeNotFound(_)));
    }

    #[tokio::test]
    async fn pay_persists_paid_charge() {
        let mut charge_repo = repo_returning(pix_charge("ch_1", MERCHANT_ID));
        charge_repo
            .expect_update()
            .times(1)
            .withf(|charge| charge.is_paid() && charge.paid_at().is_some())
            .returning(|charge| Box::pin(async move { Ok(charge) }));
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        let charge = usecase.pay(MERCHANT_ID, "ch_1").await.unwrap();

        assert_eq!(charge.status(), ChargeStatus::Paid);
    }

    #[tokio::test]
    async fn refund_of_pending_charge_is_an_operation_error() {
        let mut charge_repo = repo_returning(pix_charge("ch_1", MERCHANT_ID));
        charge_repo.expect_update().never();
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        let err = usecase
            .refund(MERCHANT_ID, "ch_1", Some("duplicate".to_string()))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "cannot refund charge with status PENDING");
    }

    #[tokio::test]
    async fn refund_of_paid_charge_records_reason() {
        let mut charge_repo = repo_returning(paid_charge("ch_1", MERCHANT_ID));
        accept_updates(&mut charge_repo);
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        let charge = usecase
            .refund(MERCHANT_ID, "ch_1", Some("duplicate".to_string()))
            .await
            .unwrap();

        assert_eq!(charge.status(), ChargeStatus::Refunded);
        assert_eq!(charge.failure_reason(), Some("duplicate"));
    }

    #[tokio::test]
    async fn cancel_of_paid_charge_is_rejected() {
        let mut charge_repo = repo_returning(paid_charge("ch_1", MERCHANT_ID));
        charge_repo.expect_update().never();
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        let err = usecase.cancel(MERCHANT_ID, "ch_1").await.unwrap_err();

        assert!(matches!(
            err,
            ChargeError::Operation {
                operation: "cancel",
                status: ChargeStatus::Paid
            }
        ));
    }

    #[tokio::test]
    async fn fail_requires_reason_and_stores_it() {
        let mut charge_repo = repo_returning(pix_charge("ch_1", MERCHANT_ID));
        accept_updates(&mut charge_repo);
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        let err = usecase
            .fail(MERCHANT_ID, "ch_1", "  ".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ChargeError::Validation(_)));

        let charge = usecase
            .fail(MERCHANT_ID, "ch_1", "card declined".to_string())
            .await
            .unwrap();
        assert!(charge.is_failed());
        assert_eq!(charge.failure_reason(), Some("card declined"));
    }

    #[tokio::test]
    async fn update_changes_amount_description_and_metadata() {
        let mut charge_repo = repo_returning(pix_charge("ch_1", MERCHANT_ID));
        accept_updates(&mut charge_repo);
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        let mut metadata = charges::domain::value_objects::charges::Metadata::new();
        metadata.insert("orderId".to_string(), json!("42"));

        let charge = usecase
            .update(
                MERCHANT_ID,
                "ch_1",
                UpdateChargeRequest {
                    amount: Some(Decimal::new(200_00, 2)),
                    description: Some("Order 42 (revised)".to_string()),
                    metadata: Some(metadata),
                },
            )
            .await
            .unwrap();

        assert_eq!(charge.amount(), Decimal::new(200_00, 2));
        assert_eq!(charge.description(), Some("Order 42 (revised)"));
        assert_eq!(charge.metadata()["orderId"], "42");
    }

    #[tokio::test]
    async fn update_amount_of_paid_charge_is_rejected() {
        let mut charge_repo = repo_returning(paid_charge("ch_1", MERCHANT_ID));
        charge_repo.expect_update().never();
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        let err = usecase
            .update(
                MERCHANT_ID,
                "ch_1",
                UpdateChargeRequest {
                    amount: Some(Decimal::new(1_00, 2)),
                    ..UpdateChargeRequest::default()
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "cannot update amount of charge with status PAID");
    }

    #[tokio::test]
    async fn list_by_customer_keeps_merchant_scope() {
        let mut charge_repo = MockChargeRepository::new();
        charge_repo
            .expect_find_by_customer_id()
            .withf(|customer_id, filter| {
                customer_id == CUSTOMER_ID
                    && filter.merchant_id.as_deref() == Some(MERCHANT_ID)
                    && filter.limit() == 100
            })
            .returning(|_, _| {
                Box::pin(async {
                    Ok(ChargePage {
                        charges: vec![pix_charge("ch_1", MERCHANT_ID)],
                        total: 101,
                    })
                })
            });
        charge_repo.expect_find_by_merchant_id().never();
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        let response = usecase
            .list(
                MERCHANT_ID,
                ListChargesQuery {
                    customer_id: Some(CUSTOMER_ID.to_string()),
                    limit: Some(500),
                    ..ListChargesQuery::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(response.charges.len(), 1);
        assert_eq!(response.pagination.total_pages, 2);
        assert!(response.pagination.has_next);
    }

    #[tokio::test]
    async fn list_by_merchant_uses_default_paging() {
        let mut charge_repo = MockChargeRepository::new();
        charge_repo
            .expect_find_by_merchant_id()
            .with(eq(MERCHANT_ID.to_string()), always())
            .returning(|_, filter: ListChargesFilter| {
                assert_eq!((filter.page(), filter.limit()), (1, 10));
                Box::pin(async { Ok(ChargePage { charges: vec![], total: 0 }) })
            });
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        let response = usecase
            .list(MERCHANT_ID, ListChargesQuery::default())
            .await
            .unwrap();

        assert!(response.charges.is_empty());
        assert!(!response.pagination.has_prev);
    }

    #[tokio::test]
    async fn expire_overdue_only_touches_due_charges_of_merchant() {
        let mut charge_repo = MockChargeRepository::new();
        charge_repo
            .expect_find_pending_charges()
            .with(eq(MERCHANT_ID.to_string()))
            .returning(|_| {
                Box::pin(async {
                    Ok(vec![
                        overdue_boleto_charge("ch_due", MERCHANT_ID),
                        pix_charge("ch_not_due", MERCHANT_ID),
                        overdue_boleto_charge("ch_other", OTHER_MERCHANT_ID),
                    ])
                })
            });
        charge_repo
            .expect_update()
            .times(1)
            .withf(|charge| charge.id() == "ch_due" && charge.is_expired())
            .returning(|charge| Box::pin(async move { Ok(charge) }));
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        let expired = usecase.expire_overdue(MERCHANT_ID, Utc::now()).await.unwrap();

        assert_eq!(expired, 1);
    }

    #[tokio::test]
    async fn delete_checks_ownership_first() {
        let mut charge_repo = repo_returning(pix_charge("ch_1", OTHER_MERCHANT_ID));
        charge_repo.expect_delete().never();
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        assert!(usecase.delete(MERCHANT_ID, "ch_1").await.is_err());
    }

    #[tokio::test]
    async fn statistics_failure_is_internal() {
        let mut charge_repo = MockChargeRepository::new();
        charge_repo
            .expect_get_statistics()
            .with(eq(Some(MERCHANT_ID.to_string())), always(), always())
            .returning(|_, _, _| Box::pin(async { Err(anyhow!("timeout")) }));
        let usecase = ChargeUseCase::new(Arc::new(charge_repo));

        let err = usecase
            .statistics(MERCHANT_ID, StatisticsQuery::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ChargeError::Internal(_)));
    }
}
