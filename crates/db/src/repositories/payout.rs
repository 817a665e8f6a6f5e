//! Payout ledger: locked requests, status transitions and their compensation.
//!
//! Lock order inside every write: payout row (transitions only), instructor
//! profile, then PENDING earnings by `(created_at, id)`. Requests and
//! releases for one instructor therefore serialize on the profile row.

use chrono::Utc;
use edumart_core::balance::BalanceSums;
use edumart_core::payout::{
    PayoutAction, PayoutError, PayoutService, PayoutStatus, plan_settlement, settlement_target,
};
use edumart_core::reports::PayoutRow;
use edumart_shared::types::{Currency, EarningId, Money, PageRequest, PageResponse, PayoutId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, Statement,
};
use tracing::{error, info, warn};

use super::convert;
use super::error::RepositoryError;
use super::txn::begin_with_timeouts;
use crate::entities::sea_orm_active_enums::{
    EarningStatus as DbEarningStatus, PayoutStatus as DbPayoutStatus,
};
use crate::entities::{earnings, instructor_profiles, payouts};

const BALANCE_SQL: &str = r"
SELECT
    COALESCE((SELECT SUM(commission) FROM earnings
              WHERE instructor_id = $1 AND currency = $2 AND status = 'PENDING'), 0)::BIGINT
        AS pending_earnings,
    COALESCE((SELECT SUM(commission) FROM earnings
              WHERE instructor_id = $1 AND currency = $2 AND status = 'PAID'), 0)::BIGINT
        AS paid_earnings,
    COALESCE((SELECT SUM(amount) FROM payouts
              WHERE instructor_id = $1 AND currency = $2
                AND status IN ('PENDING', 'PROCESSING')), 0)::BIGINT
        AS in_flight_payouts,
    COALESCE((SELECT SUM(amount) FROM payouts
              WHERE instructor_id = $1 AND currency = $2 AND status = 'COMPLETED'), 0)::BIGINT
        AS completed_payouts
";

#[derive(Debug, FromQueryResult)]
struct BalanceRow {
    pending_earnings: i64,
    paid_earnings: i64,
    in_flight_payouts: i64,
    completed_payouts: i64,
}

impl From<BalanceRow> for BalanceSums {
    fn from(row: BalanceRow) -> Self {
        Self {
            pending_earnings: row.pending_earnings,
            paid_earnings: row.paid_earnings,
            in_flight_payouts: row.in_flight_payouts,
            completed_payouts: row.completed_payouts,
        }
    }
}

/// Reads the four balance aggregates in one statement.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn load_balance_sums<C: ConnectionTrait>(
    conn: &C,
    instructor: UserId,
    currency: Currency,
) -> Result<BalanceSums, RepositoryError> {
    let row = BalanceRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        BALANCE_SQL,
        [instructor.into_inner().into(), currency.code().into()],
    ))
    .one(conn)
    .await?;
    Ok(row.map(BalanceSums::from).unwrap_or_default())
}

/// A committed payout request.
#[derive(Debug, Clone)]
pub struct PayoutRequested {
    /// The new payout.
    pub payout: payouts::Model,
    /// Earnings marked PAID for it.
    pub settled: usize,
    /// Balance aggregates after the request.
    pub balance_after: BalanceSums,
}

/// A committed status transition.
#[derive(Debug, Clone)]
pub struct PayoutTransition {
    /// The payout after the transition.
    pub payout: payouts::Model,
    /// The status it left.
    pub previous: PayoutStatus,
    /// Earnings returned to PENDING.
    pub released: u64,
    /// Earnings re-settled into the remaining active payouts.
    pub resettled: usize,
}

/// Payout repository.
#[derive(Debug, Clone)]
pub struct PayoutRepository {
    db: DatabaseConnection,
    tx_timeout_ms: u64,
}

impl PayoutRepository {
    /// Creates a new payout repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, tx_timeout_ms: u64) -> Self {
        Self { db, tx_timeout_ms }
    }

    /// Unlocked balance read for display.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn balance(&self, instructor: UserId, currency: Currency) -> Result<BalanceSums, RepositoryError> {
        load_balance_sums(&self.db, instructor, currency).await
    }

    /// Requests a payout against the available balance.
    ///
    /// Validation runs against a locked balance read; the payout row and the
    /// settled earnings are written in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `PayoutError` for a rejected request and `Database` when the
    /// transaction fails or a lock times out.
    pub async fn request_payout(
        &self,
        instructor: UserId,
        amount: Money,
    ) -> Result<PayoutRequested, RepositoryError> {
        let txn = begin_with_timeouts(&self.db, self.tx_timeout_ms).await?;

        let profile = instructor_profiles::Entity::find_by_id(instructor.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await?;
        let has_details = profile.as_ref().is_some_and(instructor_profiles::Model::has_payment_details);

        let pending = Self::lock_pending(&txn, instructor, amount.currency).await?;
        let sums = load_balance_sums(&txn, instructor, amount.currency).await?;
        PayoutService::validate_request(amount, &sums, has_details)?;

        let now = Utc::now();
        let payout_id = PayoutId::new();
        let payout = payouts::ActiveModel {
            id: Set(payout_id.into_inner()),
            instructor_id: Set(instructor.into_inner()),
            amount: Set(amount.amount),
            currency: Set(amount.currency.code().to_string()),
            status: Set(DbPayoutStatus::Pending),
            gateway_id: Set(None),
            gateway_response: Set(None),
            failure_reason: Set(None),
            requested_at: Set(now.into()),
            processed_at: Set(None),
            failed_at: Set(None),
            cancelled_at: Set(None),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let with_payout = sums.with_new_payout(amount.amount);
        let snapshots: Vec<_> = pending.iter().map(convert::earning_snapshot).collect();
        let plan = plan_settlement(&snapshots, &with_payout);
        if plan.shortfall > 0 {
            return Err(RepositoryError::Integrity(format!(
                "payout {payout_id} left {} uncovered after settlement",
                plan.shortfall
            )));
        }
        Self::mark_paid(&txn, &plan.settle, payout_id).await?;

        txn.commit().await?;

        let balance_after = BalanceSums {
            pending_earnings: with_payout.pending_earnings - plan.settled_amount,
            paid_earnings: with_payout.paid_earnings + plan.settled_amount,
            ..with_payout
        };
        info!(
            instructor_id = %instructor,
            payout_id = %payout_id,
            amount = amount.amount,
            currency = %amount.currency,
            settled = plan.settle.len(),
            "Payout requested"
        );
        Ok(PayoutRequested {
            payout,
            settled: plan.settle.len(),
            balance_after,
        })
    }

    /// PENDING → PROCESSING.
    ///
    /// # Errors
    ///
    /// Returns `PayoutError::InvalidStatus` or `PayoutError::NotFound`.
    pub async fn start_processing(&self, id: PayoutId) -> Result<PayoutTransition, RepositoryError> {
        self.transition(id, None, |_, status| Ok(PayoutService::start_processing(status)?))
            .await
    }

    /// PENDING | PROCESSING → COMPLETED with a gateway reference.
    ///
    /// # Errors
    ///
    /// Returns `PayoutError::InvalidStatus` or `PayoutError::NotFound`.
    pub async fn process(&self, id: PayoutId) -> Result<PayoutTransition, RepositoryError> {
        self.transition(id, None, |payout, status| {
            let amount = Money::new(payout.amount, convert::currency(&payout.currency)?);
            Ok(PayoutService::process(status, id, amount, Utc::now())?)
        })
        .await
    }

    /// PROCESSING | COMPLETED → FAILED, releasing the payout's earnings.
    ///
    /// # Errors
    ///
    /// Returns `PayoutError::ReasonRequired`, `InvalidStatus` or `NotFound`.
    pub async fn fail(&self, id: PayoutId, reason: &str) -> Result<PayoutTransition, RepositoryError> {
        self.transition(id, None, |_, status| Ok(PayoutService::fail(status, reason, Utc::now())?))
            .await
    }

    /// Instructor-owned PENDING → CANCELLED, releasing the payout's earnings.
    ///
    /// A payout owned by someone else is reported as not found.
    ///
    /// # Errors
    ///
    /// Returns `PayoutError::InvalidStatus` or `PayoutError::NotFound`.
    pub async fn cancel(&self, id: PayoutId, owner: UserId) -> Result<PayoutTransition, RepositoryError> {
        self.transition(id, Some(owner), |_, status| Ok(PayoutService::cancel(status, Utc::now())?))
            .await
    }

    async fn transition<F>(
        &self,
        id: PayoutId,
        owner: Option<UserId>,
        decide: F,
    ) -> Result<PayoutTransition, RepositoryError>
    where
        F: FnOnce(&payouts::Model, PayoutStatus) -> Result<PayoutAction, RepositoryError>,
    {
        let txn = begin_with_timeouts(&self.db, self.tx_timeout_ms).await?;

        let payout = payouts::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await?
            .filter(|p| owner.is_none_or(|o| p.instructor_id == o.into_inner()))
            .ok_or(PayoutError::NotFound(id))?;

        let previous: PayoutStatus = payout.status.into();
        let action = decide(&payout, previous)?;
        let instructor = UserId::from_uuid(payout.instructor_id);
        let currency = convert::currency(&payout.currency)?;

        let (mut released, mut resettled) = (0, 0);
        if action.releases_earnings() {
            instructor_profiles::Entity::find_by_id(instructor.into_inner())
                .lock_exclusive()
                .one(&txn)
                .await?;
        }

        let updated = Self::apply(&txn, payout, &action).await?;

        if action.releases_earnings() {
            released = Self::release(&txn, id).await?;
            resettled = Self::resettle(&txn, instructor, currency).await?;
        }

        txn.commit().await?;

        info!(
            payout_id = %id,
            instructor_id = %instructor,
            from = %previous,
            to = %action.new_status(),
            released,
            resettled,
            "Payout status changed"
        );
        Ok(PayoutTransition {
            payout: updated,
            previous,
            released,
            resettled,
        })
    }

    async fn apply(
        txn: &DatabaseTransaction,
        payout: payouts::Model,
        action: &PayoutAction,
    ) -> Result<payouts::Model, RepositoryError> {
        let now = Utc::now();
        let mut active: payouts::ActiveModel = payout.into();
        active.status = Set(action.new_status().into());
        active.updated_at = Set(now.into());
        match action {
            PayoutAction::StartProcessing { .. } => {}
            PayoutAction::Complete {
                processed_at,
                gateway_id,
                gateway_response,
                ..
            } => {
                active.processed_at = Set(Some((*processed_at).into()));
                active.gateway_id = Set(Some(gateway_id.clone()));
                active.gateway_response = Set(Some(gateway_response.clone()));
            }
            PayoutAction::Fail {
                reason, failed_at, ..
            } => {
                active.failure_reason = Set(Some(reason.clone()));
                active.failed_at = Set(Some((*failed_at).into()));
            }
            PayoutAction::Cancel { cancelled_at, .. } => {
                active.cancelled_at = Set(Some((*cancelled_at).into()));
            }
        }
        Ok(active.update(txn).await?)
    }

    /// Returns the payout's earnings to PENDING.
    async fn release(txn: &DatabaseTransaction, id: PayoutId) -> Result<u64, RepositoryError> {
        let result = earnings::Entity::update_many()
            .set(earnings::ActiveModel {
                status: Set(DbEarningStatus::Pending),
                payout_id: Set(None),
                paid_at: Set(None),
                ..Default::default()
            })
            .filter(earnings::Column::PayoutId.eq(id.into_inner()))
            .filter(earnings::Column::Status.eq(DbEarningStatus::Paid))
            .exec(txn)
            .await?;
        Ok(result.rows_affected)
    }

    /// Re-applies coverage after a release, attributing newly settled
    /// earnings to the most recent payout still active.
    async fn resettle(
        txn: &DatabaseTransaction,
        instructor: UserId,
        currency: Currency,
    ) -> Result<usize, RepositoryError> {
        let active: Vec<(PayoutId, _)> = payouts::Entity::find()
            .filter(payouts::Column::InstructorId.eq(instructor.into_inner()))
            .filter(payouts::Column::Currency.eq(currency.code()))
            .filter(payouts::Column::Status.is_in([
                DbPayoutStatus::Pending,
                DbPayoutStatus::Processing,
                DbPayoutStatus::Completed,
            ]))
            .all(txn)
            .await?
            .into_iter()
            .map(|p| (PayoutId::from_uuid(p.id), convert::utc(p.requested_at)))
            .collect();
        let Some(target) = settlement_target(&active) else {
            return Ok(0);
        };

        let pending = Self::lock_pending(txn, instructor, currency).await?;
        let sums = load_balance_sums(txn, instructor, currency).await?;
        let snapshots: Vec<_> = pending.iter().map(convert::earning_snapshot).collect();
        let plan = plan_settlement(&snapshots, &sums);
        if plan.shortfall > 0 {
            error!(
                instructor_id = %instructor,
                currency = %currency,
                shortfall = plan.shortfall,
                "Active payouts not fully backed after release"
            );
        }
        Self::mark_paid(txn, &plan.settle, target).await?;
        Ok(plan.settle.len())
    }

    async fn lock_pending(
        txn: &DatabaseTransaction,
        instructor: UserId,
        currency: Currency,
    ) -> Result<Vec<earnings::Model>, RepositoryError> {
        Ok(earnings::Entity::find()
            .filter(earnings::Column::InstructorId.eq(instructor.into_inner()))
            .filter(earnings::Column::Currency.eq(currency.code()))
            .filter(earnings::Column::Status.eq(DbEarningStatus::Pending))
            .order_by_asc(earnings::Column::CreatedAt)
            .order_by_asc(earnings::Column::Id)
            .lock_exclusive()
            .all(txn)
            .await?)
    }

    async fn mark_paid(
        txn: &DatabaseTransaction,
        ids: &[EarningId],
        payout: PayoutId,
    ) -> Result<(), RepositoryError> {
        if ids.is_empty() {
            return Ok(());
        }
        let result = earnings::Entity::update_many()
            .set(earnings::ActiveModel {
                status: Set(DbEarningStatus::Paid),
                payout_id: Set(Some(payout.into_inner())),
                paid_at: Set(Some(Utc::now().into())),
                ..Default::default()
            })
            .filter(earnings::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .filter(earnings::Column::Status.eq(DbEarningStatus::Pending))
            .exec(txn)
            .await?;
        if result.rows_affected != ids.len() as u64 {
            warn!(
                payout_id = %payout,
                expected = ids.len(),
                updated = result.rows_affected,
                "Settlement touched fewer earnings than planned"
            );
            return Err(RepositoryError::Integrity(format!(
                "settled {} of {} earnings for payout {payout}",
                result.rows_affected,
                ids.len()
            )));
        }
        Ok(())
    }

    /// Finds a payout by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find(&self, id: PayoutId) -> Result<Option<payouts::Model>, RepositoryError> {
        Ok(payouts::Entity::find_by_id(id.into_inner()).one(&self.db).await?)
    }

    /// An instructor's payouts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_for_instructor(
        &self,
        instructor: UserId,
        page: &PageRequest,
        status: Option<PayoutStatus>,
    ) -> Result<PageResponse<payouts::Model>, RepositoryError> {
        let query = payouts::Entity::find()
            .filter(payouts::Column::InstructorId.eq(instructor.into_inner()));
        self.paginate(query, page, status).await
    }

    /// Every payout, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_all(
        &self,
        page: &PageRequest,
        status: Option<PayoutStatus>,
    ) -> Result<PageResponse<payouts::Model>, RepositoryError> {
        self.paginate(payouts::Entity::find(), page, status).await
    }

    async fn paginate(
        &self,
        mut query: sea_orm::Select<payouts::Entity>,
        page: &PageRequest,
        status: Option<PayoutStatus>,
    ) -> Result<PageResponse<payouts::Model>, RepositoryError> {
        if let Some(status) = status {
            query = query.filter(payouts::Column::Status.eq(DbPayoutStatus::from(status)));
        }
        let page = page.normalized();
        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(payouts::Column::RequestedAt)
            .order_by_desc(payouts::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok(PageResponse::new(rows, page.page, page.per_page, total))
    }

    /// The instructor's most recent payouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn recent(&self, instructor: UserId, limit: u64) -> Result<Vec<payouts::Model>, RepositoryError> {
        Ok(payouts::Entity::find()
            .filter(payouts::Column::InstructorId.eq(instructor.into_inner()))
            .order_by_desc(payouts::Column::RequestedAt)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// Every payout of the instructor as export rows, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn export_rows(&self, instructor: UserId) -> Result<Vec<PayoutRow>, RepositoryError> {
        payouts::Entity::find()
            .filter(payouts::Column::InstructorId.eq(instructor.into_inner()))
            .order_by_asc(payouts::Column::RequestedAt)
            .all(&self.db)
            .await?
            .iter()
            .map(convert::payout_row)
            .collect()
    }
}
