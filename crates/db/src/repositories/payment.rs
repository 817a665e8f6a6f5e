//! Payments: completion into earnings and refund cascades.

use chrono::Utc;
use edumart_core::payment::{
    CompletionService, EnrollmentLine, PaymentError, PaymentStatus, RefundPlan, RefundRequest,
    RefundService,
};
use edumart_shared::config::PartialRefundPolicy;
use edumart_shared::types::{
    CourseId, Currency, EarningId, EnrollmentId, PageRequest, PageResponse, PaymentId, UserId,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::convert;
use super::error::RepositoryError;
use super::txn::begin_with_timeouts;
use crate::entities::sea_orm_active_enums::{
    EarningStatus as DbEarningStatus, EnrollmentStatus as DbEnrollmentStatus,
    PaymentStatus as DbPaymentStatus,
};
use crate::entities::{earnings, enrollments, payments};

/// One course in a checkout.
#[derive(Debug, Clone)]
pub struct CheckoutLine {
    /// Course bought.
    pub course_id: CourseId,
    /// Course owner.
    pub instructor_id: UserId,
    /// Price paid after discounts, minor units.
    pub price: i64,
}

/// A checkout awaiting gateway confirmation.
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// Buyer.
    pub student_id: UserId,
    /// Payment currency.
    pub currency: Currency,
    /// Gateway name.
    pub gateway: String,
    /// Payment method.
    pub method: String,
    /// Coupon or promotion discount already taken off the line prices.
    pub discount: i64,
    /// Courses in the cart.
    pub lines: Vec<CheckoutLine>,
}

/// A payment with everything it created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// The payment row.
    pub payment: payments::Model,
    /// Enrollments the payment covers.
    pub enrollments: Vec<enrollments::Model>,
    /// Earnings the payment produced.
    pub earnings: Vec<earnings::Model>,
}

/// A committed payment completion.
#[derive(Debug, Clone)]
pub struct PaymentCompleted {
    /// The payment after completion.
    pub payment: payments::Model,
    /// Earnings created, one per enrollment.
    pub earnings: Vec<earnings::Model>,
    /// Instructors who earned from the payment.
    pub instructors: Vec<UserId>,
}

/// A committed refund.
#[derive(Debug, Clone)]
pub struct RefundOutcome {
    /// The payment after the refund.
    pub payment: payments::Model,
    /// What the refund changed.
    pub plan: RefundPlan,
    /// Instructors whose earnings were cancelled.
    pub instructors: Vec<UserId>,
}

/// Payment repository.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    db: DatabaseConnection,
    tx_timeout_ms: u64,
}

impl PaymentRepository {
    /// Creates a new payment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, tx_timeout_ms: u64) -> Self {
        Self { db, tx_timeout_ms }
    }

    /// Records a checkout as a PENDING payment with ACTIVE enrollments.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_pending(&self, input: NewPayment) -> Result<PaymentDetails, RepositoryError> {
        let txn = begin_with_timeouts(&self.db, self.tx_timeout_ms).await?;
        let now = Utc::now();
        let amount: i64 = input.lines.iter().map(|l| l.price).sum();
        let payment_id = PaymentId::new();

        let payment = payments::ActiveModel {
            id: Set(payment_id.into_inner()),
            student_id: Set(input.student_id.into_inner()),
            amount: Set(amount),
            original_amount: Set(amount + input.discount),
            discount_amount: Set(input.discount),
            refund_amount: Set(0),
            currency: Set(input.currency.code().to_string()),
            status: Set(DbPaymentStatus::Pending),
            gateway: Set(input.gateway),
            method: Set(input.method),
            gateway_transaction_id: Set(None),
            refund_reason: Set(None),
            created_at: Set(now.into()),
            completed_at: Set(None),
            refunded_at: Set(None),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let mut rows = Vec::with_capacity(input.lines.len());
        for line in input.lines {
            let enrollment = enrollments::ActiveModel {
                id: Set(EnrollmentId::new().into_inner()),
                student_id: Set(input.student_id.into_inner()),
                course_id: Set(line.course_id.into_inner()),
                instructor_id: Set(line.instructor_id.into_inner()),
                payment_id: Set(payment_id.into_inner()),
                price: Set(line.price),
                status: Set(DbEnrollmentStatus::Active),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;
            rows.push(enrollment);
        }

        txn.commit().await?;
        Ok(PaymentDetails {
            payment,
            enrollments: rows,
            earnings: Vec::new(),
        })
    }

    /// Finds a payment by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find(&self, id: PaymentId) -> Result<Option<payments::Model>, RepositoryError> {
        Ok(payments::Entity::find_by_id(id.into_inner()).one(&self.db).await?)
    }

    /// Every payment, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(
        &self,
        page: &PageRequest,
        status: Option<PaymentStatus>,
    ) -> Result<PageResponse<payments::Model>, RepositoryError> {
        let mut query = payments::Entity::find();
        if let Some(status) = status {
            query = query.filter(payments::Column::Status.eq(DbPaymentStatus::from(status)));
        }
        let page = page.normalized();
        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(payments::Column::CreatedAt)
            .order_by_desc(payments::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok(PageResponse::new(rows, page.page, page.per_page, total))
    }

    /// A payment with its enrollments and earnings.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotFound` for an unknown id.
    pub async fn details(&self, id: PaymentId) -> Result<PaymentDetails, RepositoryError> {
        let payment = self.find(id).await?.ok_or(PaymentError::NotFound(id))?;
        let enrollments = enrollments::Entity::find()
            .filter(enrollments::Column::PaymentId.eq(id.into_inner()))
            .order_by_asc(enrollments::Column::CreatedAt)
            .all(&self.db)
            .await?;
        let earnings = earnings::Entity::find()
            .filter(earnings::Column::PaymentId.eq(id.into_inner()))
            .order_by_asc(earnings::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(PaymentDetails {
            payment,
            enrollments,
            earnings,
        })
    }

    /// PENDING → COMPLETED; creates one earning per enrollment.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotFound`, `InvalidTransactionStatus` or
    /// `InvalidCommission`.
    pub async fn complete(&self, id: PaymentId, fee_bps: u32) -> Result<PaymentCompleted, RepositoryError> {
        let txn = begin_with_timeouts(&self.db, self.tx_timeout_ms).await?;
        let payment = Self::lock_payment(&txn, id).await?;

        let enrollments = enrollments::Entity::find()
            .filter(enrollments::Column::PaymentId.eq(id.into_inner()))
            .order_by_asc(enrollments::Column::CreatedAt)
            .order_by_asc(enrollments::Column::Id)
            .all(&txn)
            .await?;
        let lines: Vec<EnrollmentLine> = enrollments
            .iter()
            .map(|e| EnrollmentLine {
                enrollment_id: EnrollmentId::from_uuid(e.id),
                instructor_id: UserId::from_uuid(e.instructor_id),
                price: e.price,
            })
            .collect();
        let planned = CompletionService::plan(payment.status.into(), &lines, fee_bps)?;

        let now = Utc::now();
        let mut created = Vec::with_capacity(planned.len());
        for earning in &planned {
            let row = earnings::ActiveModel {
                id: Set(EarningId::new().into_inner()),
                instructor_id: Set(earning.instructor_id.into_inner()),
                payment_id: Set(id.into_inner()),
                enrollment_id: Set(Some(earning.enrollment_id.into_inner())),
                amount: Set(earning.split.gross),
                commission: Set(earning.split.commission),
                platform_fee: Set(earning.split.platform_fee),
                currency: Set(payment.currency.clone()),
                status: Set(DbEarningStatus::Pending),
                payout_id: Set(None),
                created_at: Set(now.into()),
                paid_at: Set(None),
                cancelled_at: Set(None),
            }
            .insert(&txn)
            .await?;
            created.push(row);
        }

        let mut active: payments::ActiveModel = payment.into();
        active.status = Set(DbPaymentStatus::Completed);
        active.completed_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        let payment = active.update(&txn).await?;

        txn.commit().await?;

        let instructors = distinct(planned.iter().map(|p| p.instructor_id));
        info!(
            payment_id = %id,
            earnings = created.len(),
            amount = payment.amount,
            "Payment completed"
        );
        Ok(PaymentCompleted {
            payment,
            earnings: created,
            instructors,
        })
    }

    /// Applies a refund and its cascade in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotFound`, `InvalidTransactionStatus` or a
    /// validation error from the refund rules.
    pub async fn refund(
        &self,
        id: PaymentId,
        request: &RefundRequest,
        policy: PartialRefundPolicy,
    ) -> Result<RefundOutcome, RepositoryError> {
        let txn = begin_with_timeouts(&self.db, self.tx_timeout_ms).await?;
        let payment = Self::lock_payment(&txn, id).await?;

        let earnings = earnings::Entity::find()
            .filter(earnings::Column::PaymentId.eq(id.into_inner()))
            .order_by_asc(earnings::Column::CreatedAt)
            .order_by_asc(earnings::Column::Id)
            .lock_exclusive()
            .all(&txn)
            .await?;
        let snapshots: Vec<_> = earnings.iter().map(convert::earning_snapshot).collect();
        let plan = RefundService::plan(&convert::payment_snapshot(&payment)?, request, &snapshots, policy)?;

        let now = Utc::now();
        let mut active: payments::ActiveModel = payment.into();
        active.status = Set(plan.new_status.into());
        active.refund_amount = Set(plan.new_refund_amount);
        active.refund_reason = Set(Some(request.reason.trim().to_string()));
        active.refunded_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        let payment = active.update(&txn).await?;

        if plan.refund_enrollments {
            enrollments::Entity::update_many()
                .set(enrollments::ActiveModel {
                    status: Set(DbEnrollmentStatus::Refunded),
                    updated_at: Set(now.into()),
                    ..Default::default()
                })
                .filter(enrollments::Column::PaymentId.eq(id.into_inner()))
                .exec(&txn)
                .await?;
        }

        if !plan.cancel_earnings.is_empty() {
            let result = earnings::Entity::update_many()
                .set(earnings::ActiveModel {
                    status: Set(DbEarningStatus::Cancelled),
                    cancelled_at: Set(Some(now.into())),
                    ..Default::default()
                })
                .filter(earnings::Column::Id.is_in(plan.cancel_earnings.iter().map(|e| e.into_inner())))
                .filter(earnings::Column::Status.eq(DbEarningStatus::Pending))
                .exec(&txn)
                .await?;
            if result.rows_affected != plan.cancel_earnings.len() as u64 {
                return Err(RepositoryError::Integrity(format!(
                    "cancelled {} of {} earnings for payment {id}",
                    result.rows_affected,
                    plan.cancel_earnings.len()
                )));
            }
        }

        txn.commit().await?;

        if !plan.clawback_earnings.is_empty() {
            warn!(
                payment_id = %id,
                earnings = plan.clawback_earnings.len(),
                commission = plan.clawback_commission,
                "Refunded earnings were already paid out; clawback required"
            );
        }
        info!(
            payment_id = %id,
            refund = request.amount,
            status = %plan.new_status,
            cancelled = plan.cancel_earnings.len(),
            "Refund processed"
        );

        let instructors = distinct(
            earnings
                .iter()
                .filter(|e| plan.cancel_earnings.contains(&EarningId::from_uuid(e.id)))
                .map(|e| UserId::from_uuid(e.instructor_id)),
        );
        Ok(RefundOutcome {
            payment,
            plan,
            instructors,
        })
    }

    async fn lock_payment(txn: &DatabaseTransaction, id: PaymentId) -> Result<payments::Model, RepositoryError> {
        Ok(payments::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(PaymentError::NotFound(id))?)
    }
}

fn distinct(ids: impl Iterator<Item = UserId>) -> Vec<UserId> {
    let mut out: Vec<UserId> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
