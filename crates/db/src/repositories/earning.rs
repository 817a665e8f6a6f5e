//! Earnings ledger reads.

use chrono::{DateTime, Utc};
use edumart_core::earnings::EarningStatus;
use edumart_core::metrics::DateRange;
use edumart_core::reports::EarningRow;
use edumart_shared::types::{Currency, PageRequest, PageResponse, PaymentId, UserId};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use super::convert;
use super::error::RepositoryError;
use crate::entities::{earnings, sea_orm_active_enums::EarningStatus as DbEarningStatus};

/// Filters for the detailed earnings list.
#[derive(Debug, Clone, Default)]
pub struct EarningFilter {
    /// Only this status.
    pub status: Option<EarningStatus>,
    /// Only this currency.
    pub currency: Option<Currency>,
    /// Only earnings created in this range.
    pub range: Option<DateRange>,
}

/// Earnings repository.
#[derive(Debug, Clone)]
pub struct EarningRepository {
    db: DatabaseConnection,
}

impl EarningRepository {
    /// Creates a new earnings repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn instructor_query(instructor: UserId, filter: &EarningFilter) -> sea_orm::Select<earnings::Entity> {
        let mut query =
            earnings::Entity::find().filter(earnings::Column::InstructorId.eq(instructor.into_inner()));
        if let Some(status) = filter.status {
            query = query.filter(earnings::Column::Status.eq(DbEarningStatus::from(status)));
        }
        if let Some(currency) = filter.currency {
            query = query.filter(earnings::Column::Currency.eq(currency.code()));
        }
        if let Some(range) = filter.range {
            query = query
                .filter(earnings::Column::CreatedAt.gte(range.start_at()))
                .filter(earnings::Column::CreatedAt.lt(range.end_exclusive_at()));
        }
        query
    }

    /// Lists an instructor's earnings, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_for_instructor(
        &self,
        instructor: UserId,
        page: &PageRequest,
        filter: &EarningFilter,
    ) -> Result<PageResponse<earnings::Model>, RepositoryError> {
        let page = page.normalized();
        let query = Self::instructor_query(instructor, filter);
        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(earnings::Column::CreatedAt)
            .order_by_desc(earnings::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok(PageResponse::new(rows, page.page, page.per_page, total))
    }

    /// Every earning in the range as export rows, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn export_rows(
        &self,
        instructor: UserId,
        range: Option<DateRange>,
    ) -> Result<Vec<EarningRow>, RepositoryError> {
        let filter = EarningFilter {
            range,
            ..EarningFilter::default()
        };
        Self::instructor_query(instructor, &filter)
            .order_by_asc(earnings::Column::CreatedAt)
            .all(&self.db)
            .await?
            .iter()
            .map(convert::earning_row)
            .collect()
    }

    /// Earnings created by a payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn for_payment(&self, payment: PaymentId) -> Result<Vec<earnings::Model>, RepositoryError> {
        Ok(earnings::Entity::find()
            .filter(earnings::Column::PaymentId.eq(payment.into_inner()))
            .order_by_asc(earnings::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Σ non-cancelled commission created in `[from, to)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn commission_between(
        &self,
        instructor: UserId,
        currency: Currency,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let total: Option<i64> = earnings::Entity::find()
            .select_only()
            .column_as(Expr::cust("COALESCE(SUM(commission), 0)::BIGINT"), "total")
            .filter(earnings::Column::InstructorId.eq(instructor.into_inner()))
            .filter(earnings::Column::Currency.eq(currency.code()))
            .filter(earnings::Column::Status.ne(DbEarningStatus::Cancelled))
            .filter(earnings::Column::CreatedAt.gte(from))
            .filter(earnings::Column::CreatedAt.lt(to))
            .into_tuple()
            .one(&self.db)
            .await?;
        Ok(total.unwrap_or(0))
    }
}
