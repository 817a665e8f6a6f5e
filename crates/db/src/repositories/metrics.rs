//! Aggregate reads behind the dashboards.

use edumart_core::metrics::{DateRange, FinancialEvent, RevenueSums};
use edumart_shared::types::{Currency, UserId};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, Statement,
};

use super::convert;
use super::error::RepositoryError;
use crate::entities::{earnings, sea_orm_active_enums::EarningStatus as DbEarningStatus};

const REVENUE_SQL: &str = r"
SELECT
    p.currency,
    COALESCE(SUM(p.original_amount), 0)::BIGINT AS gross,
    COALESCE(SUM(p.discount_amount), 0)::BIGINT AS discounts,
    COALESCE(SUM(p.refund_amount), 0)::BIGINT AS refunds,
    COUNT(*)::BIGINT AS transactions,
    COALESCE((SELECT SUM(e.platform_fee) FROM earnings e
              WHERE e.currency = p.currency AND e.status <> 'CANCELLED'
                AND e.created_at >= $1 AND e.created_at < $2), 0)::BIGINT AS platform_fees,
    COALESCE((SELECT SUM(e.commission) FROM earnings e
              WHERE e.currency = p.currency AND e.status <> 'CANCELLED'
                AND e.created_at >= $1 AND e.created_at < $2), 0)::BIGINT AS instructor_commission
FROM payments p
WHERE p.status IN ('COMPLETED', 'REFUNDED', 'PARTIALLY_REFUNDED')
  AND p.completed_at >= $1 AND p.completed_at < $2
GROUP BY p.currency
ORDER BY p.currency
";

#[derive(Debug, FromQueryResult)]
struct RevenueRow {
    currency: String,
    gross: i64,
    discounts: i64,
    refunds: i64,
    transactions: i64,
    platform_fees: i64,
    instructor_commission: i64,
}

/// Metrics repository.
#[derive(Debug, Clone)]
pub struct MetricsRepository {
    db: DatabaseConnection,
}

impl MetricsRepository {
    /// Creates a new metrics repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Non-cancelled earnings of one instructor in `range`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn earnings_events(
        &self,
        instructor: UserId,
        currency: Currency,
        range: &DateRange,
    ) -> Result<Vec<FinancialEvent>, RepositoryError> {
        let rows = earnings::Entity::find()
            .filter(earnings::Column::InstructorId.eq(instructor.into_inner()))
            .filter(earnings::Column::Currency.eq(currency.code()))
            .filter(earnings::Column::Status.ne(DbEarningStatus::Cancelled))
            .filter(earnings::Column::CreatedAt.gte(range.start_at()))
            .filter(earnings::Column::CreatedAt.lt(range.end_exclusive_at()))
            .order_by_asc(earnings::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(rows.iter().map(event).collect())
    }

    /// Non-cancelled earnings of every instructor in `range`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn revenue_events(
        &self,
        currency: Currency,
        range: &DateRange,
    ) -> Result<Vec<FinancialEvent>, RepositoryError> {
        let rows = earnings::Entity::find()
            .filter(earnings::Column::Currency.eq(currency.code()))
            .filter(earnings::Column::Status.ne(DbEarningStatus::Cancelled))
            .filter(earnings::Column::CreatedAt.gte(range.start_at()))
            .filter(earnings::Column::CreatedAt.lt(range.end_exclusive_at()))
            .order_by_asc(earnings::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(rows.iter().map(event).collect())
    }

    /// Platform revenue in `range`, per currency with activity.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored currency is unknown.
    pub async fn revenue_sums(&self, range: &DateRange) -> Result<Vec<(Currency, RevenueSums)>, RepositoryError> {
        let rows = RevenueRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            REVENUE_SQL,
            [range.start_at().into(), range.end_exclusive_at().into()],
        ))
        .all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok((
                    convert::currency(&row.currency)?,
                    RevenueSums {
                        gross: row.gross,
                        discounts: row.discounts,
                        refunds: row.refunds,
                        platform_fees: row.platform_fees,
                        instructor_commission: row.instructor_commission,
                        transactions: u64::try_from(row.transactions).unwrap_or_default(),
                    },
                ))
            })
            .collect()
    }

    /// Number of non-cancelled earnings, i.e. sales credited to the instructor.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn sales_count(&self, instructor: UserId, currency: Currency) -> Result<u64, RepositoryError> {
        Ok(earnings::Entity::find()
            .filter(earnings::Column::InstructorId.eq(instructor.into_inner()))
            .filter(earnings::Column::Currency.eq(currency.code()))
            .filter(earnings::Column::Status.ne(DbEarningStatus::Cancelled))
            .count(&self.db)
            .await?)
    }
}

fn event(model: &earnings::Model) -> FinancialEvent {
    FinancialEvent {
        at: convert::utc(model.created_at),
        amount: model.amount,
        commission: model.commission,
        platform_fee: model.platform_fee,
    }
}
