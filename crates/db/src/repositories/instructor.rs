//! Instructor profile repository: payout method and details.

use edumart_shared::types::{Currency, UserId};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
};
use serde_json::Value;

use super::convert;
use super::error::RepositoryError;
use crate::entities::{earnings, instructor_profiles, payouts};

/// Instructor profile repository.
#[derive(Debug, Clone)]
pub struct InstructorRepository {
    db: DatabaseConnection,
}

impl InstructorRepository {
    /// Creates a new instructor repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds the profile of an instructor.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_profile(
        &self,
        instructor: UserId,
    ) -> Result<Option<instructor_profiles::Model>, RepositoryError> {
        Ok(instructor_profiles::Entity::find_by_id(instructor.into_inner())
            .one(&self.db)
            .await?)
    }

    /// Creates or replaces the payout method and details.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub async fn update_payment_details(
        &self,
        instructor: UserId,
        method: &str,
        details: Value,
    ) -> Result<instructor_profiles::Model, RepositoryError> {
        let now = chrono::Utc::now().into();
        let profile = instructor_profiles::ActiveModel {
            user_id: Set(instructor.into_inner()),
            payout_method: Set(Some(method.trim().to_string())),
            payout_details: Set(Some(details)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        instructor_profiles::Entity::insert(profile)
            .on_conflict(
                OnConflict::column(instructor_profiles::Column::UserId)
                    .update_columns([
                        instructor_profiles::Column::PayoutMethod,
                        instructor_profiles::Column::PayoutDetails,
                        instructor_profiles::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        tracing::info!(instructor_id = %instructor, method, "payment details updated");

        self.find_profile(instructor)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Instructor profile", instructor))
    }

    /// Currencies the instructor has earnings or payouts in, in `Currency::ALL` order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored code is unknown.
    pub async fn currencies(&self, instructor: UserId) -> Result<Vec<Currency>, RepositoryError> {
        let mut codes: Vec<String> = earnings::Entity::find()
            .select_only()
            .column(earnings::Column::Currency)
            .distinct()
            .filter(earnings::Column::InstructorId.eq(instructor.into_inner()))
            .into_tuple()
            .all(&self.db)
            .await?;
        let payout_codes: Vec<String> = payouts::Entity::find()
            .select_only()
            .column(payouts::Column::Currency)
            .distinct()
            .filter(payouts::Column::InstructorId.eq(instructor.into_inner()))
            .into_tuple()
            .all(&self.db)
            .await?;
        codes.extend(payout_codes);

        let mut found = Vec::new();
        for code in &codes {
            found.push(convert::currency(code)?);
        }
        Ok(Currency::ALL
            .into_iter()
            .filter(|c| found.contains(c))
            .collect())
    }
}
