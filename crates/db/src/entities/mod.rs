//! `SeaORM` entity definitions.

pub mod prelude;

pub mod courses;
pub mod earnings;
pub mod enrollments;
pub mod instructor_profiles;
pub mod notifications;
pub mod payments;
pub mod payouts;
pub mod sea_orm_active_enums;
pub mod users;
