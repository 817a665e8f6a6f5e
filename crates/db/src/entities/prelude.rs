//! Entity re-exports.

pub use super::courses::Entity as Courses;
pub use super::earnings::Entity as Earnings;
pub use super::enrollments::Entity as Enrollments;
pub use super::instructor_profiles::Entity as InstructorProfiles;
pub use super::notifications::Entity as Notifications;
pub use super::payments::Entity as Payments;
pub use super::payouts::Entity as Payouts;
pub use super::users::Entity as Users;
