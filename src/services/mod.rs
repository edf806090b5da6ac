// Business logic services

pub mod user_service;
pub mod profile_service;
pub mod catalog_service;
pub mod plan_ordering;
pub mod workout_plan_service;
pub mod workout_session_service;
pub mod streak_service;
pub mod analytics_service;

pub use user_service::UserService;
pub use profile_service::ProfileService;
pub use catalog_service::CatalogService;
pub use workout_plan_service::WorkoutPlanService;
pub use workout_session_service::WorkoutSessionService;
pub use streak_service::StreakService;
pub use analytics_service::AnalyticsService;
