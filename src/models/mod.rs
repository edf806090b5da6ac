// Data models shared by services and API handlers

pub mod user;
pub mod profile;
pub mod catalog;
pub mod workout_plan;
pub mod workout_session;
pub mod streak;
pub mod analytics;
pub mod validation;

pub use user::*;
pub use profile::*;
pub use catalog::*;
pub use workout_plan::*;
pub use workout_session::*;
pub use streak::*;
pub use analytics::*;
pub use validation::*;
