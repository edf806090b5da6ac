use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct DailyStreak {
    pub user_id: Uuid,
    pub streak_count: i32,
    pub last_active: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// Already counted for this day
    Unchanged,
    /// Activity on the day after the last active day
    Extended,
    /// First activity, or a gap of more than one day
    Reset,
}

impl DailyStreak {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            streak_count: 0,
            last_active: None,
        }
    }

    /// Record a completed session on `today`.
    pub fn record_activity(&mut self, today: NaiveDate) -> StreakChange {
        if self.last_active == Some(today) {
            return StreakChange::Unchanged;
        }

        let yesterday = today.checked_sub_days(Days::new(1));
        let change = if self.last_active.is_some() && self.last_active == yesterday {
            self.streak_count += 1;
            StreakChange::Extended
        } else {
            self.streak_count = 1;
            StreakChange::Reset
        };

        self.last_active = Some(today);
        change
    }
}
