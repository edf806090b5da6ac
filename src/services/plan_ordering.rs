//! Position arithmetic for exercises inside a workout plan.
//!
//! Positions are 1-based and contiguous. Every insert, move and removal is
//! expressed as at most one [`ShiftRange`]: a closed range of positions whose
//! occupants move by `delta`. The service issues that range as a single
//! `UPDATE`, and tests apply it to plain vectors.

/// Positions in `from..=to` (or `from..` when `to` is `None`) move by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftRange {
    pub from: i32,
    pub to: Option<i32>,
    pub delta: i32,
}

impl ShiftRange {
    pub fn contains(&self, position: i32) -> bool {
        position >= self.from && self.to.map_or(true, |to| position <= to)
    }

    pub fn apply(&self, position: i32) -> i32 {
        if self.contains(position) {
            position + self.delta
        } else {
            position
        }
    }
}

/// Where a new exercise lands: the requested position clamped to `1..=max+1`,
/// or the end of the plan when none was requested.
pub fn insert_position(requested: Option<i32>, max_position: i32) -> i32 {
    let end = max_position.max(0) + 1;
    requested.map_or(end, |position| position.clamp(1, end))
}

/// Make room at `position` by pushing it and everything after it up by one.
pub fn shift_for_insert(position: i32) -> ShiftRange {
    ShiftRange {
        from: position,
        to: None,
        delta: 1,
    }
}

/// Close the gap left at `position`.
pub fn shift_for_delete(position: i32) -> ShiftRange {
    ShiftRange {
        from: position + 1,
        to: None,
        delta: -1,
    }
}

/// Target of a move, clamped to the occupied range `1..=max`.
pub fn move_target(requested: i32, max_position: i32) -> i32 {
    requested.clamp(1, max_position.max(1))
}

/// Shift applied to the other exercises when one moves from `from` to `to`.
/// `None` when nothing moves.
pub fn shift_for_move(from: i32, to: i32) -> Option<ShiftRange> {
    if to < from {
        Some(ShiftRange {
            from: to,
            to: Some(from - 1),
            delta: 1,
        })
    } else if to > from {
        Some(ShiftRange {
            from: from + 1,
            to: Some(to),
            delta: -1,
        })
    } else {
        None
    }
}
