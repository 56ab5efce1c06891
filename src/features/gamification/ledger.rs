//! XP ledger
//!
//! Pure arithmetic mapping cumulative experience to a level. Fixed-width
//! curve: every level spans [`XP_PER_LEVEL`] points, no diminishing
//! returns.

use crate::shared::constants::XP_PER_LEVEL;

/// Result of applying an XP delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpAward {
    pub xp: i64,
    pub level: i64,
}

/// Level for a cumulative XP total: `floor(xp / 50) + 1`.
///
/// Floor division via `div_euclid` keeps the mapping consistent even for
/// a hypothetical negative balance (future penalties).
pub fn level_for(xp: i64) -> i64 {
    xp.div_euclid(XP_PER_LEVEL) + 1
}

/// XP still needed to reach the next level boundary.
///
/// Returns 0 exactly at a boundary (xp a multiple of 50), never negative.
pub fn xp_to_next_level(xp: i64) -> i64 {
    (XP_PER_LEVEL - xp.rem_euclid(XP_PER_LEVEL)) % XP_PER_LEVEL
}

/// Apply a delta and recompute the level. Delta is non-negative in
/// current usage but negative deltas recompute consistently too.
pub fn award_xp(current_xp: i64, delta: i64) -> XpAward {
    let xp = current_xp + delta;
    XpAward {
        xp,
        level: level_for(xp),
    }
}
