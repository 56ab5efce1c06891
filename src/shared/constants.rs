/// XP span of a single level (fixed-width leveling curve)
pub const XP_PER_LEVEL: i64 = 50;

/// XP awarded for posting a comment
pub const XP_FOR_COMMENT: i64 = 10;

/// XP awarded for liking an issue
pub const XP_FOR_LIKE: i64 = 5;

// =============================================================================
// MOTIVATIONAL MESSAGE POOLS
// =============================================================================

/// Messages attached to level-up notifications, one drawn per event
pub const LEVEL_UP_MESSAGES: &[&str] = &[
    "You leveled up! Your city thanks you.",
    "New level unlocked - keep the reports coming!",
    "Another level conquered. The neighborhood noticed.",
    "Level up! Civic hero in the making.",
    "You just reached a new level. Onwards!",
];

/// Messages attached to XP-change notifications, one drawn per event
pub const XP_MESSAGES: &[&str] = &[
    "Nice! You earned some XP.",
    "Every point counts - thanks for contributing.",
    "XP gained. Your voice matters.",
    "More experience in the bag!",
    "Points added. Keep engaging!",
];
