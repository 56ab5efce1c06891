pub mod bus;
pub mod ledger;

pub use bus::{LevelUpEvent, NotificationBus, Subscription, XpChangeEvent};
pub use ledger::{award_xp, level_for, xp_to_next_level, XpAward};
