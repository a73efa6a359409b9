//! Read-time projections over the grant ledger.
//!
//! Every view is recomputed from a full ledger snapshot; nothing here touches storage or the clock.

pub mod stats;
pub mod totals;

pub use stats::{compute_stats, start_of_month, RecentGrant, StatsView, RECENT_HISTORY_LIMIT};
pub use totals::{compute_totals, rank_leaderboard, LeaderboardEntry, LEADERBOARD_SIZE};
