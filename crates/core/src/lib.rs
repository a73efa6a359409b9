//! Kudos core: grant records, ledger projections, grant planning, and configuration.
//!
//! Nothing in this crate performs I/O apart from reading the config file; storage lives in
//! `kudos-db` and the Slack surface in `kudos-slack`.

pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod grants;
pub mod ledger;

pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::grant::{ChannelId, GrantRecord, UserId};
pub use errors::{ApplicationError, DomainError};
pub use grants::{plan_grants, GrantRequest};
pub use ledger::{
    compute_stats, compute_totals, rank_leaderboard, LeaderboardEntry, RecentGrant, StatsView,
};
