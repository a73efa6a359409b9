use std::collections::HashMap;

use crate::domain::grant::{GrantRecord, UserId};

pub const LEADERBOARD_SIZE: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: usize,
    pub user_id: UserId,
    pub received: u64,
}

/// All-time received count per recipient.
pub fn compute_totals(ledger: &[GrantRecord]) -> HashMap<UserId, u64> {
    let mut totals = HashMap::new();
    for record in ledger {
        *totals.entry(record.to.clone()).or_insert(0) += 1;
    }
    totals
}

/// Orders recipients by received count, highest first; equal counts fall back to user id so
/// repeated renders of the same ledger agree.
pub fn rank_leaderboard(totals: &HashMap<UserId, u64>, limit: usize) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<(&UserId, u64)> =
        totals.iter().map(|(user_id, received)| (user_id, *received)).collect();
    ranked.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(right.0)));

    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, (user_id, received))| LeaderboardEntry {
            rank: index + 1,
            user_id: user_id.clone(),
            received,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{compute_totals, rank_leaderboard, LEADERBOARD_SIZE};
    use crate::domain::grant::{ChannelId, GrantRecord, UserId};

    fn grant(from: &str, to: &str) -> GrantRecord {
        GrantRecord {
            from: UserId::new(from),
            to: UserId::new(to),
            reason: "great pairing session".to_owned(),
            date: "2026-10-19".to_owned(),
            ts: 1_790_000_000.0,
            channel_id: ChannelId::new("C-KUDOS"),
        }
    }

    #[test]
    fn totals_count_each_recipient_and_sum_to_ledger_length() {
        let ledger = vec![
            grant("U1", "U2"),
            grant("U3", "U2"),
            grant("U2", "U1"),
            grant("U1", "U3"),
            grant("U1", "U2"),
        ];

        let totals = compute_totals(&ledger);

        assert_eq!(totals.get(&UserId::new("U2")), Some(&3));
        assert_eq!(totals.get(&UserId::new("U1")), Some(&1));
        assert_eq!(totals.get(&UserId::new("U3")), Some(&1));
        assert_eq!(totals.values().sum::<u64>(), ledger.len() as u64);
    }

    #[test]
    fn empty_ledger_has_no_totals() {
        assert!(compute_totals(&[]).is_empty());
        assert!(rank_leaderboard(&compute_totals(&[]), LEADERBOARD_SIZE).is_empty());
    }

    #[test]
    fn leaderboard_sorts_descending_and_truncates() {
        let mut ledger = Vec::new();
        for recipient in 0..12 {
            for _ in 0..=recipient {
                ledger.push(grant("U-GIVER", &format!("U{recipient:02}")));
            }
        }

        let ranked = rank_leaderboard(&compute_totals(&ledger), LEADERBOARD_SIZE);

        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].user_id, UserId::new("U11"));
        assert_eq!(ranked[0].received, 12);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[9].user_id, UserId::new("U02"));
        assert_eq!(ranked[9].rank, 10);
        assert!(ranked.windows(2).all(|pair| pair[0].received >= pair[1].received));
    }

    #[test]
    fn ties_are_ordered_by_user_id() {
        let ledger = vec![grant("U1", "U9"), grant("U1", "U4"), grant("U1", "U6")];

        let ranked = rank_leaderboard(&compute_totals(&ledger), LEADERBOARD_SIZE);
        let order: Vec<&str> = ranked.iter().map(|entry| entry.user_id.as_str()).collect();

        assert_eq!(order, vec!["U4", "U6", "U9"]);
    }
}
