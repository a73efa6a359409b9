use std::fmt;

use chrono::{DateTime, TimeZone};

use crate::domain::grant::{ChannelId, GrantRecord, UserId};
use crate::errors::DomainError;
use crate::ledger::stats::unix_seconds;

/// A submitted grant dialog: one grantor, one or more selected recipients, one reason.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantRequest {
    pub grantor: UserId,
    pub recipients: Vec<UserId>,
    pub reason: String,
}

/// Builds one record per recipient other than the grantor. All records share the same reason,
/// timestamp, date and channel.
pub fn plan_grants<Tz>(
    request: &GrantRequest,
    now: &DateTime<Tz>,
    channel_id: &ChannelId,
) -> Result<Vec<GrantRecord>, DomainError>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let ts = unix_seconds(now);
    let date = now.format("%Y-%m-%d").to_string();

    let records: Vec<GrantRecord> = request
        .recipients
        .iter()
        .filter(|recipient| **recipient != request.grantor)
        .map(|recipient| GrantRecord {
            from: request.grantor.clone(),
            to: recipient.clone(),
            reason: request.reason.clone(),
            date: date.clone(),
            ts,
            channel_id: channel_id.clone(),
        })
        .collect();

    if records.is_empty() {
        return Err(DomainError::NoEligibleRecipients { grantor: request.grantor.to_string() });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{plan_grants, GrantRequest};
    use crate::domain::grant::{ChannelId, UserId};
    use crate::errors::DomainError;

    fn request(grantor: &str, recipients: &[&str]) -> GrantRequest {
        GrantRequest {
            grantor: UserId::new(grantor),
            recipients: recipients.iter().map(|id| UserId::new(*id)).collect(),
            reason: "unblocked the release".to_owned(),
        }
    }

    #[test]
    fn batch_records_differ_only_in_recipient() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).single().expect("instant");
        let channel = ChannelId::new("C-KUDOS");

        let records =
            plan_grants(&request("U-A", &["U-B", "U-C"]), &now, &channel).expect("two records");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].to, UserId::new("U-B"));
        assert_eq!(records[1].to, UserId::new("U-C"));
        for record in &records {
            assert_eq!(record.from, UserId::new("U-A"));
            assert_eq!(record.reason, records[0].reason);
            assert_eq!(record.ts, records[0].ts);
            assert_eq!(record.date, "2026-10-19");
            assert_eq!(record.channel_id, channel);
        }
        assert_eq!(records[0].ts, now.timestamp() as f64);
    }

    #[test]
    fn self_only_selection_is_rejected() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).single().expect("instant");

        let error = plan_grants(&request("U-A", &["U-A"]), &now, &ChannelId::new("C1"))
            .expect_err("self grant should be rejected");

        assert_eq!(error, DomainError::NoEligibleRecipients { grantor: "U-A".to_owned() });
    }

    #[test]
    fn self_is_dropped_from_mixed_selection() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).single().expect("instant");

        let records = plan_grants(&request("U-A", &["U-A", "U-B"]), &now, &ChannelId::new("C1"))
            .expect("one record");

        assert_eq!(records.len(), 1);
        assert!(records.iter().all(|record| !record.is_self_grant()));
    }
}
