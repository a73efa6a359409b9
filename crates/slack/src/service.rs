use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeZone;
use tracing::{info, warn};

use kudos_core::clock::Clock;
use kudos_core::config::KudosConfig;
use kudos_core::domain::grant::{GrantRecord, UserId};
use kudos_core::errors::ApplicationError;
use kudos_core::grants::{plan_grants, GrantRequest};
use kudos_core::ledger::{compute_stats, compute_totals, rank_leaderboard, LEADERBOARD_SIZE};
use kudos_db::GrantRepository;

use crate::blocks::{
    empty_leaderboard_message, grant_announcement, grant_modal, notice_message, LeaderboardCard,
    MessageTemplate, PodiumProfile, StatsCard,
};
use crate::commands::{
    CommandEnvelope, CommandRouteError, GrantOutcome, GrantSubmission, KudosCommandService,
};
use crate::web_api::SlackWebApi;

const PODIUM_SIZE: usize = 3;
const PLACEHOLDER_NAME: &str = "User";

/// Kudos behaviour behind every Slack surface: reads and appends the ledger, renders views, and
/// delivers them through the Web API.
pub struct KudosService<C> {
    repository: Arc<dyn GrantRepository>,
    web_api: Arc<dyn SlackWebApi>,
    clock: C,
    settings: KudosConfig,
}

impl<C> KudosService<C>
where
    C: Clock,
    <C::Tz as TimeZone>::Offset: fmt::Display + Send + Sync,
{
    pub fn new(
        repository: Arc<dyn GrantRepository>,
        web_api: Arc<dyn SlackWebApi>,
        clock: C,
        settings: KudosConfig,
    ) -> Self {
        Self { repository, web_api, clock, settings }
    }

    /// Full ledger snapshot. A failed read degrades to an empty ledger so views still render.
    async fn load_ledger(&self) -> Vec<GrantRecord> {
        match self.repository.load_all().await {
            Ok(records) => records,
            Err(error) => {
                warn!(
                    event_name = "ledger.load_failed",
                    error = %error,
                    "could not read grant ledger; rendering with no data"
                );
                Vec::new()
            }
        }
    }

    async fn podium_profile(&self, user_id: &UserId) -> PodiumProfile {
        match self.web_api.user_profile(user_id).await {
            Ok(profile) => PodiumProfile {
                display_name: profile.display_name,
                avatar_url: profile
                    .avatar_url
                    .unwrap_or_else(|| self.settings.default_avatar_url.clone()),
            },
            Err(error) => {
                warn!(
                    event_name = "slack.user_profile_failed",
                    user_id = %user_id,
                    error = %error,
                    "user lookup failed; using placeholder identity"
                );
                PodiumProfile {
                    display_name: PLACEHOLDER_NAME.to_owned(),
                    avatar_url: self.settings.default_avatar_url.clone(),
                }
            }
        }
    }

    async fn post_message(&self, channel: &str, message: &MessageTemplate, what: &'static str) {
        if let Err(error) = self.web_api.post_message(channel, message).await {
            warn!(event_name = "slack.post_failed", channel, what, error = %error, "post failed");
        }
    }

    async fn post_ephemeral(
        &self,
        channel: &str,
        user: &UserId,
        message: &MessageTemplate,
        what: &'static str,
    ) {
        if let Err(error) = self.web_api.post_ephemeral(channel, user, message).await {
            warn!(
                event_name = "slack.post_failed",
                channel,
                user_id = %user,
                what,
                error = %error,
                "ephemeral post failed"
            );
        }
    }
}

#[async_trait]
impl<C> KudosCommandService for KudosService<C>
where
    C: Clock + 'static,
    <C::Tz as TimeZone>::Offset: fmt::Display + Send + Sync,
{
    async fn open_grant_dialog(&self, envelope: &CommandEnvelope) -> Result<(), CommandRouteError> {
        let Some(trigger_id) = envelope.trigger_id.as_deref() else {
            warn!(user_id = %envelope.user_id, "grant dialog requested without a trigger id");
            return Ok(());
        };

        if let Err(error) = self.web_api.open_view(trigger_id, &grant_modal()).await {
            warn!(
                event_name = "slack.open_view_failed",
                user_id = %envelope.user_id,
                error = %error,
                "could not open grant dialog"
            );
        }
        Ok(())
    }

    async fn show_leaderboard(&self, envelope: &CommandEnvelope) -> Result<(), CommandRouteError> {
        let ledger = self.load_ledger().await;
        let totals = compute_totals(&ledger);
        let channel = envelope.reply_channel();

        if totals.is_empty() {
            self.post_message(&channel, &empty_leaderboard_message(), "leaderboard").await;
            return Ok(());
        }

        let entries = rank_leaderboard(&totals, LEADERBOARD_SIZE);
        let mut podium = Vec::with_capacity(PODIUM_SIZE);
        for entry in entries.iter().take(PODIUM_SIZE) {
            podium.push(self.podium_profile(&entry.user_id).await);
        }
        let month_label = self.clock.now().format("%B %Y").to_string();

        let message = LeaderboardCard::new(month_label, entries, podium).render();
        self.post_message(&channel, &message, "leaderboard").await;
        info!(
            event_name = "kudos.leaderboard_posted",
            user_id = %envelope.user_id,
            recipients = totals.len(),
            "leaderboard posted"
        );
        Ok(())
    }

    async fn show_stats(&self, envelope: &CommandEnvelope) -> Result<(), CommandRouteError> {
        let ledger = self.load_ledger().await;
        let view = compute_stats(
            &ledger,
            &envelope.user_id,
            &self.clock.now(),
            self.settings.monthly_limit,
        );
        let message = StatsCard::new(&view).render(&mut rand::thread_rng());

        match &envelope.channel_id {
            Some(channel_id) => {
                self.post_ephemeral(channel_id.as_str(), &envelope.user_id, &message, "stats").await
            }
            None => self.post_message(envelope.user_id.as_str(), &message, "stats").await,
        }
        Ok(())
    }

    async fn submit_grants(
        &self,
        submission: GrantSubmission,
    ) -> Result<GrantOutcome, CommandRouteError> {
        let request = GrantRequest {
            grantor: submission.grantor,
            recipients: submission.recipients,
            reason: submission.reason,
        };
        let official_channel = self.settings.official_channel();
        let planned = plan_grants(&request, &self.clock.now(), &official_channel);
        let grantor = &request.grantor;

        let records = match planned {
            Ok(records) => records,
            Err(error) => {
                info!(
                    event_name = "kudos.self_grant_rejected",
                    user_id = %grantor,
                    "grant dialog had no recipient other than the grantor"
                );
                let notice = notice_message(ApplicationError::from(error).user_message());
                self.post_ephemeral(grantor.as_str(), grantor, &notice, "self-grant notice").await;
                return Ok(GrantOutcome::RejectedSelfGrant);
            }
        };

        let mut recorded = Vec::with_capacity(records.len());
        for record in records {
            let recipient = record.to.clone();
            match self.repository.append(record).await {
                Ok(()) => recorded.push(recipient),
                Err(error) => warn!(
                    event_name = "ledger.append_failed",
                    grantor = %grantor,
                    recipient = %recipient,
                    error = %error,
                    "grant could not be stored"
                ),
            }
        }

        if recorded.is_empty() {
            let error = ApplicationError::Persistence("every grant append failed".to_owned());
            let notice = notice_message(error.user_message());
            self.post_ephemeral(grantor.as_str(), grantor, &notice, "not-recorded notice").await;
            return Ok(GrantOutcome::NotRecorded);
        }

        let announcement = grant_announcement(grantor, &recorded, &request.reason);
        self.post_message(official_channel.as_str(), &announcement, "grant announcement").await;
        info!(
            event_name = "kudos.granted",
            grantor = %grantor,
            recipients = recorded.len(),
            "kudos recorded"
        );
        Ok(GrantOutcome::Announced { recipients: recorded })
    }
}
