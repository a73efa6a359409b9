use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use kudos_core::domain::grant::{ChannelId, UserId};

pub const GIVE_KUDOS_COMMAND: &str = "/dar-kudos";
pub const LEADERBOARD_COMMAND: &str = "/leaderboard";
pub const MY_KUDOS_COMMAND: &str = "/mis-kudos";
pub const GIVE_KUDOS_SHORTCUT: &str = "dar_kudos_atajo";
pub const LEADERBOARD_SHORTCUT: &str = "leaderboard";
pub const MY_KUDOS_SHORTCUT: &str = "mis-kudos";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: Option<String>,
    pub user_id: String,
    pub trigger_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShortcutPayload {
    pub callback_id: String,
    pub user_id: String,
    pub channel_id: Option<String>,
    pub trigger_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KudosCommand {
    OpenGrantDialog,
    Leaderboard,
    MyStats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandSource {
    SlashCommand,
    Shortcut,
    Button,
}

/// A user request normalised from whichever Slack surface it came through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub command: KudosCommand,
    pub source: CommandSource,
    pub user_id: UserId,
    /// Absent for global shortcuts; replies then go to the user's DM.
    pub channel_id: Option<ChannelId>,
    pub trigger_id: Option<String>,
}

impl CommandEnvelope {
    /// Where replies for this request are delivered: the invoking channel, or the user's DM.
    pub fn reply_channel(&self) -> String {
        match &self.channel_id {
            Some(channel_id) => channel_id.as_str().to_owned(),
            None => self.user_id.as_str().to_owned(),
        }
    }
}

/// A submitted grant dialog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantSubmission {
    pub grantor: UserId,
    pub recipients: Vec<UserId>,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrantOutcome {
    /// At least one record persisted and the channel announcement was attempted.
    Announced { recipients: Vec<UserId> },
    /// Every selected recipient was the grantor.
    RejectedSelfGrant,
    /// No append succeeded.
    NotRecorded,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
    #[error("unsupported shortcut: {0}")]
    UnsupportedShortcut(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

pub fn normalize_slash_command(
    payload: SlashCommandPayload,
) -> Result<CommandEnvelope, CommandParseError> {
    let command = match payload.command.trim() {
        GIVE_KUDOS_COMMAND => KudosCommand::OpenGrantDialog,
        LEADERBOARD_COMMAND => KudosCommand::Leaderboard,
        MY_KUDOS_COMMAND => KudosCommand::MyStats,
        _ => return Err(CommandParseError::UnsupportedCommand(payload.command)),
    };

    Ok(CommandEnvelope {
        command,
        source: CommandSource::SlashCommand,
        user_id: UserId::new(payload.user_id),
        channel_id: non_empty(payload.channel_id).map(ChannelId::new),
        trigger_id: non_empty(Some(payload.trigger_id)),
    })
}

pub fn normalize_shortcut(payload: ShortcutPayload) -> Result<CommandEnvelope, CommandParseError> {
    let command = match payload.callback_id.as_str() {
        GIVE_KUDOS_SHORTCUT => KudosCommand::OpenGrantDialog,
        LEADERBOARD_SHORTCUT => KudosCommand::Leaderboard,
        MY_KUDOS_SHORTCUT => KudosCommand::MyStats,
        _ => return Err(CommandParseError::UnsupportedShortcut(payload.callback_id)),
    };

    Ok(CommandEnvelope {
        command,
        source: CommandSource::Shortcut,
        user_id: UserId::new(payload.user_id),
        channel_id: non_empty(payload.channel_id).map(ChannelId::new),
        trigger_id: non_empty(Some(payload.trigger_id)),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
}

pub struct CommandRouter<S: ?Sized> {
    service: Arc<S>,
}

impl<S> CommandRouter<S>
where
    S: KudosCommandService + ?Sized,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    pub async fn route(&self, envelope: CommandEnvelope) -> Result<(), CommandRouteError> {
        match envelope.command {
            KudosCommand::OpenGrantDialog => self.service.open_grant_dialog(&envelope).await,
            KudosCommand::Leaderboard => self.service.show_leaderboard(&envelope).await,
            KudosCommand::MyStats => self.service.show_stats(&envelope).await,
        }
    }

    pub async fn submit(&self, submission: GrantSubmission) -> Result<GrantOutcome, CommandRouteError> {
        self.service.submit_grants(submission).await
    }
}

#[async_trait]
pub trait KudosCommandService: Send + Sync {
    async fn open_grant_dialog(&self, envelope: &CommandEnvelope) -> Result<(), CommandRouteError>;

    async fn show_leaderboard(&self, envelope: &CommandEnvelope) -> Result<(), CommandRouteError>;

    async fn show_stats(&self, envelope: &CommandEnvelope) -> Result<(), CommandRouteError>;

    async fn submit_grants(
        &self,
        submission: GrantSubmission,
    ) -> Result<GrantOutcome, CommandRouteError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use kudos_core::domain::grant::{ChannelId, UserId};

    use super::{
        normalize_shortcut, normalize_slash_command, CommandEnvelope, CommandParseError,
        CommandRouteError, CommandRouter, CommandSource, GrantOutcome, GrantSubmission,
        KudosCommand, KudosCommandService, ShortcutPayload, SlashCommandPayload,
    };

    fn slash(command: &str, channel_id: Option<&str>) -> SlashCommandPayload {
        SlashCommandPayload {
            command: command.to_owned(),
            text: String::new(),
            channel_id: channel_id.map(str::to_owned),
            user_id: "U1".to_owned(),
            trigger_id: "trigger-1".to_owned(),
        }
    }

    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl KudosCommandService for RecordingService {
        async fn open_grant_dialog(
            &self,
            _envelope: &CommandEnvelope,
        ) -> Result<(), CommandRouteError> {
            self.calls.lock().await.push("dialog");
            Ok(())
        }

        async fn show_leaderboard(
            &self,
            _envelope: &CommandEnvelope,
        ) -> Result<(), CommandRouteError> {
            self.calls.lock().await.push("leaderboard");
            Ok(())
        }

        async fn show_stats(&self, _envelope: &CommandEnvelope) -> Result<(), CommandRouteError> {
            self.calls.lock().await.push("stats");
            Ok(())
        }

        async fn submit_grants(
            &self,
            submission: GrantSubmission,
        ) -> Result<GrantOutcome, CommandRouteError> {
            self.calls.lock().await.push("submit");
            Ok(GrantOutcome::Announced { recipients: submission.recipients })
        }
    }

    #[test]
    fn slash_commands_map_to_kudos_commands() {
        let cases = [
            ("/dar-kudos", KudosCommand::OpenGrantDialog),
            ("/leaderboard", KudosCommand::Leaderboard),
            ("/mis-kudos", KudosCommand::MyStats),
        ];

        for (command, expected) in cases {
            let envelope = normalize_slash_command(slash(command, Some("C1"))).expect("normalize");
            assert_eq!(envelope.command, expected, "{command}");
            assert_eq!(envelope.source, CommandSource::SlashCommand);
            assert_eq!(envelope.channel_id, Some(ChannelId::new("C1")));
            assert_eq!(envelope.trigger_id.as_deref(), Some("trigger-1"));
        }
    }

    #[test]
    fn unknown_slash_command_is_rejected() {
        let error = normalize_slash_command(slash("/quote", Some("C1"))).expect_err("reject");
        assert_eq!(error, CommandParseError::UnsupportedCommand("/quote".to_owned()));
    }

    #[test]
    fn global_shortcut_replies_in_direct_message() {
        let envelope = normalize_shortcut(ShortcutPayload {
            callback_id: "mis-kudos".to_owned(),
            user_id: "U7".to_owned(),
            channel_id: None,
            trigger_id: "trigger-2".to_owned(),
        })
        .expect("normalize");

        assert_eq!(envelope.command, KudosCommand::MyStats);
        assert_eq!(envelope.channel_id, None);
        assert_eq!(envelope.reply_channel(), "U7");
    }

    #[test]
    fn blank_channel_counts_as_absent() {
        let envelope = normalize_slash_command(slash("/leaderboard", Some("  "))).expect("normalize");
        assert_eq!(envelope.channel_id, None);
        assert_eq!(envelope.reply_channel(), UserId::new("U1").to_string());
    }

    #[test]
    fn unknown_shortcut_is_rejected() {
        let error = normalize_shortcut(ShortcutPayload {
            callback_id: "other".to_owned(),
            user_id: "U7".to_owned(),
            channel_id: None,
            trigger_id: String::new(),
        })
        .expect_err("reject");
        assert_eq!(error, CommandParseError::UnsupportedShortcut("other".to_owned()));
    }

    #[tokio::test]
    async fn router_dispatches_each_command_to_its_service_method() {
        let service = Arc::new(RecordingService::default());
        let router = CommandRouter::new(service.clone());

        for command in ["/dar-kudos", "/leaderboard", "/mis-kudos"] {
            let envelope = normalize_slash_command(slash(command, None)).expect("normalize");
            router.route(envelope).await.expect("route");
        }
        let outcome = router
            .submit(GrantSubmission {
                grantor: UserId::new("U1"),
                recipients: vec![UserId::new("U2")],
                reason: "thanks".to_owned(),
            })
            .await
            .expect("submit");

        assert_eq!(*service.calls.lock().await, vec!["dialog", "leaderboard", "stats", "submit"]);
        assert_eq!(outcome, GrantOutcome::Announced { recipients: vec![UserId::new("U2")] });
    }
}
