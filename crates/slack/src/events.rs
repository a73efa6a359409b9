use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use kudos_core::domain::grant::{ChannelId, UserId};

use crate::{
    blocks::{
        GRANT_MODAL_CALLBACK_ID, MESSAGE_ACTION_ID, MESSAGE_BLOCK_ID, MY_STATS_ACTION_ID,
        RECEIVERS_ACTION_ID, RECEIVERS_BLOCK_ID,
    },
    commands::{
        normalize_shortcut, normalize_slash_command, CommandEnvelope, CommandParseError,
        CommandRouteError, CommandRouter, CommandSource, GrantOutcome, GrantSubmission,
        KudosCommand, KudosCommandService, ShortcutPayload, SlashCommandPayload,
    },
};

/// One Socket Mode frame after decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketFrame {
    Hello,
    /// Slack is about to close the connection; the runner should reconnect.
    Disconnect { reason: String },
    Envelope(SlackEnvelope),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    Shortcut(ShortcutPayload),
    ViewSubmission(ViewSubmissionEvent),
    BlockAction(BlockActionEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::Shortcut(_) => SlackEventType::Shortcut,
            Self::ViewSubmission(_) => SlackEventType::ViewSubmission,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    Shortcut,
    ViewSubmission,
    BlockAction,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewSubmissionEvent {
    pub callback_id: String,
    pub user_id: String,
    pub selected_users: Vec<String>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub user_id: String,
    pub channel_id: Option<String>,
    pub action_id: String,
    pub value: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameParseError {
    #[error("socket frame is not valid JSON: {0}")]
    Json(String),
    #[error("socket frame is missing `{0}`")]
    MissingField(&'static str),
}

/// Decodes a Socket Mode text frame.
pub fn parse_socket_frame(raw: &str) -> Result<SocketFrame, FrameParseError> {
    let frame: Value =
        serde_json::from_str(raw).map_err(|error| FrameParseError::Json(error.to_string()))?;
    let frame_type = str_field(&frame, &["type"]).unwrap_or_default();

    match frame_type {
        "hello" => return Ok(SocketFrame::Hello),
        "disconnect" => {
            let reason = str_field(&frame, &["reason"]).unwrap_or("unspecified").to_owned();
            return Ok(SocketFrame::Disconnect { reason });
        }
        _ => {}
    }

    let envelope_id = str_field(&frame, &["envelope_id"])
        .ok_or(FrameParseError::MissingField("envelope_id"))?
        .to_owned();
    let payload = frame.get("payload").unwrap_or(&Value::Null);

    let event = match frame_type {
        "slash_commands" => parse_slash_command(payload)?,
        "interactive" => parse_interactive(payload)?,
        other => SlackEvent::Unsupported { event_type: other.to_owned() },
    };

    Ok(SocketFrame::Envelope(SlackEnvelope { envelope_id, event }))
}

fn parse_slash_command(payload: &Value) -> Result<SlackEvent, FrameParseError> {
    Ok(SlackEvent::SlashCommand(SlashCommandPayload {
        command: required(payload, &["command"], "payload.command")?,
        text: str_field(payload, &["text"]).unwrap_or_default().to_owned(),
        channel_id: str_field(payload, &["channel_id"]).map(str::to_owned),
        user_id: required(payload, &["user_id"], "payload.user_id")?,
        trigger_id: str_field(payload, &["trigger_id"]).unwrap_or_default().to_owned(),
    }))
}

fn parse_interactive(payload: &Value) -> Result<SlackEvent, FrameParseError> {
    let interaction_type = str_field(payload, &["type"]).unwrap_or_default();
    let user_id = || required(payload, &["user", "id"], "payload.user.id");

    let event = match interaction_type {
        "shortcut" | "message_action" => SlackEvent::Shortcut(ShortcutPayload {
            callback_id: required(payload, &["callback_id"], "payload.callback_id")?,
            user_id: user_id()?,
            channel_id: str_field(payload, &["channel", "id"]).map(str::to_owned),
            trigger_id: str_field(payload, &["trigger_id"]).unwrap_or_default().to_owned(),
        }),
        "view_submission" => {
            let values = payload
                .get("view")
                .and_then(|view| view.get("state"))
                .and_then(|state| state.get("values"))
                .unwrap_or(&Value::Null);
            let selected_users = values
                .get(RECEIVERS_BLOCK_ID)
                .and_then(|block| block.get(RECEIVERS_ACTION_ID))
                .and_then(|action| action.get("selected_users"))
                .and_then(Value::as_array)
                .map(|users| users.iter().filter_map(Value::as_str).map(str::to_owned).collect())
                .unwrap_or_default();
            let message = str_field(values, &[MESSAGE_BLOCK_ID, MESSAGE_ACTION_ID, "value"])
                .unwrap_or_default()
                .to_owned();

            SlackEvent::ViewSubmission(ViewSubmissionEvent {
                callback_id: required(payload, &["view", "callback_id"], "payload.view.callback_id")?,
                user_id: user_id()?,
                selected_users,
                message,
            })
        }
        "block_actions" => {
            let action = payload
                .get("actions")
                .and_then(Value::as_array)
                .and_then(|actions| actions.first())
                .ok_or(FrameParseError::MissingField("payload.actions"))?;

            SlackEvent::BlockAction(BlockActionEvent {
                user_id: user_id()?,
                channel_id: str_field(payload, &["channel", "id"]).map(str::to_owned),
                action_id: required(action, &["action_id"], "payload.actions[0].action_id")?,
                value: str_field(action, &["value"]).map(str::to_owned),
            })
        }
        other => SlackEvent::Unsupported { event_type: format!("interactive.{other}") },
    };

    Ok(event)
}

fn str_field<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter().try_fold(value, |current, key| current.get(key))?.as_str()
}

fn required(value: &Value, path: &[&str], name: &'static str) -> Result<String, FrameParseError> {
    str_field(value, path).map(str::to_owned).ok_or(FrameParseError::MissingField(name))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed,
    Submitted(GrantOutcome),
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error(transparent)]
    Route(#[from] CommandRouteError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher with every kudos surface routed to `service`.
pub fn kudos_dispatcher<S>(service: Arc<S>) -> EventDispatcher
where
    S: KudosCommandService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(service.clone()));
    dispatcher.register(ShortcutHandler::new(service.clone()));
    dispatcher.register(ViewSubmissionHandler::new(service.clone()));
    dispatcher.register(BlockActionHandler::new(service));
    dispatcher
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: KudosCommandService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: KudosCommandService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let normalized = normalize_slash_command(payload.clone())?;
        self.router.route(normalized).await?;
        Ok(HandlerResult::Processed)
    }
}

pub struct ShortcutHandler<S> {
    router: CommandRouter<S>,
}

impl<S> ShortcutHandler<S>
where
    S: KudosCommandService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for ShortcutHandler<S>
where
    S: KudosCommandService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::Shortcut
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::Shortcut(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let normalized = normalize_shortcut(payload.clone())?;
        self.router.route(normalized).await?;
        Ok(HandlerResult::Processed)
    }
}

pub struct ViewSubmissionHandler<S> {
    router: CommandRouter<S>,
}

impl<S> ViewSubmissionHandler<S>
where
    S: KudosCommandService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for ViewSubmissionHandler<S>
where
    S: KudosCommandService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::ViewSubmission
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::ViewSubmission(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.callback_id != GRANT_MODAL_CALLBACK_ID {
            debug!(
                correlation_id = %ctx.correlation_id,
                callback_id = %event.callback_id,
                "ignoring submission for unknown view"
            );
            return Ok(HandlerResult::Ignored);
        }

        let submission = GrantSubmission {
            grantor: UserId::new(event.user_id.clone()),
            recipients: event.selected_users.iter().cloned().map(UserId::new).collect(),
            reason: event.message.clone(),
        };
        let outcome = self.router.submit(submission).await?;
        Ok(HandlerResult::Submitted(outcome))
    }
}

pub struct BlockActionHandler<S> {
    router: CommandRouter<S>,
}

impl<S> BlockActionHandler<S>
where
    S: KudosCommandService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for BlockActionHandler<S>
where
    S: KudosCommandService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::BlockAction
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::BlockAction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.action_id != MY_STATS_ACTION_ID {
            debug!(
                correlation_id = %ctx.correlation_id,
                action_id = %event.action_id,
                "ignoring unknown block action"
            );
            return Ok(HandlerResult::Ignored);
        }

        let envelope = CommandEnvelope {
            command: KudosCommand::MyStats,
            source: CommandSource::Button,
            user_id: UserId::new(event.user_id.clone()),
            channel_id: event.channel_id.clone().map(ChannelId::new),
            trigger_id: None,
        };
        self.router.route(envelope).await?;
        Ok(HandlerResult::Processed)
    }
}
