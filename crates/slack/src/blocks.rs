use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use kudos_core::domain::grant::UserId;
use kudos_core::ledger::{LeaderboardEntry, StatsView};

pub const GRANT_MODAL_CALLBACK_ID: &str = "kudos_modal_submission";
pub const RECEIVERS_BLOCK_ID: &str = "receivers";
pub const RECEIVERS_ACTION_ID: &str = "id";
pub const MESSAGE_BLOCK_ID: &str = "custom";
pub const MESSAGE_ACTION_ID: &str = "message";
pub const MY_STATS_ACTION_ID: &str = "mis_stats";

const PODIUM_MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];
const HISTORY_EMOJIS: [&str; 6] = ["🚀", "🔥", "🤝", "💎", "🎯", "🌟"];
// Slack rejects section blocks with more than ten fields.
const MAX_SECTION_FIELDS: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String, emoji: bool },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into(), emoji: true }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text, .. } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "button")]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { action_id: action_id.into(), text: TextObject::plain(label), style: None, value: None }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "image")]
pub struct ImageElement {
    pub image_url: String,
    pub alt_text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputElement {
    MultiUsersSelect { action_id: String, placeholder: TextObject },
    PlainTextInput { action_id: String, multiline: bool },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        block_id: String,
        text: TextObject,
    },
    Section {
        block_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<TextObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<ImageElement>,
    },
    Divider {
        block_id: String,
    },
    Actions {
        block_id: String,
        elements: Vec<ButtonElement>,
    },
    Context {
        block_id: String,
        elements: Vec<TextObject>,
    },
    Input {
        block_id: String,
        label: TextObject,
        element: InputElement,
    },
}

/// A message ready for `chat.postMessage`/`chat.postEphemeral`. Messages without blocks are sent
/// as plain text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

impl MessageTemplate {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self { fallback_text: text.into(), blocks: Vec::new() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "modal")]
pub struct ModalView {
    pub callback_id: String,
    pub title: TextObject,
    pub submit: TextObject,
    pub close: TextObject,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn header(mut self, block_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Header { block_id: block_id.into(), text: TextObject::plain(text) });
        self
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(builder.build(block_id.into()));
        self
    }

    pub fn divider(mut self, block_id: impl Into<String>) -> Self {
        self.blocks.push(Block::Divider { block_id: block_id.into() });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
    fields: Vec<TextObject>,
    accessory: Option<ImageElement>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    pub fn field(&mut self, text: impl Into<String>) -> &mut Self {
        self.fields.push(TextObject::mrkdwn(text));
        self
    }

    pub fn image(&mut self, image_url: impl Into<String>, alt_text: impl Into<String>) -> &mut Self {
        self.accessory =
            Some(ImageElement { image_url: image_url.into(), alt_text: alt_text.into() });
        self
    }

    fn build(self, block_id: String) -> Block {
        let text = if self.text.is_none() && self.fields.is_empty() {
            Some(TextObject::plain(""))
        } else {
            self.text
        };
        Block::Section { block_id, text, fields: self.fields, accessory: self.accessory }
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// Display name and avatar shown next to a podium rank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodiumProfile {
    pub display_name: String,
    pub avatar_url: String,
}

pub fn grant_modal() -> ModalView {
    ModalView {
        callback_id: GRANT_MODAL_CALLBACK_ID.to_owned(),
        title: TextObject::plain("KudosBot"),
        submit: TextObject::plain("Send"),
        close: TextObject::plain("Cancel"),
        blocks: vec![
            Block::Section {
                block_id: "kudos.modal.intro.v1".to_owned(),
                text: Some(TextObject::mrkdwn("Let's recognize some great work! ⭐")),
                fields: Vec::new(),
                accessory: None,
            },
            Block::Input {
                block_id: RECEIVERS_BLOCK_ID.to_owned(),
                label: TextObject::plain("Who are you thanking? 👥"),
                element: InputElement::MultiUsersSelect {
                    action_id: RECEIVERS_ACTION_ID.to_owned(),
                    placeholder: TextObject::plain("Pick teammates"),
                },
            },
            Block::Input {
                block_id: MESSAGE_BLOCK_ID.to_owned(),
                label: TextObject::plain("Your thank-you message 🖊️"),
                element: InputElement::PlainTextInput {
                    action_id: MESSAGE_ACTION_ID.to_owned(),
                    multiline: true,
                },
            },
        ],
    }
}

/// Channel announcement for one dialog submission, naming every recorded recipient.
pub fn grant_announcement(grantor: &UserId, recipients: &[UserId], reason: &str) -> MessageTemplate {
    let mentions = recipients.iter().map(UserId::mention).collect::<Vec<_>>().join(", ");

    MessageBuilder::new("New kudos!")
        .section("kudos.announcement.recipients.v1", |section| {
            section.field(format!("🏅 *{mentions}*")).field("*+1*");
        })
        .section("kudos.announcement.reason.v1", |section| {
            section.mrkdwn(format!(" {} _{reason}_", grantor.mention()));
        })
        .build()
}

pub fn empty_leaderboard_message() -> MessageTemplate {
    MessageTemplate::text_only("No kudos yet. Be the first to give some! 🚀")
}

pub fn notice_message(text: impl Into<String>) -> MessageTemplate {
    MessageTemplate::text_only(text)
}

/// Top of the all-time ranking. The first three entries get a medal and avatar; the rest are
/// listed as compact rank/count pairs.
#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardCard {
    month_label: String,
    entries: Vec<LeaderboardEntry>,
    podium: Vec<PodiumProfile>,
}

impl LeaderboardCard {
    /// `podium` holds the profiles of the leading entries, in rank order.
    pub fn new(
        month_label: impl Into<String>,
        entries: Vec<LeaderboardEntry>,
        podium: Vec<PodiumProfile>,
    ) -> Self {
        Self { month_label: month_label.into(), entries, podium }
    }

    pub fn render(&self) -> MessageTemplate {
        let mut builder = MessageBuilder::new("Leaderboard")
            .header("kudos.leaderboard.header.v1", "🏆 Leaderboard")
            .context("kudos.leaderboard.period.v1", |context| {
                context.mrkdwn(format!("Global · *{}*", self.month_label));
            })
            .divider("kudos.leaderboard.divider.top.v1");

        for ((entry, profile), medal) in
            self.entries.iter().zip(self.podium.iter()).zip(PODIUM_MEDALS)
        {
            builder = builder.section(format!("kudos.leaderboard.podium.{}.v1", entry.rank), |section| {
                section
                    .mrkdwn(format!(
                        "{medal} *{}. {}*\n{} Kudos",
                        entry.rank, profile.display_name, entry.received
                    ))
                    .image(profile.avatar_url.clone(), "avatar");
            });
        }

        let podium_len = self.podium.len().min(PODIUM_MEDALS.len());
        let runners_up = self.entries.get(podium_len..).unwrap_or_default();
        if !runners_up.is_empty() {
            builder = builder.divider("kudos.leaderboard.divider.rest.v1");
            for (index, chunk) in runners_up.chunks(MAX_SECTION_FIELDS / 2).enumerate() {
                builder = builder.section(format!("kudos.leaderboard.rest.{}.v1", index + 1), |section| {
                    for entry in chunk {
                        section
                            .field(format!("*{}.* {}", entry.rank, entry.user_id.mention()))
                            .field(format!("{} Kudos", entry.received));
                    }
                });
            }
        }

        builder
            .divider("kudos.leaderboard.divider.actions.v1")
            .actions("kudos.leaderboard.actions.v1", |actions| {
                actions.button(
                    ButtonElement::new(MY_STATS_ACTION_ID, "My stats")
                        .style(ButtonStyle::Primary)
                        .value(MY_STATS_ACTION_ID),
                );
            })
            .build()
    }
}

pub struct StatsCard<'a> {
    view: &'a StatsView,
}

impl<'a> StatsCard<'a> {
    pub fn new(view: &'a StatsView) -> Self {
        Self { view }
    }

    /// Each history line gets a celebration emoji drawn from `rng`.
    pub fn render<R: Rng + ?Sized>(&self, rng: &mut R) -> MessageTemplate {
        let view = self.view;
        let history = view
            .recent_received
            .iter()
            .map(|grant| {
                let emoji = HISTORY_EMOJIS.choose(rng).copied().unwrap_or("🌟");
                format!(
                    "{emoji} *+1 kudos* {} from {} in {} on {}",
                    grant.reason,
                    grant.from.mention(),
                    grant.channel_id.mention(),
                    grant.date_label
                )
            })
            .collect::<Vec<_>>();

        let builder = MessageBuilder::new("Your stats")
            .header("kudos.stats.header.v1", "📊 Personal Stats")
            .context("kudos.stats.period.v1", |context| {
                context.mrkdwn(format!("📅 *{}*", view.month_label));
            })
            .divider("kudos.stats.divider.summary.v1")
            .section("kudos.stats.summary.v1", |section| {
                section
                    .field(format!("*Received:*\n{}", view.received_total))
                    .field(format!("*Granted:*\n{}", view.granted_this_month))
                    .field(format!("*Available:*\n{}", view.available))
                    .field(format!("*Limit:*\n{}/month", view.monthly_limit));
            })
            .divider("kudos.stats.divider.history.v1")
            .section("kudos.stats.history.title.v1", |section| {
                section.mrkdwn("*Recent History*");
            });

        if history.is_empty() {
            builder
                .context("kudos.stats.history.empty.v1", |context| {
                    context.mrkdwn("You haven't received any kudos recently.");
                })
                .build()
        } else {
            builder
                .section("kudos.stats.history.v1", |section| {
                    section.mrkdwn(history.join("\n\n"));
                })
                .build()
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    use kudos_core::domain::grant::{ChannelId, UserId};
    use kudos_core::ledger::{LeaderboardEntry, RecentGrant, StatsView};

    use super::{
        grant_announcement, grant_modal, Block, ButtonStyle, LeaderboardCard, MessageBuilder,
        PodiumProfile, StatsCard, TextObject, HISTORY_EMOJIS,
    };

    fn entry(rank: usize, user: &str, received: u64) -> LeaderboardEntry {
        LeaderboardEntry { rank, user_id: UserId::new(user), received }
    }

    fn profile(name: &str) -> PodiumProfile {
        PodiumProfile {
            display_name: name.to_owned(),
            avatar_url: format!("https://avatars.example/{name}.png"),
        }
    }

    fn stats_view(recent: Vec<RecentGrant>) -> StatsView {
        StatsView {
            user_id: UserId::new("U1"),
            month_label: "October 2026".to_owned(),
            received_total: 7,
            granted_this_month: 3,
            available: 37,
            monthly_limit: 40,
            recent_received: recent,
        }
    }

    fn section_text(block: &Block) -> Option<&str> {
        match block {
            Block::Section { text: Some(text), .. } => Some(text.text()),
            _ => None,
        }
    }

    #[test]
    fn message_builder_creates_typed_block_structure() {
        let message = MessageBuilder::new("fallback")
            .header("kudos.test.header.v1", "Title")
            .section("kudos.test.fields.v1", |section| {
                section.field("*A*").field("*B*");
            })
            .build();

        assert_eq!(message.blocks.len(), 2);
        assert!(matches!(
            &message.blocks[1],
            Block::Section { block_id, text: None, fields, .. }
                if block_id == "kudos.test.fields.v1" && fields.len() == 2
        ));
    }

    #[test]
    fn blocks_serialize_to_block_kit_json() {
        let message = MessageBuilder::new("fallback")
            .section("kudos.test.podium.v1", |section| {
                section.mrkdwn("*1. Ada*").image("https://img.example/ada.png", "avatar");
            })
            .divider("kudos.test.divider.v1")
            .build();

        let value = serde_json::to_value(&message.blocks).expect("serialize blocks");
        assert_eq!(
            value,
            json!([
                {
                    "type": "section",
                    "block_id": "kudos.test.podium.v1",
                    "text": { "type": "mrkdwn", "text": "*1. Ada*" },
                    "accessory": {
                        "type": "image",
                        "image_url": "https://img.example/ada.png",
                        "alt_text": "avatar"
                    }
                },
                { "type": "divider", "block_id": "kudos.test.divider.v1" }
            ])
        );
    }

    #[test]
    fn grant_modal_uses_submission_wire_ids() {
        let value = serde_json::to_value(grant_modal()).expect("serialize modal");

        assert_eq!(value["type"], "modal");
        assert_eq!(value["callback_id"], "kudos_modal_submission");
        assert_eq!(value["blocks"][1]["block_id"], "receivers");
        assert_eq!(value["blocks"][1]["element"]["type"], "multi_users_select");
        assert_eq!(value["blocks"][1]["element"]["action_id"], "id");
        assert_eq!(value["blocks"][2]["block_id"], "custom");
        assert_eq!(value["blocks"][2]["element"]["type"], "plain_text_input");
        assert_eq!(value["blocks"][2]["element"]["action_id"], "message");
        assert_eq!(value["blocks"][2]["element"]["multiline"], true);
    }

    #[test]
    fn announcement_names_all_recipients_once() {
        let message = grant_announcement(
            &UserId::new("UA"),
            &[UserId::new("UB"), UserId::new("UC")],
            "shipped the migration",
        );

        assert!(matches!(
            &message.blocks[0],
            Block::Section { fields, .. }
                if fields.first().map(TextObject::text) == Some("🏅 *<@UB>, <@UC>*")
        ));
        assert_eq!(section_text(&message.blocks[1]), Some(" <@UA> _shipped the migration_"));
    }

    #[test]
    fn leaderboard_renders_podium_rest_and_stats_button() {
        let entries = (1..=10).map(|rank| entry(rank, &format!("U{rank}"), 20 - rank as u64)).collect();
        let card = LeaderboardCard::new(
            "October 2026",
            entries,
            vec![profile("Ada"), profile("Grace"), profile("Linus")],
        );

        let message = card.render();

        assert_eq!(
            section_text(&message.blocks[3]),
            Some("🥇 *1. Ada*\n19 Kudos"),
        );
        assert!(matches!(
            &message.blocks[5],
            Block::Section { accessory: Some(image), .. }
                if image.image_url == "https://avatars.example/Linus.png"
        ));

        let rest_fields: Vec<&str> = message
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Section { block_id, fields, .. }
                    if block_id.starts_with("kudos.leaderboard.rest.") =>
                {
                    Some(fields)
                }
                _ => None,
            })
            .inspect(|fields| assert!(fields.len() <= 10))
            .flatten()
            .map(TextObject::text)
            .collect();
        assert_eq!(rest_fields.len(), 14);
        assert_eq!(rest_fields[0], "*4.* <@U4>");
        assert_eq!(rest_fields[13], "10 Kudos");

        let Some(Block::Actions { elements, .. }) = message.blocks.last() else {
            panic!("expected trailing actions block");
        };
        assert_eq!(elements[0].action_id, "mis_stats");
        assert_eq!(elements[0].style, Some(ButtonStyle::Primary));
    }

    #[test]
    fn short_leaderboard_has_no_runner_up_section() {
        let card = LeaderboardCard::new(
            "October 2026",
            vec![entry(1, "U1", 3), entry(2, "U2", 1)],
            vec![profile("Ada"), profile("Grace")],
        );

        let message = card.render();

        assert!(!message.blocks.iter().any(|block| matches!(
            block,
            Block::Section { block_id, .. } if block_id.starts_with("kudos.leaderboard.rest.")
        )));
        assert_eq!(section_text(&message.blocks[4]), Some("🥈 *2. Grace*\n1 Kudos"));
    }

    #[test]
    fn stats_card_lists_counters_and_history() {
        let view = stats_view(vec![RecentGrant {
            from: UserId::new("U9"),
            channel_id: ChannelId::new("C-KUDOS"),
            reason: "great demo".to_owned(),
            ts: 1_792_000_000.0,
            date_label: "October 15".to_owned(),
        }]);

        let message = StatsCard::new(&view).render(&mut StdRng::seed_from_u64(7));

        let Block::Section { fields, .. } = &message.blocks[3] else {
            panic!("expected summary fields");
        };
        let fields: Vec<&str> = fields.iter().map(TextObject::text).collect();
        assert_eq!(
            fields,
            vec!["*Received:*\n7", "*Granted:*\n3", "*Available:*\n37", "*Limit:*\n40/month"]
        );

        let history = message.blocks.last().and_then(section_text).expect("history section");
        let (emoji, line) = history.split_once(' ').expect("emoji prefix");
        assert!(HISTORY_EMOJIS.contains(&emoji));
        assert_eq!(line, "*+1 kudos* great demo from <@U9> in <#C-KUDOS> on October 15");
    }

    #[test]
    fn stats_card_without_history_shows_empty_context() {
        let view = stats_view(Vec::new());

        let message = StatsCard::new(&view).render(&mut StdRng::seed_from_u64(1));

        assert!(matches!(
            message.blocks.last(),
            Some(Block::Context { block_id, .. }) if block_id == "kudos.stats.history.empty.v1"
        ));
    }
}
