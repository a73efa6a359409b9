//! Slack integration for the kudos bot, over Socket Mode.
//!
//! - **Socket Mode** (`socket`): websocket session with Slack, acks, reconnection.
//! - **Events** (`events`): frame decoding and the per-event-type dispatcher.
//! - **Commands** (`commands`): `/dar-kudos`, `/leaderboard`, `/mis-kudos` and their shortcuts.
//! - **Block Kit** (`blocks`): the grant modal, leaderboard and stats cards, announcements.
//! - **Web API** (`web_api`): the handful of Slack methods the bot calls.
//! - **Service** (`service`): kudos behaviour wired to the ledger and the Web API.
//!
//! ```text
//! Socket Mode frame -> EventDispatcher -> handler -> KudosService -> ledger / views
//!                                                          |
//!                                            Web API <- Block Kit message
//! ```

pub mod blocks;
pub mod commands;
pub mod events;
pub mod service;
pub mod socket;
pub mod web_api;

pub use events::kudos_dispatcher;
pub use service::KudosService;
pub use socket::{ReconnectPolicy, SocketModeRunner, WebSocketTransport};
pub use web_api::{ReqwestSlackWebApi, SlackWebApi};
