//! Slack Events API webhook.
//!
//! Requests are verified ([`signature`]), handshakes answered and
//! everything else queued by the HTTP layer ([`server`]). The queue
//! consumer parses ([`event`]) and routes ([`dispatch`]) each event to
//! one of the built-in [`handlers`].

pub mod dispatch;
pub mod event;
pub mod handlers;
pub mod server;
pub mod signature;

pub use dispatch::{EventDispatcher, RoutedEvent, dispatch, route};
pub use event::{EventCallback, EventType, InboundEvent, ReactionItem};
pub use handlers::{EventHandlerFn, HandlerContext, HandlerOutcome, handler_for};
pub use server::{WebhookState, webhook_router};
pub use signature::{sign_slack_request, verify_slack_signature};
