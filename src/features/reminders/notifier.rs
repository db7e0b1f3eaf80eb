//! # Reminder Delivery
//!
//! Where reminders go and how they get there. The scheduler only sees the
//! [`Notifier`] and [`RecipientResolver`] traits; the Discord implementations
//! live here as well.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: DM fallback when no review channel is configured
//! - 1.0.0: Channel delivery with user mention

use crate::core::error::DeliveryError;
use async_trait::async_trait;
use log::debug;
use serenity::http::Http;
use serenity::model::id::{ChannelId, UserId};
use std::fmt;
use std::sync::Arc;

/// Destination of one reminder message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Post in a shared channel, optionally mentioning the owner
    Channel { channel_id: u64, mention: Option<u64> },
    /// Direct message to the owner
    Direct { user_id: u64 },
}

impl Recipient {
    /// Mention markup to greet the owner with, when the platform supports it
    pub fn mention(&self) -> Option<String> {
        match self {
            Recipient::Channel {
                mention: Some(user_id),
                ..
            }
            | Recipient::Direct { user_id } => Some(format!("<@{user_id}>")),
            Recipient::Channel { mention: None, .. } => None,
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Channel { channel_id, .. } => write!(f, "channel {channel_id}"),
            Recipient::Direct { user_id } => write!(f, "DM to {user_id}"),
        }
    }
}

/// Delivers a text message to a recipient
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &Recipient, text: &str) -> Result<(), DeliveryError>;
}

/// Maps an item owner to a reminder recipient. `None` means the owner is skipped.
pub trait RecipientResolver: Send + Sync {
    fn resolve(&self, owner: &str) -> Option<Recipient>;
}

impl<F> RecipientResolver for F
where
    F: Fn(&str) -> Option<Recipient> + Send + Sync,
{
    fn resolve(&self, owner: &str) -> Option<Recipient> {
        self(owner)
    }
}

/// Owners are Discord user ids. With a review channel configured the reminder
/// is posted there with a mention; otherwise it goes out as a DM.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscordRecipients {
    pub review_channel: Option<u64>,
}

impl DiscordRecipients {
    pub fn new(review_channel: Option<u64>) -> Self {
        Self { review_channel }
    }
}

impl RecipientResolver for DiscordRecipients {
    fn resolve(&self, owner: &str) -> Option<Recipient> {
        let user_id = owner.trim().parse::<u64>().ok().filter(|id| *id != 0)?;
        Some(match self.review_channel {
            Some(channel_id) => Recipient::Channel {
                channel_id,
                mention: Some(user_id),
            },
            None => Recipient::Direct { user_id },
        })
    }
}

/// Sends reminders through the Discord HTTP API
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, recipient: &Recipient, text: &str) -> Result<(), DeliveryError> {
        let http: &Http = &self.http;
        match recipient {
            Recipient::Channel { channel_id, .. } => {
                ChannelId(*channel_id).say(http, text).await?;
            }
            Recipient::Direct { user_id } => {
                let dm = UserId(*user_id).create_dm_channel(http).await?;
                dm.id.say(http, text).await?;
            }
        }
        debug!("Delivered {} byte reminder to {recipient}", text.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_recipient_with_mention() {
        let recipients = DiscordRecipients::new(Some(555));
        let recipient = recipients.resolve("1234").unwrap();
        assert_eq!(
            recipient,
            Recipient::Channel {
                channel_id: 555,
                mention: Some(1234)
            }
        );
        assert_eq!(recipient.mention().as_deref(), Some("<@1234>"));
    }

    #[test]
    fn test_dm_when_no_channel() {
        let recipients = DiscordRecipients::default();
        assert_eq!(
            recipients.resolve(" 42 "),
            Some(Recipient::Direct { user_id: 42 })
        );
    }

    #[test]
    fn test_unresolvable_owners() {
        let recipients = DiscordRecipients::new(Some(1));
        assert_eq!(recipients.resolve("alice"), None);
        assert_eq!(recipients.resolve(""), None);
        assert_eq!(recipients.resolve("0"), None);
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |owner: &str| {
            (owner == "u1").then_some(Recipient::Channel {
                channel_id: 9,
                mention: None,
            })
        };
        assert!(resolver.resolve("u1").is_some());
        assert!(resolver.resolve("u2").is_none());
        assert_eq!(resolver.resolve("u1").unwrap().mention(), None);
    }

    #[test]
    fn test_recipient_display() {
        assert_eq!(Recipient::Direct { user_id: 7 }.to_string(), "DM to 7");
        let channel = Recipient::Channel {
            channel_id: 8,
            mention: None,
        };
        assert_eq!(channel.to_string(), "channel 8");
    }
}
