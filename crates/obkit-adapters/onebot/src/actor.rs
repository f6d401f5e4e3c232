//! Chat actors and the capabilities built on them.
//!
//! - [`SendSupport`] - sends through the interception pipeline
//! - [`ReplySupport`] - answers an event in the chat it came from
//! - [`DeleteSupport`] - recalls a sent or received message
//!
//! ```rust,ignore
//! use obkit_adapter_onebot::{DeleteSupport, OneBotEvent, ReplySupport, SendSupport};
//!
//! dispatcher.listen_to::<OneBotEvent, _, _>(|event| async move {
//!     let event = event.downcast_ref::<OneBotEvent>().unwrap();
//!     if event.plain_text() == "ping" {
//!         let receipt = event.reply("pong").await?;
//!         receipt.delete().await?;
//!     }
//!     Ok(())
//! });
//!
//! bot.group(123456).member(654321).send("hi").await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::api::actions;
use crate::bot::OneBotBot;
use crate::error::{BotError, BotResult};
use crate::event::{OneBotEvent, OneBotEventKind};
use crate::interaction::{self, InteractionMessage, SendReceipt, SendTarget};

// ============================================================================
// Capabilities
// ============================================================================

/// Anything messages can be sent to.
#[async_trait]
pub trait SendSupport: Send + Sync {
    fn bot(&self) -> &OneBotBot;

    fn send_target(&self) -> SendTarget;

    /// Sends `message` through the interception pipeline.
    async fn send<M>(&self, message: M) -> BotResult<Arc<SendReceipt>>
    where
        M: Into<InteractionMessage> + Send,
    {
        interaction::send(self.bot(), self.send_target(), message.into()).await
    }
}

/// Events that can be answered in their origin chat.
#[async_trait]
pub trait ReplySupport: Send + Sync {
    /// Sends `message` to the chat the event came from.
    async fn reply<M>(&self, message: M) -> BotResult<Arc<SendReceipt>>
    where
        M: Into<InteractionMessage> + Send;
}

/// Messages that can be recalled.
#[async_trait]
pub trait DeleteSupport: Send + Sync {
    async fn delete(&self) -> BotResult<()>;
}

async fn delete_message(bot: &OneBotBot, message_id: i64) -> BotResult<()> {
    let action = actions::delete_msg(message_id);
    bot.execute_result(&action)
        .await?
        .ensure_success(action.name())?;
    debug!(bot_id = %bot.id(), message_id, "Message deleted");
    Ok(())
}

#[async_trait]
impl DeleteSupport for SendReceipt {
    async fn delete(&self) -> BotResult<()> {
        delete_message(self.bot(), self.message_id()).await
    }
}

// ============================================================================
// Events
// ============================================================================

impl OneBotEvent {
    /// Chat a reply to this event goes to.
    pub fn reply_target(&self) -> Option<SendTarget> {
        match self.kind() {
            OneBotEventKind::NormalGroupMessage(e)
            | OneBotEventKind::AnonymousGroupMessage(e)
            | OneBotEventKind::NoticeGroupMessage(e)
            | OneBotEventKind::DefaultGroupMessage(e) => Some(SendTarget::Group {
                group_id: e.group_id,
            }),
            OneBotEventKind::GroupPrivateMessage(e) => Some(match e.group_id {
                Some(group_id) => SendTarget::Member {
                    group_id,
                    user_id: e.user_id,
                },
                None => SendTarget::Friend { user_id: e.user_id },
            }),
            OneBotEventKind::FriendMessage(e) | OneBotEventKind::DefaultPrivateMessage(e) => {
                Some(SendTarget::Friend { user_id: e.user_id })
            }
            _ => None,
        }
    }
}

#[async_trait]
impl ReplySupport for OneBotEvent {
    async fn reply<M>(&self, message: M) -> BotResult<Arc<SendReceipt>>
    where
        M: Into<InteractionMessage> + Send,
    {
        let target = self.reply_target().ok_or(BotError::NotReplyable {
            event: self.kind().name(),
        })?;
        interaction::send(self.bot(), target, message.into()).await
    }
}

#[async_trait]
impl DeleteSupport for OneBotEvent {
    async fn delete(&self) -> BotResult<()> {
        let message_id = self.message_id().ok_or(BotError::NotAMessage {
            event: self.kind().name(),
        })?;
        delete_message(self.bot(), message_id).await
    }
}

// ============================================================================
// Actors
// ============================================================================

#[derive(Debug, Clone)]
pub struct OneBotFriend {
    bot: OneBotBot,
    user_id: i64,
}

impl OneBotFriend {
    pub(crate) fn new(bot: OneBotBot, user_id: i64) -> Self {
        Self { bot, user_id }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }
}

impl SendSupport for OneBotFriend {
    fn bot(&self) -> &OneBotBot {
        &self.bot
    }

    fn send_target(&self) -> SendTarget {
        SendTarget::Friend {
            user_id: self.user_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OneBotGroup {
    bot: OneBotBot,
    group_id: i64,
}

impl OneBotGroup {
    pub(crate) fn new(bot: OneBotBot, group_id: i64) -> Self {
        Self { bot, group_id }
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    pub fn member(&self, user_id: i64) -> OneBotMember {
        OneBotMember::new(self.bot.clone(), self.group_id, user_id)
    }
}

impl SendSupport for OneBotGroup {
    fn bot(&self) -> &OneBotBot {
        &self.bot
    }

    fn send_target(&self) -> SendTarget {
        SendTarget::Group {
            group_id: self.group_id,
        }
    }
}

/// A group member, messaged through a temporary session.
#[derive(Debug, Clone)]
pub struct OneBotMember {
    bot: OneBotBot,
    group_id: i64,
    user_id: i64,
}

impl OneBotMember {
    pub(crate) fn new(bot: OneBotBot, group_id: i64, user_id: i64) -> Self {
        Self {
            bot,
            group_id,
            user_id,
        }
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }
}

impl SendSupport for OneBotMember {
    fn bot(&self) -> &OneBotBot {
        &self.bot
    }

    fn send_target(&self) -> SendTarget {
        SendTarget::Member {
            group_id: self.group_id,
            user_id: self.user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use obkit_core::EventDispatcher;
    use serde_json::{Value, json};

    use super::*;
    use crate::testing::{MockHttpClient, test_bot_with};

    const SENT: &str = r#"{"retcode":0,"status":"ok","data":{"message_id":99}}"#;
    const DELETED: &str = r#"{"retcode":0,"status":"ok","data":null}"#;

    fn setup() -> (OneBotBot, Arc<MockHttpClient>) {
        let http = MockHttpClient::new();
        let bot = test_bot_with(http.clone(), Arc::new(EventDispatcher::new())).build();
        (bot, http)
    }

    fn resolve(bot: &OneBotBot, payload: Value) -> OneBotEvent {
        let event = bot
            .resolver()
            .resolve(bot, &payload.to_string())
            .unwrap();
        event.downcast_ref::<OneBotEvent>().unwrap().clone()
    }

    fn last_body(http: &MockHttpClient) -> Value {
        let request = http.requests().pop().unwrap();
        serde_json::from_str(request.json_body.as_deref().unwrap()).unwrap()
    }

    fn private_message(sub_type: &str, group_id: Option<i64>) -> Value {
        let mut payload = json!({
            "time": 1, "self_id": 10, "post_type": "message", "message_type": "private",
            "sub_type": sub_type, "message_id": 7, "user_id": 20,
            "message": [{"type": "text", "data": {"text": "hi"}}]
        });
        if let Some(group_id) = group_id {
            payload["group_id"] = json!(group_id);
        }
        payload
    }

    #[tokio::test]
    async fn test_actor_targets() {
        let (bot, http) = setup();
        http.respond(200, SENT);
        http.respond(200, SENT);
        http.respond(200, SENT);

        bot.friend(20).send("a").await.unwrap();
        assert_eq!(
            last_body(&http),
            json!({"user_id": 20, "message": "a", "auto_escape": true})
        );

        bot.group(100).send("b").await.unwrap();
        assert_eq!(
            last_body(&http),
            json!({"group_id": 100, "message": "b", "auto_escape": true})
        );

        let receipt = bot.group(100).member(20).send("c").await.unwrap();
        assert_eq!(
            receipt.target(),
            SendTarget::Member {
                group_id: 100,
                user_id: 20
            }
        );
        assert_eq!(http.requests_to("send_private_msg").len(), 2);
    }

    #[tokio::test]
    async fn test_reply_targets_origin_chat() {
        let (bot, _) = setup();

        let group = resolve(
            &bot,
            json!({
                "time": 1, "self_id": 10, "post_type": "message", "message_type": "group",
                "sub_type": "normal", "message_id": 5, "group_id": 100, "user_id": 20,
                "message": []
            }),
        );
        assert_eq!(
            group.reply_target(),
            Some(SendTarget::Group { group_id: 100 })
        );

        let friend = resolve(&bot, private_message("friend", None));
        assert_eq!(
            friend.reply_target(),
            Some(SendTarget::Friend { user_id: 20 })
        );

        let temp = resolve(&bot, private_message("group", Some(100)));
        assert_eq!(
            temp.reply_target(),
            Some(SendTarget::Member {
                group_id: 100,
                user_id: 20
            })
        );

        let temp_without_group = resolve(&bot, private_message("group", None));
        assert_eq!(
            temp_without_group.reply_target(),
            Some(SendTarget::Friend { user_id: 20 })
        );
    }

    #[tokio::test]
    async fn test_reply_sends_to_friend() {
        let (bot, http) = setup();
        http.respond(200, SENT);

        let event = resolve(&bot, private_message("friend", None));
        let receipt = event.reply("pong").await.unwrap();

        assert_eq!(receipt.message_id(), 99);
        assert_eq!(
            last_body(&http),
            json!({"user_id": 20, "message": "pong", "auto_escape": true})
        );
    }

    #[tokio::test]
    async fn test_non_message_events_cannot_be_replied_or_deleted() {
        let (bot, http) = setup();
        let event = resolve(
            &bot,
            json!({
                "time": 1, "self_id": 10, "post_type": "meta_event",
                "meta_event_type": "heartbeat", "interval": 5000,
                "status": {"online": true, "good": true}
            }),
        );

        assert!(matches!(
            event.reply("x").await,
            Err(BotError::NotReplyable {
                event: "onebot.meta_event.heartbeat"
            })
        ));
        assert!(matches!(
            event.delete().await,
            Err(BotError::NotAMessage { .. })
        ));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_delete_receipt_and_event() {
        let (bot, http) = setup();
        http.respond(200, SENT);
        http.respond(200, DELETED);
        http.respond(200, DELETED);

        let receipt = bot.group(100).send("x").await.unwrap();
        receipt.delete().await.unwrap();
        assert_eq!(last_body(&http), json!({"message_id": 99}));

        let event = resolve(&bot, private_message("friend", None));
        event.delete().await.unwrap();
        assert_eq!(last_body(&http), json!({"message_id": 7}));
    }

    #[tokio::test]
    async fn test_delete_failure_is_reported() {
        let (bot, http) = setup();
        http.respond(
            200,
            r#"{"retcode":100,"status":"failed","data":null,"message":"no such message"}"#,
        );

        let event = resolve(&bot, private_message("friend", None));
        assert!(matches!(event.delete().await, Err(BotError::Api(_))));
    }
}
