use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use uuid::Uuid;

use obkit_core::{Event, EventType};

use crate::bot::OneBotBot;
use crate::error::{BotError, BotResult};
use crate::event::PLATFORM;
use crate::interaction::{InteractionMessage, SendReceipt, SendTarget};

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

// ============================================================================
// Pre-send
// ============================================================================

/// Pushed before a message is sent.
///
/// Listeners run in registration order and may replace the message with
/// [`set_current_message`](Self::set_current_message) until it is consumed
/// by the send. Any listener error cancels the send.
///
/// ```rust,ignore
/// dispatcher.listen_to::<MessagePreSendEvent, _, _>(|event| async move {
///     let event = event.downcast_ref::<MessagePreSendEvent>().unwrap();
///     if let Some(text) = event.current_message().as_text() {
///         event.set_current_message(format!("[bot] {text}"))?;
///     }
///     Ok(())
/// });
/// ```
pub struct MessagePreSendEvent {
    id: Uuid,
    time: i64,
    bot: OneBotBot,
    target: SendTarget,
    original: InteractionMessage,
    current: Mutex<InteractionMessage>,
    consumed: AtomicBool,
}

impl MessagePreSendEvent {
    pub(crate) fn new(bot: OneBotBot, target: SendTarget, message: InteractionMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            time: now_secs(),
            bot,
            target,
            current: Mutex::new(message.clone()),
            original: message,
            consumed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn bot(&self) -> &OneBotBot {
        &self.bot
    }

    pub fn target(&self) -> SendTarget {
        self.target
    }

    /// The message passed to the send call.
    pub fn original_message(&self) -> &InteractionMessage {
        &self.original
    }

    pub fn current_message(&self) -> InteractionMessage {
        self.current.lock().clone()
    }

    /// Replaces the message to send.
    ///
    /// Fails with [`BotError::MessageConsumed`] once the send took it.
    pub fn set_current_message(&self, message: impl Into<InteractionMessage>) -> BotResult<()> {
        let mut current = self.current.lock();
        if self.consumed.load(Ordering::Acquire) {
            return Err(BotError::MessageConsumed);
        }
        *current = message.into();
        Ok(())
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }

    /// Marks the message consumed without taking it.
    ///
    /// Returns `false` if it was already consumed.
    pub(crate) fn consume(&self) -> bool {
        self.consumed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Takes the current message. Succeeds exactly once.
    pub(crate) fn take_message(&self) -> BotResult<InteractionMessage> {
        if !self.consume() {
            return Err(BotError::MessageConsumed);
        }
        Ok(self.current.lock().clone())
    }
}

impl fmt::Debug for MessagePreSendEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagePreSendEvent")
            .field("id", &self.id)
            .field("bot", &self.bot.id())
            .field("target", &self.target)
            .field("current", &*self.current.lock())
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

impl Event for MessagePreSendEvent {
    fn event_name(&self) -> &'static str {
        "onebot.message.pre_send"
    }

    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn event_type(&self) -> EventType {
        EventType::Internal
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Post-send
// ============================================================================

/// Pushed after a message was sent.
///
/// Its listeners run in the background; their errors are only logged.
pub struct MessagePostSendEvent {
    id: Uuid,
    time: i64,
    target: SendTarget,
    message: InteractionMessage,
    receipt: Arc<SendReceipt>,
}

impl MessagePostSendEvent {
    pub(crate) fn new(
        target: SendTarget,
        message: InteractionMessage,
        receipt: Arc<SendReceipt>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            time: now_secs(),
            target,
            message,
            receipt,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn bot(&self) -> &OneBotBot {
        self.receipt.bot()
    }

    pub fn target(&self) -> SendTarget {
        self.target
    }

    /// The message that was actually sent.
    pub fn message(&self) -> &InteractionMessage {
        &self.message
    }

    /// The receipt returned to the sender.
    pub fn receipt(&self) -> &Arc<SendReceipt> {
        &self.receipt
    }
}

impl fmt::Debug for MessagePostSendEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagePostSendEvent")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("message", &self.message)
            .field("receipt", &self.receipt)
            .finish()
    }
}

impl Event for MessagePostSendEvent {
    fn event_name(&self) -> &'static str {
        "onebot.message.post_send"
    }

    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn event_type(&self) -> EventType {
        EventType::Internal
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_bot;

    #[tokio::test]
    async fn test_message_can_be_taken_once() {
        let event = MessagePreSendEvent::new(
            test_bot().build(),
            SendTarget::Friend { user_id: 1 },
            "hello".into(),
        );
        event.set_current_message("world").unwrap();
        event.set_current_message("again").unwrap();

        let taken = event.take_message().unwrap();
        assert_eq!(taken.as_text(), Some("again"));
        assert_eq!(event.original_message().as_text(), Some("hello"));

        assert!(matches!(event.take_message(), Err(BotError::MessageConsumed)));
        assert!(matches!(
            event.set_current_message("late"),
            Err(BotError::MessageConsumed)
        ));
        assert_eq!(event.current_message().as_text(), Some("again"));
    }

    #[tokio::test]
    async fn test_consume_blocks_later_take() {
        let event = MessagePreSendEvent::new(
            test_bot().build(),
            SendTarget::Group { group_id: 2 },
            "hello".into(),
        );
        assert!(event.consume());
        assert!(!event.consume());
        assert!(event.is_consumed());
        assert!(matches!(event.take_message(), Err(BotError::MessageConsumed)));
    }
}
