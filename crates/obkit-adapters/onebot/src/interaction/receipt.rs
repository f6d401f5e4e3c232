use std::fmt;

use crate::bot::OneBotBot;
use crate::interaction::SendTarget;

/// Result of a successful send.
///
/// Recall the message with [`DeleteSupport`](crate::DeleteSupport).
pub struct SendReceipt {
    bot: OneBotBot,
    target: SendTarget,
    message_id: i64,
}

impl SendReceipt {
    pub(crate) fn new(bot: OneBotBot, target: SendTarget, message_id: i64) -> Self {
        Self {
            bot,
            target,
            message_id,
        }
    }

    pub fn bot(&self) -> &OneBotBot {
        &self.bot
    }

    pub fn target(&self) -> SendTarget {
        self.target
    }

    /// Id the gateway assigned to the sent message.
    pub fn message_id(&self) -> i64 {
        self.message_id
    }
}

impl fmt::Debug for SendReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendReceipt")
            .field("bot", &self.bot.id())
            .field("target", &self.target)
            .field("message_id", &self.message_id)
            .finish()
    }
}
