use std::sync::Arc;

use futures::StreamExt;
use futures::future::ready;
use tracing::{debug, error};

use obkit_core::BoxedEvent;

use crate::api::actions::{self, MessageBody, MessageIdResult};
use crate::api::Action;
use crate::bot::OneBotBot;
use crate::error::{ApiResult, BotResult, InterceptionError};
use crate::interaction::{
    InteractionMessage, MessagePostSendEvent, MessagePreSendEvent, SendReceipt, SendTarget,
};

/// Sends `message` to `target` through the interception pipeline.
///
/// 1. Pushes a [`MessagePreSendEvent`] and waits for every listener.
/// 2. Any listener error aborts with an [`InterceptionError`] holding all
///    errors in invocation order; nothing is sent.
/// 3. Otherwise takes the current message and sends it.
/// 4. Pushes a [`MessagePostSendEvent`] in the background and returns the
///    receipt it carries.
pub(crate) async fn send(
    bot: &OneBotBot,
    target: SendTarget,
    message: InteractionMessage,
) -> BotResult<Arc<SendReceipt>> {
    let event = Arc::new(MessagePreSendEvent::new(bot.clone(), target, message));

    let errors: Vec<anyhow::Error> = bot
        .event_bus()
        .push(BoxedEvent::from_arc(event.clone()))
        .filter_map(|result| ready(result.into_error()))
        .collect()
        .await;

    if !errors.is_empty() {
        if !event.consume() {
            debug!(bot_id = %bot.id(), "Pre-send message was already consumed");
        }
        let err = InterceptionError::new(errors);
        error!(
            bot_id = %bot.id(),
            target = ?target,
            error = %err,
            "Message pre-send event process failed"
        );
        return Err(err.into());
    }

    let message = event.take_message()?;
    let body = message.clone().into_body()?;
    let sent = bot.actions().request_data(&send_action(target, &body)?).await?;
    debug!(
        bot_id = %bot.id(),
        target = ?target,
        message_id = sent.message_id,
        "Message sent"
    );

    let receipt = Arc::new(SendReceipt::new(bot.clone(), target, sent.message_id));
    bot.push_in_background(BoxedEvent::new(MessagePostSendEvent::new(
        target,
        message,
        receipt.clone(),
    )));
    Ok(receipt)
}

fn send_action(target: SendTarget, body: &MessageBody) -> ApiResult<Action<MessageIdResult>> {
    match target {
        SendTarget::Friend { user_id } => actions::send_private_msg(user_id, None, body),
        SendTarget::Group { group_id } => actions::send_group_msg(group_id, body),
        SendTarget::Member { group_id, user_id } => {
            actions::send_private_msg(user_id, Some(group_id), body)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use anyhow::anyhow;
    use obkit_core::EventDispatcher;
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    use super::*;
    use crate::error::BotError;
    use crate::testing::{MockHttpClient, test_bot_with, wait_until};

    const SENT: &str = r#"{"retcode":0,"status":"ok","data":{"message_id":99}}"#;

    fn setup() -> (OneBotBot, Arc<MockHttpClient>, Arc<EventDispatcher>) {
        let http = MockHttpClient::new();
        let dispatcher = Arc::new(EventDispatcher::new());
        let bot = test_bot_with(http.clone(), dispatcher.clone()).build();
        (bot, http, dispatcher)
    }

    fn sent_body(http: &MockHttpClient, action: &str) -> Value {
        let request = http.requests_to(action).pop().unwrap();
        serde_json::from_str(request.json_body.as_deref().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_listener_errors_are_aggregated_in_order() {
        let (bot, http, dispatcher) = setup();
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        dispatcher.listen_to::<MessagePreSendEvent, _, _>(move |event| {
            *slot.lock() = Some(event);
            async { Ok(()) }
        });
        dispatcher.listen_to::<MessagePreSendEvent, _, _>(|_| async {
            Err(anyhow!("E1"))
        });
        dispatcher.listen_to::<MessagePreSendEvent, _, _>(|_| async { Ok(()) });
        dispatcher.listen_to::<MessagePreSendEvent, _, _>(|_| async {
            Err(anyhow!("E2"))
        });

        let err = send(&bot, SendTarget::Group { group_id: 1 }, "hello".into())
            .await
            .unwrap_err();

        match err {
            BotError::Interception(err) => {
                let messages: Vec<_> = err.suppressed.iter().map(ToString::to_string).collect();
                assert_eq!(messages, ["E1", "E2"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(http.requests().is_empty());

        let event = seen.lock().take().unwrap();
        let event = event.downcast_ref::<MessagePreSendEvent>().unwrap();
        assert!(event.is_consumed());
        assert!(event.set_current_message("late").is_err());
    }

    #[tokio::test]
    async fn test_listener_replaces_message() {
        let (bot, http, dispatcher) = setup();
        http.respond(200, SENT);
        dispatcher.listen_to::<MessagePreSendEvent, _, _>(|event| async move {
            let event = event.downcast_ref::<MessagePreSendEvent>().unwrap();
            assert_eq!(event.current_message().as_text(), Some("hello"));
            event.set_current_message("world")?;
            Ok(())
        });

        send(&bot, SendTarget::Friend { user_id: 20 }, "hello".into())
            .await
            .unwrap();

        assert_eq!(
            sent_body(&http, "send_private_msg"),
            json!({"user_id": 20, "message": "world", "auto_escape": true})
        );
    }

    #[tokio::test]
    async fn test_receipt_is_shared_with_post_send_event() {
        let (bot, http, dispatcher) = setup();
        http.respond(200, SENT);

        let seen: Arc<Mutex<Option<Arc<SendReceipt>>>> = Arc::new(Mutex::new(None));
        let returned = Arc::new(AtomicBool::new(false));
        let seen_in_listener = seen.clone();
        let returned_in_listener = returned.clone();
        dispatcher.listen_to::<MessagePostSendEvent, _, _>(move |event| {
            let seen = seen_in_listener.clone();
            let returned = returned_in_listener.clone();
            async move {
                let event = event.downcast_ref::<MessagePostSendEvent>().unwrap();
                assert!(returned.load(Ordering::SeqCst));
                *seen.lock() = Some(event.receipt().clone());
                Ok(())
            }
        });

        let receipt = send(
            &bot,
            SendTarget::Member {
                group_id: 100,
                user_id: 20,
            },
            "hi".into(),
        )
        .await
        .unwrap();
        returned.store(true, Ordering::SeqCst);
        assert_eq!(receipt.message_id(), 99);

        wait_until(|| seen.lock().is_some()).await;
        let delivered = seen.lock().clone().unwrap();
        assert!(Arc::ptr_eq(&receipt, &delivered));
        assert_eq!(
            sent_body(&http, "send_private_msg"),
            json!({"user_id": 20, "group_id": 100, "message": "hi", "auto_escape": true})
        );
    }

    #[tokio::test]
    async fn test_post_send_errors_do_not_reach_sender() {
        let (bot, http, dispatcher) = setup();
        http.respond(200, SENT);
        dispatcher.listen_to::<MessagePostSendEvent, _, _>(|_| async {
            Err(anyhow!("post-send failure"))
        });

        let receipt = send(&bot, SendTarget::Group { group_id: 1 }, "hi".into()).await;
        assert!(receipt.is_ok());
    }

    #[tokio::test]
    async fn test_unsupported_replacement() {
        let (bot, http, dispatcher) = setup();
        dispatcher.listen_to::<MessagePreSendEvent, _, _>(|event| async move {
            let event = event.downcast_ref::<MessagePreSendEvent>().unwrap();
            event.set_current_message(InteractionMessage::Extension(Arc::new(1u8)))?;
            Ok(())
        });

        let err = send(&bot, SendTarget::Group { group_id: 1 }, "hi".into())
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::UnsupportedMessage { .. }));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_action_error_is_propagated_without_post_send() {
        let (bot, http, dispatcher) = setup();
        http.respond(500, "boom");
        let post_sent = Arc::new(AtomicBool::new(false));
        let flag = post_sent.clone();
        dispatcher.listen_to::<MessagePostSendEvent, _, _>(move |_| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }
        });

        let err = send(&bot, SendTarget::Group { group_id: 1 }, "hi".into())
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Api(_)));

        tokio::task::yield_now().await;
        assert!(!post_sent.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_segments_are_sent_as_array() {
        let (bot, http, _) = setup();
        http.respond(200, SENT);

        let segments = vec![
            crate::model::segment::Segment::at(20),
            crate::model::segment::Segment::text(" hi"),
        ];
        send(&bot, SendTarget::Group { group_id: 1 }, segments.into())
            .await
            .unwrap();

        assert_eq!(
            sent_body(&http, "send_group_msg"),
            json!({
                "group_id": 1,
                "message": [
                    {"type": "at", "data": {"qq": "20"}},
                    {"type": "text", "data": {"text": " hi"}}
                ]
            })
        );
    }
}
