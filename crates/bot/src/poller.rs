//! Long-poll loop.
//!
//! Updates are handled one at a time in arrival order. A failing command
//! or a failed send is logged and the loop moves on; only the chat
//! transport itself going away makes the loop back off.

use std::thread;
use std::time::Duration;

use stockbot_sheets::RecordSource;

use crate::reply::Reply;
use crate::router::CommandRouter;
use crate::telegram::{TelegramClient, TelegramError, Update};

const BACKOFF_START: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(30);

pub struct Poller<S: RecordSource> {
    client: TelegramClient,
    router: CommandRouter,
    source: S,
    poll_timeout: Duration,
}

impl<S: RecordSource> Poller<S> {
    pub fn new(client: TelegramClient, router: CommandRouter, source: S, poll_timeout: Duration) -> Self {
        Self { client, router, source, poll_timeout }
    }

    /// Serve forever.
    pub fn run(&self) -> ! {
        let mut offset = 0;
        let mut backoff = BACKOFF_START;

        log::info!("polling for updates (timeout {}s)", self.poll_timeout.as_secs());
        loop {
            match self.poll_once(offset) {
                Ok(next) => {
                    offset = next;
                    backoff = BACKOFF_START;
                }
                Err(e) => {
                    log::warn!("getUpdates failed: {}; retrying in {}s", e, backoff.as_secs());
                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(BACKOFF_MAX);
                }
            }
        }
    }

    /// Fetch one batch, handle it, and return the next offset.
    pub fn poll_once(&self, offset: i64) -> Result<i64, TelegramError> {
        let updates = self.client.get_updates(offset, self.poll_timeout)?;

        let mut next = offset;
        for update in &updates {
            next = next.max(update.update_id + 1);
            self.handle_update(update);
        }
        Ok(next)
    }

    pub fn handle_update(&self, update: &Update) {
        if let Some(message) = &update.message {
            let Some(text) = message.text.as_deref() else {
                return;
            };
            let Some(command) = self.router.route_for(text) else {
                return;
            };
            let chat_id = message.chat.id;
            log::info!("/{} from chat {}", command.name, chat_id);

            if let Some(replies) = self.router.dispatch(text, &self.source) {
                self.send_all(chat_id, replies);
            }
        } else if let Some(query) = &update.callback_query {
            if let Err(e) = self.client.answer_callback_query(&query.id) {
                log::debug!("answerCallbackQuery failed: {}", e);
            }

            let (Some(data), Some(message)) = (query.data.as_deref(), &query.message) else {
                return;
            };
            let chat_id = message.chat.id;
            log::info!("button '{}' from chat {}", data, chat_id);

            if let Some(replies) = self.router.dispatch_callback(data, &self.source) {
                self.send_all(chat_id, replies);
            }
        }
    }

    fn send_all(&self, chat_id: i64, replies: Vec<Reply>) {
        for reply in replies {
            if let Err(e) = self.client.send_reply(chat_id, reply) {
                log::warn!("failed to send reply to chat {}: {}", chat_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use stockbot_inventory::Record;
    use stockbot_sheets::SheetError;

    struct Rows(Vec<Record>);

    impl RecordSource for Rows {
        fn fetch_records(&self) -> Result<Vec<Record>, SheetError> {
            Ok(self.0.clone())
        }
    }

    fn rows() -> Rows {
        Rows(vec![
            Record::from_pairs([("Code", "A1"), ("Item", "Blue Widget"), ("Quantity", "5")]),
            Record::from_pairs([("Code", "B2"), ("Item", "Red Widget"), ("Quantity", "15")]),
        ])
    }

    fn poller(server: &MockServer) -> Poller<Rows> {
        let client =
            TelegramClient::new(&server.base_url(), "123:abc", Duration::from_secs(1)).unwrap();
        Poller::new(client, CommandRouter::with_default_commands(), rows(), Duration::from_secs(1))
    }

    fn ok_message() -> serde_json::Value {
        json!({ "ok": true, "result": { "message_id": 1, "chat": { "id": 42 } } })
    }

    // ── poll_once ───────────────────────────────────────────────────

    #[test]
    fn test_poll_once_advances_offset_and_replies() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/getUpdates");
            then.status(200).json_body(json!({
                "ok": true,
                "result": [
                    { "update_id": 10, "message": { "message_id": 1, "chat": { "id": 42 }, "text": "/check <10" } },
                    { "update_id": 11, "message": { "message_id": 2, "chat": { "id": 42 }, "text": "hello" } }
                ]
            }));
        });
        let send = server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:abc/sendMessage")
                .body_includes("Code: A1, Item: Blue Widget, Quantity: 5");
            then.status(200).json_body(ok_message());
        });

        let next = poller(&server).poll_once(0).unwrap();
        assert_eq!(next, 12);
        send.assert_calls(1);
    }

    #[test]
    fn test_poll_once_empty_batch_keeps_offset() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/getUpdates");
            then.status(200).json_body(json!({ "ok": true, "result": [] }));
        });

        assert_eq!(poller(&server).poll_once(7).unwrap(), 7);
    }

    #[test]
    fn test_poll_once_transport_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/getUpdates");
            then.status(409).json_body(json!({
                "ok": false, "error_code": 409, "description": "Conflict: terminated by other getUpdates request"
            }));
        });

        let err = poller(&server).poll_once(0).unwrap_err();
        assert!(matches!(err, TelegramError::Api { code: 409, .. }));
    }

    // ── Callbacks ───────────────────────────────────────────────────

    #[test]
    fn test_callback_is_answered_and_dispatched() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/getUpdates");
            then.status(200).json_body(json!({
                "ok": true,
                "result": [{
                    "update_id": 3,
                    "callback_query": {
                        "id": "cb-9",
                        "from": { "id": 5, "first_name": "Ann" },
                        "message": { "message_id": 4, "chat": { "id": 42 } },
                        "data": "check"
                    }
                }]
            }));
        });
        let answer = server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:abc/answerCallbackQuery")
                .json_body(json!({ "callback_query_id": "cb-9" }));
            then.status(200).json_body(json!({ "ok": true, "result": true }));
        });
        let send = server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:abc/sendMessage")
                .body_includes("Please specify a quantity threshold");
            then.status(200).json_body(ok_message());
        });

        assert_eq!(poller(&server).poll_once(0).unwrap(), 4);
        answer.assert();
        send.assert();
    }

    // ── Send failures ───────────────────────────────────────────────

    #[test]
    fn test_send_failure_does_not_stop_batch() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/getUpdates");
            then.status(200).json_body(json!({
                "ok": true,
                "result": [
                    { "update_id": 1, "message": { "message_id": 1, "chat": { "id": 42 }, "text": "/help" } },
                    { "update_id": 2, "message": { "message_id": 2, "chat": { "id": 42 }, "text": "/help" } }
                ]
            }));
        });
        let send = server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/sendMessage");
            then.status(403).json_body(json!({
                "ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"
            }));
        });

        assert_eq!(poller(&server).poll_once(0).unwrap(), 3);
        send.assert_calls(2);
    }
}
