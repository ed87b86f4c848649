//! Recording fake of the Bot API and update builders shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Value};
use teloxide::types::{CallbackQueryId, ChatId, InlineKeyboardMarkup, Update};
use tokio::sync::Notify;

use crate::bot::CallbackAnswer;
use crate::platform::{BotControl, Messenger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SendText(ChatId, String),
    SendGame(ChatId, String, InlineKeyboardMarkup),
    Answer(CallbackQueryId, CallbackAnswer),
    BotUsername,
    RegisterCommands,
    ClearWebhook { drop_pending_updates: bool },
    RegisterWebhook(String),
    FetchUpdates { offset: i32, limit: u8, timeout_secs: u32 },
}

#[derive(Default)]
pub struct FakeBot {
    calls: Mutex<Vec<Call>>,
    fail_sends: bool,
    answer_failures: Mutex<usize>,
    fail_webhook: bool,
    batches: Mutex<VecDeque<Result<Vec<Update>, String>>>,
    stop_after_fetches: Option<usize>,
    fetches: Mutex<usize>,
    stopped: Notify,
}

impl FakeBot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sendMessage / sendGame fails.
    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// The next `n` answerCallbackQuery calls fail.
    pub fn failing_answers(self, n: usize) -> Self {
        *self.answer_failures.lock().unwrap() = n;
        self
    }

    /// deleteWebhook and setWebhook fail.
    pub fn failing_webhook(mut self) -> Self {
        self.fail_webhook = true;
        self
    }

    /// Queue the result of the next getUpdates call; an empty queue yields no updates.
    pub fn queue_updates(self, batch: Result<Vec<Update>, &str>) -> Self {
        self.batches
            .lock()
            .unwrap()
            .push_back(batch.map_err(str::to_string));
        self
    }

    /// Make [`FakeBot::stopped`] resolve once `n` getUpdates calls have completed.
    pub fn stop_after_fetches(mut self, n: usize) -> Self {
        self.stop_after_fetches = Some(n);
        self
    }

    /// Shutdown signal for polling loops driven by this fake.
    pub async fn stopped(&self) {
        self.stopped.notified().await;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Messenger for FakeBot {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.record(Call::SendText(chat_id, text.to_string()));
        if self.fail_sends {
            return Err(anyhow!("sendMessage failed: network down"));
        }
        Ok(())
    }

    async fn send_game_invite(
        &self,
        chat_id: ChatId,
        game_short_name: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<()> {
        self.record(Call::SendGame(
            chat_id,
            game_short_name.to_string(),
            keyboard,
        ));
        if self.fail_sends {
            return Err(anyhow!("sendGame failed: network down"));
        }
        Ok(())
    }

    async fn answer_callback(
        &self,
        query_id: &CallbackQueryId,
        answer: &CallbackAnswer,
    ) -> Result<()> {
        self.record(Call::Answer(query_id.clone(), answer.clone()));
        let mut failures = self.answer_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(anyhow!("answerCallbackQuery failed: query is too old"));
        }
        Ok(())
    }
}

#[async_trait]
impl BotControl for FakeBot {
    async fn bot_username(&self) -> Result<String> {
        self.record(Call::BotUsername);
        Ok("chess_bot".to_string())
    }

    async fn register_commands(&self) -> Result<()> {
        self.record(Call::RegisterCommands);
        Ok(())
    }

    async fn clear_webhook(&self, drop_pending_updates: bool) -> Result<()> {
        self.record(Call::ClearWebhook {
            drop_pending_updates,
        });
        if self.fail_webhook {
            return Err(anyhow!("deleteWebhook failed"));
        }
        Ok(())
    }

    async fn register_webhook(&self, url: &Url) -> Result<()> {
        self.record(Call::RegisterWebhook(url.to_string()));
        if self.fail_webhook {
            return Err(anyhow!("setWebhook failed"));
        }
        Ok(())
    }

    async fn fetch_updates(&self, offset: i32, limit: u8, timeout_secs: u32) -> Result<Vec<Update>> {
        self.record(Call::FetchUpdates {
            offset,
            limit,
            timeout_secs,
        });
        {
            let mut fetches = self.fetches.lock().unwrap();
            *fetches += 1;
            if self.stop_after_fetches == Some(*fetches) {
                self.stopped.notify_one();
            }
        }
        match self.batches.lock().unwrap().pop_front() {
            Some(Ok(updates)) => Ok(updates),
            Some(Err(e)) => Err(anyhow!(e)),
            None => Ok(Vec::new()),
        }
    }
}

pub fn query_id(id: &str) -> CallbackQueryId {
    CallbackQueryId(id.to_string())
}

fn user_json(id: i64, username: Option<&str>) -> Value {
    let mut user = json!({
        "id": id,
        "is_bot": false,
        "first_name": "Test",
    });
    if let Some(name) = username {
        user["username"] = json!(name);
    }
    user
}

pub fn text_update_json(update_id: u32, chat_id: i64, username: Option<&str>, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": 100 + update_id,
            "date": 1_700_000_000,
            "chat": { "id": chat_id, "type": "private", "first_name": "Test" },
            "from": user_json(chat_id, username),
            "text": text,
        }
    })
}

pub fn callback_update_json(
    update_id: u32,
    query_id: &str,
    username: Option<&str>,
    game_short_name: Option<&str>,
) -> Value {
    let mut query = json!({
        "id": query_id,
        "from": user_json(42, username),
        "chat_instance": "-8827462384723",
    });
    if let Some(name) = game_short_name {
        query["game_short_name"] = json!(name);
    }
    json!({
        "update_id": update_id,
        "callback_query": query,
    })
}

pub fn text_update(update_id: u32, chat_id: i64, username: Option<&str>, text: &str) -> Update {
    // Update's deserializer only recognises its kind when reading from text
    serde_json::from_str(&text_update_json(update_id, chat_id, username, text).to_string())
        .expect("valid message update")
}

pub fn callback_update(
    update_id: u32,
    query_id: &str,
    username: Option<&str>,
    game_short_name: Option<&str>,
) -> Update {
    let json = callback_update_json(update_id, query_id, username, game_short_name);
    serde_json::from_str(&json.to_string()).expect("valid callback update")
}
