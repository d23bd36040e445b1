//! In-process stand-ins for the completion and reply services.

use std::sync::Mutex;
use std::time::Duration;

use crate::chat::completion::{Completion, CompletionApi, CompletionFuture, CompletionRequest};
use crate::chat::errors::{ChatError, ChatResult};
use crate::chat::message::{Message, Role};
use crate::line::errors::LineError;
use crate::line::messaging::{ReplyFuture, ReplySender};

#[derive(Clone)]
enum Behavior {
    Reply(String),
    Echo(Duration),
    TimeOut,
    Empty,
}

/// Completion stub that records every message list it receives.
pub struct StubCompletion {
    behavior: Behavior,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl StubCompletion {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer `text`.
    pub fn replying(text: &str) -> Self {
        Self::with(Behavior::Reply(text.to_string()))
    }

    /// Answer `re: <last user text>` after sleeping `delay`.
    pub fn echoing(delay: Duration) -> Self {
        Self::with(Behavior::Echo(delay))
    }

    /// Fail every call as a timeout.
    pub fn timing_out() -> Self {
        Self::with(Behavior::TimeOut)
    }

    /// Answer with an empty choice list.
    pub fn empty() -> Self {
        Self::with(Behavior::Empty)
    }

    /// Message lists received so far, oldest call first.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl CompletionApi for StubCompletion {
    fn complete<'a>(
        &'a self,
        request: CompletionRequest<'a>,
    ) -> CompletionFuture<'a, ChatResult<Completion>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.messages.to_vec());
        }
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|message| message.role() == Role::User)
            .map(|message| message.content().to_string())
            .unwrap_or_default();
        let behavior = self.behavior.clone();

        Box::pin(async move {
            match behavior {
                Behavior::Reply(text) => Ok(Completion::from_text(text)),
                Behavior::Echo(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(Completion::from_text(format!("re: {last_user}")))
                }
                Behavior::TimeOut => Err(ChatError::Timeout(Duration::from_secs(30))),
                Behavior::Empty => Ok(Completion::default()),
            }
        })
    }
}

/// Reply sender that keeps `(reply_token, text)` pairs instead of calling LINE.
#[derive(Default)]
pub struct RecordingReplier {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingReplier {
    /// Replier whose sends are rejected after being recorded.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Replies sent so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl ReplySender for RecordingReplier {
    fn reply_text<'a>(&'a self, reply_token: &'a str, text: &'a str) -> ReplyFuture<'a> {
        Box::pin(async move {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push((reply_token.to_string(), text.to_string()));
            }
            if self.fail {
                return Err(LineError::Status {
                    status: 400,
                    body: "Invalid reply token".to_string(),
                });
            }
            Ok(())
        })
    }
}

