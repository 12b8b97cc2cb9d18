//! Timed event schedules.
//!
//! A script is a plain iterator of [`Beat`]s: each beat says how long to wait
//! before its event goes out. Scripts never sleep themselves; see
//! [`crate::source::paced`] for the driver.

use std::time::Duration;

use conduit_core::{Event, ResultPayload};
use tracing::debug;

/// One scheduled event.
#[derive(Clone, Debug, PartialEq)]
pub struct Beat {
    pub delay: Duration,
    pub event: Event,
}

/// Typing speed and per-stage time budget for progress narration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressPacing {
    pub char_delay: Duration,
    pub stage_budget: Duration,
}

impl Default for ProgressPacing {
    fn default() -> Self {
        Self {
            char_delay: Duration::from_millis(30),
            stage_budget: Duration::from_secs(3),
        }
    }
}

impl ProgressPacing {
    /// Time spent typing `message`, one character per `char_delay`.
    pub fn typing_time(&self, message: &str) -> Duration {
        let chars = u32::try_from(message.chars().count()).unwrap_or(u32::MAX);
        self.char_delay.saturating_mul(chars)
    }

    /// Pause after a stage so typing plus pause fills the budget.
    pub fn pause_after(&self, message: &str) -> Duration {
        self.stage_budget.saturating_sub(self.typing_time(message))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenPacing {
    pub token_delay: Duration,
}

impl Default for TokenPacing {
    fn default() -> Self {
        Self {
            token_delay: Duration::from_millis(50),
        }
    }
}

struct StageCursor {
    message: String,
    typed: String,
    offset: usize,
}

/// Progress narration followed by exactly one `Result`.
///
/// Each stage yields one `ProgressPartial` per character (the accumulated
/// text so far), then a `ProgressComplete` with the full message. The
/// inter-character delay follows every partial; the stage pause follows the
/// complete event and so lands on the next stage's first beat (or on the
/// result).
pub struct ProgressScript {
    stages: std::vec::IntoIter<String>,
    total: usize,
    current: Option<StageCursor>,
    pending: Duration,
    result: Option<ResultPayload>,
    pacing: ProgressPacing,
}

impl ProgressScript {
    pub fn new(stages: Vec<String>, result: ResultPayload, pacing: ProgressPacing) -> Self {
        Self {
            total: stages.len(),
            stages: stages.into_iter(),
            current: None,
            pending: Duration::ZERO,
            result: Some(result),
            pacing,
        }
    }

    fn take_pending(&mut self, next: Duration) -> Duration {
        std::mem::replace(&mut self.pending, next)
    }
}

impl Iterator for ProgressScript {
    type Item = Beat;

    fn next(&mut self) -> Option<Beat> {
        loop {
            if let Some(cursor) = &mut self.current {
                if let Some(ch) = cursor.message[cursor.offset..].chars().next() {
                    cursor.offset += ch.len_utf8();
                    cursor.typed.push(ch);
                    let text = cursor.typed.clone();
                    let delay = self.take_pending(self.pacing.char_delay);
                    return Some(Beat {
                        delay,
                        event: Event::ProgressPartial { text },
                    });
                }

                let message = self.current.take().map(|c| c.message)?;
                let done = self.total - self.stages.len();
                debug!(stage = done, total = self.total, %message, "progress stage typed");
                let delay = self.take_pending(self.pacing.pause_after(&message));
                return Some(Beat {
                    delay,
                    event: Event::ProgressComplete { text: message },
                });
            }

            if let Some(message) = self.stages.next() {
                self.current = Some(StageCursor {
                    message,
                    typed: String::new(),
                    offset: 0,
                });
                continue;
            }

            let payload = self.result.take()?;
            let delay = self.take_pending(Duration::ZERO);
            return Some(Beat {
                delay,
                event: Event::Result { payload },
            });
        }
    }
}

/// Word-level answer stream: one `Token` per whitespace-separated word,
/// each preceded by `token_delay`, then `Done`.
pub struct TokenScript {
    words: std::iter::Enumerate<std::vec::IntoIter<String>>,
    delay: Duration,
    finished: bool,
}

impl TokenScript {
    pub fn new(answer: &str, pacing: TokenPacing) -> Self {
        let words: Vec<String> = answer.split_whitespace().map(str::to_string).collect();
        Self {
            words: words.into_iter().enumerate(),
            delay: pacing.token_delay,
            finished: false,
        }
    }
}

impl Iterator for TokenScript {
    type Item = Beat;

    fn next(&mut self) -> Option<Beat> {
        if self.finished {
            return None;
        }
        match self.words.next() {
            Some((index, word)) => Some(Beat {
                delay: self.delay,
                event: Event::Token {
                    content: format!("{word} "),
                    index: index as u64,
                },
            }),
            None => {
                self.finished = true;
                Some(Beat {
                    delay: Duration::ZERO,
                    event: Event::Done,
                })
            }
        }
    }
}
