//! Speech bubble queue.
//!
//! Messages display one at a time in arrival order. Each stays up for its
//! own duration, then the bubble runs a fixed exit transition and the queue
//! waits the configured gap before showing the next one.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time;

use crate::effect::{Effect, EffectSender};
use crate::scheduler::Scheduler;

/// A queued bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub duration: Duration,
}

/// Bubble timing and style, refreshed whenever the configuration loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTiming {
    /// Length of the bubble's exit transition.
    pub exit_transition: Duration,
    /// Gap between one bubble hiding and the next showing.
    pub inter_message_delay: Duration,
    /// Style class passed along with every bubble.
    pub bubble_style: String,
}

impl Default for QueueTiming {
    fn default() -> Self {
        Self {
            exit_transition: Duration::from_millis(300),
            inter_message_delay: Duration::from_millis(2000),
            bubble_style: "default".to_string(),
        }
    }
}

/// FIFO of speech bubbles with a single display slot.
#[derive(Debug, Clone)]
pub struct MessageQueue {
    inner: Arc<QueueInner>,
}

#[derive(Debug)]
struct QueueInner {
    state: Mutex<QueueState>,
    timing: Mutex<QueueTiming>,
    effects: EffectSender,
    scheduler: Scheduler,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Message>,
    /// Text of the bubble on screen (or last on screen while the processor
    /// is still running).
    displayed: Option<String>,
    /// Whether the processor is running.
    active: bool,
}

impl MessageQueue {
    /// Create a queue that emits on `effects` and runs on `scheduler`.
    pub fn new(effects: EffectSender, scheduler: Scheduler) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                timing: Mutex::new(QueueTiming::default()),
                effects,
                scheduler,
            }),
        }
    }

    /// Replace the bubble timing. Takes effect from the next message.
    pub fn set_timing(&self, timing: QueueTiming) {
        *self.inner.timing.lock() = timing;
    }

    /// Queue a message.
    ///
    /// Returns `false` if the message was dropped because the same text is
    /// already on screen.
    pub fn show(&self, text: impl Into<String>, duration: Duration) -> bool {
        let message = Message {
            text: text.into(),
            duration,
        };

        let first = {
            let mut state = self.inner.state.lock();
            if state.active && state.displayed.as_deref() == Some(message.text.as_str()) {
                tracing::debug!(text = %message.text, "dropping duplicate message");
                return false;
            }
            if state.active {
                state.pending.push_back(message);
                return true;
            }
            state.active = true;
            state.displayed = Some(message.text.clone());
            message
        };

        let inner = self.inner.clone();
        self.inner.scheduler.spawn(process(inner, first));
        true
    }

    /// Whether a bubble is up or the queue is still draining.
    pub fn is_showing(&self) -> bool {
        self.inner.state.lock().active
    }

    /// The text currently (or most recently) on screen while active.
    pub fn displayed(&self) -> Option<String> {
        self.inner.state.lock().displayed.clone()
    }

    /// Number of messages waiting behind the one on screen.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Drop everything. The processor task must already be cancelled
    /// (see [`Scheduler::reset`]).
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.pending.clear();
        state.displayed = None;
        state.active = false;
    }
}

async fn process(inner: Arc<QueueInner>, first: Message) {
    let mut next = Some(first);
    while let Some(message) = next {
        let timing = inner.timing.lock().clone();

        let _ = inner.effects.send(Effect::MessageShown {
            text: message.text,
            style: timing.bubble_style,
        });
        time::sleep(message.duration).await;

        let _ = inner.effects.send(Effect::MessageHidden);
        time::sleep(timing.exit_transition).await;
        time::sleep(timing.inter_message_delay).await;

        next = {
            let mut state = inner.state.lock();
            let popped = state.pending.pop_front();
            state.displayed = popped.as_ref().map(|message| message.text.clone());
            state.active = popped.is_some();
            popped
        };
    }
}
