//! Animation reset timer: after the active conversation has been quiet for a
//! fixed delay, tell the main loop to clear the entrance-animation flags so a
//! re-render does not replay them.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::AppEvent;
use crate::store::ConversationId;

/// Must exceed the visual entrance animation or it gets cut short
pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Debounced one-shot timer. At most one timer is pending at a time;
/// rescheduling restarts the countdown from zero (last write wins).
pub struct SettleTimer {
    delay: Duration,
    events: mpsc::UnboundedSender<AppEvent>,
    pending: Option<JoinHandle<()>>,
}

impl SettleTimer {
    pub fn new(events: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self::with_delay(events, SETTLE_DELAY)
    }

    pub fn with_delay(events: mpsc::UnboundedSender<AppEvent>, delay: Duration) -> Self {
        Self {
            delay,
            events,
            pending: None,
        }
    }

    /// Restart the countdown for one conversation. Called whenever the active
    /// conversation changes or its message list grows. The fired event carries
    /// the conversation it was armed on, so the main loop can drop a settle
    /// that was already queued when the user switched conversations.
    pub fn reschedule(&mut self, conversation_id: ConversationId) {
        self.cancel();

        let delay = self.delay;
        let events = self.events.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(AppEvent::Settle { conversation_id });
        }));
    }

    /// Drop the pending countdown, if any. Called when no conversation is
    /// active anymore.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for SettleTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Instant, sleep};

    const TEST_DELAY: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn fires_exactly_once_after_the_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = SettleTimer::with_delay(tx, TEST_DELAY);

        let start = Instant::now();
        timer.reschedule(ConversationId(1));

        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::Settle {
                conversation_id: ConversationId(1)
            })
        ));
        assert!(start.elapsed() >= TEST_DELAY);

        sleep(TEST_DELAY * 2).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_restarts_the_countdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = SettleTimer::with_delay(tx, TEST_DELAY);

        let start = Instant::now();
        timer.reschedule(ConversationId(1));
        sleep(Duration::from_millis(600)).await;
        assert!(rx.try_recv().is_err());

        // Second change before the delay elapses: countdown starts over and
        // the event carries the newer conversation.
        timer.reschedule(ConversationId(2));
        sleep(Duration::from_millis(600)).await;
        assert!(rx.try_recv().is_err());

        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::Settle {
                conversation_id: ConversationId(2)
            })
        ));
        assert!(start.elapsed() >= Duration::from_millis(1600));

        // Only one settle despite two reschedules.
        sleep(TEST_DELAY * 2).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_suppresses_the_pending_settle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = SettleTimer::with_delay(tx, TEST_DELAY);

        timer.reschedule(ConversationId(1));
        timer.cancel();

        sleep(TEST_DELAY * 2).await;
        assert!(rx.try_recv().is_err());
    }
}
