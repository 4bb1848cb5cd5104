//! Runtime context shared by every node of one tree.
//!
//! Holds what would otherwise be process-wide: the mouse grab owner, the
//! top-level node, the direction of the last focus move, the mouse-capture
//! preference, and the queues that let other threads and timers schedule work
//! on the loop thread.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use crate::node::NodeId;
use crate::tree::Tree;

/// Direction of the most recent tab navigation. Newly focused containers
/// pick their first or last child accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationDirection {
    #[default]
    Forward,
    Backward,
}

type Job = Box<dyn FnOnce(&mut Tree) + Send>;
type TimerCallback = Box<dyn FnMut(&mut Tree) -> bool>;

/// Schedules closures onto the loop thread from anywhere.
#[derive(Clone)]
pub struct Invoker {
    sender: Sender<Job>,
}

impl Invoker {
    /// Queues `job`. Returns `false` once the runtime has been shut down.
    pub fn invoke<F>(&self, job: F) -> bool
    where
        F: FnOnce(&mut Tree) + Send + 'static,
    {
        self.sender.send(Box::new(job)).is_ok()
    }
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Invoker")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerToken(u64);

struct Timer {
    period: Duration,
    due: Instant,
    callback: TimerCallback,
}

pub struct Runtime {
    mouse_grab: Option<NodeId>,
    top: Option<NodeId>,
    direction: NavigationDirection,
    mouse_capture_enabled: bool,
    mouse_capture_dirty: bool,
    sender: Sender<Job>,
    receiver: Receiver<Job>,
    timers: BTreeMap<TimerToken, Timer>,
    next_token: u64,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            mouse_grab: None,
            top: None,
            direction: NavigationDirection::Forward,
            mouse_capture_enabled: true,
            mouse_capture_dirty: false,
            sender,
            receiver,
            timers: BTreeMap::new(),
            next_token: 0,
        }
    }

    pub fn mouse_grab(&self) -> Option<NodeId> {
        self.mouse_grab
    }

    pub fn grab_mouse(&mut self, node: NodeId) {
        self.mouse_grab = Some(node);
    }

    pub fn release_mouse(&mut self) -> Option<NodeId> {
        self.mouse_grab.take()
    }

    pub fn top(&self) -> Option<NodeId> {
        self.top
    }

    pub fn set_top(&mut self, top: Option<NodeId>) {
        self.top = top;
    }

    pub fn direction(&self) -> NavigationDirection {
        self.direction
    }

    pub fn set_direction(&mut self, direction: NavigationDirection) {
        self.direction = direction;
    }

    pub fn mouse_capture_enabled(&self) -> bool {
        self.mouse_capture_enabled
    }

    pub fn set_mouse_capture_enabled(&mut self, enabled: bool) {
        if self.mouse_capture_enabled == enabled {
            return;
        }
        self.mouse_capture_enabled = enabled;
        self.mouse_capture_dirty = true;
    }

    pub fn toggle_mouse_capture(&mut self) {
        let enabled = !self.mouse_capture_enabled;
        self.set_mouse_capture_enabled(enabled);
    }

    pub fn take_mouse_capture_change(&mut self) -> Option<bool> {
        if self.mouse_capture_dirty {
            self.mouse_capture_dirty = false;
            Some(self.mouse_capture_enabled)
        } else {
            None
        }
    }

    pub fn invoker(&self) -> Invoker {
        Invoker {
            sender: self.sender.clone(),
        }
    }

    /// Runs `callback` every `period` while it keeps returning `true`.
    pub fn add_timeout<F>(&mut self, now: Instant, period: Duration, callback: F) -> TimerToken
    where
        F: FnMut(&mut Tree) -> bool + 'static,
    {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.timers.insert(
            token,
            Timer {
                period,
                due: now + period,
                callback: Box::new(callback),
            },
        );
        token
    }

    pub fn remove_timeout(&mut self, token: TimerToken) -> bool {
        self.timers.remove(&token).is_some()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Time until the earliest timer fires, if any are pending.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.timers
            .values()
            .map(|t| t.due.saturating_duration_since(now))
            .min()
    }

    pub(crate) fn take_jobs(&mut self) -> Vec<Job> {
        self.receiver.try_iter().collect()
    }

    /// Removes and returns timers due at `now`; they are re-armed through
    /// [`Runtime::rearm`] when their callback asks for it.
    pub(crate) fn take_due(&mut self, now: Instant) -> Vec<(TimerToken, Duration, TimerCallback)> {
        let due: Vec<TimerToken> = self
            .timers
            .iter()
            .filter(|(_, t)| t.due <= now)
            .map(|(token, _)| *token)
            .collect();
        due.into_iter()
            .filter_map(|token| {
                self.timers
                    .remove(&token)
                    .map(|t| (token, t.period, t.callback))
            })
            .collect()
    }

    pub(crate) fn rearm(
        &mut self,
        token: TimerToken,
        now: Instant,
        period: Duration,
        callback: TimerCallback,
    ) {
        self.timers.insert(
            token,
            Timer {
                period,
                due: now + period,
                callback,
            },
        );
    }

    /// Forgets per-tree references, pending jobs and timers.
    pub fn reset(&mut self) {
        self.mouse_grab = None;
        self.top = None;
        self.direction = NavigationDirection::Forward;
        self.timers.clear();
        let (sender, receiver) = mpsc::channel();
        self.sender = sender;
        self.receiver = receiver;
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("mouse_grab", &self.mouse_grab)
            .field("top", &self.top)
            .field("direction", &self.direction)
            .field("mouse_capture_enabled", &self.mouse_capture_enabled)
            .field("timers", &self.timers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mouse_capture_toggle_and_take_change() {
        let mut s = Runtime::new();
        assert!(s.mouse_capture_enabled());
        s.set_mouse_capture_enabled(true);
        // no change -> None
        assert!(s.take_mouse_capture_change().is_none());
        s.set_mouse_capture_enabled(false);
        assert_eq!(s.take_mouse_capture_change(), Some(false));
        // consumed
        assert!(s.take_mouse_capture_change().is_none());
        s.toggle_mouse_capture();
        assert!(s.mouse_capture_enabled());
    }

    #[test]
    fn invoker_survives_threads_and_reset_disconnects_it() {
        let mut s = Runtime::new();
        let invoker = s.invoker();
        std::thread::spawn(move || invoker.invoke(|_| {}))
            .join()
            .unwrap();
        assert_eq!(s.take_jobs().len(), 1);
        let stale = s.invoker();
        s.reset();
        assert!(!stale.invoke(|_| {}));
        assert!(s.take_jobs().is_empty());
    }

    #[test]
    fn timers_fire_when_due() {
        let mut s = Runtime::new();
        let start = Instant::now();
        let token = s.add_timeout(start, Duration::from_millis(10), |_| false);
        assert_eq!(s.next_deadline(start), Some(Duration::from_millis(10)));
        assert!(s.take_due(start).is_empty());
        let due = s.take_due(start + Duration::from_millis(10));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0, token);
        assert_eq!(s.timer_count(), 0);
        assert!(!s.remove_timeout(token));
    }
}
