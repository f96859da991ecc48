//! Eased interpolation between two layout snapshots.
//!
//! Frames are driven by the host: the manager asks a [`FrameScheduler`] for
//! the next frame and the host calls [`AnimationManager::on_frame`] when that
//! frame fires. At most one animation runs at a time.

use std::collections::{BTreeMap, VecDeque};

use tracing::trace;

use crate::layout::{Point, StateNode};

/// Opaque id of a requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// The host's frame loop.
pub trait FrameScheduler {
    /// Current time in milliseconds.
    fn now(&self) -> f64;
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Scheduler for hosts that pump frames themselves, and for tests.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: f64,
    next_handle: u64,
    pending: VecDeque<FrameHandle>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ms: f64) {
        self.now += ms;
    }

    pub fn set_time(&mut self, ms: f64) {
        self.now = ms;
    }

    /// Takes the oldest pending frame, if any.
    pub fn pop_frame(&mut self) -> Option<FrameHandle> {
        self.pending.pop_front()
    }

    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }
}

impl FrameScheduler for ManualScheduler {
    fn now(&self) -> f64 {
        self.now
    }

    fn request_frame(&mut self) -> FrameHandle {
        self.next_handle += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending.push_back(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pending.retain(|pending| *pending != handle);
    }
}

pub type Positions = BTreeMap<String, Point>;
type UpdateFn = Box<dyn FnMut(f32, &Positions)>;

struct ActiveAnimation {
    from: Positions,
    to: Positions,
    started_at: f64,
    duration_ms: f64,
    frame: FrameHandle,
    on_update: UpdateFn,
}

/// `1 - (1 - t)^3`
pub fn ease_out_cubic(t: f64) -> f64 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}

/// Every node and nested child by id.
pub fn snapshot_positions(nodes: &[StateNode]) -> Positions {
    let mut positions = Positions::new();
    for node in nodes {
        node.walk(&mut |n: &StateNode| {
            positions.insert(n.id.clone(), n.position);
        });
    }
    positions
}

pub struct AnimationManager<S: FrameScheduler> {
    scheduler: S,
    active: Option<ActiveAnimation>,
}

impl<S: FrameScheduler> AnimationManager<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            active: None,
        }
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Starts moving from `from` to `to`, cancelling anything in flight.
    ///
    /// Only ids present in both snapshots are interpolated.
    pub fn start_animation(
        &mut self,
        from: &[StateNode],
        to: &[StateNode],
        duration_ms: f64,
        on_update: impl FnMut(f32, &Positions) + 'static,
    ) {
        self.stop_animation();
        let from = snapshot_positions(from);
        let to = snapshot_positions(to);
        let started_at = self.scheduler.now();
        let frame = self.scheduler.request_frame();
        trace!(nodes = to.len(), duration_ms, "animation started");
        self.active = Some(ActiveAnimation {
            from,
            to,
            started_at,
            duration_ms,
            frame,
            on_update: Box::new(on_update),
        });
    }

    /// Advances the running animation for the frame `handle` fired at
    /// `timestamp`. Frames that are not the one last requested are ignored.
    /// Returns whether an animation is still running.
    pub fn on_frame(&mut self, handle: FrameHandle, timestamp: f64) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.frame != handle {
            return true;
        }

        let progress = if active.duration_ms > 0.0 {
            ((timestamp - active.started_at) / active.duration_ms).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let done = progress >= 1.0;
        let eased = if done { 1.0 } else { ease_out_cubic(progress) };

        let mut frame = Positions::new();
        for (id, start) in &active.from {
            let Some(end) = active.to.get(id) else {
                continue;
            };
            let point = if done {
                *end
            } else {
                start.lerp(*end, eased as f32)
            };
            frame.insert(id.clone(), point);
        }
        (active.on_update)(eased as f32, &frame);

        if done {
            trace!("animation finished");
            self.active = None;
            return false;
        }
        active.frame = self.scheduler.request_frame();
        true
    }

    /// Cancels the pending frame and drops the animation. Safe to call at any time.
    pub fn stop_animation(&mut self) {
        if let Some(active) = self.active.take() {
            self.scheduler.cancel_frame(active.frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{NodeKind, Size};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn node(id: &str, x: f32, y: f32) -> StateNode {
        StateNode {
            id: id.to_string(),
            name: id.to_string(),
            kind: NodeKind::Pass,
            definition: None,
            position: Point::new(x, y),
            size: Size::new(180.0, 60.0),
            is_start_state: false,
            is_end_state: false,
            parent_id: None,
            branch_index: None,
            is_group: false,
            group_bounds: None,
            children: Vec::new(),
            is_expanded: false,
        }
    }

    type Log = Rc<RefCell<Vec<(f32, Positions)>>>;

    fn recorder() -> (Log, impl FnMut(f32, &Positions) + 'static) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        (log, move |p: f32, frame: &Positions| sink.borrow_mut().push((p, frame.clone())))
    }

    fn pump(manager: &mut AnimationManager<ManualScheduler>, step: f64) {
        while let Some(handle) = manager.scheduler_mut().pop_frame() {
            manager.scheduler_mut().advance(step);
            let now = manager.scheduler().now();
            manager.on_frame(handle, now);
        }
    }

    #[test]
    fn easing_curve_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(0.5), 0.875);
        assert_eq!(ease_out_cubic(2.0), 1.0);
    }

    #[test]
    fn converges_exactly_once_on_target() {
        let from = vec![node("a", 0.0, 0.0), node("gone", 5.0, 5.0)];
        let to = vec![node("a", 100.0, 33.3), node("new", 9.0, 9.0)];
        let (log, on_update) = recorder();
        let mut manager = AnimationManager::new(ManualScheduler::new());
        manager.start_animation(&from, &to, 300.0, on_update);
        pump(&mut manager, 16.0);

        let log = log.borrow();
        let finals: Vec<_> = log.iter().filter(|(p, _)| *p == 1.0).collect();
        assert_eq!(finals.len(), 1);
        assert_eq!(log.last().unwrap().0, 1.0);
        assert_eq!(finals[0].1["a"], Point::new(100.0, 33.3));
        assert!(log.iter().all(|(_, frame)| frame.len() == 1));
        assert!(log.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(!manager.is_running());
        assert_eq!(manager.scheduler().pending_frames(), 0);
    }

    #[test]
    fn restarting_cancels_the_previous_animation() {
        let from = vec![node("a", 0.0, 0.0)];
        let to = vec![node("a", 10.0, 0.0)];
        let (first_log, first) = recorder();
        let (second_log, second) = recorder();
        let mut manager = AnimationManager::new(ManualScheduler::new());

        manager.start_animation(&from, &to, 100.0, first);
        let stale = manager.scheduler_mut().pop_frame().unwrap();
        manager.scheduler_mut().advance(16.0);
        let now = manager.scheduler().now();
        assert!(manager.on_frame(stale, now));

        manager.start_animation(&to, &from, 100.0, second);
        assert_eq!(manager.scheduler().pending_frames(), 1);
        pump(&mut manager, 16.0);

        assert_eq!(first_log.borrow().len(), 1);
        let second_log = second_log.borrow();
        assert_eq!(second_log.last().unwrap().1["a"], Point::new(0.0, 0.0));
        assert_eq!(second_log.iter().filter(|(p, _)| *p == 1.0).count(), 1);
    }

    #[test]
    fn stale_frames_are_ignored() {
        let from = vec![node("a", 0.0, 0.0)];
        let (log, on_update) = recorder();
        let mut manager = AnimationManager::new(ManualScheduler::new());
        manager.start_animation(&from, &from, 100.0, on_update);
        assert!(manager.on_frame(FrameHandle(999), 50.0));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut manager = AnimationManager::new(ManualScheduler::new());
        manager.stop_animation();
        let from = vec![node("a", 0.0, 0.0)];
        let (log, on_update) = recorder();
        manager.start_animation(&from, &from, 100.0, on_update);
        manager.stop_animation();
        manager.stop_animation();
        assert!(!manager.is_running());
        assert_eq!(manager.scheduler().pending_frames(), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn zero_duration_finishes_on_first_frame() {
        let from = vec![node("a", 0.0, 0.0)];
        let to = vec![node("a", 7.0, 7.0)];
        let (log, on_update) = recorder();
        let mut manager = AnimationManager::new(ManualScheduler::new());
        manager.start_animation(&from, &to, 0.0, on_update);
        pump(&mut manager, 0.0);
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].1["a"], Point::new(7.0, 7.0));
    }
}
