//! Live-stepping and recorded-replay playback control.
//!
//! One controller, two mutually exclusive modes. Live mode repeatedly asks
//! the backend to step and mirrors the returned `(t, deltaT)`; replay mode
//! drains a FIFO queue of recorded commands. Each loop is a self-scheduling
//! tokio task: an iteration sleeps, re-checks the controller state and its
//! own generation token, then performs at most one backend round trip, so at
//! most one step is ever in flight per loop.

use std::collections::VecDeque;
use std::sync::Arc;

use shared::protocol::{Notification, ReplayEntry};
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

use crate::dispatcher::CommandDispatcher;
use crate::vocabulary::CanvasOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    LiveRunning,
    LivePaused,
    ReplayStarted,
    ReplayPaused,
    ReplayStopped,
}

impl PlaybackState {
    fn is_replay(self) -> bool {
        matches!(
            self,
            PlaybackState::ReplayStarted | PlaybackState::ReplayPaused | PlaybackState::ReplayStopped
        )
    }
}

/// Maps the UI speed slider (`0..=150`) to an inter-step delay. Log-scale:
/// speed 0 gives 1000ms, speed 150 gives 1ms, with fine control at the slow
/// end. Monotonically non-increasing in speed.
pub fn delay_for_speed(speed: f64) -> u64 {
    let speed = speed.clamp(0.0, 150.0);
    let exponent = (12.0 - speed * 12.0 / 150.0) / 4.0;
    10f64.powf(exponent).round() as u64
}

#[derive(Debug)]
struct PlaybackInner {
    state: PlaybackState,
    queue: VecDeque<ReplayEntry>,
    delay_ms: u64,
    run_until: f64,
    t: f64,
    delta_t: f64,
    /// Loop cancellation token: a loop exits as soon as the live generation
    /// moves past the one it was spawned with.
    generation: u64,
}

#[derive(Clone)]
pub struct PlaybackController {
    dispatcher: Arc<CommandDispatcher>,
    inner: Arc<Mutex<PlaybackInner>>,
}

impl PlaybackController {
    pub fn new(dispatcher: Arc<CommandDispatcher>) -> Self {
        Self {
            dispatcher,
            inner: Arc::new(Mutex::new(PlaybackInner {
                state: PlaybackState::Idle,
                queue: VecDeque::new(),
                delay_ms: 0,
                run_until: f64::INFINITY,
                t: 0.0,
                delta_t: 0.0,
                generation: 0,
            })),
        }
    }

    pub async fn state(&self) -> PlaybackState {
        self.inner.lock().await.state
    }

    pub async fn queue_len(&self) -> usize {
        self.inner.lock().await.queue.len()
    }

    /// Displayed `(t, deltaT)`, formatted to two decimals.
    pub async fn displayed_time(&self) -> (String, String) {
        let inner = self.inner.lock().await;
        (format!("{:.2}", inner.t), format!("{:.2}", inner.delta_t))
    }

    pub async fn set_speed(&self, speed: f64) {
        self.inner.lock().await.delay_ms = delay_for_speed(speed);
    }

    /// Loads replay data without starting playback; a later `play()` enters
    /// replay mode instead of live stepping.
    pub async fn queue_replay(&self, entries: Vec<ReplayEntry>) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        inner.queue = entries.into();
        inner.state = PlaybackState::ReplayStopped;
    }

    /// Loads a recorded queue and starts replaying it against a fresh
    /// system. Any live run is stopped first.
    pub async fn load_replay(&self, entries: Vec<ReplayEntry>) {
        let was_live = {
            let mut inner = self.inner.lock().await;
            let was_live = inner.state == PlaybackState::LiveRunning;
            inner.queue = entries.into();
            inner.state = PlaybackState::ReplayStarted;
            inner.generation += 1;
            was_live
        };
        if was_live {
            self.dispatcher.dispatch(&CanvasOp::Running { on: false }).await;
        }
        self.dispatcher.notify(Notification::PlayButton { visible: false });
        self.dispatcher.dispatch(&CanvasOp::NewSystem).await;
        self.spawn_replay_loop().await;
    }

    /// Starts or resumes playback. With a non-empty replay queue this
    /// (re)enters replay; otherwise it starts live stepping. Calling play
    /// while already running is a no-op.
    pub async fn play(&self) {
        enum Mode {
            Replay,
            Live,
            Noop,
        }
        let mode = {
            let mut inner = self.inner.lock().await;
            if !inner.queue.is_empty() {
                if inner.state == PlaybackState::ReplayStarted {
                    Mode::Noop
                } else {
                    inner.state = PlaybackState::ReplayStarted;
                    inner.generation += 1;
                    Mode::Replay
                }
            } else if inner.state == PlaybackState::LiveRunning {
                Mode::Noop
            } else {
                inner.state = PlaybackState::LiveRunning;
                inner.generation += 1;
                Mode::Live
            }
        };

        match mode {
            Mode::Noop => {}
            Mode::Replay => self.spawn_replay_loop().await,
            Mode::Live => {
                self.dispatcher.dispatch(&CanvasOp::Running { on: true }).await;
                self.sync_run_until().await;
                self.spawn_live_loop().await;
            }
        }
    }

    /// Freezes the active loop without discarding queue or time state.
    pub async fn pause(&self) {
        let was_live = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                PlaybackState::ReplayStarted => {
                    inner.state = PlaybackState::ReplayPaused;
                    false
                }
                PlaybackState::LiveRunning => {
                    inner.state = PlaybackState::LivePaused;
                    true
                }
                _ => return,
            }
        };
        if was_live {
            self.dispatcher.dispatch(&CanvasOp::Running { on: false }).await;
        }
    }

    /// Replay mode: clears the queue and stops. Live mode: stops the run,
    /// resets the backend, and re-reads `(t, deltaT)`.
    pub async fn reset(&self) {
        let was_replay = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            if inner.state.is_replay() || !inner.queue.is_empty() {
                inner.queue.clear();
                inner.state = PlaybackState::ReplayStopped;
                true
            } else {
                inner.state = PlaybackState::Idle;
                false
            }
        };
        self.dispatcher.notify(Notification::PlayButton { visible: true });
        if was_replay {
            return;
        }

        self.dispatcher.dispatch(&CanvasOp::Running { on: false }).await;
        self.dispatcher.dispatch(&CanvasOp::Reset).await;
        let generation = self.inner.lock().await.generation;
        let t = self
            .dispatcher
            .dispatch(&CanvasOp::Time)
            .await
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let delta_t = self
            .dispatcher
            .dispatch(&CanvasOp::DeltaT)
            .await
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        self.publish_time(generation, t, delta_t).await;
    }

    /// Advances by exactly one step (live) or one queued command (replay).
    pub async fn step(&self) {
        let replay = {
            let inner = self.inner.lock().await;
            inner.state.is_replay() || !inner.queue.is_empty()
        };
        if replay {
            self.step_replay_once().await;
        } else {
            self.step_live_once().await;
        }
    }

    /// One live backend step. Returns false when the step failed and the
    /// loop should stop.
    async fn step_live_once(&self) -> bool {
        let generation = self.inner.lock().await.generation;
        let Some(value) = self.dispatcher.dispatch(&CanvasOp::Step).await else {
            return false;
        };
        let Some((t, delta_t)) = value.as_time_pair() else {
            tracing::error!(?value, "step returned no (t, deltaT) pair");
            return false;
        };
        self.publish_time(generation, t, delta_t).await;
        true
    }

    /// Pops and dispatches one queued command. An empty queue is a no-op
    /// that also forces `ReplayStopped` and surfaces the finished signal.
    async fn step_replay_once(&self) -> bool {
        let popped = {
            let mut inner = self.inner.lock().await;
            match inner.queue.pop_front() {
                Some(entry) => Some(entry),
                None => {
                    inner.state = PlaybackState::ReplayStopped;
                    None
                }
            }
        };
        let Some(entry) = popped else {
            self.dispatcher.notify(Notification::PlaybackFinished);
            self.dispatcher.notify(Notification::PlayButton { visible: true });
            return false;
        };
        if let Err(err) = self.dispatcher.replay(&entry).await {
            tracing::error!(command = %entry.command, %err, "replay command failed");
            return false;
        }
        true
    }

    /// Updates displayed time and auto-pauses a live run at the configured
    /// end time. A stale generation means a pause/reset landed while the
    /// step's round trip was in flight; its result is discarded.
    async fn publish_time(&self, generation: u64, t: f64, delta_t: f64) {
        let auto_pause = {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                return;
            }
            inner.t = t;
            inner.delta_t = delta_t;
            if t >= inner.run_until && inner.state == PlaybackState::LiveRunning {
                inner.state = PlaybackState::LivePaused;
                true
            } else {
                false
            }
        };
        self.dispatcher.notify(Notification::TimeUpdated {
            t: format!("{t:.2}"),
            delta_t: format!("{delta_t:.2}"),
        });
        if auto_pause {
            self.dispatcher.dispatch(&CanvasOp::Running { on: false }).await;
        }
    }

    async fn sync_run_until(&self) {
        if let Some(end) = self
            .dispatcher
            .dispatch(&CanvasOp::EndTime)
            .await
            .and_then(|v| v.as_f64())
        {
            self.inner.lock().await.run_until = end;
        }
    }

    async fn spawn_live_loop(&self) {
        let controller = self.clone();
        let generation = self.inner.lock().await.generation;
        tokio::spawn(async move {
            loop {
                let delay = {
                    let inner = controller.inner.lock().await;
                    if inner.generation != generation
                        || inner.state != PlaybackState::LiveRunning
                    {
                        break;
                    }
                    inner.delay_ms
                };
                sleep(Duration::from_millis(delay.max(1))).await;
                {
                    // Re-check after the await: pause/reset may have landed
                    // while this iteration slept.
                    let inner = controller.inner.lock().await;
                    if inner.generation != generation
                        || inner.state != PlaybackState::LiveRunning
                    {
                        break;
                    }
                }
                if !controller.step_live_once().await {
                    // Leave the controller in its last good state; playback
                    // simply stops.
                    break;
                }
            }
        });
    }

    async fn spawn_replay_loop(&self) {
        let controller = self.clone();
        let generation = self.inner.lock().await.generation;
        tokio::spawn(async move {
            loop {
                let delay = {
                    let inner = controller.inner.lock().await;
                    if inner.generation != generation
                        || inner.state != PlaybackState::ReplayStarted
                    {
                        break;
                    }
                    inner.delay_ms
                };
                sleep(Duration::from_millis(delay.max(1))).await;
                {
                    let inner = controller.inner.lock().await;
                    if inner.generation != generation
                        || inner.state != PlaybackState::ReplayStarted
                    {
                        break;
                    }
                }
                if !controller.step_replay_once().await {
                    break;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_endpoints_match_slider_range() {
        assert_eq!(delay_for_speed(0.0), 1000);
        assert_eq!(delay_for_speed(150.0), 1);
    }

    #[test]
    fn delay_is_monotonically_non_increasing() {
        let mut previous = u64::MAX;
        for step in 0..=150 {
            let delay = delay_for_speed(step as f64);
            assert!(delay <= previous, "speed {step} raised the delay");
            previous = delay;
        }
    }

    #[test]
    fn delay_clamps_out_of_range_speeds() {
        assert_eq!(delay_for_speed(-10.0), delay_for_speed(0.0));
        assert_eq!(delay_for_speed(500.0), delay_for_speed(150.0));
    }
}
