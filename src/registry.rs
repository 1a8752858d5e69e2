//! Session registry: the engine's public surface.
//!
//! Owns the table of session id to session state. Each session sits behind
//! its own lock, so match processing is strictly serialized per session
//! while distinct sessions process and render fully independently. The
//! registry lock is held only long enough to clone a session handle.
//!
//! Replaces the ambient event-emitter/global-map architecture with an
//! explicit owned registry; notifications go out over a channel the
//! embedding layer drains at its leisure.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::events::EngineEvent;
use crate::layout::{ScrollLayout, UniformLayout};
use crate::matching::{MatchEngine, MatchResult};
use crate::motion::{MotionRenderer, ScrollState};
use crate::script::ScriptIndex;
use crate::session::{Session, SessionId};
use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, info};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Capacity of the notification queue. An embedder that never drains keeps
/// the first `EVENT_BUFFER` events; later ones are dropped instead of
/// growing the queue forever.
const EVENT_BUFFER: usize = 256;

/// Read-only view of a session for UI polling.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub token_index: usize,
    pub progress: f64,
    pub tokens_per_second: f64,
    pub pixel_position: f64,
    pub pixel_target: f64,
    pub scroll_state: ScrollState,
    pub idle: bool,
}

struct SessionState {
    session: Session,
    engine: MatchEngine,
    renderer: MotionRenderer,
    layout: Box<dyn ScrollLayout>,
    /// Set by stop_session; an in-flight fragment holding the state lock
    /// finishes, anything arriving after sees the session as gone.
    ended: bool,
    last_tick: Option<Instant>,
    /// Simulated time since the last accepted match or reset, accumulated
    /// from tick intervals. Drives the coasting horizon, so ticking with a
    /// synthetic clock stays independent of wall time.
    since_match: Duration,
}

impl SessionState {
    fn pixel_for_token(&self, token_index: usize) -> f64 {
        let script = self.session.script();
        match script.token(token_index) {
            Some(token) => self.layout.pixel_for_offset(script, token.start_offset),
            None => 0.0,
        }
    }

    /// Pixel position for a fractional token index, interpolating between
    /// adjacent token positions.
    fn pixel_for_fractional(&self, fractional_index: f64) -> f64 {
        let script = self.session.script();
        if script.is_empty() {
            return 0.0;
        }
        let max_index = script.token_count() - 1;
        let clamped = fractional_index.clamp(0.0, max_index as f64);
        let lower = clamped.floor() as usize;
        let upper = (lower + 1).min(max_index);
        let frac = clamped - lower as f64;

        let a = self.pixel_for_token(lower);
        let b = self.pixel_for_token(upper);
        a + (b - a) * frac
    }

    fn scroll_speed(&self, default_rate: f64) -> f64 {
        let script = self.session.script();
        let rate = self.session.rate().current_rate(default_rate);
        (rate * self.layout.px_per_token(script)).max(1.0)
    }
}

/// Owned table of active sessions plus the engine's external interface.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<Mutex<SessionState>>>>,
    next_id: AtomicU64,
    default_config: EngineConfig,
    events_tx: Sender<EngineEvent>,
    events_rx: Receiver<EngineEvent>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SessionRegistry {
    pub fn new(default_config: EngineConfig) -> Self {
        let (events_tx, events_rx) = bounded(EVENT_BUFFER);
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            default_config,
            events_tx,
            events_rx,
        }
    }

    /// Receiver for engine notifications. Events are queued until drained;
    /// the queue is bounded and overflow drops the newest events.
    pub fn events(&self) -> Receiver<EngineEvent> {
        self.events_rx.clone()
    }

    /// Build a script index and initialize session state with the registry's
    /// default config and layout.
    pub fn start_session(&self, script_text: &str) -> SessionId {
        self.start_session_with(
            script_text,
            self.default_config.clone(),
            Box::new(UniformLayout::default()),
        )
    }

    /// Start a session with explicit tunables and layout measurement.
    pub fn start_session_with(
        &self,
        script_text: &str,
        config: EngineConfig,
        layout: Box<dyn ScrollLayout>,
    ) -> SessionId {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let script = Arc::new(ScriptIndex::build(script_text));
        let max_extent = layout.max_extent(&script);

        let state = SessionState {
            session: Session::new(id, script.clone(), Instant::now()),
            renderer: MotionRenderer::new(max_extent, config.min_scroll_ms, config.max_scroll_ms),
            engine: MatchEngine::new(config),
            layout,
            ended: false,
            last_tick: None,
            since_match: Duration::ZERO,
        };

        self.sessions
            .lock()
            .unwrap()
            .insert(id, Arc::new(Mutex::new(state)));

        info!(
            "{id} started: {} tokens, {max_extent:.0}px extent",
            script.token_count()
        );
        id
    }

    /// Match a transcript fragment for a session.
    ///
    /// `source_confidence` is the external recognizer's confidence in the
    /// text; it weights the emitted position confidence but does not gate
    /// acceptance. Empty or whitespace-only text is "no speech" and a no-op.
    /// `Ok(None)` (no match) is a normal, frequent outcome.
    pub fn process_fragment(
        &self,
        id: SessionId,
        transcript_text: &str,
        source_confidence: f64,
    ) -> Result<Option<MatchResult>> {
        let handle = self.lookup(id)?;
        let mut guard = handle.lock().unwrap();
        let state = &mut *guard;
        if state.ended {
            return Err(EngineError::SessionNotFound(id));
        }

        if transcript_text.trim().is_empty() {
            debug!("{id}: no speech in fragment");
            return Ok(None);
        }

        let now = Instant::now();
        let samples_before = state.session.rate().sample_count();
        let result = state.engine.match_fragment(&mut state.session, transcript_text, now);

        let Some(result) = result else {
            return Ok(None);
        };
        state.since_match = Duration::ZERO;

        let config = state.engine.config();
        let default_rate = config.default_rate;
        let token_index = state.session.current_token_index();
        let target_px = state.pixel_for_token(token_index);
        let speed = state.scroll_speed(default_rate);
        state.renderer.set_target(target_px, speed);

        let confidence = (result.score * source_confidence.clamp(0.0, 1.0)).clamp(0.0, 1.0);
        let progress = state.session.script().progress_at(token_index);
        self.emit(EngineEvent::PositionUpdate {
            session_id: id,
            token_index,
            pixel_position: target_px,
            progress,
            confidence,
            at: Utc::now(),
        });

        if state.session.rate().sample_count() != samples_before {
            self.emit(EngineEvent::RateAdjusted {
                session_id: id,
                tokens_per_second: state.session.rate().current_rate(default_rate),
                at: Utc::now(),
            });
        }

        Ok(Some(result))
    }

    /// Advance render state by one frame, measuring the interval since the
    /// previous call. Intended to be driven by the embedding application's
    /// scheduler at the render cadence.
    pub fn tick(&self, id: SessionId) -> Result<f64> {
        let handle = self.lookup(id)?;
        let mut guard = handle.lock().unwrap();
        let state = &mut *guard;
        if state.ended {
            return Err(EngineError::SessionNotFound(id));
        }

        let now = Instant::now();
        let dt = state
            .last_tick
            .map(|prev| now.duration_since(prev))
            .unwrap_or(Duration::ZERO);
        state.last_tick = Some(now);
        Ok(advance(state, dt))
    }

    /// Advance render state by an explicit frame interval. Deterministic
    /// variant of [`tick`](Self::tick) for embedders with their own clocks.
    pub fn tick_with(&self, id: SessionId, dt: Duration) -> Result<f64> {
        let handle = self.lookup(id)?;
        let mut guard = handle.lock().unwrap();
        let state = &mut *guard;
        if state.ended {
            return Err(EngineError::SessionNotFound(id));
        }
        Ok(advance(state, dt))
    }

    pub fn pause(&self, id: SessionId) -> Result<()> {
        self.with_state(id, |state| state.renderer.pause())
    }

    pub fn resume(&self, id: SessionId) -> Result<()> {
        self.with_state(id, |state| state.renderer.resume())
    }

    /// Explicitly reposition a session, cancelling any in-flight animation.
    /// The one sanctioned way to move the display backward.
    pub fn reset_position(&self, id: SessionId, token_index: usize) -> Result<()> {
        let handle = self.lookup(id)?;
        let mut guard = handle.lock().unwrap();
        let state = &mut *guard;
        if state.ended {
            return Err(EngineError::SessionNotFound(id));
        }

        state.session.reset_position(token_index, Instant::now());
        state.since_match = Duration::ZERO;
        let token_index = state.session.current_token_index();
        let px = state.pixel_for_token(token_index);
        state.renderer.jump_to(px);

        let progress = state.session.script().progress_at(token_index);
        self.emit(EngineEvent::PositionUpdate {
            session_id: id,
            token_index,
            pixel_position: px,
            progress,
            confidence: 1.0,
            at: Utc::now(),
        });
        Ok(())
    }

    pub fn session_snapshot(&self, id: SessionId) -> Result<SessionSnapshot> {
        let handle = self.lookup(id)?;
        let guard = handle.lock().unwrap();
        let state = &*guard;
        if state.ended {
            return Err(EngineError::SessionNotFound(id));
        }
        let config = state.engine.config();
        let token_index = state.session.current_token_index();
        Ok(SessionSnapshot {
            session_id: id,
            token_index,
            progress: state.session.script().progress_at(token_index),
            tokens_per_second: state.session.rate().current_rate(config.default_rate),
            pixel_position: state.renderer.position(),
            pixel_target: state.renderer.target(),
            scroll_state: state.renderer.state(),
            idle: state.session.is_idle(Instant::now(), config.idle_timeout_ms),
        })
    }

    /// Stop a session and release its state immediately.
    ///
    /// A fragment already being matched under the session lock completes and
    /// is discarded; anything arriving afterwards gets `SessionNotFound`.
    pub fn stop_session(&self, id: SessionId) -> Result<()> {
        let handle = self
            .sessions
            .lock()
            .unwrap()
            .remove(&id)
            .ok_or(EngineError::SessionNotFound(id))?;
        handle.lock().unwrap().ended = true;

        info!("{id} stopped");
        self.emit(EngineEvent::SessionEnded {
            session_id: id,
            at: Utc::now(),
        });
        Ok(())
    }

    /// Remove sessions that have gone without an accepted match for longer
    /// than their idle timeout. Returns the reaped ids. Intended to be
    /// called periodically by the embedder's maintenance loop.
    pub fn reap_idle(&self) -> Vec<SessionId> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap();
        let expired: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, handle)| {
                let state = handle.lock().unwrap();
                state.session.is_idle(now, state.engine.config().idle_timeout_ms)
            })
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            if let Some(handle) = sessions.remove(id) {
                handle.lock().unwrap().ended = true;
                info!("{id} reaped after idle timeout");
                self.emit(EngineEvent::SessionEnded {
                    session_id: *id,
                    at: Utc::now(),
                });
            }
        }
        expired
    }

    pub fn is_active(&self, id: SessionId) -> bool {
        self.sessions.lock().unwrap().contains_key(&id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    fn lookup(&self, id: SessionId) -> Result<Arc<Mutex<SessionState>>> {
        self.sessions
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(EngineError::SessionNotFound(id))
    }

    fn with_state<T>(&self, id: SessionId, f: impl FnOnce(&mut SessionState) -> T) -> Result<T> {
        let handle = self.lookup(id)?;
        let mut guard = handle.lock().unwrap();
        if guard.ended {
            return Err(EngineError::SessionNotFound(id));
        }
        Ok(f(&mut guard))
    }

    fn emit(&self, event: EngineEvent) {
        // Bounded queue: overflow drops the event rather than blocking the
        // processing path
        let _ = self.events_tx.try_send(event);
    }
}

/// One render-frame transition: predictor-driven coasting plus the easing
/// tick. Pure over (state, dt); coasting follows the accumulated tick
/// intervals, not the wall clock, so synthetic clocks behave identically.
fn advance(state: &mut SessionState, dt: Duration) -> f64 {
    state.since_match = state.since_match.saturating_add(dt);

    // When matches stall, extend the target by bounded extrapolation so the
    // display coasts instead of freezing, then stopping once the horizon is
    // exhausted. Only extend between animations; an in-flight ease keeps
    // its target. Sessions that never matched do not coast.
    if state.renderer.state() != ScrollState::Paused
        && state.renderer.is_settled()
        && state.session.last_match_end().is_some()
    {
        let config = state.engine.config();
        let horizon = state
            .since_match
            .min(Duration::from_millis(config.prediction_horizon_ms));
        let predicted = state
            .session
            .predict(horizon.as_secs_f64(), config.default_rate);
        let px = state.pixel_for_fractional(predicted);
        if px > state.renderer.position() + f64::EPSILON {
            let speed = state.scroll_speed(config.default_rate);
            state.renderer.set_target(px, speed);
        }
    }

    state.renderer.tick(dt)
}
