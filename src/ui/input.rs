/// Input state tracker.
///
/// Tracks which keys are currently held down so that actions (steer, fire,
/// reset) trigger once per press, not once per key-repeat.
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::Direction;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// What a key press means to the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Steer(Direction),
    Fire,
    Reset,
    /// Next stage after a clear, retry after game over.
    Confirm,
    Quit,
}

/// Key map: arrows or WASD / hjkl steer, Space fires, R resets,
/// Enter confirms, Q / Esc quit.
pub fn action_for(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Up => Some(Action::Steer(Direction::Up)),
        KeyCode::Down => Some(Action::Steer(Direction::Down)),
        KeyCode::Left => Some(Action::Steer(Direction::Left)),
        KeyCode::Right => Some(Action::Steer(Direction::Right)),
        KeyCode::Char(' ') => Some(Action::Fire),
        KeyCode::Enter => Some(Action::Confirm),
        KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'q' => Some(Action::Quit),
            'r' => Some(Action::Reset),
            _ => Direction::try_from(c).ok().map(Action::Steer),
        },
        _ => None,
    }
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that transitioned from "not held" → "held" during the
    /// most recent drain_events() call, in arrival order.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for modifier handling.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.record(key, Instant::now()),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("terminal event read failed: {e}");
                    break;
                }
            }
        }

        self.expire(Instant::now());
    }

    fn record(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Without enhancement, release is left to the timeout.
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Expire keys that have timed out (fallback for terminals without Release).
    fn expire(&mut self, now: Instant) {
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    /// Actions for this frame's fresh presses, in arrival order.
    /// Ctrl+C always yields `Quit`.
    pub fn actions(&self) -> Vec<Action> {
        if self.ctrl_c_pressed() {
            return vec![Action::Quit];
        }
        self.fresh_presses.iter().filter_map(|&c| action_for(c)).collect()
    }

    // ── Internal ──

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active
            .get(&code)
            .map(|t| now.duration_since(*t) < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn key_map() {
        assert_eq!(action_for(KeyCode::Left), Some(Action::Steer(Direction::Left)));
        assert_eq!(action_for(KeyCode::Char('W')), Some(Action::Steer(Direction::Up)));
        assert_eq!(action_for(KeyCode::Char('j')), Some(Action::Steer(Direction::Down)));
        assert_eq!(action_for(KeyCode::Char(' ')), Some(Action::Fire));
        assert_eq!(action_for(KeyCode::Char('R')), Some(Action::Reset));
        assert_eq!(action_for(KeyCode::Char('q')), Some(Action::Quit));
        assert_eq!(action_for(KeyCode::Esc), Some(Action::Quit));
        assert_eq!(action_for(KeyCode::Enter), Some(Action::Confirm));
        assert_eq!(action_for(KeyCode::Char('x')), None);
        assert_eq!(action_for(KeyCode::Tab), None);
    }

    #[test]
    fn repeats_are_not_fresh() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.record(press(KeyCode::Left), t0);
        input.record(press(KeyCode::Left), t0 + Duration::from_millis(30));
        input.record(press(KeyCode::Char(' ')), t0 + Duration::from_millis(40));
        assert_eq!(input.actions(), vec![Action::Steer(Direction::Left), Action::Fire]);
    }

    #[test]
    fn held_key_expires_without_release() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.record(press(KeyCode::Up), t0);
        assert!(input.is_held_at(KeyCode::Up, t0));
        input.expire(t0 + HOLD_TIMEOUT);
        assert!(!input.is_held_at(KeyCode::Up, t0 + HOLD_TIMEOUT));
    }

    #[test]
    fn release_honored_only_when_enabled() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.record(press(KeyCode::Up), t0);
        let release = KeyEvent::new_with_kind(KeyCode::Up, KeyModifiers::NONE, KeyEventKind::Release);
        input.record(release, t0);
        assert!(input.is_held_at(KeyCode::Up, t0));

        input.honor_release = true;
        input.record(release, t0);
        assert!(!input.is_held_at(KeyCode::Up, t0));
    }

    #[test]
    fn ctrl_c_quits() {
        let mut input = InputState::new();
        input.record(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        assert_eq!(input.actions(), vec![Action::Quit]);
    }
}
