//! The event dispatcher.
//!
//! [`Keyboard`] owns the layer stack and one [`KeyRecord`] per held key. Every matrix event is
//! validated against the records, then either handled right away or, while a tap/hold key is
//! pending, kept in the held buffer until the pending key resolves.

pub(crate) mod held_buffer;

use core::fmt;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::{Duration, Instant, Ticker};
use keystack_types::action::Action;
use keystack_types::keycode::KeyCode;
use keystack_types::modifier::ModifierCombination;

use crate::event::{InputEvent, KeyEvent, KeyEventSink, KeyPos, KeyboardEvent};
use crate::function::{FunctionCall, FunctionHandler, FunctionOutcome};
use crate::config::MAX_MACRO_EVENTS;
use crate::keyboard::held_buffer::{HELD_BUFFER_SIZE, HeldBuffer};
use crate::keymap::KeyMap;
use crate::layer_stack::LayerStack;
use crate::tap_hold::{PendingKey, TapHoldDecision, TapHoldState};

/// Capacity of the per-step output buffer used by [`Keyboard::run`].
/// A step emits one macro phase at most, `KeyMap::new` rejects longer macros.
pub const OUTPUT_BUFFER_SIZE: usize = MAX_MACRO_EVENTS;

/// Held events plus the event which resolved the pending key
const REPLAY_QUEUE_SIZE: usize = HELD_BUFFER_SIZE + 1;

/// Recoverable problems with a single event. The event is dropped, nothing is emitted for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// Release of a key which isn't pressed
    UnmatchedRelease(KeyPos),
    /// Press of a key which is already pressed
    DuplicatePress(KeyPos),
    /// The position is outside the matrix
    OutOfMatrix(KeyPos),
    /// `Action::Macro` with an id the keymap doesn't define
    UnknownMacro(u8),
    /// `Action::Function` with an id the handler doesn't know
    UnknownFunction(u8),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnmatchedRelease(pos) => write!(f, "release of ({}, {}) without press", pos.row, pos.col),
            DispatchError::DuplicatePress(pos) => write!(f, "({}, {}) is already pressed", pos.row, pos.col),
            DispatchError::OutOfMatrix(pos) => write!(f, "({}, {}) is outside the matrix", pos.row, pos.col),
            DispatchError::UnknownMacro(id) => write!(f, "unknown macro {}", id),
            DispatchError::UnknownFunction(id) => write!(f, "unknown function {}", id),
        }
    }
}

/// State of a pressed key, lives from its press until its release
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyRecord {
    /// Action resolved at press time, the release uses it even if the layers changed since
    pub action: Action,
    pub pressed_at: Instant,
    /// Only set for dual-role actions
    pub tap_hold: Option<TapHoldState>,
}

pub struct Keyboard<'a, const ROW: usize, const COL: usize, F: FunctionHandler = ()> {
    keymap: KeyMap<'a, ROW, COL>,
    layer_stack: LayerStack,

    /// Records of the pressed keys, indexed by matrix position
    records: [[Option<KeyRecord>; COL]; ROW],

    /// The tap/hold key waiting for a decision
    pending: Option<PendingKey>,

    /// Events received while `pending` is set
    held_buffer: HeldBuffer,

    /// Events to process again, ahead of the next input event
    replay: heapless::Deque<KeyboardEvent, REPLAY_QUEUE_SIZE>,

    /// Handler of `Action::Function`
    functions: F,

    /// Set once a function asked to stop the event loop
    shutdown: bool,
}

impl<'a, const ROW: usize, const COL: usize, F: FunctionHandler> Keyboard<'a, ROW, COL, F> {
    pub fn new(keymap: KeyMap<'a, ROW, COL>, functions: F) -> Self {
        let layer_stack = LayerStack::new(keymap.behavior().max_layer_depth);
        Self {
            keymap,
            layer_stack,
            records: [[None; COL]; ROW],
            pending: None,
            held_buffer: HeldBuffer::new(),
            replay: heapless::Deque::new(),
            functions,
            shutdown: false,
        }
    }

    pub fn keymap(&self) -> &KeyMap<'a, ROW, COL> {
        &self.keymap
    }

    pub fn layer_stack(&self) -> &LayerStack {
        &self.layer_stack
    }

    pub fn functions(&self) -> &F {
        &self.functions
    }

    /// Record of the key at `pos`, if it's pressed and not buffered
    pub fn record(&self, pos: KeyPos) -> Option<&KeyRecord> {
        self.records.get(pos.row as usize)?.get(pos.col as usize)?.as_ref()
    }

    /// Whether a tap/hold key is waiting for a decision
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether a function requested to stop the event loop
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown
    }

    /// Main keyboard task: consume input events, send the resulting key events in order.
    ///
    /// The output is sent after every step of an input event, so replaying held events never
    /// piles up more than one step in the output buffer. Errors are logged and the event loop
    /// continues. Once an event requests a shutdown, every pressed key is released and the
    /// task returns.
    pub async fn run<M: RawMutex, const IN: usize, const OUT: usize>(
        &mut self,
        input: Receiver<'_, M, InputEvent, IN>,
        output: Sender<'_, M, KeyEvent, OUT>,
    ) {
        let mut events: heapless::Vec<KeyEvent, OUTPUT_BUFFER_SIZE> = heapless::Vec::new();
        loop {
            let input_event = input.receive().await;
            let mut result = self.start_input(input_event, &mut events);
            send_all(&mut events, &output).await;
            while let Some(step) = self.next_step(input_event, &mut events) {
                result = result.and(step);
                send_all(&mut events, &output).await;
            }
            if let Err(e) = result {
                warn!("Dropped {:?}: {:?}", input_event, e);
            }

            if self.shutdown {
                info!("Shutdown requested, releasing pressed keys");
                self.discard_pending();
                while self.release_next(&mut events) {
                    send_all(&mut events, &output).await;
                }
                return;
            }
        }
    }

    /// Process one input event, including the replay of the events it released
    pub fn process_input(&mut self, event: InputEvent, sink: &mut impl KeyEventSink) -> Result<(), DispatchError> {
        let mut result = self.start_input(event, sink);
        while let Some(step) = self.next_step(event, sink) {
            result = result.and(step);
        }
        result
    }

    /// Process a matrix event, the resulting key events are sent to `sink`.
    ///
    /// Invalid events are rejected before touching any state.
    pub fn process(&mut self, event: KeyboardEvent, sink: &mut impl KeyEventSink) -> Result<(), DispatchError> {
        self.process_input(InputEvent::Key(event), sink)
    }

    /// Resolve the pending tap/hold key as hold if the tap term has elapsed at `now`.
    /// Replaying the held buffer may make another key pending, which is checked as well.
    pub fn tick(&mut self, now: Instant, sink: &mut impl KeyEventSink) {
        if let Err(e) = self.process_input(InputEvent::Tick(now), sink) {
            warn!("Error while replaying held events: {:?}", e);
        }
    }

    /// Release every pressed key as if it was released on the matrix: holds are undone and
    /// momentary layers popped. Functions aren't called again, a pending key and the events
    /// held behind it are dropped without output.
    pub fn release_all(&mut self, sink: &mut impl KeyEventSink) {
        self.discard_pending();
        while self.release_next(sink) {}
    }

    /// First step of an input event
    fn start_input(&mut self, event: InputEvent, sink: &mut impl KeyEventSink) -> Result<(), DispatchError> {
        match event {
            InputEvent::Key(key_event) => {
                trace!("Processing {:?}", key_event);
                let pos = key_event.pos;
                if !self.keymap.contains(pos) {
                    return Err(DispatchError::OutOfMatrix(pos));
                }

                let held = self.record(pos).is_some() || self.held_buffer.is_held(pos);
                match (key_event.pressed, held) {
                    (true, true) => Err(DispatchError::DuplicatePress(pos)),
                    (false, false) => Err(DispatchError::UnmatchedRelease(pos)),
                    _ => self.dispatch(key_event, sink),
                }
            }
            InputEvent::Tick(now) => {
                self.resolve_expired(now, sink);
                Ok(())
            }
        }
    }

    /// Next step of an input event, `None` once it's fully processed.
    /// Queued events come first, then a tick checks whether the new pending key expired too.
    fn next_step(&mut self, event: InputEvent, sink: &mut impl KeyEventSink) -> Option<Result<(), DispatchError>> {
        if let Some(replayed) = self.replay.pop_front() {
            return Some(self.dispatch(replayed, sink));
        }
        match event {
            InputEvent::Tick(now) if self.resolve_expired(now, sink) => Some(Ok(())),
            _ => None,
        }
    }

    fn resolve_expired(&mut self, now: Instant, sink: &mut impl KeyEventSink) -> bool {
        let Some(pending) = self.pending else {
            return false;
        };
        if !pending.is_expired(now, &self.keymap.behavior().tap_hold) {
            return false;
        }
        debug!("Tap term elapsed for {:?}", pending.pos);
        self.resolve_as_hold(None, sink);
        true
    }

    /// Route a validated event through the pending tap/hold key, if any
    fn dispatch(&mut self, event: KeyboardEvent, sink: &mut impl KeyEventSink) -> Result<(), DispatchError> {
        let Some(pending) = self.pending else {
            return self.process_event(event, sink);
        };

        let press_buffered = self.held_buffer.is_held(event.pos);
        let decision = pending.decide(&event, press_buffered, &self.keymap.behavior().tap_hold);
        debug!("Pending key {:?}, event {:?}: {:?}", pending.pos, event, decision);
        match decision {
            TapHoldDecision::Hold => {
                self.resolve_as_hold(Some(event), sink);
                Ok(())
            }
            TapHoldDecision::Tap => {
                self.activate_pending(TapHoldState::ResolvedTap, sink);
                // The release of the tapped key, emits the tap keycode up
                let result = self.process_event(event, sink);
                self.queue_held_events(None);
                result
            }
            TapHoldDecision::Buffer => {
                if self.held_buffer.push(event).is_err() {
                    // No room to wait any longer
                    self.resolve_as_hold(Some(event), sink);
                }
                Ok(())
            }
            TapHoldDecision::Ignore => self.process_event(event, sink),
        }
    }

    fn resolve_as_hold(&mut self, current: Option<KeyboardEvent>, sink: &mut impl KeyEventSink) {
        self.activate_pending(TapHoldState::ResolvedHold, sink);
        self.queue_held_events(current);
    }

    /// Fix the role of the pending key and emit its activation
    fn activate_pending(&mut self, state: TapHoldState, sink: &mut impl KeyEventSink) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let Some(record) = self.record_mut(pending.pos).and_then(Option::as_mut) else {
            error!("Pending key {:?} has no record", pending.pos);
            return;
        };
        record.tap_hold = Some(state);
        let action = record.action;
        debug!("{:?} resolved as {:?}", pending.pos, state);

        match state {
            TapHoldState::ResolvedTap => {
                if let Some(key) = tap_keycode(&action) {
                    sink.send(KeyEvent::KeyDown(key));
                }
            }
            TapHoldState::ResolvedHold => self.activate_hold(&action, sink),
            TapHoldState::Pending => {}
        }
    }

    /// Queue the held events in arrival order, followed by `current`, ahead of anything queued.
    /// A replayed tap/hold key becomes the new pending key and buffers what follows it.
    fn queue_held_events(&mut self, current: Option<KeyboardEvent>) {
        let held = self.held_buffer.take();
        if !held.is_empty() {
            debug!("Replaying {} held events", held.len());
        }
        for event in current.iter().chain(held.iter().rev()) {
            if self.replay.push_front(*event).is_err() {
                error!("Replay queue is full, dropping {:?}", event);
            }
        }
    }

    /// Drop the pending key and the events waiting for it, none of them has emitted anything
    fn discard_pending(&mut self) {
        if let Some(pending) = self.pending.take()
            && let Some(slot) = self.record_mut(pending.pos)
        {
            *slot = None;
        }
        self.held_buffer.clear();
        self.replay.clear();
    }

    /// Release the first pressed key in row-major order, returns `false` once no key is pressed
    fn release_next(&mut self, sink: &mut impl KeyEventSink) -> bool {
        let Some(pos) = self.records.iter().enumerate().find_map(|(row, keys)| {
            keys.iter()
                .position(Option::is_some)
                .map(|col| KeyPos::new(row as u8, col as u8))
        }) else {
            return false;
        };

        let silent = self.record(pos).is_some_and(|record| {
            matches!(record.action, Action::Function(..)) || record.tap_hold == Some(TapHoldState::Pending)
        });
        if silent {
            if let Some(slot) = self.record_mut(pos) {
                *slot = None;
            }
        } else if let Err(e) = self.process_release(pos, sink) {
            warn!("Error while releasing {:?}: {:?}", pos, e);
        }
        true
    }

    /// Process an event which doesn't depend on a pending key
    fn process_event(&mut self, event: KeyboardEvent, sink: &mut impl KeyEventSink) -> Result<(), DispatchError> {
        if event.pressed {
            self.process_press(event, sink)
        } else {
            self.process_release(event.pos, sink)
        }
    }

    fn process_press(&mut self, event: KeyboardEvent, sink: &mut impl KeyEventSink) -> Result<(), DispatchError> {
        // Resolved on every press, the layers may have changed since the last one
        let action = self.keymap.resolve(event.pos, &self.layer_stack);
        let dual_role = action.is_dual_role();
        let record = KeyRecord {
            action,
            pressed_at: event.time,
            tap_hold: dual_role.then_some(TapHoldState::Pending),
        };
        if let Some(slot) = self.record_mut(event.pos) {
            *slot = Some(record);
        }
        debug!("Press {:?}: {:?}", event.pos, action);

        if dual_role {
            self.pending = Some(PendingKey {
                pos: event.pos,
                pressed_at: event.time,
            });
            return Ok(());
        }
        self.apply(action, true, sink)
    }

    fn process_release(&mut self, pos: KeyPos, sink: &mut impl KeyEventSink) -> Result<(), DispatchError> {
        let record = self
            .records
            .get_mut(pos.row as usize)
            .and_then(|r| r.get_mut(pos.col as usize))
            .and_then(Option::take)
            .ok_or(DispatchError::UnmatchedRelease(pos))?;
        debug!("Release {:?}: {:?}", pos, record.action);

        match record.tap_hold {
            None => self.apply(record.action, false, sink),
            Some(TapHoldState::ResolvedHold) => {
                self.deactivate_hold(&record.action, sink);
                Ok(())
            }
            Some(state) => {
                if let Some(key) = tap_keycode(&record.action) {
                    if state == TapHoldState::Pending {
                        sink.send(KeyEvent::KeyDown(key));
                    }
                    sink.send(KeyEvent::KeyUp(key));
                }
                Ok(())
            }
        }
    }

    /// Apply a single-role action for the press or the release of its key
    fn apply(&mut self, action: Action, pressed: bool, sink: &mut impl KeyEventSink) -> Result<(), DispatchError> {
        match action {
            Action::No | Action::Transparent => {}
            Action::Key(key) => sink.send(key_event(key, pressed)),
            Action::KeyWithModifier(key, modifiers) => {
                if pressed {
                    send_modifiers(modifiers, true, sink);
                    sink.send(KeyEvent::KeyDown(key));
                } else {
                    sink.send(KeyEvent::KeyUp(key));
                    send_modifiers(modifiers, false, sink);
                }
            }
            Action::LayerMomentary(layer) => {
                if pressed {
                    self.layer_stack.push(layer);
                } else {
                    self.layer_stack.pop(layer);
                }
            }
            Action::LayerSet(layer) => {
                if pressed {
                    info!("Default layer set to {}", layer);
                    self.layer_stack.set_default(layer);
                }
            }
            Action::Macro(id) => {
                if self.keymap.macros().play(id, pressed, sink).is_none() {
                    warn!("Macro {} isn't defined", id);
                    return Err(DispatchError::UnknownMacro(id));
                }
            }
            Action::Function(id, opt) => {
                debug!("Function {} (opt {}) pressed: {:?}", id, opt, pressed);
                match self.functions.call(FunctionCall { id, opt, pressed }) {
                    Some(FunctionOutcome::Continue) => {}
                    Some(FunctionOutcome::Shutdown) => {
                        warn!("Function {} requested shutdown", id);
                        self.shutdown = true;
                    }
                    None => {
                        warn!("Function {} isn't defined", id);
                        return Err(DispatchError::UnknownFunction(id));
                    }
                }
            }
            // Dual-role actions go through the tap/hold path
            Action::LayerTapKey(..) | Action::ModTapKey(..) => {}
        }
        Ok(())
    }

    fn activate_hold(&mut self, action: &Action, sink: &mut impl KeyEventSink) {
        match *action {
            Action::LayerTapKey(layer, _) => self.layer_stack.push(layer),
            Action::ModTapKey(modifiers, _) => send_modifiers(modifiers, true, sink),
            _ => {}
        }
    }

    fn deactivate_hold(&mut self, action: &Action, sink: &mut impl KeyEventSink) {
        match *action {
            Action::LayerTapKey(layer, _) => self.layer_stack.pop(layer),
            Action::ModTapKey(modifiers, _) => send_modifiers(modifiers, false, sink),
            _ => {}
        }
    }

    fn record_mut(&mut self, pos: KeyPos) -> Option<&mut Option<KeyRecord>> {
        self.records.get_mut(pos.row as usize)?.get_mut(pos.col as usize)
    }
}

/// Send `InputEvent::Tick` every `period`
pub async fn run_tick_source<M: RawMutex, const N: usize>(sender: Sender<'_, M, InputEvent, N>, period: Duration) {
    let mut ticker = Ticker::every(period);
    loop {
        ticker.next().await;
        sender.send(InputEvent::Tick(Instant::now())).await;
    }
}

async fn send_all<M: RawMutex, const N: usize, const OUT: usize>(
    events: &mut heapless::Vec<KeyEvent, N>,
    output: &Sender<'_, M, KeyEvent, OUT>,
) {
    for event in events.iter() {
        output.send(*event).await;
    }
    events.clear();
}

fn key_event(key: KeyCode, pressed: bool) -> KeyEvent {
    if pressed { KeyEvent::KeyDown(key) } else { KeyEvent::KeyUp(key) }
}

/// The keycode a dual-role action sends when tapped
fn tap_keycode(action: &Action) -> Option<KeyCode> {
    match *action {
        Action::LayerTapKey(_, key) | Action::ModTapKey(_, key) => Some(key),
        _ => None,
    }
}

/// Modifier downs in ctrl, shift, alt, gui order, ups in the reverse order
fn send_modifiers(modifiers: ModifierCombination, pressed: bool, sink: &mut impl KeyEventSink) {
    let (keycodes, n) = modifiers.to_modifier_keycodes();
    let keycodes = &keycodes[..n];
    if pressed {
        keycodes.iter().for_each(|k| sink.send(KeyEvent::KeyDown(*k)));
    } else {
        keycodes.iter().rev().for_each(|k| sink.send(KeyEvent::KeyUp(*k)));
    }
}
