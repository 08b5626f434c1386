use heapless::Vec;

use crate::event::{KeyPos, KeyboardEvent};

/// Capacity of the held buffer
pub(crate) const HELD_BUFFER_SIZE: usize = 16;

/// Events which arrived while a tap/hold key was pending, in arrival order
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct HeldBuffer {
    events: Vec<KeyboardEvent, HELD_BUFFER_SIZE>,
}

impl HeldBuffer {
    pub(crate) fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event, hands it back if the buffer is full
    pub(crate) fn push(&mut self, event: KeyboardEvent) -> Result<(), KeyboardEvent> {
        self.events.push(event).inspect_err(|e| {
            warn!("Held buffer overflowed, cannot save: {:?}", e);
        })
    }

    /// Whether `pos` is held according to the buffered events, i.e. its latest buffered event is a press
    pub(crate) fn is_held(&self, pos: KeyPos) -> bool {
        self.events.iter().rev().find(|e| e.pos == pos).is_some_and(|e| e.pressed)
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }

    /// Take out every buffered event, keeping the order and leaving the buffer empty
    pub(crate) fn take(&mut self) -> Vec<KeyboardEvent, HELD_BUFFER_SIZE> {
        core::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use embassy_time::Instant;

    use super::*;

    #[test]
    fn test_is_held_follows_latest_event() {
        let mut buffer = HeldBuffer::new();
        let pos = KeyPos::new(2, 1);
        buffer.push(KeyboardEvent::key(2, 1, true, Instant::from_millis(1))).unwrap();
        assert!(buffer.is_held(pos));
        buffer.push(KeyboardEvent::key(2, 1, false, Instant::from_millis(2))).unwrap();
        assert!(!buffer.is_held(pos));
        buffer.push(KeyboardEvent::key(2, 1, true, Instant::from_millis(3))).unwrap();
        assert!(buffer.is_held(pos));
    }

    #[test]
    fn test_order_and_overflow() {
        let mut buffer = HeldBuffer::new();
        for i in 0..HELD_BUFFER_SIZE {
            let event = KeyboardEvent::key(0, i as u8, true, Instant::from_millis(i as u64));
            assert!(buffer.push(event).is_ok());
        }
        let overflow = KeyboardEvent::key(1, 0, true, Instant::from_millis(100));
        assert_eq!(buffer.push(overflow), Err(overflow));
        assert_eq!(buffer.events.len(), HELD_BUFFER_SIZE);
        assert!(buffer.is_held(KeyPos::new(0, 3)));
        assert!(!buffer.is_held(KeyPos::new(1, 0)));

        let events = buffer.take();
        assert!(buffer.events.is_empty());
        assert!(events.iter().enumerate().all(|(i, e)| e.pos.col == i as u8));
    }
}
