//! The stack of active layers.
//!
//! Index 0 is the default layer and is always present. Momentary layers are stacked on top
//! of it, the topmost entry has the highest priority. A layer activated by several held keys
//! occupies a single entry with a reference count, so releasing one of the keys keeps it active.

use core::iter;

use heapless::Vec;

use crate::config::MAX_LAYER_DEPTH;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct LayerEntry {
    layer: u8,
    /// Number of held keys keeping this layer active
    count: u8,
}

#[derive(Clone, Debug)]
pub struct LayerStack {
    /// Persistent bottom of the stack
    default_layer: u8,
    /// Momentary layers above the default layer, lowest priority first
    momentary: Vec<LayerEntry, MAX_LAYER_DEPTH>,
    /// Maximum number of entries, including the default layer
    max_depth: usize,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new(8)
    }
}

impl LayerStack {
    /// Create a stack holding only layer 0.
    ///
    /// `max_depth` is validated by `KeyMap::new`, values above the stack capacity are clamped.
    pub fn new(max_depth: usize) -> Self {
        Self {
            default_layer: 0,
            momentary: Vec::new(),
            max_depth: max_depth.clamp(1, MAX_LAYER_DEPTH),
        }
    }

    /// Activate `layer` on top of the stack.
    ///
    /// If the layer is already stacked, its reference count is incremented instead.
    pub fn push(&mut self, layer: u8) {
        if let Some(entry) = self.momentary.iter_mut().rev().find(|e| e.layer == layer) {
            entry.count = entry.count.saturating_add(1);
            return;
        }
        if self.depth() >= self.max_depth {
            error!("Layer stack is full, can't push layer {}", layer);
            return;
        }
        if self.momentary.push(LayerEntry { layer, count: 1 }).is_err() {
            error!("Layer stack is full, can't push layer {}", layer);
        }
    }

    /// Release one reference of `layer`, scanning from the top.
    /// The entry is removed when no held key references it anymore.
    pub fn pop(&mut self, layer: u8) {
        if let Some(idx) = self.momentary.iter().rposition(|e| e.layer == layer) {
            let entry = &mut self.momentary[idx];
            entry.count = entry.count.saturating_sub(1);
            if entry.count == 0 {
                self.momentary.remove(idx);
            }
        }
    }

    /// Replace the bottom of the stack, momentary layers above it are kept
    pub fn set_default(&mut self, layer: u8) {
        self.default_layer = layer;
    }

    pub fn default_layer(&self) -> u8 {
        self.default_layer
    }

    /// Active layers ordered from the highest priority to the default layer
    pub fn active_order(&self) -> impl Iterator<Item = u8> + '_ {
        self.momentary
            .iter()
            .rev()
            .map(|e| e.layer)
            .chain(iter::once(self.default_layer))
    }

    /// The layer on top of the stack
    pub fn top(&self) -> u8 {
        self.momentary.last().map(|e| e.layer).unwrap_or(self.default_layer)
    }

    pub fn is_active(&self, layer: u8) -> bool {
        self.active_order().any(|l| l == layer)
    }

    /// Number of entries, including the default layer
    pub fn depth(&self) -> usize {
        self.momentary.len() + 1
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;

    fn order(stack: &LayerStack) -> Vec<u8> {
        stack.active_order().collect()
    }

    #[test]
    fn test_new_stack_has_base_layer() {
        let stack = LayerStack::default();
        assert_eq!(order(&stack), [0]);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.top(), 0);
    }

    #[test]
    fn test_push_pop_order() {
        let mut stack = LayerStack::default();
        stack.push(1);
        stack.push(3);
        assert_eq!(order(&stack), [3, 1, 0]);
        assert_eq!(stack.top(), 3);

        stack.pop(1);
        assert_eq!(order(&stack), [3, 0]);
        stack.pop(3);
        assert_eq!(order(&stack), [0]);
    }

    #[test]
    fn test_reference_counting() {
        let mut stack = LayerStack::default();
        stack.push(1);
        stack.push(1);
        assert_eq!(order(&stack), [1, 0]);

        stack.pop(1);
        assert!(stack.is_active(1));
        stack.pop(1);
        assert!(!stack.is_active(1));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_pop_absent_layer_is_noop() {
        let mut stack = LayerStack::default();
        stack.push(2);
        stack.pop(5);
        stack.pop(0);
        assert_eq!(order(&stack), [2, 0]);
    }

    #[test]
    fn test_set_default_keeps_momentary_layers() {
        let mut stack = LayerStack::default();
        stack.push(1);
        stack.set_default(2);
        assert_eq!(order(&stack), [1, 2]);
        stack.pop(1);
        assert_eq!(order(&stack), [2]);
        assert_eq!(stack.default_layer(), 2);
    }

    #[test]
    fn test_push_beyond_max_depth_is_ignored() {
        let mut stack = LayerStack::new(2);
        stack.push(1);
        stack.push(2);
        assert_eq!(order(&stack), [1, 0]);
        // Existing entries can still be referenced
        stack.push(1);
        stack.pop(1);
        assert!(stack.is_active(1));
    }
}
