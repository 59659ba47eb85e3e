//! Retained draw primitives
//!
//! Each row of the overlay owns one slot in an arena, looked up by key. A
//! tick marks every slot hidden, then re-shows the rows it updates, so a
//! row that disappears keeps its slot and reuses it when it comes back.

use std::collections::HashMap;

use sysoverlay_types::MetricId;

use crate::overlays::BarSpec;

/// Identity of a row across ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKey {
    Metric(MetricId),
    Timestamp,
}

/// Stable index into the scene arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveHandle(usize);

/// A text-only row
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSpec {
    pub text: String,
    pub x: f32,
    pub y_offset: f32,
    pub row_height: f32,
    pub font_size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Bar(BarSpec),
    Label(LabelSpec),
}

#[derive(Debug)]
struct Slot {
    key: PrimitiveKey,
    visible: bool,
    primitive: Primitive,
}

#[derive(Debug, Default)]
pub struct Scene {
    slots: Vec<Slot>,
    index: HashMap<PrimitiveKey, PrimitiveHandle>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide every primitive ahead of a rebuild
    pub fn begin_update(&mut self) {
        for slot in &mut self.slots {
            slot.visible = false;
        }
    }

    /// Replace the primitive for `key` in place, allocating a slot the first
    /// time the key is seen. The primitive becomes visible.
    pub fn upsert(&mut self, key: PrimitiveKey, primitive: Primitive) -> PrimitiveHandle {
        if let Some(&handle) = self.index.get(&key) {
            let slot = &mut self.slots[handle.0];
            slot.primitive = primitive;
            slot.visible = true;
            return handle;
        }

        let handle = PrimitiveHandle(self.slots.len());
        self.slots.push(Slot {
            key,
            visible: true,
            primitive,
        });
        self.index.insert(key, handle);
        handle
    }

    pub fn handle(&self, key: PrimitiveKey) -> Option<PrimitiveHandle> {
        self.index.get(&key).copied()
    }

    pub fn get(&self, handle: PrimitiveHandle) -> Option<&Primitive> {
        self.slots.get(handle.0).map(|s| &s.primitive)
    }

    pub fn is_visible(&self, key: PrimitiveKey) -> bool {
        self.handle(key)
            .and_then(|h| self.slots.get(h.0))
            .is_some_and(|s| s.visible)
    }

    /// Visible primitives in slot order
    pub fn visible(&self) -> impl Iterator<Item = (PrimitiveKey, &Primitive)> {
        self.slots
            .iter()
            .filter(|s| s.visible)
            .map(|s| (s.key, &s.primitive))
    }

    /// Number of allocated slots, visible or not
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(text: &str) -> Primitive {
        Primitive::Label(LabelSpec {
            text: text.to_string(),
            x: 10.0,
            y_offset: 10.0,
            row_height: 30.0,
            font_size: 18.0,
        })
    }

    #[test]
    fn upsert_reuses_slot() {
        let mut scene = Scene::new();
        let first = scene.upsert(PrimitiveKey::Timestamp, label("a"));
        scene.begin_update();
        let second = scene.upsert(PrimitiveKey::Timestamp, label("b"));

        assert_eq!(first, second);
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.get(first), Some(&label("b")));
    }

    #[test]
    fn begin_update_hides_until_upserted() {
        let mut scene = Scene::new();
        scene.upsert(PrimitiveKey::Metric(MetricId::Cpu), label("cpu"));
        scene.upsert(PrimitiveKey::Timestamp, label("ts"));

        scene.begin_update();
        assert_eq!(scene.visible().count(), 0);

        scene.upsert(PrimitiveKey::Timestamp, label("ts"));
        let keys: Vec<_> = scene.visible().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![PrimitiveKey::Timestamp]);
        assert!(!scene.is_visible(PrimitiveKey::Metric(MetricId::Cpu)));
        assert_eq!(scene.len(), 2);
    }
}
