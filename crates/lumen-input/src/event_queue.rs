use std::{collections::VecDeque, sync::Arc};

use glam::{UVec2, Vec3};
use parking_lot::Mutex;

/// A request produced by input handling and consumed by the render session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Move the camera along its view direction.
    MoveCamera(f32),
    /// Accumulate a rotation delta (yaw, pitch, roll) in radians.
    RotateCamera(Vec3),
    SetCameraPosition(Vec3),
    ResetSamples,
    Resize(UVec2),
    Screenshot,
    RenderReference,
    Quit,
}

/// Multi-producer queue of [`InputEvent`]s, drained once per frame by the control thread.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Arc<Mutex<VecDeque<InputEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: InputEvent) {
        self.events.lock().push_back(event);
    }

    /// Takes every queued event in submission order.
    pub fn drain(&self) -> Vec<InputEvent> {
        self.events.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_order_across_clones() {
        let queue = EventQueue::new();
        let producer = queue.clone();

        producer.push(InputEvent::MoveCamera(1.0));
        queue.push(InputEvent::ResetSamples);
        producer.push(InputEvent::Quit);

        assert_eq!(queue.len(), 3);
        assert_eq!(
            queue.drain(),
            vec![
                InputEvent::MoveCamera(1.0),
                InputEvent::ResetSamples,
                InputEvent::Quit
            ]
        );
        assert!(producer.is_empty());
    }
}
