use std::collections::HashSet;

use glam::{UVec2, Vec2, Vec3};
use winit::{
    event::{DeviceEvent, ElementState, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{EventQueue, InputEvent};

#[derive(Debug, Clone, Copy)]
pub struct InputBindings {
    /// World units per second.
    pub move_speed: f32,
    /// Radians per pixel of mouse motion.
    pub look_sensitivity: f32,
}

impl Default for InputBindings {
    fn default() -> Self {
        Self {
            move_speed: 2.0,
            look_sensitivity: 0.001,
        }
    }
}

/// Translates raw window-system input into [`InputEvent`]s.
///
/// Key and mouse state is collected from winit callbacks as it arrives, but events are only
/// emitted from [`InputHandler::update`], once per frame.
#[derive(Debug, Default)]
pub struct InputHandler {
    bindings: InputBindings,
    held: HashSet<KeyCode>,
    pressed: HashSet<KeyCode>,
    mouse_motion: Vec2,
}

impl InputHandler {
    pub fn new(bindings: InputBindings) -> Self {
        Self {
            bindings,
            ..Default::default()
        }
    }

    pub fn handle_window_input(&mut self, event: &WindowEvent, queue: &EventQueue) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press(key),
                        ElementState::Released => self.release(key),
                    }
                }
            }
            WindowEvent::Resized(size) => {
                queue.push(InputEvent::Resize(UVec2::new(size.width, size.height)));
            }
            WindowEvent::CloseRequested => queue.push(InputEvent::Quit),
            _ => {}
        }
    }

    pub fn handle_device_input(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.add_mouse_motion(Vec2::new(delta.0 as f32, delta.1 as f32));
        }
    }

    pub fn press(&mut self, key: KeyCode) {
        if self.held.insert(key) {
            self.pressed.insert(key);
        }
    }

    pub fn release(&mut self, key: KeyCode) {
        self.held.remove(&key);
    }

    pub fn add_mouse_motion(&mut self, delta: Vec2) {
        self.mouse_motion += delta;
    }

    pub fn key(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    /// Emits the events for this frame and clears per-frame state.
    pub fn update(&mut self, delta_time: f32, queue: &EventQueue) {
        let distance = self.bindings.move_speed * delta_time;
        if self.key(KeyCode::KeyW) {
            queue.push(InputEvent::MoveCamera(distance));
        } else if self.key(KeyCode::KeyS) {
            queue.push(InputEvent::MoveCamera(-distance));
        }

        if self.mouse_motion != Vec2::ZERO {
            // Screen-space y grows downwards, pitch grows upwards.
            let delta = Vec2::new(self.mouse_motion.x, -self.mouse_motion.y)
                * self.bindings.look_sensitivity;
            queue.push(InputEvent::RotateCamera(Vec3::new(delta.x, delta.y, 0.0)));
        }

        if self.key_pressed(KeyCode::KeyC) {
            queue.push(InputEvent::ResetSamples);
        }
        if self.key_pressed(KeyCode::F2) {
            queue.push(InputEvent::Screenshot);
        }
        if self.key_pressed(KeyCode::KeyR) {
            queue.push(InputEvent::RenderReference);
        }
        if self.key_pressed(KeyCode::Escape) {
            queue.push(InputEvent::Quit);
        }

        self.pressed.clear();
        self.mouse_motion = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_movement_key_scales_with_delta_time() {
        let queue = EventQueue::new();
        let mut input = InputHandler::new(InputBindings {
            move_speed: 4.0,
            look_sensitivity: 0.5,
        });

        input.press(KeyCode::KeyS);
        input.update(0.25, &queue);
        input.update(0.5, &queue);

        assert_eq!(
            queue.drain(),
            vec![InputEvent::MoveCamera(-1.0), InputEvent::MoveCamera(-2.0)]
        );
    }

    #[test]
    fn mouse_motion_accumulates_until_update() {
        let queue = EventQueue::new();
        let mut input = InputHandler::new(InputBindings {
            move_speed: 1.0,
            look_sensitivity: 0.5,
        });

        input.add_mouse_motion(Vec2::new(2.0, 1.0));
        input.add_mouse_motion(Vec2::new(2.0, 3.0));
        input.update(1.0 / 60.0, &queue);
        input.update(1.0 / 60.0, &queue);

        assert_eq!(
            queue.drain(),
            vec![InputEvent::RotateCamera(Vec3::new(2.0, -2.0, 0.0))]
        );
    }

    #[test]
    fn actions_fire_once_per_press() {
        let queue = EventQueue::new();
        let mut input = InputHandler::default();

        input.press(KeyCode::F2);
        input.press(KeyCode::F2);
        input.update(0.0, &queue);
        input.update(0.0, &queue);
        input.release(KeyCode::F2);
        input.press(KeyCode::KeyR);
        input.update(0.0, &queue);

        assert_eq!(
            queue.drain(),
            vec![InputEvent::Screenshot, InputEvent::RenderReference]
        );
    }
}
