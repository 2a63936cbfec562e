//! Window-system independent input events
//!
//! The window layer translates winit events into [`InputEvent`]s and queues
//! them; the frame loop drains the queue at the top of every frame. Keeping
//! the events free of winit types lets the controls be exercised in tests.

use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

/// Keys the viewer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Q,
    W,
    S,
    L,
    Z,
    Plus,
    Minus,
    Space,
    Digit2,
    Digit3,
    Left,
    Right,
    Up,
    Down,
}

/// One input event with integer pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    PointerDown { x: i32, y: i32 },
    PointerUp { x: i32, y: i32 },
    PointerMove { x: i32, y: i32 },
    /// Positive steps scroll up (zoom in), negative scroll down
    Wheel { steps: i32 },
    Key { key: Key, ctrl: bool },
    Resize { width: u32, height: u32 },
    Quit,
}

/// Maps a physical key to a viewer key
pub fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyL => Key::L,
        KeyCode::KeyZ => Key::Z,
        KeyCode::Equal | KeyCode::NumpadAdd => Key::Plus,
        KeyCode::Minus | KeyCode::NumpadSubtract => Key::Minus,
        KeyCode::Space => Key::Space,
        KeyCode::Digit2 | KeyCode::Numpad2 => Key::Digit2,
        KeyCode::Digit3 | KeyCode::Numpad3 => Key::Digit3,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        _ => return None,
    };
    Some(key)
}

/// Reduces a scroll delta to whole wheel steps (sign only)
pub fn wheel_steps(delta: MouseScrollDelta) -> i32 {
    let amount = match delta {
        MouseScrollDelta::LineDelta(_, y) => y as f64,
        MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => y,
    };
    if amount > 0.0 {
        1
    } else if amount < 0.0 {
        -1
    } else {
        0
    }
}

/// Stateful translator from winit window events
///
/// Button events carry no position in winit, so the last cursor position is
/// remembered here, together with the Ctrl modifier.
#[derive(Debug, Default)]
pub struct InputTranslator {
    cursor: (i32, i32),
    ctrl_held: bool,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::CloseRequested => Some(InputEvent::Quit),
            WindowEvent::Resized(size) => Some(InputEvent::Resize {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::ModifiersChanged(modifiers) => {
                self.ctrl_held = modifiers.state().control_key();
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x.round() as i32, position.y.round() as i32);
                Some(self.pointer_move())
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => Some(self.pointer_button(*state)),
            WindowEvent::MouseWheel { delta, .. } => match wheel_steps(*delta) {
                0 => None,
                steps => Some(InputEvent::Wheel { steps }),
            },
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => map_key(*code).map(|key| InputEvent::Key {
                key,
                ctrl: self.ctrl_held,
            }),
            _ => None,
        }
    }

    fn pointer_move(&self) -> InputEvent {
        let (x, y) = self.cursor;
        InputEvent::PointerMove { x, y }
    }

    fn pointer_button(&self, state: ElementState) -> InputEvent {
        let (x, y) = self.cursor;
        match state {
            ElementState::Pressed => InputEvent::PointerDown { x, y },
            ElementState::Released => InputEvent::PointerUp { x, y },
        }
    }
}
