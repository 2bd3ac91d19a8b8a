// Button edge detection for driver control
//
// Instead of press/release callbacks, each tick's controller snapshot is diffed
// against the previous one.

use crate::hardware::{Button, InputSource};

pub const ALL_BUTTONS: [Button; 7] = [
    Button::IntakeIn,
    Button::IntakeOut,
    Button::LiftUp,
    Button::LiftDown,
    Button::SpeedUp,
    Button::SpeedDown,
    Button::EmergencyStop,
];

/// Buttons that changed state between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonEdges {
    pressed: Vec<Button>,
    released: Vec<Button>,
}

impl ButtonEdges {
    pub fn between(previous: &impl InputSource, current: &impl InputSource) -> Self {
        let mut edges = Self::default();
        for button in ALL_BUTTONS {
            match (
                previous.button_pressed(button),
                current.button_pressed(button),
            ) {
                (false, true) => edges.pressed.push(button),
                (true, false) => edges.released.push(button),
                _ => {}
            }
        }
        edges
    }

    pub fn was_pressed(&self, button: Button) -> bool {
        self.pressed.contains(&button)
    }

    pub fn was_released(&self, button: Button) -> bool {
        self.released.contains(&button)
    }

    /// Any edge on either button
    pub fn changed(&self, a: Button, b: Button) -> bool {
        [a, b]
            .iter()
            .any(|button| self.was_pressed(*button) || self.was_released(*button))
    }

    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty() && self.released.is_empty()
    }
}
