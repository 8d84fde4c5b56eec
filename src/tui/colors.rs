//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::Priority;

/// Used for high-priority checkboxes and rows.
pub const HIGH_RED: Color = Color::Rgb(198, 40, 40);
/// Used for medium priority.
pub const MEDIUM_AMBER: Color = Color::Rgb(255, 160, 0);
/// Used for low priority.
pub const LOW_BLUE: Color = Color::Rgb(41, 121, 255);
/// Used when no priority is set.
pub const NONE_GREY: Color = Color::Rgb(117, 117, 117);

// Muted variants for the desaturate preference.

pub const HIGH_RED_MUTED: Color = Color::Rgb(143, 78, 78);
pub const MEDIUM_AMBER_MUTED: Color = Color::Rgb(150, 123, 71);
pub const LOW_BLUE_MUTED: Color = Color::Rgb(79, 103, 146);
pub const NONE_GREY_MUTED: Color = Color::Rgb(97, 97, 97);

/// Checkbox colour for a priority, honouring the desaturate preference.
pub fn priority_color(priority: Option<Priority>, desaturate: bool) -> Color {
    match (priority, desaturate) {
        (Some(Priority::High), false) => HIGH_RED,
        (Some(Priority::Medium), false) => MEDIUM_AMBER,
        (Some(Priority::Low), false) => LOW_BLUE,
        (None, false) => NONE_GREY,
        (Some(Priority::High), true) => HIGH_RED_MUTED,
        (Some(Priority::Medium), true) => MEDIUM_AMBER_MUTED,
        (Some(Priority::Low), true) => LOW_BLUE_MUTED,
        (None, true) => NONE_GREY_MUTED,
    }
}
