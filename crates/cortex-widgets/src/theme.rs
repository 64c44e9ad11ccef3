//! Shared colour constants for the cortex views

use cortex_core::{Hemisphere, Rgba};
use iced::Color;

/// Surface colour for vertices with no activation or region
pub const NEUTRAL_SURFACE: Rgba = [0.62, 0.62, 0.64, 1.0];

/// Highlight blended over the hovered atlas region
pub const HOVER_HIGHLIGHT: Rgba = [1.0, 1.0, 1.0, 0.35];

/// 3D viewport clear colour
pub const VIEWPORT_BACKGROUND: Rgba = [0.08, 0.08, 0.1, 1.0];

/// Trace browser background
pub const TRACE_BACKGROUND: Color = Color::from_rgb(0.1, 0.1, 0.12);

/// Current-time cursor in every 2D view
pub const CURSOR_COLOR: Color = Color::from_rgb(1.0, 0.85, 0.2);

/// Raw channel trace colour
pub const RAW_TRACE_COLOR: Color = Color::from_rgba(0.75, 0.8, 0.9, 0.9);

/// Thin per-vertex lines in the source browser
pub const SOURCE_LINE_COLOR: Color = Color::from_rgba(0.4, 0.6, 0.9, 0.35);

/// Aggregate curve colours (LH, RH)
pub const HEMISPHERE_COLORS: [Color; 2] = [
    Color::from_rgb(0.3, 0.75, 0.95), // LH - Sky blue
    Color::from_rgb(0.95, 0.45, 0.35), // RH - Coral
];

pub fn hemisphere_color(hemisphere: Hemisphere) -> Color {
    HEMISPHERE_COLORS[hemisphere.index()]
}

/// Convert an engine colour to an iced colour
pub fn to_color(rgba: Rgba) -> Color {
    Color::from_rgba(rgba[0], rgba[1], rgba[2], rgba[3])
}
