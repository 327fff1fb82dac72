//! Display colors for event types.
//!
//! A type's color is a pure function of its name, so any number of types can
//! be colored and a type keeps its color across restarts.

/// Dashboard palette: the brand's 4- and 6-level accent colors.
pub const EVENT_COLORS: [&str; 18] = [
    "#6b7c93", "#6772e5", "#3297d3", "#24b47e", "#e39f48", "#e37c4c", "#e25950", "#b76ac4",
    "#8f6ed5", "#aab7c4", "#87bbfd", "#68d4f8", "#74e4a2", "#fcd669", "#fdbc72", "#ffcca5",
    "#ffc7ee", "#cdd1f7",
];

/// Returns the palette color for `event_type`.
pub fn color_for(event_type: &str) -> &'static str {
    let index = fxhash::hash64(event_type) % EVENT_COLORS.len() as u64;
    EVENT_COLORS[index as usize]
}
