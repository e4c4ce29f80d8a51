//! Presentación en Discord: embeds del panel y botones de control.

pub mod buttons;
pub mod embeds;
