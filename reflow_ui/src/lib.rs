#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Text rendering for the reflow controller: a character-cell profile chart
//! and a status-line `Display` sink.

pub mod chart;
pub mod status;

pub use chart::{CellFont, Chart, Glyph, Viewport};
pub use status::{TextDisplay, ready_banner, status_line};
