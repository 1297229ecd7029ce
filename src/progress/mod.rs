//! Progress module rendering notifications as terminal progress bars.
//!
//! - `style` - progress bar styling options and templates
//! - `display` - [`ProgressSink`], the notification sink drawing the bars

pub(crate) mod display;
pub(crate) mod style;

pub use display::ProgressSink;
pub use style::{ProgressBarOpts, StyleOptions};
