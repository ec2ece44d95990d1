//! Configuration section definitions.
//!
//! Each module corresponds to a section in `fix-broken-img.toml`:
//!
//! | Module   | TOML Section | Purpose                                   |
//! |----------|--------------|-------------------------------------------|
//! | `widget` | `[widget]`   | Fallback colors, text, auto conversion    |
//! | `bundle` | `[bundle]`   | Script bundle input and output paths      |

mod bundle;
mod widget;

pub use bundle::BundleConfig;
pub use widget::{
    CARRIER_ID, DEFAULT_BACKGROUND, DEFAULT_TEXT, DEFAULT_TEXT_COLOR, WidgetConfig,
};
