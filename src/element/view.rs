//! The controller's encapsulated rendering.
//!
//! Mirrors the three parts of the shadow tree: the image slot, the loading
//! spinner and the fallback label. Only presentational flags live here;
//! the state machine in [`super::FixBrokenImg`] decides what is shown.

use crate::utils::html::{escape_attr, escape_text};

/// The `<img class="image">` inside the shadow tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSlot {
    pub src: String,
    pub alt: String,
    /// `.image.loaded`: fully opaque.
    pub loaded: bool,
}

/// The `.fallback` placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fallback {
    pub visible: bool,
    pub text: String,
    pub background: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowView {
    pub image: ImageSlot,
    /// `.loading.show`
    pub loading: bool,
    pub fallback: Fallback,
}

const STYLE: &str = "\
:host{display:inline-block;position:relative;overflow:hidden}\
.image-container{position:relative;width:100%;height:100%}\
.image{width:100%;height:100%;object-fit:cover;opacity:0;transition:opacity .3s ease}\
.image.loaded{opacity:1}\
.fallback{position:absolute;top:0;left:0;width:100%;height:100%;display:flex;\
align-items:center;justify-content:center;font-family:Arial,sans-serif;font-size:14px;\
opacity:0;transition:opacity .3s ease;pointer-events:none}\
.fallback.show{opacity:1;pointer-events:auto}\
.loading{position:absolute;top:0;left:0;width:100%;height:100%;display:flex;\
align-items:center;justify-content:center;background-color:rgba(245,245,245,.8);\
opacity:0;transition:opacity .3s ease}\
.loading.show{opacity:1}\
.loading::after{content:'';width:20px;height:20px;border:2px solid #ddd;\
border-top:2px solid #666;border-radius:50%;animation:spin 1s linear infinite}\
@keyframes spin{0%{transform:rotate(0deg)}100%{transform:rotate(360deg)}}";

impl ShadowView {
    /// Serialize as a declarative shadow root.
    pub fn to_template(&self) -> String {
        let mut out = String::with_capacity(STYLE.len() + 256);
        out.push_str("<template shadowrootmode=\"open\"><style>");
        out.push_str(STYLE);
        out.push_str("</style><div class=\"image-container\">");

        let image_class = if self.image.loaded { "image loaded" } else { "image" };
        out.push_str(&format!(
            "<img class=\"{image_class}\" src=\"{}\" alt=\"{}\">",
            escape_attr(&self.image.src),
            escape_attr(&self.image.alt),
        ));

        let loading_class = if self.loading { "loading show" } else { "loading" };
        out.push_str(&format!("<div class=\"{loading_class}\"></div>"));

        let fallback_class = if self.fallback.visible { "fallback show" } else { "fallback" };
        out.push_str(&format!(
            "<div class=\"{fallback_class}\" style=\"background-color:{};color:{}\">{}</div>",
            escape_attr(&self.fallback.background),
            escape_attr(&self.fallback.color),
            escape_text(&self.fallback.text),
        ));

        out.push_str("</div></template>");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_reflects_flags() {
        let view = ShadowView {
            image: ImageSlot {
                src: "a.png".into(),
                alt: String::new(),
                loaded: true,
            },
            loading: false,
            fallback: Fallback {
                visible: false,
                text: "<broken>".into(),
                background: "#f5f5f5".into(),
                color: "#666".into(),
            },
        };
        let html = view.to_template();
        assert!(html.contains(r#"<img class="image loaded" src="a.png" alt="">"#));
        assert!(html.contains(r#"<div class="loading"></div>"#));
        assert!(html.contains(r#"style="background-color:#f5f5f5;color:#666">&lt;broken&gt;</div>"#));
    }

    #[test]
    fn test_template_fallback_shown() {
        let mut view = ShadowView::default();
        view.fallback.visible = true;
        assert!(view.to_template().contains("class=\"fallback show\""));
    }
}
