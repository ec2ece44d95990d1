//! The `fix-broken-img` element controller.
//!
//! One controller owns the lifecycle of one element: it renders the image
//! slot, the loading spinner and the fallback label, and moves between
//! [`LoadState`]s as the host reports attribute changes and image outcomes.
//!
//! ```text
//!            src set            decoded
//!   Idle ───────────────▶ Loading ───────▶ Loaded
//!     │                     │   ▲             │
//!     │ src empty     error │   │ src set /   │
//!     ▼                     ▼   │ reload()    │
//!   Failed ◀────────────────────┴─────────────┘
//! ```
//!
//! The controller never touches the document. The host calls the hooks
//! (`on_mount`, `on_attribute_changed`, `on_unmount`) and forwards image
//! results through [`FixBrokenImg::on_image_event`]; any [`LoadRequest`] a
//! hook returns is for the host to resolve.

mod state;
mod view;

pub use state::{FailureReason, LoadOutcome, LoadRequest, LoadState};
pub use view::{Fallback, ImageSlot, ShadowView};

use crate::config::{ConfigHandle, DEFAULT_BACKGROUND, DEFAULT_TEXT_COLOR};
use crate::dom::{Element, NodeId};

/// Read access to the attributes of a controller's element.
pub trait AttributeSource {
    fn attribute(&self, name: &str) -> Option<&str>;
}

impl AttributeSource for Element {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.get_attr(name)
    }
}

impl AttributeSource for [(&str, &str)] {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.iter().find(|(key, _)| *key == name).map(|(_, v)| *v)
    }
}

#[derive(Debug)]
pub struct FixBrokenImg {
    node: NodeId,
    config: ConfigHandle,
    state: LoadState,
    view: ShadowView,
    /// Bumped for every source application; outcomes for older
    /// generations are stale.
    generation: u64,
    mounted: bool,
}

impl FixBrokenImg {
    pub const TAG: &'static str = "fix-broken-img";

    /// Attributes whose changes reach `on_attribute_changed`.
    pub const OBSERVED_ATTRIBUTES: [&'static str; 4] = ["src", "alt", "background-color", "text-color"];

    /// Construct and render the initial (idle) view.
    pub fn new(node: NodeId, config: ConfigHandle, attrs: &(impl AttributeSource + ?Sized)) -> Self {
        let mut controller = Self {
            node,
            config,
            state: LoadState::Idle,
            view: ShadowView::default(),
            generation: 0,
            mounted: false,
        };
        controller.update_alt_text(attrs);
        controller.update_styles(attrs);
        controller
    }

    pub fn is_observed(name: &str) -> bool {
        Self::OBSERVED_ATTRIBUTES
            .iter()
            .any(|observed| observed.eq_ignore_ascii_case(name))
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn view(&self) -> &ShadowView {
        &self.view
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn failure(&self) -> Option<FailureReason> {
        match self.state {
            LoadState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn loading_visible(&self) -> bool {
        self.view.loading
    }

    pub fn fallback_visible(&self) -> bool {
        self.view.fallback.visible
    }

    pub fn fallback_text(&self) -> &str {
        &self.view.fallback.text
    }

    pub fn image_loaded(&self) -> bool {
        self.view.image.loaded
    }

    // -------------------------------------------------------------------------
    // Lifecycle hooks
    // -------------------------------------------------------------------------

    /// The element was connected to the document.
    pub fn on_mount(&mut self, attrs: &(impl AttributeSource + ?Sized)) -> Option<LoadRequest> {
        self.mounted = true;
        self.load_image(attrs)
    }

    /// The element was disconnected. Outstanding requests become stale.
    pub fn on_unmount(&mut self) {
        self.mounted = false;
        self.generation += 1;
    }

    /// An observed attribute changed value.
    ///
    /// `attrs` already reflects the new value.
    pub fn on_attribute_changed(
        &mut self,
        name: &str,
        old: Option<&str>,
        new: Option<&str>,
        attrs: &(impl AttributeSource + ?Sized),
    ) -> Option<LoadRequest> {
        if old == new {
            return None;
        }

        match name {
            "src" if self.mounted => self.load_image(attrs),
            "alt" => {
                self.update_alt_text(attrs);
                None
            }
            "background-color" | "text-color" => {
                self.update_styles(attrs);
                None
            }
            _ => None,
        }
    }

    /// Resolve a request issued by this controller.
    ///
    /// Returns false when the outcome was ignored because a newer source
    /// has been applied since, or nothing is loading.
    pub fn on_image_event(&mut self, generation: u64, outcome: LoadOutcome) -> bool {
        if generation != self.generation || self.state != LoadState::Loading {
            return false;
        }

        self.view.loading = false;
        match outcome {
            LoadOutcome::Decoded => {
                self.view.image.loaded = true;
                self.view.fallback.visible = false;
                self.state = LoadState::Loaded;
            }
            LoadOutcome::Error => {
                self.view.fallback.visible = true;
                self.state = LoadState::Failed(FailureReason::LoadFailure);
            }
        }
        true
    }

    /// Re-apply the current source, starting a fresh load cycle.
    pub fn reload(&mut self, attrs: &(impl AttributeSource + ?Sized)) -> Option<LoadRequest> {
        self.load_image(attrs)
    }

    /// Re-read the fallback label, e.g. after the shared default changed.
    pub fn refresh_fallback_text(&mut self, attrs: &(impl AttributeSource + ?Sized)) {
        self.update_alt_text(attrs);
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    fn load_image(&mut self, attrs: &(impl AttributeSource + ?Sized)) -> Option<LoadRequest> {
        self.generation += 1;
        let src = attrs.attribute("src").unwrap_or_default();

        if src.is_empty() {
            self.view.image.loaded = false;
            self.view.loading = false;
            self.view.fallback.visible = true;
            self.state = LoadState::Failed(FailureReason::MissingSource);
            return None;
        }

        // Reset before showing the spinner
        self.view.image.loaded = false;
        self.view.fallback.visible = false;
        self.view.loading = true;

        self.view.image.src = src.to_string();
        self.view.image.alt = attrs.attribute("alt").unwrap_or_default().to_string();
        self.state = LoadState::Loading;

        Some(LoadRequest {
            generation: self.generation,
            src: src.to_string(),
        })
    }

    fn update_alt_text(&mut self, attrs: &(impl AttributeSource + ?Sized)) {
        self.view.fallback.text = match attrs.attribute("alt").filter(|alt| !alt.is_empty()) {
            Some(alt) => alt.to_string(),
            None => self.config.default_text(),
        };
    }

    fn update_styles(&mut self, attrs: &(impl AttributeSource + ?Sized)) {
        let pick = |name: &str, default: &str| {
            attrs
                .attribute(name)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        self.view.fallback.background = pick("background-color", DEFAULT_BACKGROUND);
        self.view.fallback.color = pick("text-color", DEFAULT_TEXT_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_TEXT, WidgetConfig};
    use crate::dom::Document;

    fn new_controller(attrs: &[(&str, &str)]) -> FixBrokenImg {
        let mut doc = Document::new();
        let node = doc.create_element(FixBrokenImg::TAG);
        FixBrokenImg::new(node, ConfigHandle::default(), attrs)
    }

    #[test]
    fn test_starts_idle() {
        let controller = new_controller(&[("src", "a.png")]);
        assert_eq!(controller.state(), LoadState::Idle);
        assert!(!controller.loading_visible());
        assert!(!controller.fallback_visible());
    }

    #[test]
    fn test_empty_src_fails_without_spinner() {
        let attrs = [("src", "")];
        let mut controller = new_controller(&attrs);
        assert_eq!(controller.on_mount(&attrs[..]), None);

        assert_eq!(controller.failure(), Some(FailureReason::MissingSource));
        assert!(!controller.loading_visible());
        assert!(controller.fallback_visible());
        assert_eq!(controller.fallback_text(), DEFAULT_TEXT);
    }

    #[test]
    fn test_missing_src_attribute_fails() {
        let attrs: [(&str, &str); 0] = [];
        let mut controller = new_controller(&attrs);
        controller.on_mount(&attrs[..]);
        assert_eq!(controller.failure(), Some(FailureReason::MissingSource));
    }

    #[test]
    fn test_successful_decode() {
        let attrs = [("src", "valid.png")];
        let mut controller = new_controller(&attrs);
        let request = controller.on_mount(&attrs[..]).unwrap();
        assert_eq!(request.src, "valid.png");
        assert_eq!(controller.state(), LoadState::Loading);
        assert!(controller.loading_visible());

        assert!(controller.on_image_event(request.generation, LoadOutcome::Decoded));
        assert_eq!(controller.state(), LoadState::Loaded);
        assert!(!controller.loading_visible());
        assert!(!controller.fallback_visible());
        assert!(controller.image_loaded());
    }

    #[test]
    fn test_decode_error_uses_alt() {
        let attrs = [("src", "missing.png"), ("alt", "a cat")];
        let mut controller = new_controller(&attrs);
        let request = controller.on_mount(&attrs[..]).unwrap();

        assert!(controller.on_image_event(request.generation, LoadOutcome::Error));
        assert_eq!(controller.failure(), Some(FailureReason::LoadFailure));
        assert!(controller.fallback_visible());
        assert!(!controller.image_loaded());
        assert_eq!(controller.fallback_text(), "a cat");
    }

    #[test]
    fn test_decode_error_uses_configured_default() {
        let attrs = [("src", "missing.png")];
        let mut doc = Document::new();
        let node = doc.create_element(FixBrokenImg::TAG);
        let config = ConfigHandle::new(WidgetConfig {
            default_text: "no image".into(),
            ..WidgetConfig::default()
        });
        let mut controller = FixBrokenImg::new(node, config, &attrs[..]);
        let request = controller.on_mount(&attrs[..]).unwrap();
        controller.on_image_event(request.generation, LoadOutcome::Error);
        assert_eq!(controller.fallback_text(), "no image");
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let first = [("src", "slow.png")];
        let mut controller = new_controller(&first);
        let old = controller.on_mount(&first[..]).unwrap();

        let second = [("src", "fast.png")];
        let new = controller
            .on_attribute_changed("src", Some("slow.png"), Some("fast.png"), &second[..])
            .unwrap();

        assert!(controller.on_image_event(new.generation, LoadOutcome::Decoded));
        assert!(!controller.on_image_event(old.generation, LoadOutcome::Error));
        assert_eq!(controller.state(), LoadState::Loaded);
    }

    #[test]
    fn test_final_state_follows_latest_source() {
        // Outcomes arrive newest-first; only the last assignment counts
        let sources = ["a.png", "b.png", "c.png"];
        let mut controller = new_controller(&[]);
        let mut requests = Vec::new();
        let mut prev: Option<&str> = None;
        for (i, src) in sources.into_iter().enumerate() {
            let attrs = [("src", src)];
            let request = if i == 0 {
                controller.on_mount(&attrs[..])
            } else {
                controller.on_attribute_changed("src", prev, Some(src), &attrs[..])
            };
            requests.push(request.unwrap());
            prev = Some(src);
        }

        let last = requests.pop().unwrap();
        assert!(controller.on_image_event(last.generation, LoadOutcome::Error));
        for stale in requests.iter().rev() {
            assert!(!controller.on_image_event(stale.generation, LoadOutcome::Decoded));
        }
        assert_eq!(controller.failure(), Some(FailureReason::LoadFailure));
    }

    #[test]
    fn test_reload_restarts_cycle() {
        let attrs = [("src", "flaky.png")];
        let mut controller = new_controller(&attrs);
        let first = controller.on_mount(&attrs[..]).unwrap();
        controller.on_image_event(first.generation, LoadOutcome::Error);
        assert!(controller.fallback_visible());

        let retry = controller.reload(&attrs[..]).unwrap();
        assert!(retry.generation > first.generation);
        assert_eq!(controller.state(), LoadState::Loading);
        assert!(controller.loading_visible());
        assert!(!controller.fallback_visible());

        controller.on_image_event(retry.generation, LoadOutcome::Decoded);
        assert_eq!(controller.state(), LoadState::Loaded);
    }

    #[test]
    fn test_alt_change_is_live() {
        let attrs = [("src", "a.png"), ("alt", "first")];
        let mut controller = new_controller(&attrs);
        let request = controller.on_mount(&attrs[..]).unwrap();

        let changed = [("src", "a.png"), ("alt", "second")];
        assert_eq!(
            controller.on_attribute_changed("alt", Some("first"), Some("second"), &changed[..]),
            None
        );
        assert_eq!(controller.fallback_text(), "second");
        assert_eq!(controller.state(), LoadState::Loading);
        assert!(controller.on_image_event(request.generation, LoadOutcome::Decoded));
    }

    #[test]
    fn test_color_change_only_restyles() {
        let attrs = [("src", "a.png")];
        let mut controller = new_controller(&attrs);
        let request = controller.on_mount(&attrs[..]).unwrap();

        let changed = [("src", "a.png"), ("background-color", "#000")];
        controller.on_attribute_changed("background-color", None, Some("#000"), &changed[..]);
        assert_eq!(controller.view().fallback.background, "#000");
        assert_eq!(controller.view().fallback.color, DEFAULT_TEXT_COLOR);
        assert_eq!(controller.generation(), request.generation);
    }

    #[test]
    fn test_unchanged_value_is_noop() {
        let attrs = [("src", "a.png")];
        let mut controller = new_controller(&attrs);
        let request = controller.on_mount(&attrs[..]).unwrap();
        assert_eq!(
            controller.on_attribute_changed("src", Some("a.png"), Some("a.png"), &attrs[..]),
            None
        );
        assert_eq!(controller.generation(), request.generation);
    }

    #[test]
    fn test_unmount_makes_requests_stale() {
        let attrs = [("src", "a.png")];
        let mut controller = new_controller(&attrs);
        let request = controller.on_mount(&attrs[..]).unwrap();
        controller.on_unmount();
        assert!(!controller.is_mounted());
        assert!(!controller.on_image_event(request.generation, LoadOutcome::Decoded));
    }

    #[test]
    fn test_observed_attributes() {
        assert!(FixBrokenImg::is_observed("src"));
        assert!(FixBrokenImg::is_observed("TEXT-COLOR"));
        assert!(!FixBrokenImg::is_observed("style"));
    }
}
