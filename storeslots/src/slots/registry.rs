use std::fmt;

use serde::{Deserialize, Serialize};

use super::SlotStyles;

/// The fixed set of slot types. Tags the editor does not know are kept
/// verbatim in `Unrecognized` so a document round-trips and still renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlotType {
    Container,
    Grid,
    Text,
    Button,
    Image,
    Html,
    Unrecognized(String),
}

impl SlotType {
    /// Every type the editor can create.
    pub const BUILT_IN: [SlotType; 6] = [
        SlotType::Container,
        SlotType::Grid,
        SlotType::Text,
        SlotType::Button,
        SlotType::Image,
        SlotType::Html,
    ];

    pub fn tag(&self) -> &str {
        match self {
            SlotType::Container => "container",
            SlotType::Grid => "grid",
            SlotType::Text => "text",
            SlotType::Button => "button",
            SlotType::Image => "image",
            SlotType::Html => "html",
            SlotType::Unrecognized(tag) => tag,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SlotType::Container => "Container",
            SlotType::Grid => "Grid",
            SlotType::Text => "Text",
            SlotType::Button => "Button",
            SlotType::Image => "Image",
            SlotType::Html => "HTML",
            SlotType::Unrecognized(_) => "Custom",
        }
    }

    pub fn can_have_children(&self) -> bool {
        match self {
            SlotType::Container | SlotType::Grid => true,
            SlotType::Text
            | SlotType::Button
            | SlotType::Image
            | SlotType::Html
            | SlotType::Unrecognized(_) => false,
        }
    }

    /// Whether a slot of `child` type may be placed directly under this type.
    pub fn accepts_child(&self, child: &SlotType) -> bool {
        match self {
            SlotType::Container => true,
            // No grids nested directly in grids.
            SlotType::Grid => *child != SlotType::Grid,
            SlotType::Text
            | SlotType::Button
            | SlotType::Image
            | SlotType::Html
            | SlotType::Unrecognized(_) => false,
        }
    }

    pub fn default_content(&self) -> &'static str {
        match self {
            SlotType::Container | SlotType::Grid => "",
            SlotType::Text => "New text",
            SlotType::Button => "Click me",
            SlotType::Image => "",
            SlotType::Html => "<div></div>",
            SlotType::Unrecognized(_) => "",
        }
    }

    pub fn default_styles(&self) -> SlotStyles {
        match self {
            SlotType::Container => SlotStyles::with_class("flex flex-col gap-4"),
            SlotType::Grid => SlotStyles::with_class("grid gap-4")
                .with_inline("grid-template-columns", "repeat(2, minmax(0, 1fr))"),
            SlotType::Text => SlotStyles::with_class("text-base"),
            SlotType::Button => SlotStyles::with_class("btn btn-primary"),
            SlotType::Image => SlotStyles::with_class("w-full h-auto"),
            SlotType::Html | SlotType::Unrecognized(_) => SlotStyles::default(),
        }
    }
}

impl From<String> for SlotType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "container" => SlotType::Container,
            "grid" => SlotType::Grid,
            "text" => SlotType::Text,
            "button" => SlotType::Button,
            "image" => SlotType::Image,
            "html" => SlotType::Html,
            _ => SlotType::Unrecognized(tag),
        }
    }
}

impl From<SlotType> for String {
    fn from(slot_type: SlotType) -> Self {
        slot_type.tag().to_string()
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_strings() {
        for t in SlotType::BUILT_IN {
            assert_eq!(SlotType::from(t.tag().to_string()), t);
        }
        assert_eq!(
            SlotType::from("carousel".to_string()),
            SlotType::Unrecognized("carousel".into())
        );
    }

    #[test]
    fn only_containers_hold_children() {
        let all = SlotType::BUILT_IN;
        let holders: Vec<_> = all
            .iter()
            .filter(|t| t.can_have_children())
            .collect();
        assert_eq!(holders, vec![&SlotType::Container, &SlotType::Grid]);
        assert!(!SlotType::Unrecognized("x".into()).can_have_children());
    }

    #[test]
    fn grid_rejects_nested_grid() {
        assert!(SlotType::Container.accepts_child(&SlotType::Grid));
        assert!(SlotType::Grid.accepts_child(&SlotType::Container));
        assert!(!SlotType::Grid.accepts_child(&SlotType::Grid));
        assert!(!SlotType::Text.accepts_child(&SlotType::Text));
    }

    #[test]
    fn unrecognized_children_stay_placeable() {
        let custom = SlotType::Unrecognized("widget".into());
        assert!(SlotType::Container.accepts_child(&custom));
        assert!(!custom.accepts_child(&SlotType::Text));
    }

    #[test]
    fn serializes_as_bare_tag() {
        assert_eq!(serde_json::to_string(&SlotType::Html).unwrap(), "\"html\"");
        let t: SlotType = serde_json::from_str("\"video\"").unwrap();
        assert_eq!(t.tag(), "video");
    }
}
