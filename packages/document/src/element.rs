//! # Elements
//!
//! Non-text content living at a single offset of a document: form controls,
//! gadgets, images, attachments, line markers and inline-blip placeholders.
//!
//! An element occupies exactly one offset in the text coordinate space. The
//! character stored at that offset is only a placeholder.
//!
//! Properties are kept as JSON values. `Null` stands for an absent value: it
//! is never stored, except by gadgets, which keep explicit nulls so a
//! gadget's state keys survive a round trip.

use crate::snapshot::ElementSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Property map of an element
pub type Properties = BTreeMap<String, Value>;

/// Character written into the text buffer where an element lives
pub const ELEMENT_PLACEHOLDER: char = ' ';

/// Type tag of an element. Unknown tags are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementType {
    Input,
    Check,
    Button,
    Label,
    RadioButton,
    RadioButtonGroup,
    Password,
    TextArea,
    Line,
    Gadget,
    Installer,
    Image,
    Attachment,
    InlineBlip,
    Other(String),
}

impl ElementType {
    /// Wire name of this type
    pub fn as_str(&self) -> &str {
        match self {
            ElementType::Input => "INPUT",
            ElementType::Check => "CHECK",
            ElementType::Button => "BUTTON",
            ElementType::Label => "LABEL",
            ElementType::RadioButton => "RADIO_BUTTON",
            ElementType::RadioButtonGroup => "RADIO_BUTTON_GROUP",
            ElementType::Password => "PASSWORD",
            ElementType::TextArea => "TEXTAREA",
            ElementType::Line => "LINE",
            ElementType::Gadget => "GADGET",
            ElementType::Installer => "INSTALLER",
            ElementType::Image => "IMAGE",
            ElementType::Attachment => "ATTACHMENT",
            ElementType::InlineBlip => "INLINE_BLIP",
            ElementType::Other(name) => name,
        }
    }
}

impl From<&str> for ElementType {
    fn from(name: &str) -> Self {
        match name {
            "INPUT" => ElementType::Input,
            "CHECK" => ElementType::Check,
            "BUTTON" => ElementType::Button,
            "LABEL" => ElementType::Label,
            "RADIO_BUTTON" => ElementType::RadioButton,
            "RADIO_BUTTON_GROUP" => ElementType::RadioButtonGroup,
            "PASSWORD" => ElementType::Password,
            "TEXTAREA" => ElementType::TextArea,
            "LINE" => ElementType::Line,
            "GADGET" => ElementType::Gadget,
            "INSTALLER" => ElementType::Installer,
            "IMAGE" => ElementType::Image,
            "ATTACHMENT" => ElementType::Attachment,
            "INLINE_BLIP" => ElementType::InlineBlip,
            other => ElementType::Other(other.to_string()),
        }
    }
}

impl From<String> for ElementType {
    fn from(name: String) -> Self {
        ElementType::from(name.as_str())
    }
}

impl From<ElementType> for String {
    fn from(element_type: ElementType) -> Self {
        element_type.as_str().to_string()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values understood by `LINE` elements
pub mod line {
    /// Largest heading
    pub const TYPE_H1: &str = "h1";
    pub const TYPE_H2: &str = "h2";
    pub const TYPE_H3: &str = "h3";
    pub const TYPE_H4: &str = "h4";
    /// Smallest heading
    pub const TYPE_H5: &str = "h5";
    /// Bulleted list item
    pub const TYPE_LI: &str = "li";

    pub const ALIGN_LEFT: &str = "l";
    pub const ALIGN_RIGHT: &str = "r";
    pub const ALIGN_CENTER: &str = "c";
    pub const ALIGN_JUSTIFIED: &str = "j";
}

/// A typed, length-one piece of non-text content
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    element_type: ElementType,
    properties: Properties,
}

impl Element {
    /// Create an element from a type and a property map
    pub fn new(element_type: impl Into<ElementType>, properties: Properties) -> Self {
        let mut element = Self {
            element_type: element_type.into(),
            properties: Properties::new(),
        };
        for (key, value) in properties {
            element.set(key, value);
        }
        element
    }

    /// Store one property; a null removes it unless this is a gadget
    fn set(&mut self, key: String, value: Value) {
        if value.is_null() && self.element_type != ElementType::Gadget {
            self.properties.remove(&key);
        } else {
            self.properties.insert(key, value);
        }
    }

    fn with_pairs<const N: usize>(element_type: ElementType, pairs: [(&str, Value); N]) -> Self {
        let properties = pairs
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        Self::new(element_type, properties)
    }

    /// Single-line text input
    pub fn input(name: &str, value: &str) -> Self {
        Self::with_pairs(
            ElementType::Input,
            [
                ("name", name.into()),
                ("value", value.into()),
                ("default_value", value.into()),
            ],
        )
    }

    /// Checkbox
    pub fn check(name: &str, value: &str) -> Self {
        Self::with_pairs(
            ElementType::Check,
            [
                ("name", name.into()),
                ("value", value.into()),
                ("default_value", value.into()),
            ],
        )
    }

    pub fn button(name: &str, value: &str) -> Self {
        Self::with_pairs(ElementType::Button, [("name", name.into()), ("value", value.into())])
    }

    /// Label attached to the control named `label_for`
    pub fn label(label_for: &str, caption: &str) -> Self {
        Self::with_pairs(
            ElementType::Label,
            [("name", label_for.into()), ("value", caption.into())],
        )
    }

    /// Radio button belonging to `group`
    pub fn radio_button(name: &str, group: &str) -> Self {
        Self::with_pairs(
            ElementType::RadioButton,
            [("name", name.into()), ("value", group.into())],
        )
    }

    pub fn radio_button_group(name: &str, value: &str) -> Self {
        Self::with_pairs(
            ElementType::RadioButtonGroup,
            [("name", name.into()), ("value", value.into())],
        )
    }

    pub fn password(name: &str, value: &str) -> Self {
        Self::with_pairs(ElementType::Password, [("name", name.into()), ("value", value.into())])
    }

    pub fn text_area(name: &str, value: &str) -> Self {
        Self::with_pairs(ElementType::TextArea, [("name", name.into()), ("value", value.into())])
    }

    /// Line marker. Use [`Element::with_property`] to set `indent`,
    /// `alignment` or `direction`.
    pub fn line(line_type: Option<&str>) -> Self {
        Self::with_pairs(
            ElementType::Line,
            [("lineType", line_type.map_or(Value::Null, Value::from))],
        )
    }

    /// Gadget hosted at `url` with optional initial state
    pub fn gadget(url: &str, mut state: Properties) -> Self {
        state.insert("url".to_string(), url.into());
        Self::new(ElementType::Gadget, state)
    }

    pub fn installer(manifest: &str) -> Self {
        Self::with_pairs(ElementType::Installer, [("manifest", manifest.into())])
    }

    /// Image at `url`. Use [`Element::with_property`] for `width`, `height`,
    /// `attachmentId` and `caption`.
    pub fn image(url: &str) -> Self {
        Self::with_pairs(
            ElementType::Image,
            [("url", url.into())],
        )
    }

    /// New attachment. `mimeType`, `attachmentId` and `attachmentUrl` are
    /// filled in by the server.
    pub fn attachment(caption: &str, data: &str) -> Self {
        Self::with_pairs(
            ElementType::Attachment,
            [("caption", caption.into()), ("data", data.into())],
        )
    }

    /// Placeholder for the inline blip with id `blip_id`
    pub fn inline_blip(blip_id: &str) -> Self {
        Self::with_pairs(ElementType::InlineBlip, [("id", blip_id.into())])
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key.to_string(), value.into());
        self
    }

    pub fn element_type(&self) -> &ElementType {
        &self.element_type
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Property value, `None` when missing or null
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).filter(|value| !value.is_null())
    }

    /// Property value, or `default` when missing or null
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.get(key).unwrap_or(default)
    }

    /// String property, `None` when missing or not a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Gadget state keys (every property except `url`)
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties
            .keys()
            .map(String::as_str)
            .filter(|key| *key != "url")
    }

    /// Merge `updates` into the property map in place. A null update
    /// clears the property.
    pub fn update(&mut self, updates: &Properties) {
        for (key, value) in updates {
            self.set(key.clone(), value.clone());
        }
    }

    /// Whether this element has the given type and every restriction
    /// matches a property exactly. A missing property compares as null.
    pub fn matches(&self, element_type: &ElementType, restrictions: &Properties) -> bool {
        if &self.element_type != element_type {
            return false;
        }
        restrictions.iter().all(|(key, expected)| {
            self.properties.get(key).unwrap_or(&Value::Null) == expected
        })
    }

    /// Wire form of this element
    pub fn to_snapshot(&self) -> ElementSnapshot {
        ElementSnapshot {
            element_type: self.element_type.clone(),
            properties: self.properties.clone(),
        }
    }

    pub fn from_snapshot(snapshot: ElementSnapshot) -> Self {
        Self::new(snapshot.element_type, snapshot.properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_names_round_trip() {
        for name in ["INPUT", "RADIO_BUTTON_GROUP", "TEXTAREA", "INLINE_BLIP", "GADGET"] {
            assert_eq!(ElementType::from(name).as_str(), name);
        }
        assert_eq!(
            ElementType::from("SPARKLE"),
            ElementType::Other("SPARKLE".to_string())
        );
    }

    #[test]
    fn test_null_properties_dropped_on_serialize() {
        let image = Element::image("http://a/b.png").with_property("width", 20);
        let snapshot = image.to_snapshot();

        assert_eq!(snapshot.properties.len(), 2);
        assert_eq!(snapshot.properties["url"], json!("http://a/b.png"));
        assert_eq!(snapshot.properties["width"], json!(20));
    }

    #[test]
    fn test_null_properties_are_not_stored() {
        let attachment = Element::attachment("cat", "bytes").with_property("mimeType", Value::Null);
        assert_eq!(attachment.properties().len(), 2);

        let mut line = Element::line(Some("h1")).with_property("indent", 2);
        let mut updates = Properties::new();
        updates.insert("indent".to_string(), Value::Null);
        line.update(&updates);
        assert_eq!(line.get_str("lineType"), Some("h1"));
        assert!(!line.properties().contains_key("indent"));
        assert_eq!(Element::from_snapshot(line.to_snapshot()), line);
    }

    #[test]
    fn test_gadget_keeps_null_properties() {
        let mut state = Properties::new();
        state.insert("seen".to_string(), Value::Null);
        let gadget = Element::gadget("http://a/b.xml", state);

        let snapshot = gadget.to_snapshot();
        assert_eq!(snapshot.properties.get("seen"), Some(&Value::Null));
        assert_eq!(gadget.keys().collect::<Vec<_>>(), vec!["seen"]);
    }

    #[test]
    fn test_get_accessors() {
        let button = Element::button("ok", "Click");
        assert_eq!(button.get_str("value"), Some("Click"));
        assert_eq!(button.get("missing"), None);
        assert_eq!(button.get_or("missing", &json!("x")), &json!("x"));

        let line = Element::line(None);
        assert_eq!(line.get("lineType"), None);
    }

    #[test]
    fn test_update_merges_in_place() {
        let mut button = Element::button("test1", "Click");
        let mut updates = Properties::new();
        updates.insert("name".to_string(), json!("test2"));
        button.update(&updates);

        assert_eq!(button.get_str("name"), Some("test2"));
        assert_eq!(button.get_str("value"), Some("Click"));
        assert_eq!(button.element_type(), &ElementType::Button);
    }

    #[test]
    fn test_restriction_matching() {
        let image = Element::image("http://a/b.png");
        let mut restrictions = Properties::new();
        restrictions.insert("url".to_string(), json!("http://a/b.png"));

        assert!(image.matches(&ElementType::Image, &restrictions));
        assert!(!image.matches(&ElementType::Gadget, &restrictions));

        restrictions.insert("caption".to_string(), json!("cat"));
        assert!(!image.matches(&ElementType::Image, &restrictions));
    }
}
