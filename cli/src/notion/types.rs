//! Serde types for the Notion REST API surface used by the engines.
//!
//! Only the fields the sync engines read are modeled; everything else is
//! dropped at deserialization time. Block payloads round-trip through the
//! converter, so their shapes match what the API both returns and accepts.

use serde::{Deserialize, Serialize};

// ── Rich text ─────────────────────────────────────────────────

/// Inline formatting flags for a rich-text segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub code: bool,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "default".to_string()
}

/// An inline link target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
}

/// The `text` payload of a rich-text segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

/// One rich-text segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    #[serde(rename = "type", default = "default_text_type")]
    pub kind: String,
    #[serde(default)]
    pub text: TextContent,
    #[serde(default, skip_serializing_if = "is_default_annotations")]
    pub annotations: Annotations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

fn default_text_type() -> String {
    "text".to_string()
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_default_annotations(a: &Annotations) -> bool {
    *a == Annotations::default()
}

impl RichText {
    /// Plain segment with default annotations.
    #[must_use]
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            text: TextContent {
                content: content.into(),
                link: None,
            },
            ..Self::default()
        }
    }

    /// The effective text of this segment (prefers `plain_text` from the
    /// API, falls back to `text.content`).
    #[must_use]
    pub fn effective_text(&self) -> &str {
        self.plain_text.as_deref().unwrap_or(&self.text.content)
    }

    /// The effective link URL, from either the text payload or `href`.
    #[must_use]
    pub fn effective_link(&self) -> Option<&str> {
        self.text
            .link
            .as_ref()
            .map(|l| l.url.as_str())
            .or(self.href.as_deref())
    }
}

// ── Blocks ────────────────────────────────────────────────────

/// Payload of a paragraph-like block (paragraph, headings, list items,
/// quote): rich text plus optional nested children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Block>>,
}

/// Payload of a code block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub language: String,
}

/// Payload of a table block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    pub table_width: usize,
    #[serde(default)]
    pub has_column_header: bool,
    #[serde(default)]
    pub has_row_header: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Block>>,
}

/// Payload of a table row: one cell per column, each a rich-text array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRowBlock {
    #[serde(default)]
    pub cells: Vec<Vec<RichText>>,
}

/// An external or API-hosted file reference (images).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(default)]
    pub url: String,
}

/// Payload of an image block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<FileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caption: Vec<RichText>,
}

impl ImageBlock {
    /// The hosted URL, wherever it lives.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.external
            .as_ref()
            .or(self.file.as_ref())
            .map(|f| f.url.as_str())
    }
}

/// Payload of a child-page block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChildPageBlock {
    #[serde(default)]
    pub title: String,
}

/// Typed block payload, tagged by the API's `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockPayload {
    Paragraph { paragraph: RichTextBlock },
    #[serde(rename = "heading_1")]
    Heading1 { heading_1: RichTextBlock },
    #[serde(rename = "heading_2")]
    Heading2 { heading_2: RichTextBlock },
    #[serde(rename = "heading_3")]
    Heading3 { heading_3: RichTextBlock },
    BulletedListItem { bulleted_list_item: RichTextBlock },
    NumberedListItem { numbered_list_item: RichTextBlock },
    Quote { quote: RichTextBlock },
    Code { code: CodeBlock },
    Divider { divider: serde_json::Value },
    Table { table: TableBlock },
    TableRow { table_row: TableRowBlock },
    Image { image: ImageBlock },
    ChildPage { child_page: ChildPageBlock },
    /// Any block kind the converter does not model.
    #[serde(other)]
    Unsupported,
}

/// A block as returned by (and sent to) the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Always "block" on the wire.
    #[serde(default = "default_object")]
    pub object: String,

    /// Assigned by the server; absent on blocks we create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub has_children: bool,

    #[serde(flatten)]
    pub payload: BlockPayload,
}

fn default_object() -> String {
    "block".to_string()
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

impl Block {
    /// New outgoing block around a payload.
    #[must_use]
    pub fn new(payload: BlockPayload) -> Self {
        Self {
            object: default_object(),
            id: None,
            has_children: false,
            payload,
        }
    }
}

// ── Pages ─────────────────────────────────────────────────────

/// A page's parent reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Parent {
    PageId { page_id: String },
    DatabaseId { database_id: String },
    Workspace { workspace: bool },
    #[serde(other)]
    Other,
}

/// Emoji icon attached to a page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Icon {
    Emoji { emoji: String },
    #[serde(other)]
    Other,
}

/// A page object, reduced to the fields the engines read.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub last_edited_time: String,
    #[serde(default)]
    pub parent: Option<Parent>,
    #[serde(default)]
    pub icon: Option<Icon>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub properties: serde_json::Value,
}

impl Page {
    /// Extract the title from the page's `title` property, trying the
    /// common property names.
    #[must_use]
    pub fn title(&self) -> String {
        let props = self.properties.as_object();
        let Some(props) = props else {
            return "Untitled".to_string();
        };
        for value in props.values() {
            if value.get("type").and_then(|t| t.as_str()) != Some("title") {
                continue;
            }
            if let Some(parts) = value.get("title").and_then(|t| t.as_array()) {
                let text: String = parts
                    .iter()
                    .filter_map(|p| p.get("plain_text").and_then(|t| t.as_str()))
                    .collect();
                if !text.is_empty() {
                    return text;
                }
            }
        }
        "Untitled".to_string()
    }

    /// Dashed parent page id, when the parent is a page.
    #[must_use]
    pub fn parent_page_id(&self) -> Option<&str> {
        match &self.parent {
            Some(Parent::PageId { page_id }) => Some(page_id),
            _ => None,
        }
    }
}

/// A paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockList {
    #[serde(default)]
    pub results: Vec<Block>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_payload_wire_tag() {
        let block = Block::new(BlockPayload::Heading1 {
            heading_1: RichTextBlock {
                rich_text: vec![RichText::plain("Hi")],
                children: None,
            },
        });
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["object"], "block");
        assert_eq!(json["type"], "heading_1");
        assert_eq!(json["heading_1"]["rich_text"][0]["text"]["content"], "Hi");
    }

    #[test]
    fn test_unknown_block_type_deserializes_as_unsupported() {
        let json = r#"{"object":"block","id":"b1","type":"callout","callout":{}}"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.payload, BlockPayload::Unsupported);
    }

    #[test]
    fn test_page_title_extraction() {
        let json = serde_json::json!({
            "id": "27db1a4f-8d1c-4ce5-9f2a-11aa6bb41234",
            "url": "https://www.notion.so/x",
            "last_edited_time": "2025-01-01T00:00:00.000Z",
            "parent": {"type": "page_id", "page_id": "parent-id"},
            "properties": {
                "title": {
                    "type": "title",
                    "title": [{"plain_text": "My "}, {"plain_text": "Page"}]
                }
            }
        });
        let page: Page = serde_json::from_value(json).unwrap();
        assert_eq!(page.title(), "My Page");
        assert_eq!(page.parent_page_id(), Some("parent-id"));
    }

    #[test]
    fn test_rich_text_effective_fields() {
        let json = serde_json::json!({
            "type": "text",
            "text": {"content": "link text", "link": {"url": "https://example.com"}},
            "plain_text": "link text",
            "annotations": {"bold": true, "italic": false, "strikethrough": false,
                             "underline": false, "code": false, "color": "default"}
        });
        let rt: RichText = serde_json::from_value(json).unwrap();
        assert_eq!(rt.effective_text(), "link text");
        assert_eq!(rt.effective_link(), Some("https://example.com"));
        assert!(rt.annotations.bold);
    }
}
