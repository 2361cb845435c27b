//! Markdown → block conversion.
//!
//! Drives a `pulldown-cmark` event stream into the remote block model.
//! Each source line maps to its own block (soft breaks split paragraphs),
//! which keeps the rendering in `to_markdown` a stable inverse: pushing a
//! pulled file again produces identical blocks.
//!
//! Headings deeper than level 3 have no remote representation; they are
//! encoded as bold paragraphs prefixed `(h_N) ` and restored on pull.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use super::{chunked_code_rich_text, normalize_fence_language, MAX_TEXT_LEN};
use crate::notion::types::{
    Annotations, Block, BlockPayload, CodeBlock, ImageBlock, Link, RichText, RichTextBlock,
    TableBlock, TableRowBlock, TextContent,
};
use crate::projection::split_frontmatter;

/// Convert a whole code file into a single code block with the given
/// language tag, chunking the text into rich-text segments.
#[must_use]
pub fn code_file_to_blocks(content: &str, language: &str) -> Vec<Block> {
    vec![Block::new(BlockPayload::Code {
        code: CodeBlock {
            rich_text: chunked_code_rich_text(content),
            language: language.to_string(),
        },
    })]
}

/// Convert Markdown text into a block list.
///
/// Front-matter (if any) is stripped first; it belongs to the projection
/// layer, not to page content.
#[must_use]
pub fn markdown_to_blocks(markdown: &str) -> Vec<Block> {
    let (_, body) = split_frontmatter(markdown);

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(body, options);

    let mut builder = BlockBuilder::default();
    for event in parser {
        builder.event(event);
    }
    builder.finish()
}

/// Accumulates inline rich-text segments with the active annotations.
#[derive(Default)]
struct InlineCollector {
    segments: Vec<RichText>,
    bold: u32,
    italic: u32,
    strikethrough: u32,
    link: Option<String>,
}

impl InlineCollector {
    fn annotations(&self, code: bool) -> Annotations {
        Annotations {
            bold: self.bold > 0,
            italic: self.italic > 0,
            strikethrough: self.strikethrough > 0,
            code,
            ..Annotations::default()
        }
    }

    fn push_text(&mut self, text: &str, code: bool) {
        if text.is_empty() {
            return;
        }
        let annotations = self.annotations(code);
        let link = self.link.clone().map(|url| Link { url });
        let chars: Vec<char> = text.chars().collect();
        for chunk in chars.chunks(MAX_TEXT_LEN) {
            self.segments.push(RichText {
                text: TextContent {
                    content: chunk.iter().collect(),
                    link: link.clone(),
                },
                annotations: annotations.clone(),
                ..RichText::default()
            });
        }
    }

    fn take(&mut self) -> Vec<RichText> {
        std::mem::take(&mut self.segments)
    }

    fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// A list being collected, possibly nested inside an item.
struct ListFrame {
    numbered: bool,
    items: Vec<Block>,
}

/// A list item being collected: its own text plus nested child blocks.
struct ItemFrame {
    numbered: bool,
    rich_text: Vec<RichText>,
    children: Vec<Block>,
}

/// A table being collected row by row.
#[derive(Default)]
struct TableFrame {
    rows: Vec<Vec<Vec<RichText>>>,
    current_row: Vec<Vec<RichText>>,
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    inline: InlineCollector,
    heading: Option<u32>,
    quote_depth: u32,
    code: Option<(String, String)>,
    lists: Vec<ListFrame>,
    items: Vec<ItemFrame>,
    table: Option<TableFrame>,
    image: Option<ImageCollect>,
}

struct ImageCollect {
    url: String,
    alt: String,
}

impl BlockBuilder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some((_, buffer)) = &mut self.code {
                    buffer.push_str(&text);
                } else if let Some(image) = &mut self.image {
                    image.alt.push_str(&text);
                } else {
                    self.inline.push_text(&text, false);
                }
            }
            Event::Code(text) => {
                if let Some(image) = &mut self.image {
                    image.alt.push_str(&text);
                } else {
                    self.inline.push_text(&text, true);
                }
            }
            // Line-oriented model: breaks split the current paragraph
            Event::SoftBreak | Event::HardBreak => self.flush_paragraph(),
            Event::Rule => {
                self.emit(Block::new(BlockPayload::Divider {
                    divider: serde_json::json!({}),
                }));
            }
            Event::Html(text) | Event::InlineHtml(text) => {
                self.inline.push_text(&text, false);
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.heading = Some(heading_level_number(level));
            }
            Tag::Paragraph => {}
            Tag::BlockQuote(_) => self.quote_depth += 1,
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    pulldown_cmark::CodeBlockKind::Fenced(info) => {
                        normalize_fence_language(&info).to_string()
                    }
                    pulldown_cmark::CodeBlockKind::Indented => "plain text".to_string(),
                };
                self.code = Some((lang, String::new()));
            }
            Tag::List(start) => {
                // A list opening inside an item: the pending inline text
                // is the item's own line, not part of the sublist
                if let Some(item) = self.items.last_mut() {
                    if item.rich_text.is_empty() && !self.inline.is_empty() {
                        item.rich_text = self.inline.take();
                    }
                }
                self.lists.push(ListFrame {
                    numbered: start.is_some(),
                    items: Vec::new(),
                });
            }
            Tag::Item => {
                let numbered = self.lists.last().is_some_and(|l| l.numbered);
                self.items.push(ItemFrame {
                    numbered,
                    rich_text: Vec::new(),
                    children: Vec::new(),
                });
            }
            Tag::Emphasis => self.inline.italic += 1,
            Tag::Strong => self.inline.bold += 1,
            Tag::Strikethrough => self.inline.strikethrough += 1,
            Tag::Link { dest_url, .. } => self.inline.link = Some(dest_url.to_string()),
            Tag::Image { dest_url, .. } => {
                self.image = Some(ImageCollect {
                    url: dest_url.to_string(),
                    alt: String::new(),
                });
            }
            Tag::Table(_) => self.table = Some(TableFrame::default()),
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = &mut self.table {
                    table.current_row.clear();
                }
            }
            Tag::TableCell => {}
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                let level = self.heading.take().unwrap_or(1);
                let rich_text = self.inline.take();
                let block = heading_block(level, rich_text);
                self.emit(block);
            }
            TagEnd::Paragraph => self.flush_paragraph(),
            TagEnd::BlockQuote { .. } => self.quote_depth = self.quote_depth.saturating_sub(1),
            TagEnd::CodeBlock => {
                if let Some((language, mut text)) = self.code.take() {
                    // The parser keeps the final newline of the fence body
                    if text.ends_with('\n') {
                        text.pop();
                    }
                    self.emit(Block::new(BlockPayload::Code {
                        code: CodeBlock {
                            rich_text: super::chunked_rich_text(&text),
                            language,
                        },
                    }));
                }
            }
            TagEnd::Item => {
                // Any inline text not yet flushed belongs to this item
                let trailing = self.inline.take();
                if let Some(mut item) = self.items.pop() {
                    if item.rich_text.is_empty() {
                        item.rich_text = trailing;
                    } else if !trailing.is_empty() {
                        item.rich_text.extend(trailing);
                    }
                    let block = list_item_block(item);
                    if let Some(list) = self.lists.last_mut() {
                        list.items.push(block);
                    } else {
                        self.blocks.push(block);
                    }
                }
            }
            TagEnd::List(_) => {
                if let Some(list) = self.lists.pop() {
                    if let Some(item) = self.items.last_mut() {
                        // Nested list: capture the item's own text first,
                        // then attach the sub-items as children
                        if item.rich_text.is_empty() {
                            item.rich_text = self.inline.take();
                        }
                        item.children.extend(list.items);
                    } else {
                        self.blocks.extend(list.items);
                    }
                }
            }
            TagEnd::Emphasis => self.inline.italic = self.inline.italic.saturating_sub(1),
            TagEnd::Strong => self.inline.bold = self.inline.bold.saturating_sub(1),
            TagEnd::Strikethrough => {
                self.inline.strikethrough = self.inline.strikethrough.saturating_sub(1);
            }
            TagEnd::Link => self.inline.link = None,
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    // Remote-hosted images only; local paths are deferred
                    if image.url.starts_with("http://") || image.url.starts_with("https://") {
                        self.flush_paragraph();
                        self.emit(Block::new(BlockPayload::Image {
                            image: ImageBlock {
                                external: Some(crate::notion::types::FileRef { url: image.url }),
                                file: None,
                                caption: if image.alt.is_empty() {
                                    Vec::new()
                                } else {
                                    vec![RichText::plain(image.alt)]
                                },
                            },
                        }));
                    }
                }
            }
            TagEnd::TableHead | TagEnd::TableRow => {
                if let Some(table) = &mut self.table {
                    table.rows.push(std::mem::take(&mut table.current_row));
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = &mut self.table {
                    table.current_row.push(self.inline.take());
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.emit(table_block(table));
                }
            }
            _ => {}
        }
    }

    /// Emit the pending inline text as a paragraph (or quote) block.
    fn flush_paragraph(&mut self) {
        if self.inline.is_empty() {
            return;
        }
        let rich_text = self.inline.take();
        let payload = if self.quote_depth > 0 {
            BlockPayload::Quote {
                quote: RichTextBlock {
                    rich_text,
                    children: None,
                },
            }
        } else {
            BlockPayload::Paragraph {
                paragraph: RichTextBlock {
                    rich_text,
                    children: None,
                },
            }
        };
        self.emit(Block::new(payload));
    }

    /// Route a finished block to the innermost open list item, or to the
    /// top level.
    fn emit(&mut self, block: Block) {
        if let Some(item) = self.items.last_mut() {
            // Text inside an item stays inline; structured blocks nest
            if item.rich_text.is_empty() && !self.inline.is_empty() {
                item.rich_text = self.inline.take();
            }
            item.children.push(block);
        } else {
            self.blocks.push(block);
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush_paragraph();
        self.blocks
    }
}

fn heading_level_number(level: HeadingLevel) -> u32 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn heading_block(level: u32, rich_text: Vec<RichText>) -> Block {
    let payload = match level {
        1 => BlockPayload::Heading1 {
            heading_1: RichTextBlock {
                rich_text,
                children: None,
            },
        },
        2 => BlockPayload::Heading2 {
            heading_2: RichTextBlock {
                rich_text,
                children: None,
            },
        },
        3 => BlockPayload::Heading3 {
            heading_3: RichTextBlock {
                rich_text,
                children: None,
            },
        },
        deeper => {
            // No remote heading past level 3: bold paragraph with a
            // restorable marker prefix
            let mut segments = vec![RichText {
                text: TextContent {
                    content: format!("(h_{deeper}) "),
                    link: None,
                },
                annotations: Annotations {
                    bold: true,
                    ..Annotations::default()
                },
                ..RichText::default()
            }];
            segments.extend(rich_text.into_iter().map(|mut rt| {
                rt.annotations.bold = true;
                rt
            }));
            BlockPayload::Paragraph {
                paragraph: RichTextBlock {
                    rich_text: segments,
                    children: None,
                },
            }
        }
    };
    Block::new(payload)
}

fn list_item_block(item: ItemFrame) -> Block {
    let children = if item.children.is_empty() {
        None
    } else {
        Some(item.children)
    };
    let body = RichTextBlock {
        rich_text: item.rich_text,
        children,
    };
    let payload = if item.numbered {
        BlockPayload::NumberedListItem {
            numbered_list_item: body,
        }
    } else {
        BlockPayload::BulletedListItem {
            bulleted_list_item: body,
        }
    };
    Block::new(payload)
}

fn table_block(table: TableFrame) -> Block {
    let width = table.rows.iter().map(Vec::len).max().unwrap_or(0);
    let children: Vec<Block> = table
        .rows
        .into_iter()
        .map(|mut cells| {
            cells.resize_with(width, Vec::new);
            Block::new(BlockPayload::TableRow {
                table_row: TableRowBlock { cells },
            })
        })
        .collect();
    Block::new(BlockPayload::Table {
        table: TableBlock {
            table_width: width,
            has_column_header: true,
            has_row_header: false,
            children: Some(children),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(rich_text: &[RichText]) -> String {
        rich_text.iter().map(|rt| rt.text.content.as_str()).collect()
    }

    #[test]
    fn test_heading_and_paragraph() {
        let blocks = markdown_to_blocks("# Hi\nhello\n");
        assert_eq!(blocks.len(), 2);
        match &blocks[0].payload {
            BlockPayload::Heading1 { heading_1 } => {
                assert_eq!(text_of(&heading_1.rich_text), "Hi");
            }
            other => panic!("expected heading_1, got {other:?}"),
        }
        match &blocks[1].payload {
            BlockPayload::Paragraph { paragraph } => {
                assert_eq!(text_of(&paragraph.rich_text), "hello");
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_deep_heading_becomes_marked_bold_paragraph() {
        let blocks = markdown_to_blocks("#### Deep\n");
        assert_eq!(blocks.len(), 1);
        match &blocks[0].payload {
            BlockPayload::Paragraph { paragraph } => {
                assert_eq!(text_of(&paragraph.rich_text), "(h_4) Deep");
                assert!(paragraph.rich_text.iter().all(|rt| rt.annotations.bold));
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_inline_annotations() {
        let blocks = markdown_to_blocks("a **bold** and *it* and `co` end\n");
        let BlockPayload::Paragraph { paragraph } = &blocks[0].payload else {
            panic!("expected paragraph");
        };
        let seg_bold = paragraph
            .rich_text
            .iter()
            .find(|rt| rt.text.content == "bold")
            .unwrap();
        assert!(seg_bold.annotations.bold);
        let seg_it = paragraph
            .rich_text
            .iter()
            .find(|rt| rt.text.content == "it")
            .unwrap();
        assert!(seg_it.annotations.italic);
        let seg_code = paragraph
            .rich_text
            .iter()
            .find(|rt| rt.text.content == "co")
            .unwrap();
        assert!(seg_code.annotations.code);
    }

    #[test]
    fn test_link_segment() {
        let blocks = markdown_to_blocks("see [docs](https://example.com/d)\n");
        let BlockPayload::Paragraph { paragraph } = &blocks[0].payload else {
            panic!("expected paragraph");
        };
        let link_seg = paragraph
            .rich_text
            .iter()
            .find(|rt| rt.text.content == "docs")
            .unwrap();
        assert_eq!(
            link_seg.text.link.as_ref().map(|l| l.url.as_str()),
            Some("https://example.com/d")
        );
    }

    #[test]
    fn test_nested_list() {
        let blocks = markdown_to_blocks("- a\n  - b\n- c\n");
        assert_eq!(blocks.len(), 2);
        let BlockPayload::BulletedListItem { bulleted_list_item } = &blocks[0].payload else {
            panic!("expected bulleted item");
        };
        assert_eq!(text_of(&bulleted_list_item.rich_text), "a");
        let children = bulleted_list_item.children.as_ref().unwrap();
        assert_eq!(children.len(), 1);
        let BlockPayload::BulletedListItem { bulleted_list_item: nested } = &children[0].payload
        else {
            panic!("expected nested bulleted item");
        };
        assert_eq!(text_of(&nested.rich_text), "b");
    }

    #[test]
    fn test_numbered_list() {
        let blocks = markdown_to_blocks("1. first\n2. second\n");
        assert_eq!(blocks.len(), 2);
        assert!(matches!(
            blocks[0].payload,
            BlockPayload::NumberedListItem { .. }
        ));
    }

    #[test]
    fn test_quote() {
        let blocks = markdown_to_blocks("> wisdom\n");
        assert_eq!(blocks.len(), 1);
        match &blocks[0].payload {
            BlockPayload::Quote { quote } => assert_eq!(text_of(&quote.rich_text), "wisdom"),
            other => panic!("expected quote, got {other:?}"),
        }
    }

    #[test]
    fn test_fenced_code_with_language_alias() {
        let blocks = markdown_to_blocks("```py\nprint('hi')\n```\n");
        assert_eq!(blocks.len(), 1);
        match &blocks[0].payload {
            BlockPayload::Code { code } => {
                assert_eq!(code.language, "python");
                assert_eq!(text_of(&code.rich_text), "print('hi')");
            }
            other => panic!("expected code, got {other:?}"),
        }
    }

    #[test]
    fn test_divider() {
        let blocks = markdown_to_blocks("a\n\n---\n\nb\n");
        assert_eq!(blocks.len(), 3);
        assert!(matches!(blocks[1].payload, BlockPayload::Divider { .. }));
    }

    #[test]
    fn test_table() {
        let blocks = markdown_to_blocks("| a | b |\n| --- | --- |\n| 1 | 2 |\n");
        assert_eq!(blocks.len(), 1);
        let BlockPayload::Table { table } = &blocks[0].payload else {
            panic!("expected table");
        };
        assert_eq!(table.table_width, 2);
        assert!(table.has_column_header);
        let rows = table.children.as_ref().unwrap();
        assert_eq!(rows.len(), 2);
        let BlockPayload::TableRow { table_row } = &rows[0].payload else {
            panic!("expected table row");
        };
        assert_eq!(text_of(&table_row.cells[0]), "a");
        assert_eq!(text_of(&table_row.cells[1]), "b");
    }

    #[test]
    fn test_remote_image_becomes_image_block() {
        let blocks = markdown_to_blocks("![logo](https://example.com/x.png)\n");
        assert_eq!(blocks.len(), 1);
        let BlockPayload::Image { image } = &blocks[0].payload else {
            panic!("expected image");
        };
        assert_eq!(image.url(), Some("https://example.com/x.png"));
        assert_eq!(text_of(&image.caption), "logo");
    }

    #[test]
    fn test_local_image_is_deferred() {
        let blocks = markdown_to_blocks("![local](./pic.png)\n");
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_frontmatter_is_stripped() {
        let blocks = markdown_to_blocks("---\npage_id: abc\n---\n\nbody\n");
        assert_eq!(blocks.len(), 1);
        assert!(matches!(blocks[0].payload, BlockPayload::Paragraph { .. }));
    }

    #[test]
    fn test_code_file_single_block() {
        let blocks = code_file_to_blocks("fn main() {}\n", "rust");
        assert_eq!(blocks.len(), 1);
        match &blocks[0].payload {
            BlockPayload::Code { code } => {
                assert_eq!(code.language, "rust");
                assert_eq!(code.rich_text.len(), 1);
                assert_eq!(code.rich_text[0].text.content, "fn main() {}\n");
            }
            other => panic!("expected code, got {other:?}"),
        }
    }

    #[test]
    fn test_long_paragraph_is_chunked() {
        let long = "x".repeat(4000);
        let blocks = markdown_to_blocks(&long);
        let BlockPayload::Paragraph { paragraph } = &blocks[0].payload else {
            panic!("expected paragraph");
        };
        assert!(paragraph.rich_text.len() >= 3);
        assert!(paragraph
            .rich_text
            .iter()
            .all(|rt| rt.text.content.chars().count() <= MAX_TEXT_LEN));
    }
}
