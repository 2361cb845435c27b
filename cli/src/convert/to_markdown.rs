//! Block → Markdown rendering.
//!
//! The inverse of `to_blocks`: produces one line per block (two-space
//! indentation per nesting level) so a pulled file pushed back converts
//! to the same block list. Output is deterministic for equal inputs;
//! change detection hashes it directly.

use regex::Regex;
use std::fmt::Write as _;
use std::sync::OnceLock;

use crate::error::Result;
use crate::notion::types::{Block, BlockPayload, RichText, RichTextBlock};
use crate::notion::NotionClient;

static H_MARKER_REGEX: OnceLock<Regex> = OnceLock::new();

fn h_marker_regex() -> &'static Regex {
    H_MARKER_REGEX.get_or_init(|| Regex::new(r"^\(h_(\d+)\)\s(.*)$").unwrap())
}

/// Render a block list (children already resolved) to Markdown.
///
/// Child-page blocks are skipped; the pull engine materializes them as
/// separate files.
#[must_use]
pub fn blocks_to_markdown(blocks: &[Block]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for block in blocks {
        render_block(block, 0, &mut lines);
    }
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn render_block(block: &Block, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match &block.payload {
        BlockPayload::Paragraph { paragraph } => {
            let plain = plain_text(&paragraph.rich_text);
            // Restore headings deeper than level 3 from their marker
            if let Some(caps) = h_marker_regex().captures(&plain) {
                let level: usize = caps[1].parse().unwrap_or(4);
                if level >= 4 {
                    lines.push(format!("{indent}{} {}", "#".repeat(level), &caps[2]));
                    render_children(paragraph, depth, lines);
                    return;
                }
            }
            lines.push(format!("{indent}{}", inline_to_markdown(&paragraph.rich_text)));
            render_children(paragraph, depth, lines);
        }
        BlockPayload::Heading1 { heading_1 } => {
            lines.push(format!("{indent}# {}", inline_to_markdown(&heading_1.rich_text)));
        }
        BlockPayload::Heading2 { heading_2 } => {
            lines.push(format!("{indent}## {}", inline_to_markdown(&heading_2.rich_text)));
        }
        BlockPayload::Heading3 { heading_3 } => {
            lines.push(format!("{indent}### {}", inline_to_markdown(&heading_3.rich_text)));
        }
        BlockPayload::BulletedListItem { bulleted_list_item } => {
            lines.push(format!(
                "{indent}- {}",
                inline_to_markdown(&bulleted_list_item.rich_text)
            ));
            render_children(bulleted_list_item, depth + 1, lines);
        }
        BlockPayload::NumberedListItem { numbered_list_item } => {
            lines.push(format!(
                "{indent}1. {}",
                inline_to_markdown(&numbered_list_item.rich_text)
            ));
            render_children(numbered_list_item, depth + 1, lines);
        }
        BlockPayload::Quote { quote } => {
            lines.push(format!("{indent}> {}", inline_to_markdown(&quote.rich_text)));
            render_children(quote, depth, lines);
        }
        BlockPayload::Code { code } => {
            lines.push(format!("{indent}```{}", code.language));
            let body = plain_text(&code.rich_text);
            // A trailing newline would render as a stray blank line
            let trimmed = body.strip_suffix('\n').unwrap_or(&body);
            for line in trimmed.split('\n') {
                lines.push(format!("{indent}{line}"));
            }
            lines.push(format!("{indent}```"));
        }
        BlockPayload::Divider { .. } => lines.push(format!("{indent}---")),
        BlockPayload::Table { table } => {
            let Some(rows) = &table.children else {
                return;
            };
            for (i, row) in rows.iter().enumerate() {
                let BlockPayload::TableRow { table_row } = &row.payload else {
                    continue;
                };
                let cells: Vec<String> = table_row
                    .cells
                    .iter()
                    .map(|cell| inline_to_markdown(cell))
                    .collect();
                lines.push(format!("{indent}| {} |", cells.join(" | ")));
                if i == 0 && table.has_column_header {
                    let seps = vec!["---"; table.table_width.max(cells.len())];
                    lines.push(format!("{indent}| {} |", seps.join(" | ")));
                }
            }
        }
        BlockPayload::TableRow { .. } => {
            // Rendered by the owning table
        }
        BlockPayload::Image { image } => {
            if let Some(url) = image.url() {
                let caption = plain_text(&image.caption);
                lines.push(format!("{indent}![{caption}]({url})"));
            }
        }
        BlockPayload::ChildPage { .. } | BlockPayload::Unsupported => {}
    }
}

fn render_children(body: &RichTextBlock, depth: usize, lines: &mut Vec<String>) {
    if let Some(children) = &body.children {
        for child in children {
            render_block(child, depth, lines);
        }
    }
}

/// Concatenated text with no formatting applied.
fn plain_text(rich_text: &[RichText]) -> String {
    rich_text.iter().map(RichText::effective_text).collect()
}

/// Render rich-text segments with inline Markdown formatting.
fn inline_to_markdown(rich_text: &[RichText]) -> String {
    let mut out = String::new();
    for segment in rich_text {
        let mut text = segment.effective_text().to_string();
        let a = &segment.annotations;
        if a.code {
            text = format!("`{text}`");
        }
        if a.strikethrough {
            text = format!("~~{text}~~");
        }
        if a.italic {
            text = format!("*{text}*");
        }
        if a.bold {
            text = format!("**{text}**");
        }
        if let Some(url) = segment.effective_link() {
            text = format!("[{text}]({url})");
        }
        let _ = write!(out, "{text}");
    }
    out
}

/// Renders remote pages to Markdown, fetching nested children on demand.
pub struct PageRenderer<'a> {
    client: &'a NotionClient,
}

impl<'a> PageRenderer<'a> {
    #[must_use]
    pub fn new(client: &'a NotionClient) -> Self {
        Self { client }
    }

    /// Fetch a page's block tree and render it to Markdown.
    ///
    /// # Errors
    ///
    /// Propagates remote errors from block fetching.
    pub async fn render_page(&self, page_id: &str) -> Result<String> {
        let blocks = self.client.get_child_blocks(page_id).await?;
        self.render_blocks(blocks).await
    }

    /// Render blocks already fetched by the caller, resolving nested
    /// children first.
    ///
    /// # Errors
    ///
    /// Propagates remote errors from child fetching.
    pub async fn render_blocks(&self, blocks: Vec<Block>) -> Result<String> {
        let resolved = self.resolve_children(blocks, 0).await?;
        Ok(blocks_to_markdown(&resolved))
    }

    /// Recursively fetch children for blocks that carry them remotely
    /// (nested list items, tables).
    fn resolve_children<'b>(
        &'b self,
        blocks: Vec<Block>,
        depth: usize,
    ) -> futures::future::BoxFuture<'b, Result<Vec<Block>>> {
        Box::pin(async move {
            // Nesting guard against pathological or cyclic trees
            if depth >= 10 {
                return Ok(blocks);
            }
            let mut resolved = Vec::with_capacity(blocks.len());
            for mut block in blocks {
                let wants_children = block.has_children
                    && !matches!(block.payload, BlockPayload::ChildPage { .. });
                if wants_children {
                    if let Some(id) = block.id.clone() {
                        let children = self.client.get_child_blocks(&id).await?;
                        let children = self.resolve_children(children, depth + 1).await?;
                        attach_children(&mut block.payload, children);
                    }
                }
                resolved.push(block);
            }
            Ok(resolved)
        })
    }
}

fn attach_children(payload: &mut BlockPayload, children: Vec<Block>) {
    match payload {
        BlockPayload::Paragraph { paragraph: body }
        | BlockPayload::BulletedListItem {
            bulleted_list_item: body,
        }
        | BlockPayload::NumberedListItem {
            numbered_list_item: body,
        }
        | BlockPayload::Quote { quote: body } => body.children = Some(children),
        BlockPayload::Table { table } => table.children = Some(children),
        _ => {}
    }
}
