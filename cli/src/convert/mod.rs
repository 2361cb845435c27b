//! Bidirectional translation between Markdown and the remote block model.
//!
//! `to_blocks` turns Markdown (CommonMark + tables + fenced code +
//! images) or a whole code file into the block list the remote accepts;
//! `to_markdown` renders fetched blocks back into Markdown. Rendering is
//! deterministic for equal inputs so hash-based change detection does not
//! see spurious diffs on round trips.

mod to_blocks;
mod to_markdown;

pub use to_blocks::{code_file_to_blocks, markdown_to_blocks};
pub use to_markdown::{blocks_to_markdown, PageRenderer};

use crate::notion::types::RichText;

/// Maximum characters per rich-text segment. The remote caps text nodes
/// at 2000; 1800 leaves headroom for escaping.
pub const MAX_TEXT_LEN: usize = 1800;

/// File extensions pushed as a single code block, with their language
/// tags.
pub const CODE_EXTENSIONS: &[(&str, &str)] = &[
    ("py", "python"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("json", "json"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("sh", "bash"),
    ("html", "html"),
    ("css", "css"),
    ("java", "java"),
    ("cpp", "c++"),
    ("c", "c"),
    ("go", "go"),
    ("rs", "rust"),
    ("rb", "ruby"),
    ("php", "php"),
    ("sql", "sql"),
    ("xml", "xml"),
];

/// Image extensions skipped on push.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "svg", "webp", "ico", "tiff", "tif",
];

/// Code-block languages the remote accepts.
const SUPPORTED_LANGUAGES: &[&str] = &[
    "abap", "arduino", "assembly", "bash", "basic", "c", "c#", "c++", "clojure", "coffeescript",
    "css", "dart", "diff", "docker", "elixir", "elm", "erlang", "f#", "flow", "fortran", "gherkin",
    "glsl", "go", "graphql", "groovy", "haskell", "html", "java", "javascript", "json", "julia",
    "kotlin", "latex", "less", "lisp", "livescript", "lua", "makefile", "markdown", "markup",
    "matlab", "mermaid", "nix", "objective-c", "ocaml", "pascal", "perl", "php", "plain text",
    "powershell", "prolog", "protobuf", "python", "r", "ruby", "rust", "sass", "scala", "scheme",
    "scss", "shell", "sql", "swift", "toml", "typescript", "vb.net", "verilog", "vhdl",
    "visual basic", "webassembly", "xml", "yaml",
];

/// Language tag for a code-file extension (lowercase, without dot).
#[must_use]
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.to_lowercase();
    CODE_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

/// Whether an extension is an image extension skipped on push.
#[must_use]
pub fn is_image_extension(ext: &str) -> bool {
    let ext = ext.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|e| *e == ext)
}

/// Map a fence language tag to a remote-accepted language.
///
/// Common abbreviations are aliased; anything the remote does not accept
/// falls back to `plain text`.
#[must_use]
pub fn normalize_fence_language(raw: &str) -> &'static str {
    let raw = raw.trim().to_lowercase();
    let mapped = match raw.as_str() {
        "" | "txt" | "text" | "plain_text" => "plain text",
        "sh" | "zsh" => "bash",
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "yml" => "yaml",
        "md" => "markdown",
        "json5" => "json",
        other => other,
    };
    SUPPORTED_LANGUAGES
        .iter()
        .find(|l| **l == mapped)
        .copied()
        .unwrap_or("plain text")
}

/// Hard per-node character limit imposed by the remote.
const HARD_TEXT_CAP: usize = 2000;

/// Split text into rich-text segments of at most [`MAX_TEXT_LEN`]
/// characters, preserving order. Empty input yields one empty segment so
/// the remote accepts the block.
#[must_use]
pub fn chunked_rich_text(text: &str) -> Vec<RichText> {
    if text.is_empty() {
        return vec![RichText::plain("")];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(MAX_TEXT_LEN)
        .map(|chunk| RichText::plain(chunk.iter().collect::<String>()))
        .collect()
}

/// Chunk a whole code file's text for a single code block.
///
/// Cuts [`MAX_TEXT_LEN`]-char segments, but the final remainder is
/// emitted whole once it fits under the remote's [`HARD_TEXT_CAP`]
/// (avoids a trailing sliver segment), preserving byte order.
#[must_use]
pub fn chunked_code_rich_text(text: &str) -> Vec<RichText> {
    if text.is_empty() {
        return vec![RichText::plain("")];
    }
    let chars: Vec<char> = text.chars().collect();
    let mut segments = Vec::new();
    let mut rest: &[char] = &chars;
    while rest.len() > HARD_TEXT_CAP {
        let (head, tail) = rest.split_at(MAX_TEXT_LEN);
        segments.push(RichText::plain(head.iter().collect::<String>()));
        rest = tail;
    }
    segments.push(RichText::plain(rest.iter().collect::<String>()));
    segments
}
