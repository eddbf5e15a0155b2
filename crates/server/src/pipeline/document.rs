//! Assembly of highlighted fragments into the documents we serve.

use bytes::Bytes;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"/><meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>Preview: "#;

const PAGE_HEAD_TAIL: &str = r#"</title>
<script src="https://cdn.tailwindcss.com"></script>
<style>
  pre {
    white-space: pre-wrap;
    word-break: break-word;
  }
</style>
</head>
<body>"#;

const PAGE_SUFFIX: &str = "</body>\n</html>";

const FRAGMENT_OPEN: &str = r#"<div class="p-4 bg-gray-50 dark:bg-gray-800 overflow-auto">"#;
const FRAGMENT_CLOSE: &str = "</div>";

/// Escape HTML special characters for safe embedding in HTML documents.
pub fn html_escape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

/// Wrap a highlighted fragment in the full preview page.
pub fn page(url: &str, fragment: &str) -> String {
    let title = html_escape(url);
    let mut html = String::with_capacity(
        PAGE_HEAD.len() + title.len() + PAGE_HEAD_TAIL.len() + fragment.len() + PAGE_SUFFIX.len(),
    );
    html.push_str(PAGE_HEAD);
    html.push_str(&title);
    html.push_str(PAGE_HEAD_TAIL);
    html.push_str(fragment);
    html.push_str(PAGE_SUFFIX);
    html
}

/// Wrap a highlighted fragment for injection into a client-owned page.
pub fn embed(fragment: &str) -> String {
    format!("{FRAGMENT_OPEN}\n{fragment}\n{FRAGMENT_CLOSE}")
}

/// Split a document into `size`-byte slices for chunked delivery.
///
/// Slices share the document's buffer; concatenated they are the document.
/// A zero `size` yields the whole document as one slice.
pub fn chunks(document: Bytes, size: usize) -> impl Iterator<Item = Bytes> {
    let size = if size == 0 { document.len().max(1) } else { size };
    (0..document.len())
        .step_by(size)
        .map(move |start| document.slice(start..(start + size).min(document.len())))
}
