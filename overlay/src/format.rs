//! Comment formatting: raw annotation text to display markup.
//!
//! The engine holds a boxed [`CommentFormatter`] so hosts can swap the
//! renderer. [`MarkdownFormatter`] renders GitHub-flavored markdown with
//! single newlines as hard breaks; [`PlainFormatter`] is the degraded path
//! used when markdown is turned off. Neither passes raw HTML through: embedded
//! tags are shown as text and `javascript:` link targets are dropped.

#[cfg(test)]
#[path = "format_test.rs"]
mod format_test;

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

/// Turns raw annotation text into HTML. Output is trusted by the renderer.
pub trait CommentFormatter {
    fn to_html(&self, text: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownFormatter;

impl CommentFormatter for MarkdownFormatter {
    fn to_html(&self, text: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES;
        let parser = Parser::new_ext(text, options).map(|event| match event {
            Event::SoftBreak => Event::HardBreak,
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::Start(Tag::Link { link_type, dest_url, title, id }) => {
                Event::Start(Tag::Link { link_type, dest_url: safe_url(dest_url), title, id })
            }
            Event::Start(Tag::Image { link_type, dest_url, title, id }) => {
                Event::Start(Tag::Image { link_type, dest_url: safe_url(dest_url), title, id })
            }
            other => other,
        });
        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

/// Newlines become `<br>` and `*x*` becomes `<strong>x</strong>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl CommentFormatter for PlainFormatter {
    fn to_html(&self, text: &str) -> String {
        let escaped = escape(text).replace('\n', "<br>");
        let parts: Vec<&str> = escaped.split('*').collect();
        let mut out = String::with_capacity(escaped.len());
        let mut i = 0;
        while i < parts.len() {
            out.push_str(parts[i]);
            match (parts.get(i + 1), i + 2 < parts.len()) {
                (Some(inner), true) => {
                    out.push_str("<strong>");
                    out.push_str(inner);
                    out.push_str("</strong>");
                    i += 2;
                }
                (Some(_), false) => {
                    out.push('*');
                    i += 1;
                }
                (None, _) => i += 1,
            }
        }
        out
    }
}

/// Pick the formatter for the configured capability.
#[must_use]
pub fn formatter(markdown: bool) -> Box<dyn CommentFormatter> {
    if markdown { Box::new(MarkdownFormatter) } else { Box::new(PlainFormatter) }
}

/// Whether the raw text embeds an image reference.
#[must_use]
pub fn has_embedded_image(text: &str) -> bool {
    text.contains("![")
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let scheme = url.trim_start().get(..11).map(str::to_ascii_lowercase);
    if scheme.as_deref() == Some("javascript:") { CowStr::Borrowed("#") } else { url }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
