use std::borrow::Cow;

use pulldown_cmark::{Event, Parser, TagEnd};
use scraper::{ElementRef, Html, Node};

/// Words per minute used for reading-time estimates on article pages.
const READING_WORDS_PER_MINUTE: usize = 200;

/// Tags that sit inside a word without separating it (`bet<b>ting</b>`).
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "code", "em", "i", "mark", "s", "small", "span", "strong", "sub", "sup",
    "u",
];

/// Elements whose text is never prose.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Converts editor content (HTML, Markdown, or a mix) into plain text.
///
/// HTML is parsed first and only its text is kept: block-level elements
/// become a space, inline elements vanish. The remainder goes through a
/// Markdown parser so emphasis markers, link syntax and heading hashes
/// disappear while text, code and decoded entities are kept.
pub fn strip_markup(raw: &str) -> String {
    let without_tags = strip_html_tags(raw);
    let mut out = String::with_capacity(without_tags.len());

    for event in Parser::new(&without_tags) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak | Event::Rule => out.push(' '),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::Item)
            | Event::End(TagEnd::CodeBlock)
            | Event::End(TagEnd::TableCell) => out.push(' '),
            Event::Html(_) | Event::InlineHtml(_) => out.push(' '),
            _ => {}
        }
    }

    out.trim().to_string()
}

/// Extracts the text nodes of any HTML in `raw`.
///
/// Block-level elements become a space, inline elements vanish, and
/// script/style bodies and comments are dropped. Input without a `<` is
/// returned as-is.
fn strip_html_tags(raw: &str) -> Cow<'_, str> {
    if !raw.contains('<') {
        return Cow::Borrowed(raw);
    }

    let fragment = Html::parse_fragment(raw);
    let mut out = String::with_capacity(raw.len());
    let mut pending = vec![Step::Enter(fragment.root_element())];

    while let Some(step) = pending.pop() {
        match step {
            Step::Text(text) => out.push_str(text),
            Step::Gap => out.push(' '),
            Step::Enter(element) => {
                // Reversed so the stack pops children in document order
                for child in element.children().rev() {
                    match child.value() {
                        Node::Text(text) => pending.push(Step::Text(&**text)),
                        Node::Element(tag) if SKIPPED_TAGS.contains(&tag.name()) => {}
                        Node::Element(tag) => {
                            let Some(child) = ElementRef::wrap(child) else {
                                continue;
                            };
                            if INLINE_TAGS.contains(&tag.name()) {
                                pending.push(Step::Enter(child));
                            } else {
                                pending.push(Step::Gap);
                                pending.push(Step::Enter(child));
                                pending.push(Step::Gap);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    Cow::Owned(out)
}

enum Step<'a> {
    Enter(ElementRef<'a>),
    Text(&'a str),
    Gap,
}

/// Counts whitespace-separated words in plain text.
///
/// Empty or whitespace-only text has zero words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated reading time in whole minutes, rounded up. Non-empty text is
/// always at least one minute.
pub fn reading_time_minutes(text: &str) -> usize {
    word_count(text).div_ceil(READING_WORDS_PER_MINUTE)
}

/// Derives a URL slug from a title: lowercase ASCII alphanumerics joined by
/// single hyphens.
///
/// ```
/// use tipsheet::content::slugify;
///
/// assert_eq!(slugify("AFL Round 5: Tips & Odds!"), "afl-round-5-tips-odds");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}
