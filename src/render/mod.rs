//! Markdown-subset renderer
//!
//! Turns untrusted message text into an HTML fragment. The input is entity
//! escaped before any markdown stage runs, so the only live markup in the
//! output is markup a stage below introduced itself.
//!
//! Supported: `#`..`###` headings, `**bold**`/`__bold__`, `*italic*`/`_italic_`,
//! inline code, fenced code blocks, `http(s)` links, flat ordered/unordered
//! lists and paragraphs. Anything else is left as text.
//!
//! Stage order is fixed:
//! 1. escape
//! 2. fenced code blocks
//! 3. inline code
//! 4. headings
//! 5. emphasis
//! 6. links
//! 7. lists
//! 8. paragraphs
//!
//! Code produced by stages 2 and 3 is parked behind NUL-delimited tokens so
//! that stages 4-8 never rewrite it. Escaping maps NUL to U+FFFD, which makes
//! the tokens impossible to forge from input.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static FENCED_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:([A-Za-z0-9_+-]*)[^\S\n]*\n)?(.*?)```")
        .expect("valid fenced code pattern")
});

static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`\n]+)`").expect("valid inline code pattern"));

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(#{1,3}) (.+)$").expect("valid heading pattern"));

static EMPHASIS: Lazy<[(Regex, &'static str); 4]> = Lazy::new(|| {
    [
        (r"\*\*([^*\s][^*\n]*?)\*\*", "strong"),
        (r"__([^_\s][^_\n]*?)__", "strong"),
        (r"\*([^*\s][^*\n]*?)\*", "em"),
        (r"_([^_\s][^_\n]*?)_", "em"),
    ]
    .map(|(pattern, tag)| (Regex::new(pattern).expect("valid emphasis pattern"), tag))
});

static LINK_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\]\((https?://[^)\s]+)\)").expect("valid link target pattern"));

static LINK_TARGET_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x00U(\d+)\x00").expect("valid token pattern"));

static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]\n]+)\]\((https?://[^)\s]+)\)").expect("valid link pattern")
});

static UNORDERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-*+]\s+(.*)$").expect("valid list pattern"));

static ORDERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\.\s+(.*)$").expect("valid list pattern"));

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph pattern"));

static BLOCK_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x00B\d+\x00").expect("valid token pattern"));

static STASH_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x00[BI](\d+)\x00").expect("valid token pattern"));

/// Block-level openings emitted by the stages; lines starting with one of
/// these are not wrapped in a paragraph. Parked code blocks are split out
/// of their line separately.
const BLOCK_OPENERS: [&str; 5] = ["<h1>", "<h2>", "<h3>", "<ul>", "<ol>"];

type Stage = fn(&mut Document);

const STAGES: [Stage; 7] = [
    fenced_code,
    inline_code,
    headings,
    emphasis,
    links,
    lists,
    paragraphs,
];

/// Render `input` as an HTML fragment.
///
/// `is_user` is accepted for callers that style turns differently; the output
/// does not depend on it yet.
pub fn render(input: &str, is_user: bool) -> String {
    let _ = is_user;
    let mut doc = Document::new(escape_html(input));
    for stage in STAGES {
        stage(&mut doc);
    }
    doc.finish()
}

/// Entity-escape every HTML-significant character.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.replace("\r\n", "\n").chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

/// Text being rendered plus the code fragments parked out of reach of the
/// later stages.
struct Document {
    text: String,
    stash: Vec<String>,
}

impl Document {
    fn new(text: String) -> Self {
        Self {
            text,
            stash: Vec::new(),
        }
    }

    fn park(&mut self, kind: char, html: String) -> String {
        self.stash.push(html);
        format!("\u{0}{}{}\u{0}", kind, self.stash.len() - 1)
    }

    fn replace_with(&mut self, re: &Regex, mut f: impl FnMut(&mut Self, &Captures) -> String) {
        let source = std::mem::take(&mut self.text);
        let mut out = String::with_capacity(source.len());
        let mut last = 0;
        for caps in re.captures_iter(&source) {
            let whole = caps.get(0).expect("group 0 always matches");
            out.push_str(&source[last..whole.start()]);
            out.push_str(&f(self, &caps));
            last = whole.end();
        }
        out.push_str(&source[last..]);
        self.text = out;
    }

    fn finish(self) -> String {
        let stash = self.stash;
        STASH_TOKEN
            .replace_all(&self.text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| stash.get(i))
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

fn fenced_code(doc: &mut Document) {
    doc.replace_with(&FENCED_CODE, |doc, caps| {
        // Content is already escaped; a second pass on `<` catches anything
        // that slipped in through concatenation.
        let code = caps[2].trim_end_matches('\n').replace('<', "&lt;");
        let lang = caps.get(1).map_or("", |m| m.as_str());
        let html = if lang.is_empty() {
            format!("<pre><code>{}</code></pre>", code)
        } else {
            format!("<pre><code class=\"language-{}\">{}</code></pre>", lang, code)
        };
        doc.park('B', html)
    });
}

fn inline_code(doc: &mut Document) {
    doc.replace_with(&INLINE_CODE, |doc, caps| {
        doc.park('I', format!("<code>{}</code>", &caps[1]))
    });
}

fn headings(doc: &mut Document) {
    doc.text = HEADING
        .replace_all(&doc.text, |caps: &Captures| {
            let level = caps[1].len();
            format!("<h{level}>{}</h{level}>", caps[2].trim_end())
        })
        .into_owned();
}

fn emphasis(doc: &mut Document) {
    // Link targets sit out this stage so underscores in URLs survive.
    let mut targets = Vec::new();
    let mut text = LINK_TARGET
        .replace_all(&doc.text, |caps: &Captures| {
            targets.push(caps[1].to_string());
            format!("](\u{0}U{}\u{0})", targets.len() - 1)
        })
        .into_owned();

    for (re, tag) in EMPHASIS.iter() {
        text = re
            .replace_all(&text, format!("<{tag}>${{1}}</{tag}>").as_str())
            .into_owned();
    }

    doc.text = LINK_TARGET_TOKEN
        .replace_all(&text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| targets.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned();
}

fn links(doc: &mut Document) {
    doc.text = LINK
        .replace_all(
            &doc.text,
            r#"<a href="${2}" target="_blank" rel="noopener noreferrer">${1}</a>"#,
        )
        .into_owned();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

fn list_item(line: &str) -> Option<(ListKind, String)> {
    if let Some(caps) = UNORDERED_ITEM.captures(line) {
        return Some((ListKind::Unordered, caps[1].trim_end().to_string()));
    }
    ORDERED_ITEM
        .captures(line)
        .map(|caps| (ListKind::Ordered, caps[1].trim_end().to_string()))
}

fn lists(doc: &mut Document) {
    fn flush(out: &mut Vec<String>, open: Option<(ListKind, Vec<String>)>) {
        if let Some((kind, items)) = open {
            let items: String = items.iter().map(|i| format!("<li>{}</li>", i)).collect();
            out.push(format!("<{tag}>{items}</{tag}>", tag = kind.tag()));
        }
    }

    let mut out = Vec::new();
    let mut open: Option<(ListKind, Vec<String>)> = None;

    for line in doc.text.lines() {
        match list_item(line) {
            Some((kind, item)) => {
                if let Some((current, items)) = open.as_mut() {
                    if *current == kind {
                        items.push(item);
                        continue;
                    }
                }
                flush(&mut out, open.take());
                open = Some((kind, vec![item]));
            }
            None => {
                flush(&mut out, open.take());
                out.push(line.to_string());
            }
        }
    }
    flush(&mut out, open);

    doc.text = out.join("\n");
}

fn paragraphs(doc: &mut Document) {
    fn flush(html: &mut Vec<String>, run: &mut Vec<&str>) {
        if !run.is_empty() {
            html.push(format!("<p>{}</p>", run.join("<br>")));
            run.clear();
        }
    }

    let mut html = Vec::new();
    for block in PARAGRAPH_BREAK.split(&doc.text) {
        let mut run = Vec::new();
        for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if BLOCK_OPENERS.iter().any(|opener| line.starts_with(opener)) {
                flush(&mut html, &mut run);
                html.push(line.to_string());
                continue;
            }

            // A code block must not end up inside a <p>; split the line around it.
            let mut last = 0;
            for token in BLOCK_TOKEN.find_iter(line) {
                let before = line[last..token.start()].trim();
                if !before.is_empty() {
                    run.push(before);
                }
                flush(&mut html, &mut run);
                html.push(token.as_str().to_string());
                last = token.end();
            }
            let rest = line[last..].trim();
            if !rest.is_empty() {
                run.push(rest);
            }
        }
        flush(&mut html, &mut run);
    }

    doc.text = html.join("\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_markup() {
        assert_eq!(
            render("<script>alert('x')</script> & \"q\"", true),
            "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; &quot;q&quot;</p>"
        );
    }

    #[test]
    fn test_plain_text_keeps_its_content() {
        assert_eq!(render("just some words", false), "<p>just some words</p>");
        assert_eq!(render("one\ntwo\n\nthree", false), "<p>one<br>two</p>\n<p>three</p>");
        assert_eq!(render("", false), "");
    }

    #[test]
    fn test_render_is_deterministic() {
        let input = "# T\n\n- a\n- b\n\n```\nx\n```\n[l](https://x.com) **b** `c`";
        assert_eq!(render(input, false), render(input, false));
    }

    #[test]
    fn test_headings() {
        assert_eq!(
            render("# One\n## Two\n### Three\n#### Four", false),
            "<h1>One</h1>\n<h2>Two</h2>\n<h3>Three</h3>\n<p>#### Four</p>"
        );
        assert_eq!(render("#nospace", false), "<p>#nospace</p>");
    }

    #[test]
    fn test_emphasis() {
        assert_eq!(
            render("**b** and *i* and __B__ and _i_", false),
            "<p><strong>b</strong> and <em>i</em> and <strong>B</strong> and <em>i</em></p>"
        );
    }

    #[test]
    fn test_inline_code_is_left_alone() {
        assert_eq!(
            render("use `a*b*c` or `<br>`", false),
            "<p>use <code>a*b*c</code> or <code>&lt;br&gt;</code></p>"
        );
    }

    #[test]
    fn test_fenced_code_block() {
        assert_eq!(
            render("```rust\nlet x = a * b * c;\n# not a heading\n```", false),
            "<pre><code class=\"language-rust\">let x = a * b * c;\n# not a heading</code></pre>"
        );
        assert_eq!(
            render("Look:\n```\n<div>\n```\nDone", false),
            "<p>Look:</p>\n<pre><code>&lt;div&gt;</code></pre>\n<p>Done</p>"
        );
    }

    #[test]
    fn test_single_line_fence_keeps_its_text() {
        assert_eq!(render("```hello```", false), "<pre><code>hello</code></pre>");
        assert_eq!(
            render("Run ```ls -la``` now", false),
            "<p>Run</p>\n<pre><code>ls -la</code></pre>\n<p>now</p>"
        );
        assert_eq!(
            render("```\nplain\n```", false),
            "<pre><code>plain</code></pre>"
        );
    }

    #[test]
    fn test_code_block_is_never_inside_a_paragraph() {
        let html = render("before\nsee ```a``` and ```b``` after\nend", false);
        assert_eq!(
            html,
            "<p>before<br>see</p>\n<pre><code>a</code></pre>\n<p>and</p>\n<pre><code>b</code></pre>\n<p>after<br>end</p>"
        );
        assert!(!html.contains("<p><pre>"));
    }

    #[test]
    fn test_link_target_keeps_underscores() {
        let html = render("[docs](https://x.com/some_page_name) and _this_", false);
        assert!(html.contains(r#"href="https://x.com/some_page_name""#));
        assert!(html.contains("<em>this</em>"));

        assert_eq!(
            render("**see [a](https://x.com/a_b_c)**", false),
            r#"<p><strong>see <a href="https://x.com/a_b_c" target="_blank" rel="noopener noreferrer">a</a></strong></p>"#
        );
    }

    #[test]
    fn test_links_allow_only_http() {
        let html = render("[a](https://x.com)", false);
        assert!(html.contains(r#"href="https://x.com""#));
        assert!(html.contains(r#"target="_blank""#));
        assert!(html.contains(r#"rel="noopener noreferrer""#));

        let html = render("[a](javascript:alert(1))", false);
        assert!(!html.contains("<a "));
        assert!(html.contains("[a](javascript:alert(1))"));
    }

    #[test]
    fn test_link_attribute_cannot_be_broken() {
        let html = render(r#"[x](https://x.com/"onmouseover="alert(1))"#, false);
        assert!(!html.contains(r#"" onmouseover"#));
        assert!(html.contains("&quot;onmouseover="));

        let html = render("[q](https://x.com/?a=1&b=2)", false);
        assert!(html.contains(r#"href="https://x.com/?a=1&amp;b=2""#));
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            render("- a\n* b\n+ c\n1. one\n2. two\nafter", false),
            "<ul><li>a</li><li>b</li><li>c</li></ul>\n<ol><li>one</li><li>two</li></ol>\n<p>after</p>"
        );
        assert_eq!(
            render("* item with *emph*", false),
            "<ul><li>item with <em>emph</em></li></ul>"
        );
    }

    #[test]
    fn test_no_raw_markup_survives() {
        let nasty = [
            "<img src=x onerror=alert(1)>",
            "**<b>**",
            "[<svg onload=alert(1)>](https://x.com)",
            "```\n</code></pre><script>x</script>\n```",
            "`<iframe>`",
            "# <h1>",
            "- <li>",
        ];
        for input in nasty {
            let html = render(input, true);
            for tag in ["<img", "<b>", "<svg", "<script", "<iframe", "<h1><h1>", "<li><li>"] {
                assert!(!html.contains(tag), "{input:?} rendered to {html:?}");
            }
        }
    }

    #[test]
    fn test_placeholder_tokens_cannot_be_forged() {
        let html = render("\u{0}B0\u{0} and `x`", false);
        assert!(html.contains('\u{FFFD}'));
        assert!(html.contains("<code>x</code>"));
    }
}
