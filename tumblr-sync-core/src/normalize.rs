//! Content normalisation: raw post content in, Markdown out.
//!
//! Two things happen here:
//! - embedded link cards (`data-npf='{...}'`, produced when a link is shared
//!   from the mobile app) are decoded and logged. The decoded card does not
//!   change the output; [`extract_embedded_link`] is the hook for callers that
//!   want to do more with it.
//! - HTML content is converted to Markdown with a small regex based converter.
//!   Text between tags is never escaped, so content that is already Markdown
//!   survives a pass through the converter untouched.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::post::ContentFormat;

static EMBEDDED_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"data-npf='(\{.*\})'").expect("embedded link pattern"));

/// Link card embedded in a text post.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmbeddedLinkPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub display_url: String,
    pub title: String,
    pub description: String,
    pub site_name: String,
    #[serde(deserialize_with = "one_or_first")]
    pub poster: Option<Poster>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Poster {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub width: i64,
    pub height: i64,
}

/// The API sends the poster as a list of media objects; older payloads carry
/// a single object.
fn one_or_first<'de, D>(deserializer: D) -> Result<Option<Poster>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Poster>),
        One(Poster),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(p)) => Some(p),
        Some(OneOrMany::Many(list)) => list.into_iter().next(),
        None => None,
    })
}

/// Decodes the embedded link card, if the content carries one.
/// Malformed JSON is treated as "no card".
pub fn extract_embedded_link(content: &str) -> Option<EmbeddedLinkPayload> {
    let raw = EMBEDDED_LINK.captures(content)?.get(1)?.as_str();
    match serde_json::from_str::<EmbeddedLinkPayload>(raw) {
        Ok(payload) => Some(payload),
        Err(e) => {
            debug!(error = %e, "Ignoring unparseable embedded link payload");
            None
        }
    }
}

/// Turns raw post content into Markdown according to its declared format.
pub fn normalize(content: &str, format: ContentFormat) -> String {
    if let Some(link) = extract_embedded_link(content) {
        info!(
            url = %link.url,
            title = %link.title,
            site_name = %link.site_name,
            "Found embedded link in text post"
        );
    }

    match format {
        ContentFormat::Html => html_to_markdown(content),
        ContentFormat::Markdown => content.to_string(),
    }
}

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($re).expect($re));
    };
}

pattern!(PRE, r"(?is)<pre(?:\s[^>]*)?>(.*?)</pre>");
pattern!(CODE_TAG, r"(?i)</?code(?:\s[^>]*)?>");
pattern!(COMMENT, r"(?s)<!--.*?-->");
pattern!(SCRIPT, r"(?is)<(script|style)(?:\s[^>]*)?>.*?</(?:script|style)>");
pattern!(STRONG, r"(?is)<(?:strong|b)(?:\s[^>]*)?>(.*?)</(?:strong|b)>");
pattern!(EM, r"(?is)<(?:em|i)(?:\s[^>]*)?>(.*?)</(?:em|i)>");
pattern!(STRIKE, r"(?is)<(?:del|s|strike)(?:\s[^>]*)?>(.*?)</(?:del|s|strike)>");
pattern!(CODE, r"(?is)<code(?:\s[^>]*)?>(.*?)</code>");
pattern!(LINK, r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a>"#);
pattern!(IMG, r"(?is)<img\s[^>]*>");
pattern!(SRC_ATTR, r#"(?is)\ssrc\s*=\s*["']([^"']*)["']"#);
pattern!(ALT_ATTR, r#"(?is)\salt\s*=\s*["']([^"']*)["']"#);
pattern!(HEADING, r"(?is)<h([1-6])(?:\s[^>]*)?>(.*?)</h[1-6]>");
pattern!(BR, r"(?i)<br\s*/?>");
pattern!(HR, r"(?i)<hr(?:\s[^>]*)?/?>");
// A list with no list nested inside it.
pattern!(
    INNERMOST_LIST,
    r"(?is)<(ul|ol)(?:\s[^>]*)?>((?:[^<]|<[^uo]|<[uo][^l])*?)</(?:ul|ol)>"
);
pattern!(LI, r"(?is)<li(?:\s[^>]*)?>(.*?)</li>");
pattern!(P_TAG, r"(?i)</?p(?:\s[^>]*)?>");
pattern!(
    BLOCK,
    r"(?i)</?(?:p|div|figure|figcaption|section|article|header|footer)(?:\s[^>]*)?>"
);
pattern!(BLOCKQUOTE, r"(?is)<blockquote(?:\s[^>]*)?>(.*?)</blockquote>");
// Real tags only: a `<` not followed by a tag name is text.
pattern!(
    ANY_TAG,
    r"</?[A-Za-z][A-Za-z0-9-]*(?:\s[^>]*)?/?>|<![A-Za-z][^>]*>"
);
pattern!(NUMERIC_ENTITY, r"&#([xX][0-9a-fA-F]+|[0-9]+);");
pattern!(BLANK_LINES, r"[ \t]*\n(?:[ \t]*\n)+");

const PRE_MARKER: char = '\u{1}';

/// Converts an HTML fragment to Markdown.
pub fn html_to_markdown(html: &str) -> String {
    let mut md = html.replace("\r\n", "\n").replace(PRE_MARKER, "");

    // Preformatted blocks are set aside so later passes leave them alone.
    let mut preformatted = Vec::new();
    md = PRE
        .replace_all(&md, |caps: &Captures| {
            let body = CODE_TAG.replace_all(&caps[1], "");
            let body = decode_entities(&ANY_TAG.replace_all(&body, ""));
            preformatted.push(format!("```\n{}\n```", body.trim_matches('\n')));
            format!("\n\n{PRE_MARKER}{}{PRE_MARKER}\n\n", preformatted.len() - 1)
        })
        .into_owned();

    md = COMMENT.replace_all(&md, "").into_owned();
    md = SCRIPT.replace_all(&md, "").into_owned();

    md = STRONG.replace_all(&md, "**$1**").into_owned();
    md = EM.replace_all(&md, "*$1*").into_owned();
    md = STRIKE.replace_all(&md, "~~$1~~").into_owned();
    md = CODE.replace_all(&md, "`$1`").into_owned();
    md = LINK.replace_all(&md, "[$2]($1)").into_owned();
    md = IMG
        .replace_all(&md, |caps: &Captures| {
            let tag = &caps[0];
            let src = SRC_ATTR.captures(tag).map(|c| c[1].to_string());
            let alt = ALT_ATTR.captures(tag).map(|c| c[1].to_string());
            match src {
                Some(src) => format!("![{}]({})", alt.unwrap_or_default(), src),
                None => String::new(),
            }
        })
        .into_owned();

    md = HEADING
        .replace_all(&md, |caps: &Captures| {
            let level: usize = caps[1].parse().unwrap_or(1);
            format!("\n\n{} {}\n\n", "#".repeat(level), caps[2].trim())
        })
        .into_owned();
    md = BR.replace_all(&md, "\n").into_owned();
    md = HR.replace_all(&md, "\n\n---\n\n").into_owned();

    // Innermost lists first, so a nested list is already text when its
    // parent item is rendered.
    while INNERMOST_LIST.is_match(&md) {
        md = INNERMOST_LIST
            .replace_all(&md, |caps: &Captures| {
                list_items(&caps[2], caps[1].eq_ignore_ascii_case("ol"))
            })
            .into_owned();
    }

    md = BLOCK.replace_all(&md, "\n\n").into_owned();
    md = BLOCKQUOTE
        .replace_all(&md, |caps: &Captures| {
            let inner = collapse_blank_lines(&caps[1]);
            let quoted: Vec<String> = inner
                .trim()
                .lines()
                .map(|line| {
                    if line.trim().is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {line}")
                    }
                })
                .collect();
            format!("\n\n{}\n\n", quoted.join("\n"))
        })
        .into_owned();

    md = ANY_TAG.replace_all(&md, "").into_owned();
    md = decode_entities(&md);
    md = collapse_blank_lines(&md);

    for (i, block) in preformatted.iter().enumerate() {
        md = md.replace(&format!("{PRE_MARKER}{i}{PRE_MARKER}"), block);
    }

    md.trim().to_string()
}

fn list_items(list: &str, ordered: bool) -> String {
    let items: Vec<String> = LI
        .captures_iter(list)
        .enumerate()
        .map(|(i, caps)| {
            let bullet = if ordered {
                format!("{}. ", i + 1)
            } else {
                "- ".to_string()
            };
            let text = P_TAG.replace_all(&caps[1], "\n");
            // Continuation lines, such as a nested list, are indented under
            // the bullet text.
            let indent = " ".repeat(bullet.len());
            let body = text
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.trim().is_empty())
                .enumerate()
                .map(|(n, line)| {
                    if n == 0 {
                        line.trim_start().to_string()
                    } else {
                        format!("{indent}{line}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("{bullet}{body}")
        })
        .collect();
    format!("\n\n{}\n\n", items.join("\n"))
}

fn collapse_blank_lines(text: &str) -> String {
    BLANK_LINES.replace_all(text, "\n\n").into_owned()
}

fn decode_entities(text: &str) -> String {
    let decoded = NUMERIC_ENTITY.replace_all(text, |caps: &Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    // &amp; goes last so "&amp;lt;" decodes to "&lt;" and not "<".
    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_bold_becomes_markdown() {
        assert_eq!(
            normalize("This is <b>simple</b> text", ContentFormat::Html),
            "This is **simple** text"
        );
    }

    #[test]
    fn markdown_is_returned_unchanged() {
        let input = "This is <b>simple</b> text";
        assert_eq!(normalize(input, ContentFormat::Markdown), input);
    }

    #[test]
    fn paragraph_wrapped_markdown_loses_the_wrapper() {
        assert_eq!(
            normalize("<p>This is **simple** text</p>", ContentFormat::Html),
            "This is **simple** text"
        );
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(
            html_to_markdown("Nothing to see here"),
            "Nothing to see here"
        );
    }

    #[test]
    fn inline_markup() {
        assert_eq!(
            html_to_markdown(
                r#"<strong>a</strong> <em>b</em> <i>c</i> <del>d</del> <code>e</code> <a href="https://x.test/">f</a>"#
            ),
            "**a** *b* *c* ~~d~~ `e` [f](https://x.test/)"
        );
    }

    #[test]
    fn paragraphs_are_separated_by_one_blank_line() {
        assert_eq!(
            html_to_markdown("<p>one</p>\n\n<p>two</p> <p>three</p>"),
            "one\n\ntwo\n\nthree"
        );
    }

    #[test]
    fn headings_and_breaks() {
        assert_eq!(
            html_to_markdown("<h2>Title</h2><p>line<br>next<br/>last</p><hr>"),
            "## Title\n\nline\nnext\nlast\n\n---"
        );
    }

    #[test]
    fn lists() {
        assert_eq!(
            html_to_markdown("<ul><li>a</li><li><p>b</p></li></ul><ol><li>x</li><li>y</li></ol>"),
            "- a\n- b\n\n1. x\n2. y"
        );
    }

    #[test]
    fn blockquotes_prefix_every_line() {
        assert_eq!(
            html_to_markdown("<blockquote><p>quoted</p><p>more</p></blockquote><p>after</p>"),
            "> quoted\n>\n> more\n\nafter"
        );
    }

    #[test]
    fn images_keep_alt_and_src() {
        assert_eq!(
            html_to_markdown(r#"<figure><img src="https://x.test/a.png" alt="A cat"></figure>"#),
            "![A cat](https://x.test/a.png)"
        );
    }

    #[test]
    fn entities_are_decoded_after_tags_are_dropped() {
        assert_eq!(
            html_to_markdown("<p>Fish &amp; chips &lt;b&gt; &#8217;s &#x41;&nbsp;&amp;lt;</p>"),
            "Fish & chips <b> \u{2019}s A &lt;"
        );
    }

    #[test]
    fn preformatted_blocks_are_fenced_verbatim() {
        assert_eq!(
            html_to_markdown("<p>run:</p><pre><code>a &lt; b\n\n\n<b>c</b></code></pre>"),
            "run:\n\n```\na < b\n\n\nc\n```"
        );
    }

    #[test]
    fn nested_lists_keep_every_item_on_its_own_bullet() {
        assert_eq!(
            html_to_markdown("<ul><li>a<ul><li>b</li><li>b2</li></ul></li><li>c</li></ul>"),
            "- a\n  - b\n  - b2\n- c"
        );
        assert_eq!(
            html_to_markdown("<ol><li>one<ul><li>x</li></ul></li><li>two</li></ol>"),
            "1. one\n   - x\n2. two"
        );
    }

    #[test]
    fn angle_brackets_that_are_not_tags_survive() {
        assert_eq!(
            normalize("1 < 2 and 3 > 2", ContentFormat::Html),
            "1 < 2 and 3 > 2"
        );
        assert_eq!(
            normalize("<p>see <https://x.test> now</p>", ContentFormat::Html),
            "see <https://x.test> now"
        );
    }

    #[test]
    fn placeholder_characters_in_input_cannot_pull_in_code_blocks() {
        assert_eq!(
            html_to_markdown("<p>**a** \u{1}0\u{1}</p><pre>x</pre>"),
            "**a** 0\n\n```\nx\n```"
        );
    }

    #[test]
    fn unknown_tags_are_dropped() {
        assert_eq!(html_to_markdown("<span class=\"x\">hi</span>"), "hi");
    }

    #[test]
    fn embedded_link_is_decoded() {
        let content = r#"<p>look</p><figure data-npf='{"type":"link","url":"https://example.com/a","display_url":"example.com","title":"A","description":"d","site_name":"Example","poster":[{"url":"https://img.test/p.jpg","type":"image/jpeg","width":640,"height":480}]}'></figure>"#;
        let link = extract_embedded_link(content).expect("payload");
        assert_eq!(link.kind, "link");
        assert_eq!(link.url, "https://example.com/a");
        assert_eq!(link.site_name, "Example");
        let poster = link.poster.expect("poster");
        assert_eq!(poster.url, "https://img.test/p.jpg");
        assert_eq!((poster.width, poster.height), (640, 480));
    }

    #[test]
    fn embedded_link_with_single_poster_object() {
        let content = r#"data-npf='{"url":"https://e.test","poster":{"url":"p","type":"t","width":1,"height":2}}'"#;
        let link = extract_embedded_link(content).expect("payload");
        assert_eq!(link.poster.map(|p| p.height), Some(2));
    }

    #[test]
    fn malformed_embedded_link_is_ignored_and_output_unchanged() {
        let content = "<p>hi</p><div data-npf='{not json}'></div>";
        assert!(extract_embedded_link(content).is_none());
        assert_eq!(normalize(content, ContentFormat::Html), "hi");
    }

    #[test]
    fn embedded_link_does_not_alter_output() {
        let content = r#"<p>hi</p><div data-npf='{"url":"https://e.test"}'></div>"#;
        assert!(extract_embedded_link(content).is_some());
        assert_eq!(normalize(content, ContentFormat::Html), "hi");
    }
}
