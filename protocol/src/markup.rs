//! Markup helpers: tokenizing, visible-text extraction and escaping.
//!
//! Markup can be non-empty while rendering nothing (`<p><br></p>`,
//! `<strong></strong>`), so emptiness checks go through [`visible_text`]
//! rather than trimming the raw string.

use std::borrow::Cow;

const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "li",
    "ul",
    "ol",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "pre",
    "tr",
];

const HIDDEN_TAGS: &[&str] = &["script", "style", "template"];

/// A lexical piece of markup. Tag names are lowercased; text is
/// entity-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Text(Cow<'a, str>),
    Open {
        name: Cow<'a, str>,
        attrs: Vec<(Cow<'a, str>, Cow<'a, str>)>,
        self_closing: bool,
    },
    Close {
        name: Cow<'a, str>,
    },
}

impl Token<'_> {
    /// Looks up an attribute on an opening tag.
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Token::Open { attrs, .. } => attrs
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, value)| value.as_ref()),
            _ => None,
        }
    }
}

/// Splits markup into tokens. Comments are dropped and the bodies of
/// `script`/`style`/`template` elements are skipped. A `<` that does not
/// start a tag is kept as text.
pub fn tokenize(markup: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = markup;
    let mut hidden_until: Option<&'static str> = None;

    while !rest.is_empty() {
        let Some(open) = rest.find('<') else {
            if hidden_until.is_none() {
                tokens.push(Token::Text(html_escape::decode_html_entities(rest)));
            }
            break;
        };
        if hidden_until.is_none() && open > 0 {
            tokens.push(Token::Text(html_escape::decode_html_entities(
                &rest[..open],
            )));
        }
        let tag_start = &rest[open..];

        if let Some(comment) = tag_start.strip_prefix("<!--") {
            rest = match comment.find("-->") {
                Some(end) => &comment[end + 3..],
                None => "",
            };
            continue;
        }

        let Some(close) = tag_start.find('>') else {
            if hidden_until.is_none() {
                tokens.push(Token::Text(html_escape::decode_html_entities(tag_start)));
            }
            break;
        };
        let inner = &tag_start[1..close];
        rest = &tag_start[close + 1..];
        let Some(token) = parse_tag(inner) else {
            if hidden_until.is_none() {
                tokens.push(Token::Text(Cow::Borrowed(&tag_start[..close + 1])));
            }
            continue;
        };

        if let Some(hidden) = hidden_until {
            if let Token::Close { name } = &token
                && name == hidden
            {
                hidden_until = None;
            }
            continue;
        }

        if let Token::Open {
            name, self_closing, ..
        } = &token
            && let Some(hidden) = HIDDEN_TAGS.iter().find(|hidden| **hidden == *name)
        {
            if !*self_closing {
                hidden_until = Some(*hidden);
            }
            continue;
        }

        tokens.push(token);
    }

    tokens
}

/// Returns the text a browser would render for `markup`: tags stripped,
/// entities decoded, `<br>` and closing block tags turned into newlines.
pub fn visible_text(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    for token in tokenize(markup) {
        match token {
            Token::Text(text) => out.push_str(&text),
            Token::Open { name, .. } if name == "br" => out.push('\n'),
            Token::Close { name } if BLOCK_TAGS.contains(&&*name) => out.push('\n'),
            Token::Open { .. } | Token::Close { .. } => {}
        }
    }
    out
}

/// True when the rendered form of `markup` contains any non-whitespace
/// character.
pub fn has_visible_text(markup: &str) -> bool {
    visible_text(markup).chars().any(|c| !c.is_whitespace())
}

/// Escapes text for inclusion in markup.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    html_escape::encode_text(text)
}

/// Escapes text for inclusion in a double-quoted attribute value.
pub fn escape_attribute(text: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(text)
}

fn parse_tag(inner: &str) -> Option<Token<'_>> {
    let (closing, inner) = match inner.strip_prefix('/') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, inner),
    };
    if !inner.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let (inner, self_closing) = match inner.trim_end().strip_suffix('/') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    let end = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(inner.len());
    let name = lowercase(&inner[..end]);
    if closing {
        return Some(Token::Close { name });
    }
    Some(Token::Open {
        name,
        attrs: parse_attrs(&inner[end..]),
        self_closing,
    })
}

fn parse_attrs(mut rest: &str) -> Vec<(Cow<'_, str>, Cow<'_, str>)> {
    let mut attrs = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let key_end = rest
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(rest.len());
        let key = lowercase(&rest[..key_end]);
        rest = rest[key_end..].trim_start();
        let Some(after_eq) = rest.strip_prefix('=') else {
            if !key.is_empty() {
                attrs.push((key, Cow::Borrowed("")));
            }
            if key_end == 0 {
                // Skip a stray character so the loop always advances.
                let mut chars = rest.chars();
                chars.next();
                rest = chars.as_str();
            }
            continue;
        };
        let after_eq = after_eq.trim_start();
        let (raw_value, remaining) = match after_eq.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &after_eq[1..];
                match body.find(quote) {
                    Some(end) => (&body[..end], &body[end + 1..]),
                    None => (body, ""),
                }
            }
            _ => {
                let end = after_eq
                    .find(char::is_whitespace)
                    .unwrap_or(after_eq.len());
                (&after_eq[..end], &after_eq[end..])
            }
        };
        attrs.push((key, html_escape::decode_html_entities(raw_value)));
        rest = remaining;
    }
    attrs
}

fn lowercase(raw: &str) -> Cow<'_, str> {
    if raw.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(raw.to_ascii_lowercase())
    } else {
        Cow::Borrowed(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_tags_and_decodes_entities() {
        assert_eq!(
            visible_text("<p>Hello <strong>bold</strong> &amp; more</p>"),
            "Hello bold & more\n"
        );
    }

    #[test]
    fn line_breaks_and_blocks_become_newlines() {
        assert_eq!(visible_text("<p>a</p><p>b<br>c</p>"), "a\nb\nc\n");
        assert_eq!(
            visible_text("<ol><li>one</li><li>two</li></ol>"),
            "one\ntwo\n\n"
        );
    }

    #[test]
    fn formatting_only_markup_has_no_visible_text() {
        assert!(!has_visible_text("<p><br></p>"));
        assert!(!has_visible_text("<p><strong></strong></p>"));
        assert!(!has_visible_text("<p>&nbsp; </p>"));
        assert!(!has_visible_text("<!-- note --><p> </p>"));
        assert!(has_visible_text("<p><em>x</em></p>"));
    }

    #[test]
    fn script_and_style_content_is_hidden() {
        assert!(!has_visible_text("<style>p { color: red }</style><p></p>"));
        assert_eq!(visible_text("<SCRIPT>alert(1)</SCRIPT>ok"), "ok");
    }

    #[test]
    fn plain_text_and_stray_angle_brackets_pass_through() {
        assert_eq!(visible_text("1 < 2"), "1 < 2");
        assert_eq!(visible_text("a <3 b> c"), "a <3 b> c");
        assert_eq!(visible_text("plain"), "plain");
    }

    #[test]
    fn escaping_round_trips_through_visible_text() {
        let name = "<evil> & \"name\".pdf";
        assert_eq!(visible_text(&escape_text(name)), name);
        assert_eq!(escape_attribute("a\"b"), "a&quot;b");
    }

    #[test]
    fn tokenizer_reads_attributes() {
        let tokens = tokenize(r#"<a href="https://x.test/?a=1&amp;b=2" target=_blank data-flag>go</a><br/>"#);
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].attr("href"), Some("https://x.test/?a=1&b=2"));
        assert_eq!(tokens[0].attr("TARGET"), Some("_blank"));
        assert_eq!(tokens[0].attr("data-flag"), Some(""));
        assert_eq!(tokens[1], Token::Text(Cow::Borrowed("go")));
        assert_eq!(
            tokens[3],
            Token::Open {
                name: Cow::Borrowed("br"),
                attrs: Vec::new(),
                self_closing: true,
            }
        );
    }
}
