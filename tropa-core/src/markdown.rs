//! Markdown-to-HTML rendering for CMS pages
//!
//! Deliberately small: a line-oriented pass with regex substitution for
//! the handful of constructs page editors actually use (headings, bold,
//! italics, links, unordered lists, paragraphs). Input is HTML-escaped
//! before any substitution, and link targets are limited to http(s) and
//! relative paths, so page content cannot inject markup or script URLs.

use once_cell::sync::Lazy;
use regex::Regex;

static BOLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("invalid bold regex"));

static ITALIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*]+)\*").expect("invalid italic regex"));

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("invalid link regex"));

/// Escape the characters HTML treats as markup.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Only http(s) and relative targets become anchors. Anything with
/// another scheme (javascript:, data:, ...) would survive HTML escaping
/// as a clickable URL.
fn is_safe_href(href: &str) -> bool {
    href.starts_with("http://")
        || href.starts_with("https://")
        || href.starts_with('/')
        || href.starts_with('#')
        || !href.contains(':')
}

/// Apply inline substitutions (bold, italic, links) to an escaped line.
fn render_inline(line: &str) -> String {
    let line = BOLD_RE.replace_all(line, "<strong>$1</strong>");
    let line = ITALIC_RE.replace_all(&line, "<em>$1</em>");
    let line = LINK_RE.replace_all(&line, |caps: &regex::Captures<'_>| {
        let (text, href) = (&caps[1], &caps[2]);
        if is_safe_href(href) {
            format!(r#"<a href="{href}">{text}</a>"#)
        } else {
            // Unsafe scheme: drop the link, keep the visible text.
            text.to_owned()
        }
    });
    line.into_owned()
}

/// Render a markdown document to an HTML fragment.
///
/// Supported constructs: `#`/`##`/`###` headings, `**bold**`, `*italic*`,
/// `[text](url)` links, `- item` unordered lists, blank-line-separated
/// paragraphs. Everything else is literal text.
pub fn render_markdown(input: &str) -> String {
    let mut html = String::new();
    let mut paragraph: Vec<String> = Vec::new();
    let mut in_list = false;

    let flush_paragraph = |html: &mut String, paragraph: &mut Vec<String>| {
        if !paragraph.is_empty() {
            html.push_str("<p>");
            html.push_str(&paragraph.join(" "));
            html.push_str("</p>\n");
            paragraph.clear();
        }
    };

    for raw_line in input.lines() {
        let line = escape_html(raw_line.trim_end());
        let trimmed = line.trim_start();

        if trimmed.is_empty() {
            flush_paragraph(&mut html, &mut paragraph);
            if in_list {
                html.push_str("</ul>\n");
                in_list = false;
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("- ") {
            flush_paragraph(&mut html, &mut paragraph);
            if !in_list {
                html.push_str("<ul>\n");
                in_list = true;
            }
            html.push_str("<li>");
            html.push_str(&render_inline(rest));
            html.push_str("</li>\n");
            continue;
        }

        if in_list {
            html.push_str("</ul>\n");
            in_list = false;
        }

        // Heading depth from leading '#' run, capped at h3.
        if let Some(heading) = parse_heading(trimmed) {
            flush_paragraph(&mut html, &mut paragraph);
            let (level, text) = heading;
            html.push_str(&format!("<h{level}>{}</h{level}>\n", render_inline(text)));
            continue;
        }

        paragraph.push(render_inline(trimmed));
    }

    flush_paragraph(&mut html, &mut paragraph);
    if in_list {
        html.push_str("</ul>\n");
    }

    html
}

fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 3 {
        return None;
    }
    let rest = &line[hashes..];
    rest.strip_prefix(' ').map(|text| (hashes, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings() {
        assert_eq!(render_markdown("# Title"), "<h1>Title</h1>\n");
        assert_eq!(render_markdown("## Sub"), "<h2>Sub</h2>\n");
        assert_eq!(render_markdown("### Deep"), "<h3>Deep</h3>\n");
        // h4+ is not supported, falls through to paragraph
        assert_eq!(render_markdown("#### nope"), "<p>#### nope</p>\n");
    }

    #[test]
    fn renders_inline_styles() {
        assert_eq!(
            render_markdown("hay **campamento** en *julio*"),
            "<p>hay <strong>campamento</strong> en <em>julio</em></p>\n"
        );
    }

    #[test]
    fn renders_links() {
        assert_eq!(
            render_markdown("ver [circular](https://example.org/c1)"),
            "<p>ver <a href=\"https://example.org/c1\">circular</a></p>\n"
        );
    }

    #[test]
    fn renders_relative_links() {
        assert_eq!(
            render_markdown("ir a [inicio](/paginas/inicio) o [arriba](#top)"),
            "<p>ir a <a href=\"/paginas/inicio\">inicio</a> o <a href=\"#top\">arriba</a></p>\n"
        );
    }

    #[test]
    fn script_scheme_links_keep_only_the_text() {
        assert_eq!(
            render_markdown("[pincha](javascript:void%200)"),
            "<p>pincha</p>\n"
        );
        assert_eq!(
            render_markdown("[logo](data:text/html;base64,AAAA)"),
            "<p>logo</p>\n"
        );
    }

    #[test]
    fn renders_lists() {
        let md = "- tienda\n- saco\n- linterna";
        assert_eq!(
            render_markdown(md),
            "<ul>\n<li>tienda</li>\n<li>saco</li>\n<li>linterna</li>\n</ul>\n"
        );
    }

    #[test]
    fn joins_paragraph_lines_and_splits_on_blank() {
        let md = "linea uno\nlinea dos\n\notro parrafo";
        assert_eq!(
            render_markdown(md),
            "<p>linea uno linea dos</p>\n<p>otro parrafo</p>\n"
        );
    }

    #[test]
    fn escapes_html() {
        assert_eq!(
            render_markdown("<script>alert('x')</script>"),
            "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;</p>\n"
        );
    }

    #[test]
    fn heading_requires_space() {
        assert_eq!(render_markdown("#nospace"), "<p>#nospace</p>\n");
    }

    #[test]
    fn empty_input_renders_empty() {
        assert_eq!(render_markdown(""), "");
        assert_eq!(render_markdown("\n\n"), "");
    }

    #[test]
    fn list_followed_by_paragraph_closes_list() {
        let md = "- uno\n- dos\n\ntexto";
        assert_eq!(
            render_markdown(md),
            "<ul>\n<li>uno</li>\n<li>dos</li>\n</ul>\n<p>texto</p>\n"
        );
    }
}
