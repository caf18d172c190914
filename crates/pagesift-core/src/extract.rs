//! Extraction engine: raw HTML plus a declarative spec in, a bounded,
//! ordered sequence of [`Item`]s out. Pure, no I/O.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::config::ExtractConfig;
use crate::error::AppError;
use crate::models::{Item, ItemLinks, SUMMARY_MAX_CHARS, clamp_text, item_id};

/// Maximum characters kept in an item title.
const TITLE_MAX_CHARS: usize = 256;

/// Caller-supplied extraction spec. Never mutated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractSpec {
    /// CSS selector targeting candidate item nodes.
    pub selector: Option<String>,
    pub fields: Vec<FieldSpec>,
    /// Caller-imposed item limit. Non-positive means "no caller limit";
    /// the global page cap still applies.
    pub max_items: Option<i64>,
    /// Attach each node's raw HTML to the item.
    pub include_raw_html: bool,
}

/// One field to extract from each candidate node.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Descendant selector. Without it the literal `fallback` is used.
    #[serde(default)]
    pub selector: Option<String>,
    /// `text` (default), `html`, or a named DOM attribute.
    #[serde(default)]
    pub attr: Option<String>,
    #[serde(default)]
    pub fallback: Option<String>,
}

/// Converts raw HTML plus an [`ExtractSpec`] into items.
#[derive(Debug, Clone)]
pub struct ExtractionEngine {
    config: ExtractConfig,
}

impl ExtractionEngine {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    /// Extract items from `html`, resolving links against `url`.
    ///
    /// `selector` (the request-level one) takes precedence over
    /// `spec.selector`. Output length never exceeds
    /// `min(spec.max_items, max_items_per_page)`.
    pub fn extract(
        &self,
        html: &str,
        url: &str,
        selector: Option<&str>,
        spec: &ExtractSpec,
    ) -> Result<Vec<Item>, AppError> {
        let doc = Html::parse_document(html);
        let limit = effective_limit(spec.max_items, self.config.max_items_per_page);

        let explicit = selector.or(spec.selector.as_deref());
        let nodes: Vec<ElementRef> = match explicit {
            Some(sel) => doc.select(&parse_selector(sel)?).collect(),
            None => self.implicit_nodes(&doc)?,
        };

        let mut items = Vec::new();
        for (idx, node) in nodes.iter().enumerate() {
            if items.len() >= limit {
                break;
            }
            if let Some(item) = self.build_item(node, idx, url, spec, false)? {
                items.push(item);
            }
        }

        // Zero items: one item spanning the whole document body, same
        // id/content rules, empty text allowed.
        if items.is_empty() {
            let body = parse_selector("body")?;
            if let Some(node) = doc.select(&body).next() {
                if let Some(item) = self.build_item(&node, 0, url, spec, true)? {
                    items.push(item);
                }
            }
        }

        for item in &mut items {
            item.content = clamp_text(&item.content, self.config.max_content_chars);
            item.summary = clamp_text(&item.summary, SUMMARY_MAX_CHARS);
        }
        items.truncate(limit);
        Ok(items)
    }

    /// Candidate nodes when no selector was supplied: the document body,
    /// optionally re-targeted through the fallback selector list.
    ///
    /// The re-targeting is a heuristic split of the page into candidate
    /// items; ambiguous pages may split badly. Controlled by
    /// [`ExtractConfig::auto_split`].
    fn implicit_nodes<'a>(&self, doc: &'a Html) -> Result<Vec<ElementRef<'a>>, AppError> {
        let body = parse_selector("body")?;
        let selected: Vec<ElementRef> = doc.select(&body).collect();
        if self.config.auto_split && selected.len() <= 1 {
            let fallback = parse_selector(&self.config.fallback_selector)?;
            let split: Vec<ElementRef> = doc.select(&fallback).collect();
            if !split.is_empty() {
                return Ok(split);
            }
        }
        Ok(selected)
    }

    fn build_item(
        &self,
        node: &ElementRef,
        idx: usize,
        url: &str,
        spec: &ExtractSpec,
        allow_empty: bool,
    ) -> Result<Option<Item>, AppError> {
        let text = normalized_text(node);
        if text.is_empty() && !allow_empty {
            return Ok(None);
        }

        let mut fields: HashMap<&str, String> = HashMap::new();
        for field in &spec.fields {
            if let Some(value) = resolve_field(node, field)? {
                fields.insert(field.name.as_str(), value);
            }
        }

        let id = item_id(&text, url);
        let title = fields
            .remove("title")
            .filter(|t| !t.is_empty())
            .or_else(|| first_heading(node))
            .unwrap_or_else(|| format!("item-{}", idx + 1));
        let content = fields.remove("content").unwrap_or_else(|| text.clone());
        let summary = fields
            .remove("summary")
            .unwrap_or_else(|| clamp_text(&text, SUMMARY_MAX_CHARS));
        let links = match fields.remove("links") {
            Some(href) => ItemLinks {
                html: resolve_href(url, &href).unwrap_or(href),
                pdf: None,
            },
            None => ItemLinks {
                html: first_anchor(node, url).unwrap_or_else(|| url.to_string()),
                pdf: None,
            },
        };

        Ok(Some(Item {
            id,
            url: url.to_string(),
            title: clamp_text(&title, TITLE_MAX_CHARS),
            summary,
            content,
            date: fields.remove("date"),
            section: fields.remove("section"),
            category: fields.remove("category"),
            links,
            raw: spec.include_raw_html.then(|| node.html()),
        }))
    }
}

/// Effective item limit: `min(requested, page_cap)`, where a missing or
/// non-positive request means the page cap alone.
fn effective_limit(requested: Option<i64>, page_cap: usize) -> usize {
    match requested {
        Some(n) if n > 0 => (n as usize).min(page_cap),
        _ => page_cap,
    }
}

fn parse_selector(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector)
        .map_err(|e| AppError::Validation(format!("invalid selector '{selector}': {e}")))
}

/// Node text with whitespace collapsed to single spaces. Text fragments are
/// space-joined so adjacent elements do not run together.
fn normalized_text(node: &ElementRef) -> String {
    node.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve one field against a node per its spec.
fn resolve_field(node: &ElementRef, field: &FieldSpec) -> Result<Option<String>, AppError> {
    let Some(selector) = field.selector.as_deref() else {
        return Ok(field.fallback.clone());
    };
    let sel = parse_selector(selector)?;
    let Some(found) = node.select(&sel).next() else {
        return Ok(field.fallback.clone());
    };
    let value = match field.attr.as_deref().unwrap_or("text") {
        "text" => Some(normalized_text(&found)),
        "html" => Some(found.inner_html()),
        attr => found.value().attr(attr).map(str::to_string),
    };
    Ok(value.or_else(|| field.fallback.clone()))
}

fn first_heading(node: &ElementRef) -> Option<String> {
    let sel = Selector::parse("h1, h2, h3").ok()?;
    node.select(&sel)
        .next()
        .map(|h| normalized_text(&h))
        .filter(|t| !t.is_empty())
}

/// First descendant anchor whose href resolves against the source URL.
fn first_anchor(node: &ElementRef, base: &str) -> Option<String> {
    let sel = Selector::parse("a[href]").ok()?;
    node.select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| resolve_href(base, href))
}

fn resolve_href(base: &str, href: &str) -> Option<String> {
    match Url::parse(href) {
        Ok(absolute) => Some(absolute.to_string()),
        Err(_) => Url::parse(base).ok()?.join(href).ok().map(String::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TRUNCATION_MARKER;

    fn engine() -> ExtractionEngine {
        ExtractionEngine::new(ExtractConfig::default())
    }

    fn title_field(selector: &str) -> FieldSpec {
        FieldSpec {
            name: "title".into(),
            selector: Some(selector.into()),
            attr: None,
            fallback: None,
        }
    }

    #[test]
    fn article_selector_with_title_field() {
        let html = "<body><article><h2>Title A</h2>content text</article></body>";
        let spec = ExtractSpec {
            fields: vec![title_field("h2")],
            ..ExtractSpec::default()
        };
        let items = engine()
            .extract(html, "https://example.com", Some("article"), &spec)
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Title A");
        assert!(items[0].content.contains("content text"));
    }

    #[test]
    fn selector_matching_nothing_falls_back_to_body() {
        let html = "<body><p>only paragraph</p></body>";
        let items = engine()
            .extract(html, "https://example.com", Some("article"), &ExtractSpec::default())
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "only paragraph");
    }

    #[test]
    fn empty_page_still_yields_one_item() {
        let items = engine()
            .extract("<body></body>", "https://example.com", None, &ExtractSpec::default())
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "");
        assert_eq!(items[0].title, "item-1");
        assert_eq!(items[0].links.html, "https://example.com");
    }

    #[test]
    fn auto_split_breaks_page_into_list_items() {
        let html = "<body><ul><li>first</li><li>second</li><li>third</li></ul></body>";
        let items = engine()
            .extract(html, "https://example.com", None, &ExtractSpec::default())
            .unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].content, "first");
        assert_eq!(items[2].content, "third");
    }

    #[test]
    fn auto_split_off_keeps_one_body_item() {
        let config = ExtractConfig {
            auto_split: false,
            ..ExtractConfig::default()
        };
        let html = "<body><ul><li>first</li><li>second</li></ul></body>";
        let items = ExtractionEngine::new(config)
            .extract(html, "https://example.com", None, &ExtractSpec::default())
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "first second");
    }

    #[test]
    fn caller_limit_and_page_cap_both_bound_output() {
        let html = format!(
            "<body>{}</body>",
            (0..30).map(|i| format!("<article>entry {i}</article>")).collect::<String>()
        );

        let spec = ExtractSpec {
            max_items: Some(5),
            ..ExtractSpec::default()
        };
        let items = engine()
            .extract(&html, "https://example.com", Some("article"), &spec)
            .unwrap();
        assert_eq!(items.len(), 5);

        let config = ExtractConfig {
            max_items_per_page: 3,
            ..ExtractConfig::default()
        };
        let items = ExtractionEngine::new(config)
            .extract(&html, "https://example.com", Some("article"), &spec)
            .unwrap();
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn non_positive_max_items_means_no_caller_limit() {
        let html = format!(
            "<body>{}</body>",
            (0..10).map(|i| format!("<article>entry {i}</article>")).collect::<String>()
        );
        for bad in [Some(0), Some(-4), None] {
            let spec = ExtractSpec {
                max_items: bad,
                ..ExtractSpec::default()
            };
            let items = engine()
                .extract(&html, "https://example.com", Some("article"), &spec)
                .unwrap();
            assert_eq!(items.len(), 10, "max_items {bad:?}");
        }
    }

    #[test]
    fn empty_nodes_are_skipped() {
        let html = "<body><article>real</article><article>  </article><article>more</article></body>";
        let items = engine()
            .extract(html, "https://example.com", Some("article"), &ExtractSpec::default())
            .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn whitespace_is_collapsed() {
        let html = "<body><article>  spaced\n\n   out\ttext </article></body>";
        let items = engine()
            .extract(html, "https://example.com", Some("article"), &ExtractSpec::default())
            .unwrap();
        assert_eq!(items[0].content, "spaced out text");
    }

    #[test]
    fn content_and_summary_are_clamped_with_marker() {
        let config = ExtractConfig {
            max_content_chars: 100,
            ..ExtractConfig::default()
        };
        let long = "word ".repeat(200);
        let html = format!("<body><article>{long}</article></body>");
        let items = ExtractionEngine::new(config)
            .extract(&html, "https://example.com", Some("article"), &ExtractSpec::default())
            .unwrap();

        assert_eq!(items[0].content.chars().count(), 100);
        assert!(items[0].content.ends_with(TRUNCATION_MARKER));
        assert_eq!(items[0].summary.chars().count(), SUMMARY_MAX_CHARS);
        assert!(items[0].summary.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = "<body><article>alpha</article><article>beta</article></body>";
        let run = || {
            engine()
                .extract(html, "https://example.com", Some("article"), &ExtractSpec::default())
                .unwrap()
                .into_iter()
                .map(|i| i.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn id_changes_when_content_changes() {
        let a = engine()
            .extract(
                "<body><article>alpha</article></body>",
                "https://example.com",
                Some("article"),
                &ExtractSpec::default(),
            )
            .unwrap();
        let b = engine()
            .extract(
                "<body><article>beta</article></body>",
                "https://example.com",
                Some("article"),
                &ExtractSpec::default(),
            )
            .unwrap();
        assert_ne!(a[0].id, b[0].id);
    }

    #[test]
    fn heading_fallback_then_placeholder() {
        let html = "<body>\
            <article><h1>Heading</h1>text</article>\
            <article>plain text</article>\
        </body>";
        let items = engine()
            .extract(html, "https://example.com", Some("article"), &ExtractSpec::default())
            .unwrap();
        assert_eq!(items[0].title, "Heading");
        assert_eq!(items[1].title, "item-2");
    }

    #[test]
    fn field_attr_variants() {
        let html = r#"<body><article>
            <h2>T</h2>
            <a class="doc" href="/docs/file.pdf">download</a>
            <div class="inner"><b>bold</b></div>
        </article></body>"#;
        let spec = ExtractSpec {
            fields: vec![
                FieldSpec {
                    name: "links".into(),
                    selector: Some("a.doc".into()),
                    attr: Some("href".into()),
                    fallback: None,
                },
                FieldSpec {
                    name: "section".into(),
                    selector: Some("div.inner".into()),
                    attr: Some("html".into()),
                    fallback: None,
                },
                FieldSpec {
                    name: "category".into(),
                    selector: None,
                    attr: None,
                    fallback: Some("news".into()),
                },
                FieldSpec {
                    name: "date".into(),
                    selector: Some("time".into()),
                    attr: None,
                    fallback: Some("unknown".into()),
                },
            ],
            ..ExtractSpec::default()
        };
        let items = engine()
            .extract(html, "https://example.com/list", Some("article"), &spec)
            .unwrap();

        let item = &items[0];
        // href attribute, resolved against the source URL
        assert_eq!(item.links.html, "https://example.com/docs/file.pdf");
        // inner markup
        assert_eq!(item.section.as_deref(), Some("<b>bold</b>"));
        // literal fallback without selector
        assert_eq!(item.category.as_deref(), Some("news"));
        // fallback when the descendant selector matches nothing
        assert_eq!(item.date.as_deref(), Some("unknown"));
    }

    #[test]
    fn links_default_to_first_anchor_then_source_url() {
        let html = "<body>\
            <article><a href=\"/a/1\">one</a>text</article>\
            <article>no anchor here</article>\
        </body>";
        let items = engine()
            .extract(html, "https://example.com/base/", Some("article"), &ExtractSpec::default())
            .unwrap();
        assert_eq!(items[0].links.html, "https://example.com/a/1");
        assert_eq!(items[1].links.html, "https://example.com/base/");
    }

    #[test]
    fn include_raw_html_attaches_node_markup() {
        let html = "<body><article><p>hi</p></article></body>";
        let spec = ExtractSpec {
            include_raw_html: true,
            ..ExtractSpec::default()
        };
        let items = engine()
            .extract(html, "https://example.com", Some("article"), &spec)
            .unwrap();
        assert!(items[0].raw.as_deref().unwrap().contains("<p>hi</p>"));
    }

    #[test]
    fn invalid_selector_is_a_validation_error() {
        let err = engine()
            .extract("<body></body>", "https://example.com", Some("[[["), &ExtractSpec::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn spec_deserializes_from_camel_case_json() {
        let spec: ExtractSpec = serde_json::from_str(
            r#"{
                "selector": ".entry",
                "fields": [{"name": "title", "selector": "h2"}],
                "maxItems": 10,
                "includeRawHtml": true
            }"#,
        )
        .unwrap();
        assert_eq!(spec.selector.as_deref(), Some(".entry"));
        assert_eq!(spec.max_items, Some(10));
        assert!(spec.include_raw_html);
        assert_eq!(spec.fields.len(), 1);
    }
}
