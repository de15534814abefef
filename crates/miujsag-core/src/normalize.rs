use crate::models::{Article, Category, IndexableArticle, IndexedCategory, IndexedSite, Site};

/// Builds the engine document for `article`, embedding copies of its taxonomy.
///
/// Only `{id, name, slug}` of the site and `{id, name}` of the category are
/// carried over. Missing content becomes an empty string.
#[must_use]
pub fn normalize(article: &Article, site: &Site, category: &Category) -> IndexableArticle {
    IndexableArticle {
        title: article.title.clone(),
        url: article.url.clone(),
        description: article.description.clone(),
        content: article
            .content
            .as_deref()
            .map(collapse_whitespace)
            .unwrap_or_default(),
        published_at: article.published_at,
        estimated_read_time: article.estimated_read_time,
        image: article.image.clone(),
        site: IndexedSite {
            id: site.id,
            name: site.name.clone(),
            slug: site.slug.clone(),
        },
        category: IndexedCategory {
            id: category.id,
            name: category.name.clone(),
        },
    }
}

/// Replaces every run of two or more whitespace characters with one space.
///
/// A lone whitespace character is kept as is, so a single tab or newline
/// survives untouched.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if !ch.is_whitespace() {
            out.push(ch);
            continue;
        }
        if chars.peek().is_some_and(|next| next.is_whitespace()) {
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn article(content: Option<&str>) -> Article {
        Article {
            id: "a-1".to_string(),
            title: "Go concurrency patterns".to_string(),
            url: "http://x/a".to_string(),
            description: "channels and select".to_string(),
            content: content.map(ToString::to_string),
            published_at: Utc::now(),
            estimated_read_time: 4,
            image: Some("http://x/a.png".to_string()),
        }
    }

    fn site() -> Site {
        Site {
            id: 1,
            name: "Eng".to_string(),
            slug: Some("eng".to_string()),
        }
    }

    fn category() -> Category {
        Category {
            id: 5,
            name: "Backend".to_string(),
            slug: Some("backend".to_string()),
        }
    }

    fn has_whitespace_run(text: &str) -> bool {
        text.chars()
            .zip(text.chars().skip(1))
            .any(|(a, b)| a.is_whitespace() && b.is_whitespace())
    }

    #[test]
    fn collapse_whitespace_merges_mixed_runs() {
        assert_eq!(collapse_whitespace("a  b   c"), "a b c");
        assert_eq!(collapse_whitespace("a\n\n\tb"), "a b");
        assert_eq!(collapse_whitespace("  lead and trail  "), " lead and trail ");
        assert_eq!(collapse_whitespace("one\ttab"), "one\ttab");
        assert_eq!(collapse_whitespace("nbsp\u{a0} run"), "nbsp run");
    }

    #[test]
    fn collapse_whitespace_leaves_no_runs_and_is_idempotent() {
        for input in [
            "",
            " ",
            "\t\t",
            "x \n \r\n y",
            "no-runs-here",
            "many     spaces\u{2003}\u{2003}em",
        ] {
            let once = collapse_whitespace(input);
            assert!(!has_whitespace_run(&once), "run left in {once:?}");
            assert_eq!(collapse_whitespace(&once), once);
        }
    }

    #[test]
    fn normalize_collapses_content_and_passes_scalars_through() {
        let source = article(Some("a  b   c"));
        let doc = normalize(&source, &site(), &category());
        assert_eq!(doc.content, "a b c");
        assert_eq!(doc.title, source.title);
        assert_eq!(doc.url, source.url);
        assert_eq!(doc.description, source.description);
        assert_eq!(doc.published_at, source.published_at);
        assert_eq!(doc.estimated_read_time, 4);
        assert_eq!(doc.image, source.image);
    }

    #[test]
    fn normalize_uses_empty_content_when_absent() {
        let doc = normalize(&article(None), &site(), &category());
        assert_eq!(doc.content, "");
        let body = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(body["content"], "");
    }

    #[test]
    fn normalize_embeds_only_whitelisted_taxonomy_fields() {
        let doc = normalize(&article(Some("x")), &site(), &category());
        let body = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(body["site"], serde_json::json!({"id": 1, "name": "Eng", "slug": "eng"}));
        assert_eq!(body["category"], serde_json::json!({"id": 5, "name": "Backend"}));
    }

    #[test]
    fn normalize_is_stable_when_applied_to_its_own_content() {
        let first = normalize(&article(Some("a \n\n b")), &site(), &category());
        let mut again = article(None);
        again.content = Some(first.content.clone());
        let second = normalize(&again, &site(), &category());
        assert_eq!(first.content, second.content);
    }
}
