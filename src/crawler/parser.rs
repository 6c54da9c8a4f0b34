//! Link extraction from directory-listing pages
//!
//! Autoindex markup varies wildly between servers and is frequently
//! malformed, so links are scraped with a tolerant regex rather than a
//! strict HTML parser. The filter below decides which hrefs are actual
//! listing entries; everything else (sort links, parent links, absolute
//! URLs) is dropped.

use regex::Regex;
use std::sync::OnceLock;

fn href_pattern() -> &'static Regex {
    static HREF: OnceLock<Regex> = OnceLock::new();
    HREF.get_or_init(|| Regex::new(r#"href=["']([^"']+)["']"#).expect("valid href pattern"))
}

/// Schemes that mark a link as pointing outside the mirrored tree
const EXCLUDED_SCHEMES: [&str; 7] = [
    "http://",
    "https://",
    "ftp://",
    "mailto:",
    "javascript:",
    "data:",
    "vbscript:",
];

/// Extracts listing-entry links from an HTML page, in document order
///
/// Candidates are excluded on the first matching rule:
/// absolute/scheme-qualified references, fragment-only references, `/` and
/// `./`; anything containing a parent-traversal sequence; textual
/// "parent"/"back" links and anything carrying a query component; empty or
/// whitespace-only text.
pub fn extract_links(html: &str) -> Vec<String> {
    href_pattern()
        .captures_iter(html)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str())
        .filter(|link| !is_excluded(link))
        .map(str::to_string)
        .collect()
}

fn is_excluded(link: &str) -> bool {
    // Off-tree references: absolute URLs, non-http schemes, fragments,
    // and self-references.
    if EXCLUDED_SCHEMES
        .iter()
        .any(|scheme| link.starts_with(scheme))
        || link.starts_with('#')
        || link == "/"
        || link == "./"
    {
        return true;
    }

    // Any parent-traversal sequence
    if link.contains("..") {
        return true;
    }

    // Navigation chrome and sort/query links
    let lower = link.to_lowercase();
    if lower.contains("parent") || lower.contains("back") {
        return true;
    }
    if link.contains('?') || link.contains('&') {
        return true;
    }

    link.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_files_and_directories_in_order() {
        let html = r#"<html><body>
            <a href="file1.txt">file1.txt</a>
            <a href="subdir/">subdir/</a>
            <a href="../">Parent Directory</a>
            <a href="?order=name">Name</a>
            <a href="mailto:a@b.com">mail</a>
            <a href="javascript:void(0)">js</a>
        </body></html>"#;

        assert_eq!(extract_links(html), vec!["file1.txt", "subdir/"]);
    }

    #[test]
    fn test_excludes_absolute_urls() {
        let html = r#"<a href="http://other.example.org/x">x</a>
                      <a href="https://other.example.org/y">y</a>
                      <a href="ftp://mirror.example.org/z">z</a>"#;
        assert!(extract_links(html).is_empty());
    }

    #[test]
    fn test_excludes_script_and_data_schemes() {
        let html = r#"<a href="data:text/plain,hi">d</a>
                      <a href="vbscript:evil()">v</a>"#;
        assert!(extract_links(html).is_empty());
    }

    #[test]
    fn test_excludes_fragments_and_self_references() {
        let html = r##"<a href="#top">top</a>
                       <a href="/">root</a>
                       <a href="./">here</a>"##;
        assert!(extract_links(html).is_empty());
    }

    #[test]
    fn test_excludes_traversal_patterns() {
        let html = r#"<a href="..">up</a>
                      <a href="../">up</a>
                      <a href="../../etc/passwd">deep</a>
                      <a href="dir/../other">mid</a>
                      <a href="dir/..">tail</a>"#;
        assert!(extract_links(html).is_empty());
    }

    #[test]
    fn test_excludes_navigation_text_and_queries() {
        let html = r#"<a href="Parent%20Directory">parent</a>
                      <a href="go-BACK.html">back</a>
                      <a href="list?C=M;O=A">sort</a>
                      <a href="a&amp;b">amp</a>"#;
        assert!(extract_links(html).is_empty());
    }

    #[test]
    fn test_excludes_whitespace_links() {
        let html = r#"<a href=" ">blank</a>"#;
        assert!(extract_links(html).is_empty());
    }

    #[test]
    fn test_tolerates_malformed_markup() {
        // Unclosed tags and stray brackets should not break extraction
        let html = r#"<html><body><table>
            <tr><td><a href="good.iso">good.iso</a>
            <a href='single.txt'>single-quoted
            <<>> <a href="sub/">sub/"#;
        assert_eq!(extract_links(html), vec!["good.iso", "single.txt", "sub/"]);
    }

    #[test]
    fn test_no_links_in_plain_page() {
        assert!(extract_links("<html><body>Hello</body></html>").is_empty());
    }
}
