//! Extraction of page-image filenames from an archive directory listing.

use std::sync::LazyLock;

use scraper::{Html, Selector};

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Percent-encoded `/` separating directories inside a zip listing link.
const ENCODED_SLASH: &str = "%2F";

/// Whether `href` points at a `.jp2` file under a download path.
fn is_jp2_download(href: &str) -> bool {
    match href.find("download") {
        Some(start) => {
            href.ends_with(".jp2") && href.len() - ".jp2".len() >= start + "download".len()
        }
        None => false,
    }
}

/// Final path segment after the last encoded slash.
fn filename_from_href(href: &str) -> &str {
    href.rsplit(ENCODED_SLASH).next().unwrap_or(href)
}

/// Filenames of every `.jp2` download link in `body`, in document order.
pub fn jp2_filenames(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    document
        .select(&LINK_SELECTOR)
        .filter_map(|link| link.value().attr("href"))
        .filter(|href| is_jp2_download(href))
        .map(|href| filename_from_href(href).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<html><body>
<table class="archive">
<tr><td><a href="/download/item1/item1_jp2.zip/">Go up</a></td></tr>
<tr><td><a href="//archive.org/download/item1/item1_jp2.zip/item1_jp2%2Fitem1_0002.jp2">item1_jp2/item1_0002.jp2</a></td></tr>
<tr><td><a href="//archive.org/download/item1/item1_jp2.zip/item1_jp2%2Fitem1_0001.jp2">item1_jp2/item1_0001.jp2</a></td></tr>
<tr><td><a href="//archive.org/download/item1/item1_jp2.zip/item1_jp2%2Fitem1_0001.jp2.xml">meta</a></td></tr>
<tr><td><a href="/details/item1/page_0003.jp2">details link</a></td></tr>
<tr><td><a>no href</a></td></tr>
</table>
</body></html>"#;

    #[test]
    fn test_extracts_jp2_links_in_document_order() {
        assert_eq!(
            jp2_filenames(LISTING),
            ["item1_0002.jp2", "item1_0001.jp2"]
        );
    }

    #[test]
    fn test_is_jp2_download() {
        assert!(is_jp2_download("/download/x/y.jp2"));
        assert!(is_jp2_download("download.jp2"));
        assert!(!is_jp2_download("/download/x/y.jp2.xml"));
        assert!(!is_jp2_download("/details/x/y.jp2"));
        assert!(!is_jp2_download("/x/y.JP2download"));
    }

    #[test]
    fn test_filename_without_encoded_slash_is_whole_href() {
        assert_eq!(filename_from_href("/download/x/y.jp2"), "/download/x/y.jp2");
        assert_eq!(filename_from_href("a%2Fb%2Fc.jp2"), "c.jp2");
    }

    #[test]
    fn test_empty_or_linkless_body() {
        assert!(jp2_filenames("").is_empty());
        assert!(jp2_filenames("<html><body>Not found</body></html>").is_empty());
    }
}
