use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CITATION_MARKER: Regex = Regex::new(r"【[^】]*】").unwrap();
}

/// Remove source citation markers such as `【4:0†source】`
pub fn strip_citations(content: &str) -> String {
    CITATION_MARKER.replace_all(content, "").into_owned()
}

/// Render message content as HTML. Raw HTML in the content is escaped.
pub fn to_html(content: &str) -> String {
    markdown::to_html(&strip_citations(content))
}
