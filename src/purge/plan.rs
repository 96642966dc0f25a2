//! Subject URL planning for a content-change event.
//!
//! A content change touches more than the changed item: the home page
//! and the syndication feeds go stale with it. The plan collects the
//! URLs to purge for one event, skipping blank entries rather than
//! purging them as empty strings.

use url::Url;

/// One content-change event, described by the URLs it affects.
#[derive(Debug, Clone, Default)]
pub struct ContentChange {
    /// Canonical URL of the changed item.
    pub content_url: String,
    /// The site's home URL, if it should be purged alongside.
    pub home_url: Option<String>,
    /// Syndication feed URLs; any of them may be empty and is skipped.
    pub feed_urls: Vec<String>,
}

impl ContentChange {
    /// The URLs to purge for this change, in order: content, home, feeds.
    ///
    /// Blank entries are skipped, duplicates dropped (first occurrence
    /// wins), and a bare-domain home URL gains the root path so the
    /// cache key matches what the public site serves.
    pub fn subject_urls(&self) -> Vec<String> {
        let mut subjects = Vec::new();

        push_subject(&mut subjects, self.content_url.trim());
        if let Some(home) = self.home_url.as_deref() {
            push_subject(&mut subjects, &normalize_home(home.trim()));
        }
        for feed in &self.feed_urls {
            push_subject(&mut subjects, feed.trim());
        }

        subjects
    }
}

fn push_subject(subjects: &mut Vec<String>, url: &str) {
    if url.is_empty() || subjects.iter().any(|existing| existing == url) {
        return;
    }
    subjects.push(url.to_string());
}

/// Give a bare-domain home URL its root path.
///
/// An unparseable home URL passes through untouched; the retargeter
/// reports it with the others.
fn normalize_home(home: &str) -> String {
    match Url::parse(home) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => home.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_come_in_order() {
        let change = ContentChange {
            content_url: "http://example.com/2012/my-post/".to_string(),
            home_url: Some("http://example.com/".to_string()),
            feed_urls: vec![
                "http://example.com/feed/".to_string(),
                "http://example.com/feed/atom/".to_string(),
            ],
        };

        assert_eq!(
            change.subject_urls(),
            vec![
                "http://example.com/2012/my-post/",
                "http://example.com/",
                "http://example.com/feed/",
                "http://example.com/feed/atom/",
            ]
        );
    }

    #[test]
    fn bare_home_url_gains_the_root_path() {
        let change = ContentChange {
            content_url: "http://example.com/2012/my-post/".to_string(),
            home_url: Some("http://example.com".to_string()),
            feed_urls: Vec::new(),
        };

        assert_eq!(
            change.subject_urls(),
            vec!["http://example.com/2012/my-post/", "http://example.com/"]
        );
    }

    #[test]
    fn empty_feed_urls_are_skipped() {
        let change = ContentChange {
            content_url: "http://example.com/2012/my-post/".to_string(),
            home_url: None,
            feed_urls: vec![String::new(), "   ".to_string()],
        };

        assert_eq!(
            change.subject_urls(),
            vec!["http://example.com/2012/my-post/"]
        );
    }

    #[test]
    fn duplicates_are_dropped() {
        let change = ContentChange {
            // A change to the home page itself: content and home match
            // once the home URL is normalized.
            content_url: "http://example.com/".to_string(),
            home_url: Some("http://example.com".to_string()),
            feed_urls: vec!["http://example.com/feed/".to_string()],
        };

        assert_eq!(
            change.subject_urls(),
            vec!["http://example.com/", "http://example.com/feed/"]
        );
    }

    #[test]
    fn unparseable_home_url_passes_through() {
        let change = ContentChange {
            content_url: "http://example.com/a/".to_string(),
            home_url: Some("not a url".to_string()),
            feed_urls: Vec::new(),
        };

        assert_eq!(
            change.subject_urls(),
            vec!["http://example.com/a/", "not a url"]
        );
    }

    #[test]
    fn blank_content_url_is_skipped() {
        let change = ContentChange {
            content_url: "  ".to_string(),
            home_url: Some("http://example.com".to_string()),
            feed_urls: Vec::new(),
        };

        assert_eq!(change.subject_urls(), vec!["http://example.com/"]);
    }
}
