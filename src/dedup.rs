use std::collections::HashSet;

/// Links already observed during one pipeline run.
///
/// Seed it with the sink's existing links to avoid re-emitting records that
/// are already persisted.
#[derive(Debug, Default, Clone)]
pub struct SeenLinks {
    links: HashSet<String>,
}

impl SeenLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    pub fn mark(&mut self, link: &str) {
        self.links.insert(link.to_string());
    }

    /// Marks `link` and reports whether it was new.
    pub fn insert(&mut self, link: &str) -> bool {
        if self.seen(link) {
            return false;
        }
        self.mark(link);
        true
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SeenLinks {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        SeenLinks {
            links: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for SeenLinks {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.links.extend(iter.into_iter().map(Into::into));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_then_seen() {
        let mut seen = SeenLinks::new();
        assert!(!seen.seen("https://jobs.lever.co/acme/1"));
        seen.mark("https://jobs.lever.co/acme/1");
        assert!(seen.seen("https://jobs.lever.co/acme/1"));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_insert_reports_novelty_once() {
        let mut seen = SeenLinks::new();
        assert!(seen.insert("a"));
        assert!(!seen.insert("a"));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_seeded_from_existing_links() {
        let mut seen: SeenLinks = vec!["a", "b"].into_iter().collect();
        seen.extend(vec!["c".to_string()]);
        assert!(seen.seen("a") && seen.seen("c"));
        assert!(!seen.seen("d"));
    }
}
