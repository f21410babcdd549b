use std::collections::BTreeSet;
use log::{debug, warn};

/// One site-restricted search, consumed by a single pagination run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub site: String,
    pub location_terms: Vec<String>,
    pub role_terms: Vec<String>,
    /// Extra OR-group appended verbatim, e.g. `salary OR "$"`.
    pub required_terms: Vec<String>,
    pub excluded_phrases: Vec<String>,
}

impl SearchQuery {
    pub fn new(
        site: impl Into<String>,
        location_terms: Vec<String>,
        role_terms: Vec<String>,
    ) -> Self {
        SearchQuery {
            site: site.into(),
            location_terms,
            role_terms,
            required_terms: Vec::new(),
            excluded_phrases: Vec::new(),
        }
    }

    /// `site:<site> ("loc" OR ...) ("role" OR ...) (extra OR ...) -"phrase"`
    pub fn query_string(&self) -> String {
        let mut parts = vec![format!("site:{}", self.site)];
        parts.extend(quoted_group(&self.location_terms));
        parts.extend(quoted_group(&self.role_terms));
        if !self.required_terms.is_empty() {
            parts.push(format!("({})", self.required_terms.join(" OR ")));
        }
        for phrase in &self.excluded_phrases {
            parts.push(format!("-\"{}\"", phrase));
        }
        parts.join(" ")
    }
}

fn quoted_group(terms: &[String]) -> Option<String> {
    if terms.is_empty() {
        return None;
    }
    let quoted: Vec<String> = terms.iter().map(|t| format!("\"{}\"", t)).collect();
    Some(format!("({})", quoted.join(" OR ")))
}

fn clean_terms<S: AsRef<str>>(terms: &[S]) -> Vec<String> {
    terms
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expands each role into itself, "senior", "sr", lowercase and hyphenated
/// variants. The result is a set; callers must not rely on its order.
pub fn expand_roles<S: AsRef<str>>(roles: &[S]) -> Vec<String> {
    let mut expanded = BTreeSet::new();
    for role in clean_terms(roles) {
        expanded.insert(format!("senior {}", role));
        expanded.insert(format!("sr {}", role));
        expanded.insert(role.to_lowercase());
        expanded.insert(role.replace(' ', "-"));
        expanded.insert(role);
    }
    expanded.into_iter().collect()
}

#[derive(Debug, Clone, Default)]
pub struct QueryPlanner {
    expand_roles: bool,
    split_locations: bool,
    required_terms: Vec<String>,
    excluded_phrases: Vec<String>,
}

impl QueryPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expand_roles(mut self, expand: bool) -> Self {
        self.expand_roles = expand;
        self
    }

    /// One query per site × location instead of a single location OR-group.
    pub fn split_locations(mut self, split: bool) -> Self {
        self.split_locations = split;
        self
    }

    pub fn required_terms<S: AsRef<str>>(mut self, terms: &[S]) -> Self {
        self.required_terms = clean_terms(terms);
        self
    }

    pub fn excluded_phrases<S: AsRef<str>>(mut self, phrases: &[S]) -> Self {
        self.excluded_phrases = clean_terms(phrases);
        self
    }

    pub fn plan<S: AsRef<str>>(
        &self,
        sites: &[S],
        locations: &[S],
        roles: &[S],
    ) -> Vec<SearchQuery> {
        let locations = clean_terms(locations);
        let roles = if self.expand_roles {
            expand_roles(roles)
        } else {
            clean_terms(roles)
        };

        let location_groups: Vec<Vec<String>> = if self.split_locations && !locations.is_empty() {
            locations.iter().map(|l| vec![l.clone()]).collect()
        } else {
            vec![locations]
        };

        let mut queries = Vec::new();
        for site in clean_terms(sites) {
            for group in &location_groups {
                let query = SearchQuery {
                    site: site.clone(),
                    location_terms: group.clone(),
                    role_terms: roles.clone(),
                    required_terms: self.required_terms.clone(),
                    excluded_phrases: self.excluded_phrases.clone(),
                };
                debug!("Planned query: {}", query.query_string());
                queries.push(query);
            }
        }

        if queries.is_empty() {
            warn!("No search queries planned; check the configured job sites.");
        }
        queries
    }
}

/// Plans one query per non-blank site.
pub fn plan<S: AsRef<str>>(
    sites: &[S],
    locations: &[S],
    roles: &[S],
    expand_roles: bool,
) -> Vec<SearchQuery> {
    QueryPlanner::new()
        .expand_roles(expand_roles)
        .plan(sites, locations, roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn test_one_query_per_site() {
        let queries = plan(
            &["lever.co", "  ", "greenhouse.io"],
            &["LATAM", "", "Mexico"],
            &["backend engineer"],
            false,
        );

        assert_eq!(queries.len(), 2);
        assert_eq!(
            queries[0].query_string(),
            r#"site:lever.co ("LATAM" OR "Mexico") ("backend engineer")"#
        );
        assert_eq!(queries[1].site, "greenhouse.io");
    }

    #[test]
    fn test_blank_site_contributes_nothing() {
        assert!(plan(&[" "], &["Remote"], &["engineer"], false).is_empty());
    }

    #[test]
    fn test_role_expansion_is_a_set() {
        let expanded: HashSet<String> = expand_roles(&["Backend Engineer", "backend engineer"])
            .into_iter()
            .collect();

        let expected: HashSet<String> = [
            "Backend Engineer",
            "senior Backend Engineer",
            "sr Backend Engineer",
            "backend engineer",
            "Backend-Engineer",
            "senior backend engineer",
            "sr backend engineer",
            "backend-engineer",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(expanded, expected);
    }

    #[test]
    fn test_expanded_roles_land_in_query() {
        let queries = plan(&["lever.co"], &["Remote"], &["dev"], true);
        let roles: HashSet<&str> = queries[0].role_terms.iter().map(String::as_str).collect();
        assert_eq!(roles, HashSet::from(["dev", "senior dev", "sr dev"]));
    }

    #[test]
    fn test_split_locations_and_extra_terms() {
        let queries = QueryPlanner::new()
            .split_locations(true)
            .required_terms(&["salary", "\"$\""])
            .excluded_phrases(&["job board"])
            .plan(&["lever.co"], &["Mexico", "LATAM"], &["engineer"]);

        assert_eq!(queries.len(), 2);
        assert_eq!(
            queries[1].query_string(),
            r#"site:lever.co ("LATAM") ("engineer") (salary OR "$") -"job board""#
        );
    }

    #[test]
    fn test_empty_locations_omit_group() {
        let no_locations: [&str; 0] = [];
        let queries = plan(&["lever.co"], &no_locations, &["engineer"], false);
        assert_eq!(queries[0].query_string(), r#"site:lever.co ("engineer")"#);
    }
}
