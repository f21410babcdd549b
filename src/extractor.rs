//! Heuristic field extraction from search titles, snippets and descriptions.
//!
//! Every function here is a pure transform over its inputs. A miss is not an
//! error: it comes back as [`NOT_AVAILABLE`] (or [`Currency::Unknown`]).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "GBP")]
    Gbp,
    #[serde(rename = "CAD")]
    Cad,
    #[serde(rename = "AUD")]
    Aud,
    #[default]
    #[serde(rename = "N/A")]
    Unknown,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
            Currency::Unknown => NOT_AVAILABLE,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("extractor pattern must compile"))
        .collect()
}

const TITLE_SEPARATORS: &[&str] = &[" at ", " in ", " - ", " | ", " @ ", " for "];

static TITLE_NOISE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\([^)]*\)",
        r"\[[^\]]*\]",
        r"(?i)\b(?:remote|hybrid|onsite|on-site|in-office)\b.*$",
        r"(?i)\b(?:full[ -]time|part[ -]time|contract)\b.*$",
        r"(?i)\b(?:united states|usa|uk|europe|apac)\b.*$",
        r"\d{1,2}\+? years?.*$",
        r",.*$",
    ])
});

/// Hosts that carry many employers' postings, so the domain says nothing
/// about the company.
const JOB_BOARD_HOSTS: &[&str] = &[
    "linkedin", "indeed", "glassdoor", "ziprecruiter", "monster", "wellfound",
    "lever.co", "greenhouse.io", "ashbyhq.com", "myworkdayjobs", "workday",
    "smartrecruiters", "workable", "builtin", "weworkremotely", "remoteok",
];

/// Boards whose first path segment is the employer slug.
const SLUG_HOSTS: &[&str] = &["lever.co", "greenhouse.io", "ashbyhq.com"];

const GENERIC_LABELS: &[&str] = &["www", "jobs", "careers", "apply", "boards"];

const TWO_PART_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "com.au", "com.mx", "com.br", "com.ar", "com.co", "co.nz", "co.in", "co.jp",
];

static COMPANY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\bat\s+([a-z0-9&][a-z0-9\s&]*?)\s+(?:is|for|in)\b",
        r"(?i)\bwith\s+([a-z0-9&][a-z0-9\s&]*?)\s+(?:is|for|in)\b",
        r"(?i)(?:^|\s)-\s*([a-z0-9&][a-z0-9\s&]*?)(?:\s+(?:is|for|in)\b|\s*\d|\s*$)",
        r"(?i)\|\s*([a-z0-9&][a-z0-9\s&]*?)(?:\s+(?:is|for|in)\b|\s*\d|\s*$)",
    ])
});

static LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b((?:fully\s+)?remote)\b",
        r"(?i)\b(hybrid)\b",
        r"(?i)\b(on[- ]?site|in[- ]office)\b",
        // City, ST
        r"\b(?:[Ii]n|[Aa]t|[Ll]ocation:?)\s+([A-Z][a-zA-Z]+(?:\s[A-Z][a-zA-Z]+)*,\s*[A-Z]{2})\b",
        // City, Country
        r"\b(?:[Ii]n|[Aa]t|[Ll]ocation:?)\s+([A-Z][a-zA-Z]+(?:\s[A-Z][a-zA-Z]+)*,\s*[A-Z][a-z]+(?:\s[A-Z][a-z]+)*)",
    ])
});

static COMPENSATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)[$€£]\d{2,3}k\s*-\s*[$€£]\d{2,3}k",
        r"(?i)[$€£]\d{2,3}\s*-\s*\d{2,3}k",
        r"(?i)[$€£]\d{1,3}(?:,\d{3})*(?:\s*-\s*[$€£]\d{1,3}(?:,\d{3})*)?(?:\s*per\s*year)?",
        r"(?i)[$€£]\d{2,3}(?:,\d{3})*\+",
        r"(?i)[$€£]\d{2,3}k\+",
        r"(?i)[$€£]\d{2,3}(?:\.\d{2})?\s*(?:per\s*hour|/\s*hour|/\s*hr\b|hr\b|\s+an\s+hour)",
        r"(?i)annual\s*salary\s*(?:of\s*)?[$€£]\d{1,3}(?:,\d{3})*",
        r"(?i)salary\s*range\s*(?:of\s*)?[$€£]\d{1,3}(?:,\d{3})*k?\s*-\s*[$€£]\d{1,3}(?:,\d{3})*k?",
        r"(?i)\b\d{2,3}(?:,?\d{3})*k?\s*-\s*\d{2,3}(?:,?\d{3})*k?\b",
    ])
});

static CURRENCY_PATTERNS: LazyLock<Vec<(Currency, Regex)>> = LazyLock::new(|| {
    [
        (Currency::Usd, r"(?i)\$|\bUSD\b"),
        (Currency::Eur, r"(?i)€|\bEUR\b"),
        (Currency::Gbp, r"(?i)£|\bGBP\b"),
        (Currency::Cad, r"(?i)\bCAD\b"),
        (Currency::Aud, r"(?i)\bAUD\b"),
    ]
    .into_iter()
    .map(|(currency, p)| (currency, Regex::new(p).expect("currency pattern must compile")))
    .collect()
});

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut at_word_start = true;
    for c in word.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn join_or_na(values: Vec<String>) -> String {
    if values.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        values.join(" / ")
    }
}

/// Strips company, location and employment-type noise from a posting title.
///
/// Falls back to the whitespace-collapsed input if nothing would be left.
pub fn clean_title(title: &str) -> String {
    let cut = TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| title.find(sep))
        .min()
        .unwrap_or(title.len());

    let mut cleaned = title[..cut].to_string();
    for pattern in TITLE_NOISE.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }

    let cleaned = collapse_whitespace(&cleaned);
    if cleaned.is_empty() {
        collapse_whitespace(title)
    } else {
        cleaned
    }
}

fn is_job_board(host: &str) -> bool {
    JOB_BOARD_HOSTS.iter().any(|board| host.contains(board))
}

/// The label just left of the public suffix: `careers.acme.co.uk` -> `acme`.
fn registrable_label(host: &str) -> Option<&str> {
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return labels.first().copied();
    }
    let tail = labels[labels.len() - 2..].join(".");
    let suffix_len = if labels.len() >= 3 && TWO_PART_SUFFIXES.contains(&tail.as_str()) {
        2
    } else {
        1
    };
    labels.get(labels.len() - suffix_len - 1).copied()
}

fn company_from_text(text: &str) -> Option<String> {
    COMPANY_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| collapse_whitespace(m.as_str()))
            .filter(|name| !name.is_empty())
    })
}

fn company_from_board_path(url: &Url, host: &str) -> Option<String> {
    if !SLUG_HOSTS.iter().any(|h| host.ends_with(h)) {
        return None;
    }
    url.path_segments()
        .and_then(|mut segments| segments.next())
        .filter(|slug| !slug.is_empty())
        .map(|slug| title_case(&slug.replace(['-', '_'], " ")))
}

/// Guesses the employer from the posting URL, then from the text.
pub fn extract_company(text: &str, url: &str) -> String {
    let parsed = Url::parse(url).ok();
    let host = parsed
        .as_ref()
        .and_then(|u| u.host_str())
        .map(str::to_ascii_lowercase);

    if let Some(host) = host.as_deref() {
        if !is_job_board(host) {
            if let Some(label) = registrable_label(host) {
                if !GENERIC_LABELS.contains(&label) {
                    return title_case(label);
                }
            }
        }
    }

    if let Some(company) = company_from_text(text) {
        return company;
    }

    parsed
        .as_ref()
        .zip(host.as_deref())
        .and_then(|(url, host)| company_from_board_path(url, host))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Work-mode keywords and "City, ST" / "City, Country" mentions.
pub fn extract_location(text: &str) -> String {
    let mut locations: Vec<String> = Vec::new();
    for pattern in LOCATION_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let Some(found) = caps.get(1) else { continue };
            let location = found.as_str().trim();
            if !locations.iter().any(|l| l.eq_ignore_ascii_case(location)) {
                locations.push(location.to_string());
            }
        }
    }
    join_or_na(locations)
}

/// Salary and rate mentions, in text order.
///
/// A match lying entirely inside a longer match is dropped, so
/// "$90k - $120k" is not also reported as "$90" and "$120".
pub fn extract_compensation(text: &str) -> String {
    let mut spans: Vec<(usize, usize)> = COMPENSATION_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.find_iter(text).map(|m| (m.start(), m.end())))
        .collect();
    spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut kept: Vec<(usize, usize)> = Vec::new();
    for span in spans {
        if kept.iter().any(|k| k.0 <= span.0 && span.1 <= k.1) {
            continue;
        }
        kept.push(span);
    }

    let mut compensations: Vec<String> = Vec::new();
    for (start, end) in kept {
        let value = text[start..end].trim().to_string();
        if !compensations.contains(&value) {
            compensations.push(value);
        }
    }
    join_or_na(compensations)
}

/// First currency found, checked in USD, EUR, GBP, CAD, AUD order.
pub fn determine_currency(compensation_text: &str, description_text: &str) -> Currency {
    let full_text = format!("{} {}", compensation_text, description_text);
    CURRENCY_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(&full_text))
        .map(|(currency, _)| *currency)
        .unwrap_or(Currency::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title() {
        assert_eq!(
            clean_title("Senior Backend Engineer at Acme Corp (Remote)"),
            "Senior Backend Engineer"
        );
        assert_eq!(clean_title("Software Engineer (Backend) - Remote"), "Software Engineer");
        assert_eq!(clean_title("Data Engineer, Platform"), "Data Engineer");
        assert_eq!(clean_title("Frontend Developer Full-time 3+ years"), "Frontend Developer");
        assert_eq!(clean_title("QA Engineer [Contract]   LATAM"), "QA Engineer LATAM");
        assert_eq!(clean_title("Platform Engineer | Acme @ Mexico"), "Platform Engineer");
    }

    #[test]
    fn test_clean_title_cuts_at_earliest_separator() {
        assert_eq!(clean_title("Engineer for Payments at Acme"), "Engineer");
    }

    #[test]
    fn test_clean_title_never_empties() {
        assert_eq!(clean_title("  Remote   "), "Remote");
    }

    #[test]
    fn test_company_from_employer_domain() {
        assert_eq!(extract_company("", "https://careers.acme.com/jobs/123"), "Acme");
        assert_eq!(extract_company("", "https://www.globex.co.uk/careers"), "Globex");
    }

    #[test]
    fn test_company_from_text_on_job_board() {
        assert_eq!(
            extract_company(
                "Backend Engineer at Initech is hiring",
                "https://www.linkedin.com/jobs/view/1"
            ),
            "Initech"
        );
        assert_eq!(
            extract_company(
                "Join us. Work with Umbrella Labs in Monterrey",
                "https://www.indeed.com/viewjob?jk=1"
            ),
            "Umbrella Labs"
        );
        assert_eq!(
            extract_company("Senior Developer | Hooli", "https://www.glassdoor.com/job/1"),
            "Hooli"
        );
    }

    #[test]
    fn test_company_from_board_slug() {
        assert_eq!(
            extract_company("Senior Engineer (Remote)", "https://jobs.lever.co/pied-piper/abc-123"),
            "Pied Piper"
        );
    }

    #[test]
    fn test_company_unknown() {
        assert_eq!(extract_company("Senior Engineer (Remote)", "not a url"), NOT_AVAILABLE);
    }

    #[test]
    fn test_extract_location() {
        assert_eq!(
            extract_location("Fully remote role, based in Austin, TX"),
            "Fully remote / Austin, TX"
        );
        assert_eq!(
            extract_location("Hybrid position in Mexico City, Mexico. HYBRID schedule"),
            "Hybrid / Mexico City, Mexico"
        );
        assert_eq!(extract_location("On-site at HQ"), "On-site");
        assert_eq!(extract_location("Great team, great pay"), NOT_AVAILABLE);
    }

    #[test]
    fn test_extract_compensation() {
        let comp = extract_compensation("We offer $90k - $120k per year");
        assert!(comp.contains("$90k - $120k"), "got {comp}");
        assert_eq!(extract_compensation("no numbers here"), NOT_AVAILABLE);
    }

    #[test]
    fn test_extract_compensation_variants() {
        assert_eq!(extract_compensation("Pay: $45/hour"), "$45/hour");
        assert_eq!(extract_compensation("Base $120,000+ plus equity"), "$120,000+");
        assert_eq!(
            extract_compensation("A salary range of $80,000 - $100,000 applies"),
            "salary range of $80,000 - $100,000"
        );
        assert_eq!(extract_compensation("Budget 60,000 - 75,000 EUR"), "60,000 - 75,000");
        assert_eq!(extract_compensation("€50k - €70k or $60-80k"), "€50k - €70k / $60-80k");
    }

    #[test]
    fn test_extract_compensation_bare_numbers() {
        assert_eq!(extract_compensation("Base pay 50000 - 70000 annually"), "50000 - 70000");
        assert_eq!(extract_compensation("Paying 90-120k depending on level"), "90-120k");
    }

    #[test]
    fn test_determine_currency() {
        assert_eq!(determine_currency("$80,000/year", ""), Currency::Usd);
        assert_eq!(determine_currency("", ""), Currency::Unknown);
        assert_eq!(determine_currency("€50k", ""), Currency::Eur);
        assert_eq!(determine_currency("N/A", "Paid in £ sterling"), Currency::Gbp);
        assert_eq!(determine_currency("90,000 - 110,000", "CAD per year"), Currency::Cad);
        assert_eq!(determine_currency("N/A", "cadence of releases"), Currency::Unknown);
        assert_eq!(Currency::Unknown.to_string(), "N/A");
    }
}
