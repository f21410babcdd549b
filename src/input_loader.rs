use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use log::{info, error, warn};
use calamine::{Reader, Xlsx, open_workbook};

use crate::search_engine::JobRecord;

/// Header names accepted for the link column, compared case-insensitively.
const LINK_HEADERS: &[&str] = &["link", "url", "job link"];

fn is_link_header(header: &str) -> bool {
    let header = header.trim().to_lowercase();
    LINK_HEADERS.contains(&header.as_str())
}

/// Reads every non-empty link from a CSV or XLSX export of the sink.
///
/// Best-effort: unreadable files are logged and yield an empty set.
pub fn load_links<P: AsRef<Path>>(filename: P) -> HashSet<String> {
    let path_ref = filename.as_ref();

    if !path_ref.exists() {
         warn!("Link file {:?} does not exist.", path_ref);
         return HashSet::new();
    }

    let is_excel = path_ref.extension().map_or(false, |ext| ext == "xlsx" || ext == "xls");

    if is_excel {
        return load_excel_links(path_ref);
    }

    load_csv_links(path_ref)
}

fn load_csv_links(path: &Path) -> HashSet<String> {
    let mut links = HashSet::new();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            error!("Could not open CSV file: {}", e);
            return links;
        }
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let link_idx = match rdr.headers() {
        Ok(headers) => headers.iter().position(is_link_header),
        Err(e) => {
            error!("Could not read CSV headers: {}", e);
            return links;
        }
    };
    let Some(link_idx) = link_idx else {
        error!("CSV {:?} has no 'Link' column", path);
        return links;
    };

    for result in rdr.records() {
        match result {
            Ok(record) => {
                if let Some(link) = record.get(link_idx).filter(|l| !l.is_empty()) {
                    links.insert(link.to_string());
                }
            }
            Err(e) => {
                error!("Error parsing CSV record: {}", e);
            }
        }
    }
    info!("Loaded {} links from CSV {:?}", links.len(), path);
    links
}

fn load_excel_links(path: &Path) -> HashSet<String> {
    let mut links = HashSet::new();
    let mut excel: Xlsx<_> = match open_workbook(path) {
        Ok(wb) => wb,
        Err(e) => {
            error!("Could not open Excel file: {}", e);
            return links;
        }
    };

    let worksheets = excel.worksheets();
    if let Some((_name, range)) = worksheets.first() {
        let mut link_idx = None;

        for (row_idx, row) in range.rows().enumerate() {
            if row_idx == 0 {
                link_idx = row.iter().position(|cell| is_link_header(&cell.to_string()));
                if link_idx.is_none() {
                    error!("Excel header missing 'Link' column");
                    return links;
                }
                continue;
            }

            let link = link_idx
                .and_then(|i| row.get(i))
                .map(|c| c.to_string().trim().to_string())
                .unwrap_or_default();
            if !link.is_empty() {
                links.insert(link);
            }
        }
    }

    info!("Loaded {} links from Excel {:?}", links.len(), path);
    links
}

/// Reads job records back from a CSV sink file.
pub fn load_records<P: AsRef<Path>>(filename: P) -> Vec<JobRecord> {
    let mut records = Vec::new();
    let path = filename.as_ref();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            error!("Could not open CSV file {:?}: {}", path, e);
            return records;
        }
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    for result in rdr.deserialize() {
        match result {
            Ok(record) => {
                records.push(record);
            }
            Err(e) => {
                error!("Error parsing CSV record: {}", e);
            }
        }
    }
    info!("Loaded {} records from CSV {:?}", records.len(), path);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Currency;
    use std::io::Write;

    #[test]
    fn test_load_links_from_csv_any_header_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "Title,LINK,Company").unwrap();
        writeln!(f, "A, https://jobs.lever.co/a/1 ,Acme").unwrap();
        writeln!(f, "B,,Acme").unwrap();
        writeln!(f, "C,https://jobs.lever.co/a/2,Acme").unwrap();
        drop(f);

        let links = load_links(&path);

        assert_eq!(links.len(), 2);
        assert!(links.contains("https://jobs.lever.co/a/1"));
    }

    #[test]
    fn test_missing_file_or_column_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_links(dir.path().join("nope.csv")).is_empty());

        let path = dir.path().join("no_link.csv");
        std::fs::write(&path, "Title,Company\nA,Acme\n").unwrap();
        assert!(load_links(&path).is_empty());
    }

    #[test]
    fn test_load_records_reads_sink_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.csv");
        std::fs::write(
            &path,
            "Title,Link,Snippet,Company,Location,Description,Compensation,Compensation Currency\n\
             Engineer,https://x.io/1,snip,Acme,Remote,,$90k - $120k,USD\n\
             Analyst,https://x.io/2,snip,N/A,N/A,Full text,N/A,N/A\n",
        )
        .unwrap();

        let records = load_records(&path);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].description, None);
        assert_eq!(records[0].compensation_currency, Currency::Usd);
        assert_eq!(records[1].description.as_deref(), Some("Full text"));
        assert_eq!(records[1].compensation_currency, Currency::Unknown);
    }
}
