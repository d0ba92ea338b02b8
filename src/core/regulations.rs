use crate::adapters::http::{HttpFetcher, BROWSER_USER_AGENT};
use crate::core::{Job, JobReport};
use crate::utils::error::{EtlError, Result};
use crate::utils::output::write_json;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Header and body cells of one HTML table, as trimmed text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl HtmlTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| EtlError::ProcessingError {
        message: format!("Invalid selector '{}': {:?}", css, e),
    })
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn row_cells(row: ElementRef<'_>, cells: &Selector) -> Vec<String> {
    row.select(cells).map(cell_text).collect()
}

fn in_thead(row: &ElementRef<'_>) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|e| e.value().name() != "table")
        .any(|e| e.value().name() == "thead")
}

/// Parses the first `<table>` in `html`. Headers come from `<thead>` when
/// present, otherwise from the first row.
pub fn parse_first_table(html: &str) -> Result<HtmlTable> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    let table = document.select(&table_sel).next().ok_or_else(|| EtlError::ProcessingError {
        message: "No <table> found in page".to_string(),
    })?;

    let (head, body): (Vec<_>, Vec<_>) = table.select(&row_sel).partition(in_thead);

    let mut body = body.into_iter().map(|r| row_cells(r, &cell_sel));
    let headers = match head.first() {
        Some(row) => row_cells(*row, &cell_sel),
        None => body.next().unwrap_or_default(),
    };
    let rows = body.filter(|r| !r.is_empty()).collect();

    Ok(HtmlTable { headers, rows })
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Integer,
    Float,
    Text,
}

/// Kind of one column over every body row. A column of whole numbers with
/// a gap is read as floats.
fn column_kind(table: &HtmlTable, index: usize) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    let mut seen = false;
    for cell in table.rows.iter().map(|r| r.get(index).map_or("", String::as_str)) {
        if cell.is_empty() {
            if kind == ColumnKind::Integer {
                kind = ColumnKind::Float;
            }
            continue;
        }
        seen = true;
        if kind == ColumnKind::Integer && cell.parse::<i64>().is_ok() {
            continue;
        }
        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() => kind = ColumnKind::Float,
            _ => return ColumnKind::Text,
        }
    }
    if seen { kind } else { ColumnKind::Text }
}

fn cell_value(cell: Option<&String>, kind: ColumnKind) -> Value {
    let Some(cell) = cell.filter(|c| !c.is_empty()) else {
        return Value::Null;
    };
    let number = match kind {
        ColumnKind::Integer => cell.parse::<i64>().ok().map(Value::from),
        ColumnKind::Float => cell.parse::<f64>().ok().and_then(serde_json::Number::from_f64).map(Value::Number),
        ColumnKind::Text => None,
    };
    number.unwrap_or_else(|| Value::String(cell.clone()))
}

/// `{ <key cell>: { <other header>: <cell or null> } }` for every row whose
/// `key_column` contains `needle`. Later rows with the same key replace
/// earlier ones. Numeric columns come out as JSON numbers.
pub fn summarize(table: &HtmlTable, key_column: &str, needle: &str) -> Result<Map<String, Value>> {
    let key_index = table.column(key_column).ok_or_else(|| EtlError::ProcessingError {
        message: format!("Table has no '{}' column (found {:?})", key_column, table.headers),
    })?;

    let kinds: Vec<ColumnKind> = (0..table.headers.len()).map(|i| column_kind(table, i)).collect();

    let mut summary = Map::new();
    for row in &table.rows {
        let Some(key) = row.get(key_index) else { continue };
        if !key.contains(needle) {
            continue;
        }

        let entry: Map<String, Value> = table
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != key_index)
            .map(|(i, header)| (header.clone(), cell_value(row.get(i), kinds[i])))
            .collect();
        summary.insert(key.clone(), Value::Object(entry));
    }
    Ok(summary)
}

#[derive(Debug, Clone)]
pub struct RegulationsSettings {
    pub url: String,
    pub output: PathBuf,
    pub species: String,
    pub key_column: String,
}

pub struct RegulationsJob {
    http: HttpFetcher,
    settings: RegulationsSettings,
}

impl RegulationsJob {
    pub fn new(http: HttpFetcher, settings: RegulationsSettings) -> Self {
        Self { http, settings }
    }
}

#[async_trait::async_trait]
impl Job for RegulationsJob {
    fn name(&self) -> &'static str {
        "scrape-regulations"
    }

    async fn run(&self) -> Result<JobReport> {
        let s = &self.settings;

        let html = self
            .http
            .get_text(&s.url, Some(BROWSER_USER_AGENT))
            .await
            .inspect_err(|e| tracing::error!("Error fetching the URL: {}", e))?;

        let table = parse_first_table(&html)?;
        tracing::debug!("Parsed table with {} columns and {} rows", table.headers.len(), table.rows.len());

        let summary = summarize(&table, &s.key_column, &s.species)?;
        tracing::info!("{} rows match '{}'", summary.len(), s.species);

        write_json(&s.output, &summary).await?;
        tracing::info!("Wrote {}", s.output.display());

        let mut report = JobReport::new(self.name()).with_output(s.output.display().to_string());
        report.items_processed = summary.len();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SEASONS: &str = r#"
        <html><body>
        <p>Seasons</p>
        <table>
          <thead><tr><th>Species</th><th>Season Dates</th><th>Daily Bag</th></tr></thead>
          <tbody>
            <tr><td>Ruffed Grouse</td><td>Oct. 12 -
                Feb. 28</td><td>4</td></tr>
            <tr><td>Bobwhite Quail</td><td>Nov. 2 - Nov. 30</td><td>6</td></tr>
            <tr><td>Ruffed Grouse (youth)</td><td>Oct. 5 - Oct. 6</td><td></td></tr>
          </tbody>
        </table>
        <table><tr><th>Other</th></tr></table>
        </body></html>"#;

    #[test]
    fn test_parse_first_table_with_thead() {
        let table = parse_first_table(SEASONS).unwrap();
        assert_eq!(table.headers, vec!["Species", "Season Dates", "Daily Bag"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0][1], "Oct. 12 - Feb. 28");
    }

    #[test]
    fn test_parse_first_table_header_from_first_row() {
        let html = "<table><tr><th>Species</th><th>Bag</th></tr><tr><td>Turkey</td><td>1</td></tr></table>";
        let table = parse_first_table(html).unwrap();
        assert_eq!(table.headers, vec!["Species", "Bag"]);
        assert_eq!(table.rows, vec![vec!["Turkey".to_string(), "1".to_string()]]);
    }

    #[test]
    fn test_missing_table_is_an_error() {
        assert!(matches!(
            parse_first_table("<html><body><p>closed</p></body></html>"),
            Err(EtlError::ProcessingError { .. })
        ));
    }

    #[test]
    fn test_summarize_matches_substring() {
        let table = parse_first_table(SEASONS).unwrap();
        let summary = summarize(&table, "Species", "Ruffed Grouse").unwrap();

        assert_eq!(
            Value::Object(summary),
            json!({
                "Ruffed Grouse": {"Season Dates": "Oct. 12 - Feb. 28", "Daily Bag": 4.0},
                "Ruffed Grouse (youth)": {"Season Dates": "Oct. 5 - Oct. 6", "Daily Bag": null}
            })
        );
    }

    #[test]
    fn test_summarize_last_duplicate_wins() {
        let table = HtmlTable {
            headers: vec!["Species".to_string(), "Bag".to_string()],
            rows: vec![
                vec!["Ruffed Grouse".to_string(), "3".to_string()],
                vec!["Ruffed Grouse".to_string(), "4".to_string()],
            ],
        };
        let summary = summarize(&table, "Species", "Grouse").unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary["Ruffed Grouse"], json!({"Bag": 4}));
    }

    #[test]
    fn test_summarize_infers_column_types() {
        let table = HtmlTable {
            headers: vec!["Species".to_string(), "Bag".to_string(), "Weight".to_string(), "Zone".to_string()],
            rows: vec![
                vec!["Ruffed Grouse".to_string(), "4".to_string(), "0.5".to_string(), "1".to_string()],
                vec!["Turkey".to_string(), "1".to_string(), "7".to_string(), "A".to_string()],
            ],
        };
        let summary = summarize(&table, "Species", "Grouse").unwrap();
        assert_eq!(summary["Ruffed Grouse"], json!({"Bag": 4, "Weight": 0.5, "Zone": "1"}));
    }

    #[test]
    fn test_non_finite_cells_stay_text() {
        let table = HtmlTable {
            headers: vec!["Species".to_string(), "Limit".to_string()],
            rows: vec![vec!["Ruffed Grouse".to_string(), "inf".to_string()]],
        };
        let summary = summarize(&table, "Species", "Grouse").unwrap();
        assert_eq!(summary["Ruffed Grouse"], json!({"Limit": "inf"}));
    }

    #[test]
    fn test_summarize_requires_key_column() {
        let table = HtmlTable {
            headers: vec!["Animal".to_string()],
            rows: vec![],
        };
        assert!(summarize(&table, "Species", "Grouse").is_err());
    }
}
