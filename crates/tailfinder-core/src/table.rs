use crate::{Result, TailFinderError};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A header plus data rows, every row exactly as wide as the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Borrowed view of one data row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a ResultsTable,
    cells: &'a [String],
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.table.column_index(column)?;
        self.cells.get(idx).map(|s| s.as_str())
    }
}

impl ResultsTable {
    /// Builds a table, rejecting blank column names and any row whose width
    /// differs from the header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some(i) = headers.iter().position(|h| h.trim().is_empty()) {
            return Err(TailFinderError::MalformedInput(format!(
                "column {} has no name",
                i + 1
            )));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(TailFinderError::MalformedInput(format!(
                    "row {} has {} fields, header has {}",
                    i + 1,
                    row.len(),
                    headers.len()
                )));
            }
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(move |cells| Row { table: self, cells })
    }

    /// Parses comma-delimited text whose first record is the header.
    ///
    /// The portal's export ends every line with a delimiter (`a,b,\n`); an
    /// empty trailing column is dropped from the header and from every row.
    pub fn from_delimited(text: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut records = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| {
                TailFinderError::MalformedInput(format!("unreadable delimited data: {}", e))
            })?;
            records.push(record.iter().map(|f| f.to_string()).collect::<Vec<_>>());
        }

        let mut records = records.into_iter();
        let Some(mut headers) = records.next() else {
            return Ok(Self::default());
        };

        let trailing_delimiter = headers.len() > 1 && headers.last().is_some_and(|h| h.is_empty());
        if trailing_delimiter {
            headers.pop();
        }

        let rows = records
            .map(|mut row| {
                if trailing_delimiter
                    && row.len() == headers.len() + 1
                    && row.last().is_some_and(|f| f.is_empty())
                {
                    row.pop();
                }
                row
            })
            .collect();

        Self::new(headers, rows)
    }

    /// Serializes back to comma-delimited text with a header line.
    pub fn to_delimited(&self) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        let write_err =
            |e: csv::Error| TailFinderError::MalformedInput(format!("cannot write table: {}", e));

        if !self.headers.is_empty() {
            wtr.write_record(&self.headers).map_err(write_err)?;
        }
        for row in &self.rows {
            wtr.write_record(row).map_err(write_err)?;
        }

        let bytes = wtr
            .into_inner()
            .map_err(|e| TailFinderError::MalformedInput(format!("cannot write table: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| TailFinderError::MalformedInput(format!("table is not UTF-8: {}", e)))
    }

    /// Finds `table#<table_id>` in an HTML document and reads it, first row
    /// as header. Returns `Ok(None)` when the document has no such table.
    pub fn from_html(document: &str, table_id: &str) -> Result<Option<Self>> {
        let selector = Selector::parse(&format!("table#{}", table_id)).map_err(|e| {
            TailFinderError::Config(format!("invalid table id '{}': {:?}", table_id, e))
        })?;

        let html = Html::parse_document(document);
        match html.select(&selector).next() {
            Some(table) => Self::from_html_table(table).map(Some),
            None => Ok(None),
        }
    }

    fn from_html_table(table: ElementRef<'_>) -> Result<Self> {
        static ROW_SEL: OnceLock<Selector> = OnceLock::new();
        static CELL_SEL: OnceLock<Selector> = OnceLock::new();
        let row_sel = ROW_SEL.get_or_init(|| Selector::parse("tr").unwrap());
        let cell_sel = CELL_SEL.get_or_init(|| Selector::parse("th, td").unwrap());

        let mut rows = table
            .select(row_sel)
            .map(|tr| tr.select(cell_sel).map(cell_text).collect::<Vec<_>>());

        let Some(headers) = rows.next() else {
            return Ok(Self::default());
        };
        Self::new(headers, rows.collect())
    }
}

pub(crate) fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimited_with_trailing_delimiters() {
        let text = "Carrier Code,Flight Number,Tail Number,\nAA,0100,N3BDAA,\nAA,0200,N123AA,\n";
        let table = ResultsTable::from_delimited(text).unwrap();

        assert_eq!(table.headers(), ["Carrier Code", "Flight Number", "Tail Number"]);
        assert_eq!(table.len(), 2);
        let first = table.rows().next().unwrap();
        assert_eq!(first.get("Flight Number"), Some("0100"));
        assert_eq!(first.get("Tail Number"), Some("N3BDAA"));
        assert_eq!(first.get("Gate"), None);
    }

    #[test]
    fn test_delimited_ragged_row_rejected() {
        let text = "Flight Number,Tail Number\n1234,N987UA\n5678\n";
        let err = ResultsTable::from_delimited(text).unwrap_err();
        assert!(matches!(err, TailFinderError::MalformedInput(_)));
    }

    #[test]
    fn test_delimited_empty_input() {
        let table = ResultsTable::from_delimited("").unwrap();
        assert!(table.is_empty());
        assert!(table.headers().is_empty());
    }

    #[test]
    fn test_delimited_roundtrip_with_quoting() {
        let table = ResultsTable::new(
            vec!["Flight Number".into(), "Tail Number".into(), "Note".into()],
            vec![
                vec!["1234".into(), "N987UA".into(), "diverted, returned".into()],
                vec!["0042".into(), "".into(), "said \"cancelled\"".into()],
            ],
        )
        .unwrap();

        let text = table.to_delimited().unwrap();
        let reparsed = ResultsTable::from_delimited(&text).unwrap();
        assert_eq!(reparsed, table);
    }

    #[test]
    fn test_blank_column_names_rejected() {
        let err = ResultsTable::new(
            vec!["Flight Number".into(), "Tail Number".into(), "".into()],
            vec![vec!["1234".into(), "N987UA".into(), "".into()]],
        )
        .unwrap_err();
        assert!(matches!(err, TailFinderError::MalformedInput(_)));

        let text = "Flight Number,,Tail Number\n1234,x,N987UA\n";
        assert!(ResultsTable::from_delimited(text).is_err());
    }

    #[test]
    fn test_roundtrip_of_exported_text() {
        let text = "Flight Number,Tail Number,\n1234,N987UA,\n";
        let table = ResultsTable::from_delimited(text).unwrap();
        assert_eq!(table.headers(), ["Flight Number", "Tail Number"]);
        let reparsed = ResultsTable::from_delimited(&table.to_delimited().unwrap()).unwrap();
        assert_eq!(reparsed, table);
    }

    #[test]
    fn test_html_table() {
        let html = r#"
            <html><body>
            <table id="other"><tr><td>ignore</td></tr></table>
            <table id="GridView1">
              <tr><th>Carrier Code</th><th>Flight Number</th><th>Tail Number</th></tr>
              <tr><td>AA</td><td>0100</td><td> N3BDAA&nbsp;</td></tr>
              <tr><td>AA</td><td>0200</td><td><span>N123AA</span></td></tr>
            </table>
            </body></html>"#;

        let table = ResultsTable::from_html(html, "GridView1").unwrap().unwrap();
        assert_eq!(table.headers(), ["Carrier Code", "Flight Number", "Tail Number"]);
        let tails: Vec<_> = table.rows().map(|r| r.get("Tail Number").unwrap()).collect();
        assert_eq!(tails, ["N3BDAA", "N123AA"]);
    }

    #[test]
    fn test_html_table_missing() {
        let html = "<html><body><p>No data found</p></body></html>";
        assert!(ResultsTable::from_html(html, "GridView1").unwrap().is_none());
    }

    #[test]
    fn test_html_ragged_row_rejected() {
        let html = r#"<table id="GridView1">
            <tr><th>Flight Number</th><th>Tail Number</th></tr>
            <tr><td>1234</td></tr></table>"#;
        assert!(ResultsTable::from_html(html, "GridView1").is_err());
    }
}
