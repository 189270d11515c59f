//! Spreadsheet flattening: every sheet becomes a `Sheet: {name}` header
//! followed by its rows as pipe-delimited lines, and the concatenation is
//! handed to the model as plain-text context.

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use super::ExtractionError;

/// Parse an xls/xlsx workbook from raw bytes and flatten all sheets.
pub fn flatten_workbook(bytes: &[u8]) -> Result<String, ExtractionError> {
    let cursor = std::io::Cursor::new(bytes);
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| ExtractionError::Spreadsheet(e.to_string()))?;

    let mut sheets: Vec<(String, Vec<Vec<String>>)> = Vec::new();
    for (name, range) in workbook.worksheets() {
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        sheets.push((name, rows));
    }

    Ok(flatten_sheets(&sheets))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Flatten pre-extracted sheets into the delimited text representation.
/// Cells are joined with " | "; missing cells are blank, not dropped, so
/// column positions stay aligned across rows.
pub fn flatten_sheets(sheets: &[(String, Vec<Vec<String>>)]) -> String {
    let mut text = String::new();
    for (name, rows) in sheets {
        text.push('\n');
        text.push_str("Sheet: ");
        text.push_str(name);
        text.push('\n');

        let lines: Vec<String> = rows.iter().map(|row| row.join(" | ")).collect();
        text.push_str(&lines.join("\n"));
    }
    text
}
