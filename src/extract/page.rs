//! Product page extraction
//!
//! A product page carries its part number in an article table row of the form
//! `<td>Part-no.</td><td>ABC-123</td>` and its compatibility data in a table
//! whose rows pair a vehicle/machine (column 1) with an original part number
//! (column 2).

use crate::config::ExtractorConfig;
use crate::extract::{compile_selector, ExtractError, Extractor};
use crate::storage::ExtractedPage;
use scraper::{ElementRef, Html, Selector};

/// Extracts an [`ExtractedPage`] from product page HTML
pub struct PageExtractor {
    article_rows: Selector,
    compatibility_rows: Selector,
    part_no_label: String,
}

impl PageExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            article_rows: compile_selector(&config.article_row_selector)?,
            compatibility_rows: compile_selector(&config.compatibility_row_selector)?,
            part_no_label: config.part_no_label.trim().to_string(),
        })
    }

    /// Text of the cell following the first cell labelled with the part-number label
    fn part_no(&self, document: &Html) -> String {
        document
            .select(&self.article_rows)
            .find_map(|row| {
                let cells = cells(row);
                let label = cells
                    .iter()
                    .position(|cell| cell_text(cell) == self.part_no_label)?;
                cells.get(label + 1).map(cell_text)
            })
            .unwrap_or_default()
    }

    /// Parallel column-1 / column-2 lists of the compatibility table
    fn compatibility(&self, document: &Html) -> (Vec<String>, Vec<String>) {
        document
            .select(&self.compatibility_rows)
            .map(|row| {
                let cells = cells(row);
                let first = cells.first().map(cell_text).unwrap_or_default();
                let second = cells.get(1).map(cell_text).unwrap_or_default();
                (first, second)
            })
            .unzip()
    }
}

impl Extractor for PageExtractor {
    type Output = ExtractedPage;

    fn extract(&self, content: &str) -> Result<ExtractedPage, ExtractError> {
        let document = Html::parse_document(content);

        let part_no = self.part_no(&document);
        let (adaptable_for, orig_part_no) = self.compatibility(&document);

        Ok(ExtractedPage {
            part_no,
            adaptable_for: strip_trailing_commas(&adaptable_for.join(", ")).to_string(),
            orig_part_no: strip_trailing_commas(&orig_part_no.join(", ")).to_string(),
        })
    }
}

/// Direct `<td>` children of a table row
fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() == "td")
        .collect()
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Removes trailing commas left behind by empty cells at the end of a joined list
///
/// While the trimmed string ends with a comma, the string is trimmed and
/// commas are stripped from both of its ends, so `"X, Y, , "` becomes `"X, Y"`.
/// Trailing whitespace is dropped last, so a list of empty cells ends up empty.
pub fn strip_trailing_commas(input: &str) -> &str {
    let mut current = input;
    while current.trim().ends_with(',') {
        current = current.trim().trim_matches(',');
    }
    current.trim_end()
}
