//! CSV export of the record store

use crate::storage::PageRecord;
use crate::HarvestError;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs::File;
use std::path::Path;

/// Column header written as the first line of every export
pub const CSV_HEADER: [&str; 4] = ["url", "part_no", "adaptable_for", "orig_part_no"];

/// Writes `records` to `destination` as comma-separated text
///
/// Any existing file is truncated. Fields containing the delimiter, quotes or
/// line breaks are quoted. Returns the number of data rows written.
pub fn write_csv(records: &[PageRecord], destination: &Path) -> Result<usize, HarvestError> {
    let file = File::create(destination)?;
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(file);

    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.write_record([
            record.url.as_str(),
            record.part_no.as_str(),
            record.adaptable_for.as_str(),
            record.orig_part_no.as_str(),
        ])?;
    }
    writer.flush()?;

    tracing::debug!(
        "Wrote {} records to {}",
        records.len(),
        destination.display()
    );
    Ok(records.len())
}
