// DataFusion ResultConverter
//
// Renders RecordBatch results as the string rows returned by statement
// execution: one string per row, columns separated by tabs.

use anyhow::{Context, Result};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::display::{ArrayFormatter, FormatOptions};

use crate::models::NULL_TEXT;

pub struct DataFusionResultConverter;

impl DataFusionResultConverter {
    /// Convert all batches into string rows, preserving row order
    pub fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<String>> {
        let options = FormatOptions::default().with_null(NULL_TEXT);
        let mut rows = Vec::with_capacity(batches.iter().map(|b| b.num_rows()).sum());

        for batch in batches {
            let formatters = batch
                .columns()
                .iter()
                .map(|column| ArrayFormatter::try_new(column.as_ref(), &options))
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to build column formatters")?;

            for row_idx in 0..batch.num_rows() {
                let cells: Vec<String> = formatters
                    .iter()
                    .map(|formatter| formatter.value(row_idx).to_string())
                    .collect();
                rows.push(cells.join("\t"));
            }
        }

        Ok(rows)
    }
}
