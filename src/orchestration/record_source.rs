//! Record sources - where package records come from
//!
//! Sources are pulled one record at a time. Nothing is read ahead, so a slow
//! publish naturally holds back the producer.

use crate::core::error::MigrateError;
use crate::core::traits::{PackageRecord, RecordSource};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;

/// Newline-delimited JSON: one `PackageRecord` object per line
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    line_number: usize,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> RecordSource for JsonLinesSource<R> {
    async fn next_record(&mut self) -> Result<Option<PackageRecord>, MigrateError> {
        loop {
            self.line_number += 1;
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| MigrateError::MalformedRecord {
                    line: self.line_number,
                    message: e.to_string(),
                })?;

            let Some(line) = line else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }

            return serde_json::from_str(&line)
                .map(Some)
                .map_err(|e| MigrateError::MalformedRecord {
                    line: self.line_number,
                    message: e.to_string(),
                });
        }
    }
}

#[async_trait]
impl RecordSource for mpsc::Receiver<PackageRecord> {
    async fn next_record(&mut self) -> Result<Option<PackageRecord>, MigrateError> {
        Ok(self.recv().await)
    }
}

#[async_trait]
impl RecordSource for std::vec::IntoIter<PackageRecord> {
    async fn next_record(&mut self) -> Result<Option<PackageRecord>, MigrateError> {
        Ok(self.next())
    }
}
