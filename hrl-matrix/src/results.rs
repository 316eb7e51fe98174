use crate::design::split_fields;
use crate::row::{validate_headers, Row};
use hrl_core::{HrlError, HrlResult};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Append-only writer for a result matrix.
///
/// Opening an existing file resumes it: the header is checked instead of
/// rewritten and the rows already present become the resume offset.
#[derive(Debug)]
pub struct ResultWriter {
    path: PathBuf,
    headers: Vec<String>,
    out: Option<BufWriter<File>>,
    existing_rows: usize,
    written: usize,
}

impl ResultWriter {
    pub fn open(path: impl AsRef<Path>, headers: Vec<String>) -> HrlResult<Self> {
        let path = path.as_ref().to_path_buf();
        validate_headers(&headers)?;

        let resumable = fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);
        let (out, existing_rows) = if resumable {
            let (found, rows) = scan(&path)?;
            if found != headers {
                return Err(HrlError::HeaderMismatch {
                    path,
                    expected: headers,
                    found,
                });
            }
            let mut file = OpenOptions::new().read(true).append(true).open(&path)?;
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            let mut out = BufWriter::new(file);
            if last[0] != b'\n' {
                // an interrupted run can leave the last row unterminated
                writeln!(out)?;
                out.flush()?;
            }
            (out, rows)
        } else {
            let mut out = BufWriter::new(File::create(&path)?);
            writeln!(out, "{}", headers.join(" "))?;
            out.flush()?;
            (out, 0)
        };

        tracing::info!(
            path = %path.display(),
            existing_rows,
            resumed = resumable,
            "opened result matrix"
        );
        Ok(Self {
            path,
            headers,
            out: Some(out),
            existing_rows,
            written: 0,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows that were already in the file when it was opened.
    pub fn existing_rows(&self) -> usize {
        self.existing_rows
    }

    /// Total data rows in the file, including those written by this writer.
    pub fn row_count(&self) -> usize {
        self.existing_rows + self.written
    }

    /// Appends one row and flushes it to disk.
    pub fn write_row(&mut self, row: &Row) -> HrlResult<()> {
        let line = row.to_line(&self.headers)?;
        let out = self.out.as_mut().ok_or(HrlError::Closed)?;
        writeln!(out, "{line}")?;
        out.flush()?;
        self.written += 1;
        tracing::debug!(row = self.row_count(), %line, "wrote result row");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.out.is_none()
    }

    /// Flushes and releases the file. Closing twice is a no-op.
    pub fn close(&mut self) -> HrlResult<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(())
    }

    /// Number of data rows in an existing result file, zero if there is none.
    pub fn count_rows(path: impl AsRef<Path>) -> HrlResult<usize> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(0);
        }
        Ok(scan(path)?.1)
    }
}

impl Drop for ResultWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to flush result matrix");
        }
    }
}

/// Reads the header and counts the non-blank data rows of a matrix file.
fn scan(path: &Path) -> HrlResult<(Vec<String>, usize)> {
    let mut header = None;
    let mut rows = 0;
    for line in BufReader::new(File::open(path)?).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if header.is_none() {
            header = Some(split_fields(&line));
        } else {
            rows += 1;
        }
    }
    Ok((header.unwrap_or_default(), rows))
}
