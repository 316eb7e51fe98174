use crate::row::Row;
use hrl_core::{HrlError, HrlResult};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// Lazy, sequential reader over the rows of a design matrix.
///
/// Fields are separated by any run of whitespace. Blank lines are skipped.
#[derive(Debug)]
pub struct DesignReader {
    path: PathBuf,
    headers: Vec<String>,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    rows_read: usize,
}

impl DesignReader {
    pub fn open(path: impl AsRef<Path>) -> HrlResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut lines = BufReader::new(File::open(&path)?).lines();
        let mut line_no = 0;
        let headers = loop {
            let Some(line) = lines.next() else {
                return Err(HrlError::EmptyMatrix(path));
            };
            line_no += 1;
            let fields = split_fields(&line?);
            if !fields.is_empty() {
                break fields;
            }
        };
        tracing::debug!(path = %path.display(), columns = ?headers, "opened design matrix");
        Ok(Self {
            path,
            headers,
            lines,
            line_no,
            rows_read: 0,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Line number of the last line read, counting from 1.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Consumes `count` rows, failing if the design runs out first.
    pub fn skip_rows(&mut self, count: usize) -> HrlResult<()> {
        for done in 0..count {
            match self.next_row()? {
                Some(_) => {}
                None => {
                    return Err(HrlError::ResumeBeyondDesign {
                        completed: count,
                        available: done,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn next_row(&mut self) -> HrlResult<Option<Row>> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let fields = split_fields(&line?);
            if fields.is_empty() {
                continue;
            }
            if fields.len() != self.headers.len() {
                return Err(HrlError::RowWidth {
                    path: self.path.clone(),
                    line: self.line_no,
                    expected: self.headers.len(),
                    found: fields.len(),
                });
            }
            self.rows_read += 1;
            return Ok(Some(self.headers.iter().cloned().zip(fields).collect()));
        }
        Ok(None)
    }

    /// Number of data rows in a design file.
    pub fn count_rows(path: impl AsRef<Path>) -> HrlResult<usize> {
        let mut reader = Self::open(path)?;
        while reader.next_row()?.is_some() {}
        Ok(reader.rows_read)
    }
}

impl Iterator for DesignReader {
    type Item = HrlResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

pub(crate) fn split_fields(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn design(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn reads_rows_with_mixed_whitespace() {
        let file = design("Trial  Luminance\n1 0.2\r\n\n2\t0.4\n");
        let rows: Vec<Row> = DesignReader::open(file.path())
            .unwrap()
            .collect::<HrlResult<_>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Trial"), Some("1"));
        assert_eq!(rows[1].get("Luminance"), Some("0.4"));
        assert_eq!(rows[1].columns().collect::<Vec<_>>(), ["Trial", "Luminance"]);
    }

    #[test]
    fn skip_rows_resumes_mid_design() {
        let file = design("Trial\n1\n2\n3\n");
        let mut reader = DesignReader::open(file.path()).unwrap();
        reader.skip_rows(2).unwrap();
        let next = reader.next().unwrap().unwrap();
        assert_eq!(next.get("Trial"), Some("3"));
        assert!(reader.next().is_none());
        assert_eq!(reader.line_no(), 4);
    }

    #[test]
    fn skipping_past_the_end_fails() {
        let file = design("Trial\n1\n");
        let mut reader = DesignReader::open(file.path()).unwrap();
        assert!(matches!(
            reader.skip_rows(3),
            Err(HrlError::ResumeBeyondDesign {
                completed: 3,
                available: 1
            })
        ));
    }

    #[test]
    fn ragged_rows_report_their_line() {
        let file = design("A B\n1 2\n3\n");
        let mut reader = DesignReader::open(file.path()).unwrap();
        assert!(reader.next().unwrap().is_ok());
        match reader.next() {
            Some(Err(HrlError::RowWidth { line, found, .. })) => {
                assert_eq!(line, 3);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_file_has_no_header() {
        let file = design("\n\n");
        assert!(matches!(
            DesignReader::open(file.path()),
            Err(HrlError::EmptyMatrix(_))
        ));
    }

    #[test]
    fn counts_rows() {
        let file = design("A\n1\n2\n\n3\n");
        assert_eq!(DesignReader::count_rows(file.path()).unwrap(), 3);
    }
}
