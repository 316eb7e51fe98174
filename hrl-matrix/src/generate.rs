use crate::row::{is_token, validate_headers, Row};
use hrl_core::{HrlError, HrlResult};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A named experimental factor and the levels it takes.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub name: String,
    pub levels: Vec<String>,
}

impl Factor {
    pub fn new(name: impl Into<String>, levels: impl IntoIterator<Item = impl ToString>) -> Self {
        Self {
            name: name.into(),
            levels: levels.into_iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// Every combination of factor levels, `repeats` times over, in random order.
pub fn full_factorial<R: Rng + ?Sized>(
    factors: &[Factor],
    repeats: usize,
    rng: &mut R,
) -> HrlResult<Vec<Row>> {
    let names: Vec<String> = factors.iter().map(|f| f.name.clone()).collect();
    validate_headers(&names)?;
    for factor in factors {
        if factor.levels.is_empty() {
            return Err(HrlError::Config(format!("factor '{}' has no levels", factor.name)));
        }
        if let Some(bad) = factor.levels.iter().find(|l| !is_token(l)) {
            return Err(HrlError::InvalidValue {
                column: factor.name.clone(),
                value: bad.clone(),
            });
        }
    }

    let mut cells = vec![Row::new()];
    for factor in factors {
        cells = cells
            .into_iter()
            .flat_map(|row| {
                factor
                    .levels
                    .iter()
                    .map(move |level| row.clone().with(factor.name.clone(), level))
            })
            .collect();
    }
    if factors.is_empty() {
        cells.clear();
    }

    let mut rows: Vec<Row> = (0..repeats).flat_map(|_| cells.iter().cloned()).collect();
    rows.shuffle(rng);
    Ok(rows)
}

/// Writes a design matrix: header line, then one line per row.
pub fn write_design(path: &Path, headers: &[String], rows: &[Row]) -> HrlResult<()> {
    validate_headers(headers)?;
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", headers.join(" "))?;
    for row in rows {
        writeln!(out, "{}", row.to_line(headers)?)?;
    }
    out.flush()?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote design matrix");
    Ok(())
}
