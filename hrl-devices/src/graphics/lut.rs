use hrl_core::{HrlError, HrlResult};
use hrl_matrix::DesignReader;
use std::cmp::Ordering;
use std::path::Path;

pub const INPUT_COLUMN: &str = "IntensityIn";
pub const OUTPUT_COLUMN: &str = "IntensityOut";

/// Piecewise-linear intensity correction, usually measured with a
/// photometer so that requested luminances come out linear on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut {
    points: Vec<(f32, f32)>,
}

impl Lut {
    pub fn from_points(points: Vec<(f32, f32)>) -> HrlResult<Self> {
        if points.len() < 2 {
            return Err(HrlError::InvalidLut("needs at least two points".into()));
        }
        if points
            .windows(2)
            .any(|w| w[1].0.partial_cmp(&w[0].0) != Some(Ordering::Greater))
        {
            return Err(HrlError::InvalidLut(
                "input intensities must be strictly increasing".into(),
            ));
        }
        if let Some(&(_, out)) = points.iter().find(|(_, out)| !(0.0..=1.0).contains(out)) {
            return Err(HrlError::InvalidLut(format!("output {out} is outside [0, 1]")));
        }
        Ok(Self { points })
    }

    /// Loads a two-column matrix file with `IntensityIn IntensityOut` headers.
    pub fn load(path: &Path) -> HrlResult<Self> {
        let mut reader = DesignReader::open(path)?;
        for column in [INPUT_COLUMN, OUTPUT_COLUMN] {
            if !reader.headers().iter().any(|h| h == column) {
                return Err(HrlError::InvalidLut(format!(
                    "{} has no '{column}' column",
                    path.display()
                )));
            }
        }
        let mut points = Vec::new();
        while let Some(row) = reader.next_row()? {
            let line = reader.line_no();
            let parse = |column: &str| -> HrlResult<f32> {
                let value = row.get(column).unwrap_or_default();
                value.parse().map_err(|_| HrlError::NotANumber {
                    path: path.to_path_buf(),
                    line,
                    value: value.to_string(),
                })
            };
            points.push((parse(INPUT_COLUMN)?, parse(OUTPUT_COLUMN)?));
        }
        tracing::debug!(path = %path.display(), points = points.len(), "loaded lookup table");
        Self::from_points(points)
    }

    pub fn map(&self, intensity: f32) -> f32 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if intensity <= first.0 {
            return first.1;
        }
        if intensity >= last.0 {
            return last.1;
        }
        let upper = self.points.partition_point(|(x, _)| *x < intensity);
        let (x0, y0) = self.points[upper - 1];
        let (x1, y1) = self.points[upper];
        y0 + (y1 - y0) * (intensity - x0) / (x1 - x0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn interpolates_between_points() {
        let lut = Lut::from_points(vec![(0.0, 0.0), (0.5, 0.8), (1.0, 1.0)]).unwrap();
        assert_eq!(lut.map(0.5), 0.8);
        assert!((lut.map(0.25) - 0.4).abs() < 1e-6);
        assert!((lut.map(0.75) - 0.9).abs() < 1e-6);
        assert_eq!(lut.map(-1.0), 0.0);
        assert_eq!(lut.map(2.0), 1.0);
    }

    #[test]
    fn rejects_bad_tables() {
        assert!(Lut::from_points(vec![(0.0, 0.0)]).is_err());
        assert!(Lut::from_points(vec![(0.5, 0.0), (0.5, 1.0)]).is_err());
        assert!(Lut::from_points(vec![(0.0, 0.0), (1.0, 1.5)]).is_err());
        assert!(Lut::from_points(vec![(0.0, 0.0), (f32::NAN, 0.5), (1.0, 1.0)]).is_err());
        assert!(Lut::from_points(vec![(f32::NAN, 0.0), (1.0, 1.0)]).is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lut.txt");
        fs::write(&path, "IntensityIn IntensityOut\n0 0\n1 0.9\n").unwrap();
        let lut = Lut::load(&path).unwrap();
        assert!((lut.map(0.5) - 0.45).abs() < 1e-6);

        fs::write(&path, "IntensityIn IntensityOut\n0 zero\n1 0.9\n").unwrap();
        assert!(matches!(
            Lut::load(&path),
            Err(HrlError::NotANumber { line: 2, .. })
        ));

        fs::write(&path, "IntensityIn IntensityOut\n\n0 0\n\n1 bad\n").unwrap();
        assert!(matches!(
            Lut::load(&path),
            Err(HrlError::NotANumber { line: 5, .. })
        ));

        fs::write(&path, "In Out\n0 0\n1 1\n").unwrap();
        assert!(matches!(Lut::load(&path), Err(HrlError::InvalidLut(_))));
    }
}
