use anyhow::{Context, Result, anyhow, bail};
use hrl_core::{InputKind, Key, KeyboardMap, Photometer as _, PhotometerKind};
use hrl_devices::{LinePhotometer, Protocol, SerialLink, SimulatedRig};
use hrl_matrix::{DesignReader, Factor, ResultWriter, Row, full_factorial, write_design};
use hrl_session::{Hrl, SessionConfig};
use hrl_timing::{RateSummary, read_deltas};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Serialize, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub remaining: usize,
}

pub fn progress(design: &Path, results: &Path) -> Result<Progress> {
    let total = DesignReader::count_rows(design)
        .with_context(|| format!("reading design {}", design.display()))?;
    let completed = ResultWriter::count_rows(results)
        .with_context(|| format!("reading results {}", results.display()))?;
    if completed > total {
        tracing::warn!(completed, total, "result file has more rows than the design");
    }
    Ok(Progress {
        completed,
        total,
        remaining: total.saturating_sub(completed),
    })
}

pub fn status(design: &Path, results: &Path, json: bool) -> Result<()> {
    let p = progress(design, results)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&p)?);
    } else {
        println!(
            "{} of {} trials done, {} remaining",
            p.completed, p.total, p.remaining
        );
    }
    Ok(())
}

pub fn check_rate(files: &[impl AsRef<Path>], min_rate: f64, json: bool) -> Result<()> {
    for file in files {
        let file = file.as_ref();
        let deltas =
            read_deltas(file).with_context(|| format!("reading intervals {}", file.display()))?;
        let summary = RateSummary::from_deltas(&deltas, min_rate);
        if json {
            let line = serde_json::json!({ "file": file.display().to_string(), "summary": summary });
            println!("{line}");
        } else {
            println!(
                "{} // {:.6} +- {:.6} Hz ({} frames, {} below {} Hz)",
                file.display(),
                summary.mean_hz,
                summary.std_hz,
                summary.count,
                summary.rejected,
                min_rate
            );
        }
    }
    Ok(())
}

/// Parses `NAME=a,b,c`.
pub fn parse_factor(arg: &str) -> Result<Factor> {
    let (name, levels) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("factor '{arg}' should look like NAME=level,level"))?;
    let levels: Vec<&str> = levels.split(',').map(str::trim).filter(|l| !l.is_empty()).collect();
    Ok(Factor::new(name.trim(), levels))
}

pub fn design(specs: &[String], repeats: usize, seed: Option<u64>, output: &Path) -> Result<()> {
    let factors = specs
        .iter()
        .map(|s| parse_factor(s))
        .collect::<Result<Vec<_>>>()?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let rows = full_factorial(&factors, repeats, &mut rng)?;
    let headers: Vec<String> = factors.iter().map(|f| f.name.clone()).collect();
    write_design(output, &headers, &rows)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("{} trials written to {}", rows.len(), output.display());
    Ok(())
}

pub fn measure(kind: PhotometerKind, port: &Path, samples: usize, timeout_ms: u64) -> Result<()> {
    let protocol = Protocol::for_kind(kind);
    let link = SerialLink::open(port, &protocol, Duration::from_millis(timeout_ms))?;
    let mut meter = LinePhotometer::new(link, protocol);
    for (i, value) in meter.read_samples(samples)?.into_iter().enumerate() {
        println!("{} {value}", i + 1);
    }
    Ok(())
}

/// Column names the simulated run fills in when the result file has them.
pub const RESPONSE_COLUMN: &str = "Response";
pub const RESPONSE_TIME_COLUMN: &str = "ResponseTime";

/// Plays the remaining design rows through a session on simulated hardware.
/// Each trial gets a Space press after `rt_ms`. Result columns named like a
/// design column are copied from it. Returns the number of trials run.
pub fn run_simulated(config: &SessionConfig, rt_ms: u64, timeout_ms: u64) -> Result<usize> {
    if config.results.is_none() {
        bail!("the session config has no result file to write to");
    }
    let rig = SimulatedRig::new();
    let mut hrl = Hrl::open(config, rig.clone())?;
    let press = match InputKind::from_flag(config.inputs.as_deref()) {
        Some(InputKind::ResponsePixx) => Some(16),
        Some(InputKind::Keyboard) => Some(KeyboardMap::SPACE),
        None => None,
    };
    let headers = hrl.result_headers().map(<[String]>::to_vec).unwrap_or_default();
    let timeout = Duration::from_millis(timeout_ms);

    let mut trials = 0;
    while let Some(design) = hrl.next_design()? {
        let (key, rt) = match (press, hrl.inputs.as_mut()) {
            (Some(code), Some(inputs)) => {
                // a press that outlived the last trial's timeout must not answer this one
                rig.clear_buttons();
                rig.push_button(code, Duration::from_millis(rt_ms));
                if let Some(graphics) = hrl.graphics.as_mut() {
                    graphics.flip()?;
                }
                inputs.read_button(&[Key::Space], timeout)?
            }
            _ => (None, timeout),
        };

        hrl.results.clear();
        for header in &headers {
            if let Some(value) = design.get(header) {
                hrl.results.set(header.as_str(), value);
            }
        }
        hrl.results.set(
            RESPONSE_COLUMN,
            key.map_or("None".to_string(), |k| k.to_string()),
        );
        hrl.results
            .set(RESPONSE_TIME_COLUMN, format!("{:.3}", rt.as_secs_f64()));
        // keep only declared columns
        let row: Row = hrl
            .results
            .iter()
            .filter(|(c, _)| headers.iter().any(|h| h == c))
            .collect();
        hrl.write_result(&row)
            .with_context(|| format!("writing trial {}", hrl.trial_index()))?;
        trials += 1;
    }
    hrl.close()?;
    Ok(trials)
}

pub fn simulate(config: Option<&Path>, rt_ms: u64, timeout_ms: u64) -> Result<()> {
    let config = match config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SessionConfig::from_env()?
            .ok_or_else(|| anyhow!("no --config given and HRL_CONFIG_PATH is not set"))?,
    };
    let trials = run_simulated(&config, rt_ms, timeout_ms)?;
    println!("{trials} simulated trials written");
    Ok(())
}
