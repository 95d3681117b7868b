use std::env;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use bimatch::{MatchConsumer, MatchingConfig, MatchingOrchestrator};

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Strategy {
    Cardinality,
    Nearest,
    Minimum,
}

impl Strategy {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "cardinality" => Ok(Self::Cardinality),
            "nearest" => Ok(Self::Nearest),
            "minimum" => Ok(Self::Minimum),
            other => anyhow::bail!(
                "Unknown strategy '{other}', expected cardinality, nearest or minimum"
            ),
        }
    }
}

fn parse_args() -> Result<(PathBuf, Strategy)> {
    let mut args = env::args().skip(1);
    let Some(input) = args.next() else {
        anyhow::bail!("Usage: bimatch <input.json> [cardinality|nearest|minimum]");
    };
    let strategy = match args.next() {
        Some(name) => Strategy::parse(&name)?,
        None => Strategy::Minimum,
    };
    if let Some(extra) = args.next() {
        anyhow::bail!("Unexpected extra argument: {extra}");
    }
    Ok((PathBuf::from(input), strategy))
}

#[derive(Debug, Deserialize)]
struct MatchInput {
    a: Vec<Vec<f64>>,
    b: Vec<Vec<f64>>,
    threshold: f64,
    #[serde(default)]
    config: MatchingConfig,
}

impl MatchInput {
    fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open input file {:?}", path))?;
        let input: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parse input file {:?}", path))?;
        input.check_dimensions()?;
        Ok(input)
    }

    fn check_dimensions(&self) -> Result<()> {
        let mut points = self.a.iter().chain(self.b.iter());
        let Some(first) = points.next() else {
            return Ok(());
        };
        let dims = first.len();
        if !(2..=3).contains(&dims) {
            anyhow::bail!("Points must have 2 or 3 coordinates, found {dims}");
        }
        if let Some(other) = points.find(|point| point.len() != dims) {
            anyhow::bail!(
                "Mixed point dimensions: expected {dims}, found {}",
                other.len()
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Site<'a> {
    index: usize,
    coords: &'a [f64],
}

fn sites(points: &[Vec<f64>]) -> Vec<Site<'_>> {
    points
        .iter()
        .enumerate()
        .map(|(index, coords)| Site { index, coords })
        .collect()
}

fn euclidean(left: &Site<'_>, right: &Site<'_>) -> f64 {
    left.coords
        .iter()
        .zip(right.coords)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[derive(Debug, Serialize)]
struct MatchReport {
    strategy: Strategy,
    threshold: f64,
    cardinality: usize,
    matches: Vec<(usize, usize)>,
    unmatched_a: Vec<usize>,
    unmatched_b: Vec<usize>,
    elapsed_ms: f64,
}

impl<'a> MatchConsumer<Site<'a>, Site<'a>> for MatchReport {
    fn matched(&mut self, a: &Site<'a>, b: &Site<'a>) {
        self.matches.push((a.index, b.index));
    }

    fn unmatched_a(&mut self, a: &Site<'a>) {
        self.unmatched_a.push(a.index);
    }

    fn unmatched_b(&mut self, b: &Site<'a>) {
        self.unmatched_b.push(b.index);
    }
}

fn run(input: &MatchInput, strategy: Strategy) -> Result<MatchReport> {
    input.config.validate().context("validate matching config")?;
    let orchestrator = MatchingOrchestrator::new(input.config.clone());
    let a = sites(&input.a);
    let b = sites(&input.b);
    let threshold = input.threshold;

    let mut report = MatchReport {
        strategy,
        threshold,
        cardinality: 0,
        matches: Vec::new(),
        unmatched_a: Vec::new(),
        unmatched_b: Vec::new(),
        elapsed_ms: 0.0,
    };
    let start = Instant::now();
    let cardinality = match strategy {
        Strategy::Cardinality => orchestrator.maximum_cardinality(
            &a,
            &b,
            |x, y| euclidean(x, y) <= threshold,
            &mut report,
        ),
        Strategy::Nearest => orchestrator
            .nearest_neighbour(&a, &b, euclidean, threshold, &mut report)
            .context("nearest neighbour matching")?,
        Strategy::Minimum => orchestrator
            .minimum_distance(&a, &b, euclidean, threshold, &mut report)
            .context("minimum distance matching")?,
    };
    report.cardinality = cardinality;
    report.elapsed_ms = start.elapsed().as_secs_f64() * 1e3;
    Ok(report)
}

fn main() -> Result<()> {
    init_logging();
    let (path, strategy) = parse_args()?;
    let input = MatchInput::from_path(&path)?;
    info!(
        "Matching {} x {} points from {:?} with {:?} strategy, threshold {}",
        input.a.len(),
        input.b.len(),
        path,
        strategy,
        input.threshold
    );

    let report = run(&input, strategy)?;
    info!(
        "Matched {} pairs ({} unmatched in A, {} in B) in {:.3} ms",
        report.matches.len(),
        report.unmatched_a.len(),
        report.unmatched_b.len(),
        report.elapsed_ms
    );

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &report).context("write report")?;
    writeln!(handle).context("write report")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(json: &str) -> MatchInput {
        serde_json::from_str(json).expect("parse input")
    }

    #[test]
    fn strategies_report_every_index_once() {
        let input = input(
            r#"{
                "a": [[0.0, 0.0], [10.0, 0.0], [50.0, 50.0]],
                "b": [[0.5, 0.0], [10.0, 1.0], [-30.0, 0.0]],
                "threshold": 2.0
            }"#,
        );
        input.check_dimensions().expect("dimensions");
        for strategy in [Strategy::Cardinality, Strategy::Nearest, Strategy::Minimum] {
            let report = run(&input, strategy).expect("run");
            assert_eq!(report.matches, vec![(0, 0), (1, 1)], "{strategy:?}");
            assert_eq!(report.unmatched_a, vec![2]);
            assert_eq!(report.unmatched_b, vec![2]);
            assert_eq!(report.cardinality, 2);
        }
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let input = input(r#"{"a": [[0.0, 0.0]], "b": [[1.0, 2.0, 3.0]], "threshold": 1.0}"#);
        assert!(input.check_dimensions().is_err());
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert!(Strategy::parse("fastest").is_err());
        assert_eq!(Strategy::parse("nearest").expect("strategy"), Strategy::Nearest);
    }
}
