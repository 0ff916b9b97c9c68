use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use pareval_rt::{
    Config, Dataset, DatasetLayout, Evaluator, LexiconEvaluator, Mode, StrategyRunner, SweepConfig,
};

use super::load_sweep;
use crate::error::{convert_io_error, CliError};

/// Options of `pareval bench`, after flag parsing.
#[derive(Debug)]
pub struct BenchOptions {
    pub dataset: PathBuf,
    pub layout: DatasetLayout,
    pub threads: Vec<usize>,
    pub runs: usize,
    pub config: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

/// Average sweep time of one mode and thread count.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchRow {
    pub mode: Mode,
    pub threads: usize,
    pub avg_time: f64,
    /// Sequential average divided by this row's average.
    pub speedup: f64,
}

/// Times the sequential baseline, then every parallel mode at every thread
/// count, each averaged over `runs` sweeps of the same in-memory dataset.
pub fn handle_bench(options: BenchOptions) -> Result<(), CliError> {
    if options.runs == 0 {
        return Err(CliError::InvalidRuns);
    }
    let sweep = load_sweep(options.config.as_deref())?;
    sweep.validate()?;
    let dataset = Dataset::load(&options.dataset, options.layout)?;

    let rows = benchmark(&options, &sweep, &dataset, &LexiconEvaluator)?;
    print_table(&rows);

    if let Some(path) = &options.csv {
        let file = fs::File::create(path).map_err(|e| convert_io_error(e, path.clone()))?;
        write_csv(BufWriter::new(file), &rows).map_err(|e| convert_io_error(e, path.clone()))?;
        log::info!("Wrote {} benchmark rows to {}", rows.len(), path.display());
    }
    Ok(())
}

fn benchmark(
    options: &BenchOptions,
    sweep: &SweepConfig,
    dataset: &Dataset,
    evaluator: &dyn Evaluator,
) -> Result<Vec<BenchRow>, CliError> {
    let config_for = |mode: Mode, threads: usize| {
        Config::new(mode, Some(threads), &options.dataset)
            .with_layout(options.layout)
            .with_sweep(sweep.clone())
    };

    let runs = options.runs;
    let baseline = average_time(&config_for(Mode::Sequential, 1), dataset, evaluator, runs)?;
    log::info!("Sequential baseline: {:.4}s", baseline);

    let mut rows = vec![BenchRow {
        mode: Mode::Sequential,
        threads: 1,
        avg_time: baseline,
        speedup: 1.0,
    }];
    for mode in Mode::ALL.into_iter().filter(Mode::is_parallel) {
        for &threads in &options.threads {
            let avg_time = average_time(&config_for(mode, threads), dataset, evaluator, runs)?;
            let speedup = if avg_time > 0.0 { baseline / avg_time } else { 0.0 };
            log::info!(
                "{} with {} threads: {:.4}s, speedup {:.2}",
                mode,
                threads,
                avg_time,
                speedup
            );
            rows.push(BenchRow {
                mode,
                threads,
                avg_time,
                speedup,
            });
        }
    }
    Ok(rows)
}

fn average_time(
    config: &Config,
    dataset: &Dataset,
    evaluator: &dyn Evaluator,
    runs: usize,
) -> Result<f64, CliError> {
    let runner = StrategyRunner::new(config, evaluator);
    let mut total = Duration::ZERO;
    for run in 0..runs {
        let report = runner.run(dataset)?;
        log::debug!("{} run {}: {:?}", config.mode, run + 1, report.elapsed);
        total += report.elapsed;
    }
    Ok(total.as_secs_f64() / runs as f64)
}

fn print_table(rows: &[BenchRow]) {
    println!("{:<10} {:>7} {:>12} {:>8}", "mode", "threads", "avg_time(s)", "speedup");
    for row in rows {
        println!(
            "{:<10} {:>7} {:>12.4} {:>8.2}",
            row.mode.as_str(),
            row.threads,
            row.avg_time,
            row.speedup
        );
    }
}

/// Writes `mode,threads,avg_time,speedup` rows with a header line.
pub fn write_csv<W: Write>(mut out: W, rows: &[BenchRow]) -> io::Result<()> {
    writeln!(out, "mode,threads,avg_time,speedup")?;
    for row in rows {
        writeln!(
            out,
            "{},{},{:.6},{:.4}",
            row.mode.as_str(),
            row.threads,
            row.avg_time,
            row.speedup
        )?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pareval_rt::{ConstantEvaluator, Record};

    #[test]
    fn test_csv_format() {
        let rows = vec![
            BenchRow {
                mode: Mode::Sequential,
                threads: 1,
                avg_time: 0.5,
                speedup: 1.0,
            },
            BenchRow {
                mode: Mode::DequeSteal,
                threads: 4,
                avg_time: 0.125,
                speedup: 4.0,
            },
        ];
        let mut out = Vec::new();
        write_csv(&mut out, &rows).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "mode,threads,avg_time,speedup\ns,1,0.500000,1.0000\np-steal,4,0.125000,4.0000\n"
        );
    }

    #[test]
    fn test_benchmark_covers_every_parallel_mode() {
        let dataset: Dataset = (0..50).map(|i| Record::new("0", format!("r{}", i))).collect();
        let options = BenchOptions {
            dataset: PathBuf::from("in-memory.csv"),
            layout: DatasetLayout::Balanced,
            threads: vec![2, 3],
            runs: 2,
            config: None,
            csv: None,
        };
        let sweep = SweepConfig::default();
        let rows = benchmark(&options, &sweep, &dataset, &ConstantEvaluator(0.5)).unwrap();

        assert_eq!(rows.len(), 1 + 3 * 2);
        assert_eq!(rows[0].mode, Mode::Sequential);
        assert_eq!(rows[0].speedup, 1.0);
        let modes: Vec<(Mode, usize)> = rows[1..].iter().map(|r| (r.mode, r.threads)).collect();
        assert_eq!(
            modes,
            vec![
                (Mode::BarrierParallel, 2),
                (Mode::BarrierParallel, 3),
                (Mode::DequeNoSteal, 2),
                (Mode::DequeNoSteal, 3),
                (Mode::DequeSteal, 2),
                (Mode::DequeSteal, 3),
            ]
        );
    }

    #[test]
    fn test_zero_runs_rejected() {
        let options = BenchOptions {
            dataset: PathBuf::from("unused.csv"),
            layout: DatasetLayout::Balanced,
            threads: vec![2],
            runs: 0,
            config: None,
            csv: None,
        };
        assert!(matches!(handle_bench(options), Err(CliError::InvalidRuns)));
    }
}
