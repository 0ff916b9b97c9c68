use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use pareval_rt::{DatasetLayout, Mode};

mod commands;
mod error;

use commands::bench::{handle_bench, BenchOptions};
use commands::run::{handle_run, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "pareval")]
#[command(about = "Parallel precision/recall threshold sweeps", long_about = None)]
struct Args {
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Sweep the thresholds over a dataset and write the precision/recall table
    Run {
        /// CSV file of `label,text` rows
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,
        /// Record order applied after loading
        #[arg(short, long, value_enum, default_value_t = LayoutArg::Balanced)]
        layout: LayoutArg,
        /// Execution mode
        #[arg(short, long, value_enum, default_value_t = ModeArg::Sequential)]
        mode: ModeArg,
        /// Worker threads for parallel modes (defaults to the number of CPUs)
        #[arg(short = 't', long, value_name = "N")]
        threads: Option<usize>,
        /// TOML file with sweep settings
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Where to write the precision/recall table
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Run the plot script on the written table
        #[arg(long)]
        plot: bool,
        /// Plot script to run with --plot
        #[arg(long, value_name = "FILE")]
        plot_script: Option<PathBuf>,
    },

    /// Time every mode against the sequential baseline
    Bench {
        /// CSV file of `label,text` rows
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,
        /// Record order applied after loading
        #[arg(short, long, value_enum, default_value_t = LayoutArg::Balanced)]
        layout: LayoutArg,
        /// Thread counts to measure, comma separated
        #[arg(short = 't', long, value_delimiter = ',', default_value = "2,4,6,8,12")]
        threads: Vec<usize>,
        /// Sweeps averaged per measurement
        #[arg(short, long, default_value_t = 5)]
        runs: usize,
        /// TOML file with sweep settings
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Also write the results as CSV
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },

    /// List the execution modes
    Modes,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    /// Run sequentially
    #[value(name = "s")]
    Sequential,
    /// Static chunks joined through a barrier
    #[value(name = "p-normal")]
    Normal,
    /// Per-worker deques, no stealing
    #[value(name = "p-nosteal")]
    NoSteal,
    /// Per-worker deques with work stealing
    #[value(name = "p-steal")]
    Steal,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Sequential => Mode::Sequential,
            ModeArg::Normal => Mode::BarrierParallel,
            ModeArg::NoSteal => Mode::DequeNoSteal,
            ModeArg::Steal => Mode::DequeSteal,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LayoutArg {
    /// File order
    Balanced,
    /// Shortest texts first
    Imbalanced,
}

impl From<LayoutArg> for DatasetLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Balanced => DatasetLayout::Balanced,
            LayoutArg::Imbalanced => DatasetLayout::Imbalanced,
        }
    }
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .parse_default_env()
        .init();

    match args.command {
        Command::Run {
            dataset,
            layout,
            mode,
            threads,
            config,
            output,
            plot,
            plot_script,
        } => handle_run(RunOptions {
            dataset,
            layout: layout.into(),
            mode: mode.into(),
            threads,
            config,
            output,
            plot,
            plot_script,
        })?,
        Command::Bench {
            dataset,
            layout,
            threads,
            runs,
            config,
            csv,
        } => handle_bench(BenchOptions {
            dataset,
            layout: layout.into(),
            threads,
            runs,
            config,
            csv,
        })?,
        Command::Modes => {
            for mode in Mode::ALL {
                println!("{:<10} {}", mode.as_str(), mode.description());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let args = Args::try_parse_from([
            "pareval", "run", "data.csv", "--mode", "p-steal", "-t", "6", "--layout", "imbalanced",
        ])
        .unwrap();
        match args.command {
            Command::Run {
                dataset,
                mode,
                threads,
                layout,
                plot,
                ..
            } => {
                assert_eq!(dataset, PathBuf::from("data.csv"));
                assert_eq!(Mode::from(mode), Mode::DequeSteal);
                assert_eq!(threads, Some(6));
                assert_eq!(DatasetLayout::from(layout), DatasetLayout::Imbalanced);
                assert!(!plot);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_mode_names_match_runtime() {
        use clap::ValueEnum;
        for arg in ModeArg::value_variants() {
            let name = arg.to_possible_value().unwrap().get_name().to_string();
            assert_eq!(name.parse::<Mode>().unwrap(), Mode::from(*arg));
        }
    }

    #[test]
    fn test_parse_bench_defaults() {
        let args = Args::try_parse_from(["pareval", "bench", "data.csv"]).unwrap();
        match args.command {
            Command::Bench { threads, runs, csv, .. } => {
                assert_eq!(threads, vec![2, 4, 6, 8, 12]);
                assert_eq!(runs, 5);
                assert!(csv.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Args::try_parse_from(["pareval", "run", "data.csv", "--mode", "p-fast"]).is_err());
    }
}
