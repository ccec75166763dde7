//! DVH 计算命令行工具.
//!
//! `dvh-calc intro` 显示说明; `dvh-calc calculate` 读取剂量与结构掩膜文件,
//! 计算 DVH 表并以 csv 格式输出.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dvh_berry::prelude::*;

mod report;

#[derive(Parser)]
#[command(name = "dvh-calc")]
#[command(version, about = "Dose-volume histogram calculator", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    task: Option<Task>,
}

#[derive(Subcommand)]
enum Task {
    /// Show what this tool does
    Intro,

    /// Compute DVH curves of structures from a dose volume and mask files
    Calculate {
        /// Dose distribution volume (.nii or .nii.gz)
        #[arg(value_name = "DOSE")]
        dose: PathBuf,

        /// Structure mask files; the structure name is the file name up to the first `.`
        #[arg(short, long = "mask", value_name = "FILE", required = true)]
        masks: Vec<PathBuf>,

        /// Maximum dose (exclusive) of the dose axis [env: DVH_MAX_DOSE]
        #[arg(long, value_name = "GY")]
        max_dose: Option<f64>,

        /// Step size of the dose axis [env: DVH_STEP_SIZE]
        #[arg(long, value_name = "GY")]
        step_size: Option<f64>,

        /// Table layout of the csv output
        #[arg(long, value_enum, default_value_t = Layout::Wide)]
        layout: Layout,

        /// Output csv file; stdout if omitted
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Print dose statistics of each structure to stderr
        #[arg(long)]
        summary: bool,
    },
}

/// csv 输出的表格形式.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Layout {
    /// One row per structure, one column per dose point
    Wide,
    /// One row per (dose, structure) pair
    Long,
}

const INTRO: &str = "\
DVH Calculator

Computes cumulative dose-volume histograms of anatomical structures from a
3-D dose distribution and binary structure masks, all in NIfTI format
(.nii or .nii.gz) on the same voxel grid.

For every dose d on the axis [0, step, 2 * step, ...) below the maximum dose,
the output gives the percentage of each structure's voxels that receive at
least d.

Example:
    dvh-calc calculate dose.nii.gz -m PTV.nii.gz -m Heart.nii.gz --layout long
";

fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// 合并环境变量与命令行参数, 命令行优先.
fn resolve_config(max_dose: Option<f64>, step_size: Option<f64>) -> anyhow::Result<DvhConfig> {
    let mut config = DvhConfig::from_env().context("reading DVH_* environment variables")?;
    if let Some(max_dose) = max_dose {
        config = config.with_max_dose(max_dose)?;
    }
    if let Some(step_size) = step_size {
        config = config.with_step_size(step_size)?;
    }
    Ok(config)
}

fn write_table<W: Write>(table: &DvhTable, layout: Layout, w: W) -> io::Result<()> {
    match layout {
        Layout::Wide => table.to_wide().write_csv(w),
        Layout::Long => table.to_long().write_csv(w),
    }
}

fn calculate(
    dose: PathBuf,
    masks: Vec<PathBuf>,
    config: DvhConfig,
    layout: Layout,
    out: Option<PathBuf>,
    summary: bool,
) -> anyhow::Result<()> {
    let (dose, masks) = load_inputs(&dose, &masks)?;
    let table = dvh_from_inputs(&dose, &masks, &config)?;
    log::info!(
        "computed {} curves over {} dose points",
        table.len(),
        table.axis().len()
    );

    if summary {
        report::describe(&dose, &masks, &table, io::stderr().lock())?;
    }

    match out {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("creating `{}`", path.display()))?;
            let mut w = BufWriter::new(file);
            write_table(&table, layout, &mut w)?;
            w.flush()?;
            log::info!("wrote {:?} table to `{}`", layout, path.display());
        }
        None => write_table(&table, layout, io::stdout().lock())?,
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    simple_logger::SimpleLogger::new()
        .with_level(log_level(cli.verbose))
        .init()?;

    match cli.task.unwrap_or(Task::Intro) {
        Task::Intro => print!("{INTRO}"),
        Task::Calculate {
            dose,
            masks,
            max_dose,
            step_size,
            layout,
            out,
            summary,
        } => {
            let config = resolve_config(max_dose, step_size)?;
            calculate(dose, masks, config, layout, out, summary)?;
        }
    }
    Ok(())
}
