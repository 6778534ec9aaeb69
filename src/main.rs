use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use allelic_bias::genomics::{read_sites, BamSource, SiteFileConfig, SiteFormat};
use allelic_bias::{AlleleImbalanceAnalysis, AnalysisConfig, SortOrder};

#[derive(Parser, Debug)]
#[command(
    name = "allelic-bias",
    version,
    about = "Calculate DNase-seq/ATAC-seq allelic biases from reads over given SNPs"
)]
struct Cli {
    /// SNP file: bed-like `chr start end id ref alt` or VCF (see --format).
    #[arg(short = 's', long = "snps", value_name = "SNP_FILE")]
    snps: PathBuf,

    /// Indexed BAM files from the same individual.
    #[arg(short = 'b', long = "bam", value_name = "BAM", num_args = 1.., required = true)]
    bams: Vec<PathBuf>,

    /// Reads with more mismatches (NM tag) are filtered.
    #[arg(long = "max-mismatches", value_name = "M", default_value_t = 2)]
    max_mismatches: u32,

    /// Minimum base quality at the SNP position for a read to be considered.
    #[arg(long = "min-mapq", value_name = "Q", default_value_t = 0)]
    min_mapq: u8,

    /// Minimum number of valid reads per SNP required to test it.
    #[arg(long = "min-reads", value_name = "R", default_value_t = 10)]
    min_reads: usize,

    /// Format of the SNP file.
    #[arg(short = 'f', long = "format", value_enum, default_value_t = FormatArg::Bed)]
    format: FormatArg,

    /// 1-based column of the reference base (bed: 5, vcf: 4).
    #[arg(long = "refcol", value_name = "N")]
    ref_column: Option<usize>,

    /// 1-based column of the alternative base (bed: 6, vcf: 5).
    #[arg(long = "altcol", value_name = "N")]
    alt_column: Option<usize>,

    /// Sort the output by p-value or chromosomal position.
    #[arg(long = "sortby", value_enum, default_value_t = SortArg::Pvalue)]
    sort_by: SortArg,

    /// Worker threads (0 = all cores).
    #[arg(short = 't', long = "threads", default_value_t = 0)]
    threads: usize,

    /// Write the report here instead of stdout.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Bed,
    Vcf,
}

impl From<FormatArg> for SiteFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Bed => SiteFormat::Bed,
            FormatArg::Vcf => SiteFormat::Vcf,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Pvalue,
    Position,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Pvalue => SortOrder::Significance,
            SortArg::Position => SortOrder::Position,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    check_inputs(&cli)?;

    let mut site_config = SiteFileConfig::new(cli.format.into());
    if let Some(column) = cli.ref_column {
        site_config = site_config.with_ref_column(column);
    }
    if let Some(column) = cli.alt_column {
        site_config = site_config.with_alt_column(column);
    }
    let sites = read_sites(&cli.snps, &site_config)
        .with_context(|| format!("failed to load SNPs from {}", cli.snps.display()))?;

    let config = AnalysisConfig::default()
        .with_max_mismatches(cli.max_mismatches)
        .with_min_quality(cli.min_mapq)
        .with_min_reads(cli.min_reads)
        .with_sort_order(cli.sort_by.into())
        .with_threads(cli.threads);
    let analysis = AlleleImbalanceAnalysis::new(config).context("invalid analysis settings")?;

    let sources: Vec<BamSource> = cli.bams.iter().map(BamSource::new).collect();
    let outcome = analysis
        .run(sites, &sources)
        .context("allelic imbalance analysis failed")?;

    let mut writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("failed to create output file {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    outcome
        .report
        .write(&mut writer)
        .context("failed to write report")?;

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn check_inputs(cli: &Cli) -> Result<()> {
    if !cli.snps.is_file() {
        bail!(
            "the provided SNP file {} is not a valid file; supply a valid file and check --help",
            cli.snps.display()
        );
    }
    for bam in &cli.bams {
        if !bam.is_file() {
            bail!("{} is not a valid file; please check your input", bam.display());
        }
    }
    Ok(())
}
