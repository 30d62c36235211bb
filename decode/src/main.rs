use anyhow::Context;
use clap::{Parser, Subcommand};
use decode::config::DEFAULT_BINS;
use decode::simulate::{generate_targets, to_fasta};
use decode::{
    prepare_design, solve_design, Alignment, AlignmentFormat, CodonTable, DesignConfig,
    ScipSolver,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "decode")]
#[command(version)]
#[command(about = "Degenerate codon library design by integer programming", long_about = None)]
struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a degenerate codon library for an alignment of targets
    Optimize {
        /// Aligned target sequences
        alignment: PathBuf,

        /// JSON solution record
        output: PathBuf,

        /// Total library size limit
        #[arg(short, long)]
        limit: u64,

        /// Sub-library count limit
        #[arg(short, long)]
        sublib: usize,

        /// Bins approximating the size of multi-sub-library designs
        #[arg(long, default_value_t = DEFAULT_BINS)]
        bins: usize,

        /// Solver time limit in seconds (0 = unbounded)
        #[arg(long, default_value_t = 0.0)]
        time_limit: f64,

        /// Solver threads, applied to SCIP's parallel and LP thread limits (0 = solver default)
        #[arg(short = 't', long, default_value_t = 0)]
        threads: usize,

        /// Use the approximate size constraint for a single sub-library too
        #[arg(long)]
        approx: bool,

        /// Alignment format
        #[arg(long, default_value = "clustal")]
        format: AlignmentFormat,

        /// Also write the model in LP format
        #[arg(long)]
        write_lp: Option<PathBuf>,

        /// Codon table JSON written by `codon-table` (defaults to the standard code)
        #[arg(long)]
        codon_table: Option<PathBuf>,

        /// SCIP executable (defaults to $SCIP_BIN, then `scip`)
        #[arg(long)]
        scip: Option<String>,

        /// Show solver output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Formulate the model and write it in LP format without solving
    Model {
        alignment: PathBuf,

        output: PathBuf,

        #[arg(short, long)]
        limit: u64,

        #[arg(short, long)]
        sublib: usize,

        #[arg(long, default_value_t = DEFAULT_BINS)]
        bins: usize,

        #[arg(long)]
        approx: bool,

        #[arg(long, default_value = "clustal")]
        format: AlignmentFormat,

        #[arg(long)]
        codon_table: Option<PathBuf>,
    },

    /// Write the reduced degenerate codon table as JSON
    CodonTable {
        output: PathBuf,
    },

    /// Generate a random family of point-mutant targets as FASTA
    Simulate {
        output: PathBuf,

        /// Number of distinct sequences
        #[arg(short, long)]
        count: usize,

        /// Sequence length
        #[arg(short = 'n', long)]
        length: usize,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or warn when quiet
    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Optimize {
            alignment,
            output,
            limit,
            sublib,
            bins,
            time_limit,
            threads,
            approx,
            format,
            write_lp,
            codon_table,
            scip,
            verbose,
        } => {
            let cfg = DesignConfig {
                lib_limit: limit,
                n_sublibs: sublib,
                bins,
                approximate: approx,
                time_limit,
                threads,
                verbose,
            };
            let table = load_codon_table(codon_table.as_deref())?;
            let solver = scip.map(ScipSolver::new).unwrap_or_default();
            optimize_command(alignment, output, format, cfg, &table, write_lp, solver)?;
        }
        Commands::Model {
            alignment,
            output,
            limit,
            sublib,
            bins,
            approx,
            format,
            codon_table,
        } => {
            let cfg = DesignConfig {
                lib_limit: limit,
                n_sublibs: sublib,
                bins,
                approximate: approx,
                ..DesignConfig::default()
            };
            let table = load_codon_table(codon_table.as_deref())?;
            model_command(alignment, output, format, cfg, &table)?;
        }
        Commands::CodonTable { output } => {
            let table = CodonTable::standard();
            std::fs::write(&output, table.to_json()?)
                .with_context(|| format!("writing {}", output.display()))?;
            info!("wrote {} codon classes to {}", table.len(), output.display());
        }
        Commands::Simulate {
            output,
            count,
            length,
            seed,
        } => {
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            };
            let seqs = generate_targets(count, length, &mut rng)?;
            std::fs::write(&output, to_fasta(&seqs))
                .with_context(|| format!("writing {}", output.display()))?;
            info!("wrote {} sequences to {}", seqs.len(), output.display());
        }
    }

    Ok(())
}

fn read_alignment(path: &Path, format: AlignmentFormat) -> anyhow::Result<Alignment> {
    info!("Reading alignment {}...", path.display());
    Alignment::read(path, format).with_context(|| format!("reading {}", path.display()))
}

fn load_codon_table(path: Option<&Path>) -> anyhow::Result<Cow<'static, CodonTable>> {
    let Some(path) = path else {
        return Ok(Cow::Borrowed(CodonTable::standard()));
    };
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let table = CodonTable::from_json(&text)
        .with_context(|| format!("parsing codon table {}", path.display()))?;
    info!("loaded {} codon classes from {}", table.len(), path.display());
    Ok(Cow::Owned(table))
}

fn optimize_command(
    alignment: PathBuf,
    output: PathBuf,
    format: AlignmentFormat,
    cfg: DesignConfig,
    table: &CodonTable,
    write_lp: Option<PathBuf>,
    solver: ScipSolver,
) -> anyhow::Result<()> {
    let aln = read_alignment(&alignment, format)?;
    let prepared = prepare_design(&aln, &cfg, table)?;

    if let Some(lp_path) = write_lp {
        std::fs::write(&lp_path, prepared.model.to_lp())
            .with_context(|| format!("writing {}", lp_path.display()))?;
        info!("wrote model to {}", lp_path.display());
    }

    let record = solve_design(&prepared, &cfg, table, &solver)?;

    info!("Number of covered targets:\t{}", record.n_covered);
    info!("Total library size:\t\t{}", record.total_lib_size);
    info!("Probability on target:\t\t{:.5}", record.on_target_p);
    info!("Writing output...");

    std::fs::write(&output, record.to_json()?)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

fn model_command(
    alignment: PathBuf,
    output: PathBuf,
    format: AlignmentFormat,
    cfg: DesignConfig,
    table: &CodonTable,
) -> anyhow::Result<()> {
    let aln = read_alignment(&alignment, format)?;
    let model = prepare_design(&aln, &cfg, table)?.model;
    std::fs::write(&output, model.to_lp())
        .with_context(|| format!("writing {}", output.display()))?;
    info!(
        "wrote model with {} binaries and {} constraints to {}",
        model.ilp.binaries.len(),
        model.ilp.constraints.len(),
        output.display()
    );
    Ok(())
}
