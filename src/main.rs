use std::io::Write;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use rayon::prelude::*;

use seedmm_rust::index::{IndexMeta, ReferenceIndex};
use seedmm_rust::io::{fasta, fastq, hits::TsvSink};
use seedmm_rust::search::{
    AlignerFactory, Mate, PairOutcome, PairedAlignerFactory, PairedConfig, RangeCaches, Read,
    ReadOutcome, SeedConfig, UnpairedAlignerFactory,
};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// 每批读入的读段（对）数
const BATCH: usize = 16 * 1024;

#[derive(Parser, Debug)]
#[command(
    name = "seedmm",
    author,
    version,
    about = "Seed-and-mismatch short read search over a bidirectional FM index",
    arg_required_else_help = true
)]
struct Cli {
    /// Verbose logging (debug level unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the forward + mirror FM index of a reference FASTA
    Index {
        /// Reference FASTA file
        reference: String,
        /// Output prefix; the index is written to <prefix>.smi
        #[arg(short, long, default_value = "ref")]
        output: String,
        /// Occurrence checkpoint interval
        #[arg(long = "occ-block", default_value_t = 64)]
        block: usize,
        /// Suffix array sampling rate
        #[arg(long = "sa-rate", default_value_t = 16)]
        sa_rate: u32,
    },
    /// Search reads (FASTQ) against an index
    Align(AlignArgs),
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("orient").args(["ff", "fr", "rf"])))]
struct AlignArgs {
    /// Index file (.smi)
    #[arg(short = 'x', long = "index")]
    index: String,
    /// Unpaired reads FASTQ
    #[arg(conflicts_with_all = ["mate1", "mate2"], required_unless_present = "mate1")]
    reads: Option<String>,
    /// Mate 1 FASTQ
    #[arg(short = '1', requires = "mate2")]
    mate1: Option<String>,
    /// Mate 2 FASTQ
    #[arg(short = '2', requires = "mate1")]
    mate2: Option<String>,
    /// Output path (stdout if omitted)
    #[arg(short, long)]
    out: Option<String>,

    /// Mismatches allowed in the seed (0-3)
    #[arg(short = 'n', long = "seedmms", default_value_t = 2)]
    seed_mms: u8,
    /// Seed length
    #[arg(short = 'l', long = "seedlen", default_value_t = 28)]
    seed_len: usize,
    /// Maximum sum of mismatch quality penalties
    #[arg(short = 'e', long = "maqerr", default_value_t = 70)]
    qual_cutoff: u32,
    /// Backtracks allowed per read (seed mismatches >= 2)
    #[arg(long = "maxbts", default_value_t = 125)]
    max_bts: u32,
    /// Do not round qualities to the nearest 10
    #[arg(long = "nomaqround")]
    no_maq_round: bool,
    /// Do not favour the strand that reported first
    #[arg(long = "nostrandfix")]
    no_strand_fix: bool,
    /// Order backtracking by mismatch count only
    #[arg(long = "noqualorder")]
    no_qual_order: bool,
    /// Do not search the forward strand
    #[arg(long = "nofw")]
    no_fw: bool,
    /// Do not search the reverse-complement strand
    #[arg(long = "norc")]
    no_rc: bool,
    /// Located-range cache entries per index side (0 disables)
    #[arg(long = "cachelim", default_value_t = 4096)]
    cache_limit: usize,
    /// Report at most k hits (or pairs) per read
    #[arg(short = 'k', default_value_t = 1)]
    k: usize,
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    threads: usize,

    /// Minimum fragment length
    #[arg(short = 'I', long = "minins", default_value_t = 0)]
    pe_inner: u32,
    /// Maximum fragment length
    #[arg(short = 'X', long = "maxins", default_value_t = 250)]
    pe_outer: u32,
    /// Mates are forward/forward
    #[arg(long)]
    ff: bool,
    /// Mates are forward/reverse (default)
    #[arg(long)]
    fr: bool,
    /// Mates are reverse/forward
    #[arg(long)]
    rf: bool,
    /// Report mates independently
    #[arg(long = "dont-reconcile")]
    dont_reconcile: bool,
    /// Hits kept per mate for pairing
    #[arg(long = "symceil", default_value_t = 100)]
    sym_ceil: u32,
    /// Hit count above which a mate's partner is found by window scan
    #[arg(long = "mixthresh", default_value_t = 4)]
    mixed_thresh: u32,
    /// Window scans per pair
    #[arg(long = "mixatt", default_value_t = 100)]
    mixed_attempt_lim: u32,
    /// Report each mate's best hit when no pair is found
    #[arg(long = "fallback-unpaired")]
    fallback_unpaired: bool,
}

impl AlignArgs {
    fn seed_config(&self) -> SeedConfig {
        SeedConfig {
            seed_mms: self.seed_mms,
            seed_len: self.seed_len,
            qual_cutoff: self.qual_cutoff,
            max_bts: self.max_bts,
            strand_fix: !self.no_strand_fix,
            maq_penalty: !self.no_maq_round,
            qual_order: !self.no_qual_order,
            do_fw: !self.no_fw,
            do_rc: !self.no_rc,
            cache_limit: self.cache_limit,
            ..SeedConfig::default()
        }
    }

    fn paired_config(&self) -> PairedConfig {
        let (mate1_fw, mate2_fw) = match (self.ff, self.fr, self.rf) {
            (true, ..) => (true, true),
            (_, false, true) => (false, true),
            _ => (true, false),
        };
        PairedConfig {
            seed: self.seed_config(),
            mate1_fw,
            mate2_fw,
            pe_inner: self.pe_inner,
            pe_outer: self.pe_outer,
            dont_reconcile: self.dont_reconcile,
            sym_ceil: self.sym_ceil,
            mixed_thresh: self.mixed_thresh,
            mixed_attempt_lim: self.mixed_attempt_lim,
            fallback_unpaired: self.fallback_unpaired,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();

    match cli.command {
        Commands::Index { reference, output, block, sa_rate } => {
            run_index(&reference, &output, block, sa_rate)
        }
        Commands::Align(args) => run_align(&args),
    }
}

fn run_index(reference: &str, output: &str, block: usize, sa_rate: u32) -> Result<()> {
    let records = fasta::read_fasta_file(reference)?;
    if records.is_empty() {
        bail!("FASTA file '{}' contains no sequences", reference);
    }
    let total_len: usize = records.iter().map(|(_, s)| s.len()).sum();
    log::info!("reference: {}", reference);
    log::info!("sequences: {}", records.len());
    log::info!("total_len: {}", total_len);

    let mut index = ReferenceIndex::build(&records, block, sa_rate)
        .with_context(|| format!("cannot index reference '{}'", reference))?;
    index.set_meta(IndexMeta {
        reference_file: Some(reference.to_string()),
        build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
    });

    let out_path = format!("{}.smi", output);
    index
        .save_to_file(&out_path)
        .map_err(|e| anyhow!("cannot write index to '{}': {}", out_path, e))?;
    log::info!("index saved: {}", out_path);
    Ok(())
}

fn open_output(path: Option<&str>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(std::io::BufWriter::new(
            std::fs::File::create(p).with_context(|| format!("cannot create output '{}'", p))?,
        )),
        None => Box::new(std::io::BufWriter::new(std::io::stdout())),
    })
}

/// 运行统计
#[derive(Debug, Default)]
struct Stats {
    reads: usize,
    aligned: usize,
    reported: usize,
    truncated: usize,
    pairs: usize,
    fallback: usize,
}

impl Stats {
    fn add(&mut self, o: &ReadOutcome) {
        self.reads += 1;
        self.aligned += usize::from(o.reported > 0);
        self.reported += o.reported;
        self.truncated += usize::from(o.truncated());
        self.pairs += usize::from(o.pair == PairOutcome::Concordant);
        self.fallback += usize::from(o.pair == PairOutcome::Fallback);
    }
}

fn run_align(args: &AlignArgs) -> Result<()> {
    let index = ReferenceIndex::load_from_file(&args.index)
        .map_err(|e| anyhow!("cannot load index '{}': {}", args.index, e))?;
    if let Some(ts) = &index.meta.build_timestamp {
        log::info!("index {} built {}", args.index, ts);
    }
    let pool = rayon::ThreadPoolBuilder::new().num_threads(args.threads.max(1)).build()?;
    let mut out = open_output(args.out.as_deref())?;
    let limit = Some(args.k.max(1));

    let stats = match (&args.reads, &args.mate1, &args.mate2) {
        (Some(reads), _, _) => {
            let cfg = args.seed_config();
            let caches = RangeCaches::new(cfg.cache_limit);
            let factory = UnpairedAlignerFactory::new(&index, cfg)?.with_shared_caches(caches);
            align_unpaired(&pool, &factory, &index, reads, limit, &mut out)?
        }
        (None, Some(m1), Some(m2)) => {
            let cfg = args.paired_config();
            let caches = RangeCaches::new(cfg.seed.cache_limit);
            let factory = PairedAlignerFactory::new(&index, cfg)?.with_shared_caches(caches);
            align_paired(&pool, &factory, &index, m1, m2, limit, &mut out)?
        }
        _ => bail!("give either an unpaired FASTQ or both -1 and -2"),
    };
    out.flush()?;

    log::info!(
        "reads: {}, with hits: {}, hits reported: {}, truncated searches: {}",
        stats.reads,
        stats.aligned,
        stats.reported,
        stats.truncated
    );
    if args.mate1.is_some() {
        log::info!("concordant pairs: {}, fallback: {}", stats.pairs, stats.fallback);
    }
    Ok(())
}

fn next_batch<I>(records: &mut I) -> Result<Vec<Read>>
where
    I: Iterator<Item = Result<fastq::FastqRecord>>,
{
    records.take(BATCH).map(|r| r.map(fastq::FastqRecord::into_read)).collect()
}

fn align_unpaired(
    pool: &rayon::ThreadPool,
    factory: &UnpairedAlignerFactory<'_, ReferenceIndex>,
    index: &ReferenceIndex,
    path: &str,
    limit: Option<usize>,
    out: &mut dyn Write,
) -> Result<Stats> {
    let mut records = fastq::open_fastq(path)?;
    let mut stats = Stats::default();
    loop {
        let batch = next_batch(&mut records)?;
        if batch.is_empty() {
            break;
        }
        let results: Vec<(Vec<u8>, ReadOutcome)> = pool.install(|| {
            batch
                .par_iter()
                .map_init(
                    || factory.create(),
                    |aligner, read| -> Result<(Vec<u8>, ReadOutcome)> {
                        let mut sink = TsvSink::new(Vec::new(), &index.contigs, limit);
                        sink.set_read(Mate::One, read);
                        let outcome = aligner.align(read, &mut sink)?;
                        Ok((sink.finish()?, outcome))
                    },
                )
                .collect::<Result<_>>()
        })?;
        for (text, outcome) in &results {
            out.write_all(text)?;
            stats.add(outcome);
        }
    }
    Ok(stats)
}

fn align_paired(
    pool: &rayon::ThreadPool,
    factory: &PairedAlignerFactory<'_, ReferenceIndex>,
    index: &ReferenceIndex,
    path1: &str,
    path2: &str,
    limit: Option<usize>,
    out: &mut dyn Write,
) -> Result<Stats> {
    let mut records1 = fastq::open_fastq(path1)?;
    let mut records2 = fastq::open_fastq(path2)?;
    let mut stats = Stats::default();
    loop {
        let batch1 = next_batch(&mut records1)?;
        let batch2 = next_batch(&mut records2)?;
        if batch1.len() != batch2.len() {
            bail!("'{}' and '{}' contain different numbers of reads", path1, path2);
        }
        if batch1.is_empty() {
            break;
        }
        let results: Vec<(Vec<u8>, ReadOutcome)> = pool.install(|| {
            batch1
                .par_iter()
                .zip(batch2.par_iter())
                .map_init(
                    || factory.create(),
                    |aligner, (m1, m2)| -> Result<(Vec<u8>, ReadOutcome)> {
                        let mut sink = TsvSink::new(Vec::new(), &index.contigs, limit);
                        sink.set_read(Mate::One, m1);
                        sink.set_read(Mate::Two, m2);
                        let outcome = aligner.align(m1, m2, &mut sink)?;
                        Ok((sink.finish()?, outcome))
                    },
                )
                .collect::<Result<_>>()
        })?;
        for (text, outcome) in &results {
            out.write_all(text)?;
            stats.add(outcome);
        }
    }
    Ok(stats)
}
