//! zkbind CLI - reference strings, proofs and the C boundary from the shell
//!
//! Commands:
//! - srs: Generate a reference string file
//! - prove: Prove the simple circuit and write a proof bundle
//! - verify: Verify a proof bundle
//! - run: Drive the C boundary entry point, optionally from several threads
//! - sizes: Report circuit sizes

use std::ffi::{CStr, CString};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use zkbind::{circuit_sizes, SimpleAir, SimpleCircuit, SimpleCircuitConfig};
use zkbind_ffi::{
    zkbind_live_sessions, zkbind_simple_create_and_verify_proof, zkbind_srs_init_from_file,
};
use zkbind_prover::srs::{DEFAULT_SRS_POINTS, DEFAULT_SRS_SEED};
use zkbind_prover::{
    get_crs_factory, FileReferenceStringFactory, ProverConfig, ReferenceString,
    ReferenceStringProvider, Verdict, VerificationKey, Verifier,
};

mod bundle;

use bundle::ProofBundle;

#[derive(Parser)]
#[command(name = "zkbind")]
#[command(
    about = "Zero-knowledge proof lifecycle behind an exception-free boundary",
    long_about = None
)]
struct Cli {
    /// Log filter, used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a reference string file
    Srs {
        /// Number of points
        #[arg(short, long, default_value_t = DEFAULT_SRS_POINTS)]
        points: usize,

        /// Seed the points are derived from
        #[arg(short, long)]
        seed: Option<String>,

        /// Output file
        #[arg(short, long, default_value = "srs.bin")]
        output: PathBuf,
    },

    /// Prove the simple circuit
    Prove {
        /// Trace length, log2
        #[arg(short, long, default_value_t = 6)]
        log_rows: u32,

        /// Reference string file (default: built-in generated string)
        #[arg(short, long)]
        srs: Option<PathBuf>,

        /// Prover configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output bundle
        #[arg(short, long, default_value = "proof.json")]
        output: PathBuf,
    },

    /// Verify a proof bundle
    Verify {
        /// Proof bundle
        #[arg(short, long, default_value = "proof.json")]
        bundle: PathBuf,

        /// Reference string file (default: built-in generated string)
        #[arg(short, long)]
        srs: Option<PathBuf>,
    },

    /// Create and verify proofs through the C entry point
    Run {
        /// Reference string file installed before running
        #[arg(short, long)]
        srs: Option<PathBuf>,

        /// Invocations per thread
        #[arg(short, long, default_value_t = 1)]
        iterations: usize,

        /// Concurrent threads
        #[arg(short, long, default_value_t = 1)]
        threads: usize,
    },

    /// Show circuit sizes
    Sizes {
        /// Trace length, log2
        #[arg(short, long, default_value_t = 6)]
        log_rows: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Srs { points, seed, output } => cmd_srs(points, seed.as_deref(), &output),
        Commands::Prove {
            log_rows,
            srs,
            config,
            output,
        } => cmd_prove(log_rows, srs.as_deref(), config.as_deref(), &output),
        Commands::Verify { bundle, srs } => cmd_verify(&bundle, srs.as_deref()),
        Commands::Run {
            srs,
            iterations,
            threads,
        } => cmd_run(srs.as_deref(), iterations, threads),
        Commands::Sizes { log_rows } => cmd_sizes(log_rows),
    }
}

fn provider(srs: Option<&Path>) -> Arc<dyn ReferenceStringProvider> {
    match srs {
        Some(path) => Arc::new(FileReferenceStringFactory::new(path)),
        None => get_crs_factory(),
    }
}

fn cmd_srs(points: usize, seed: Option<&str>, output: &Path) -> Result<()> {
    println!("🔑 zkbind - Generating reference string\n");

    let seed = seed.map(str::as_bytes).unwrap_or(DEFAULT_SRS_SEED);
    let srs = ReferenceString::generate(points, seed)?;
    srs.write_to_file(output)?;

    println!("   Points: {}", srs.num_points());
    println!("   Digest: 0x{}", hex::encode(srs.digest()));
    println!("\n✅ Reference string saved to {:?}", output);
    Ok(())
}

fn cmd_prove(
    log_rows: u32,
    srs: Option<&Path>,
    config: Option<&Path>,
    output: &Path,
) -> Result<()> {
    println!("🔐 zkbind - Generating proof\n");

    let prover_config: ProverConfig = match config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read {:?}", path))?;
            serde_json::from_str(&json)
                .with_context(|| format!("invalid prover config {:?}", path))?
        }
        None => ProverConfig::default(),
    };
    let provider = provider(srs);
    println!("   Reference string: {}", provider.describe());

    let circuit = SimpleCircuit::new(SimpleCircuitConfig::with_log_rows(log_rows), prover_config);
    let start = Instant::now();
    let mut session = circuit.build_session(provider.as_ref()).context("setup failed")?;
    println!("   Setup: {:?}", start.elapsed());

    let sizes = session.circuit_sizes();
    println!(
        "   Circuit: {} rows, {} transition rows, {} cells",
        sizes.subgroup, sizes.exact, sizes.total
    );

    let start = Instant::now();
    let proof = session.create_proof().context("proof construction failed")?;
    println!("   Proving: {:?} ({} bytes)", start.elapsed(), proof.len());

    if !session.verify_proof(proof.as_bytes()).context("verification failed")? {
        bail!("freshly created proof did not verify");
    }

    let bundle = ProofBundle::new(
        session.builder().config().clone(),
        session.public_inputs(),
        &session.verification_key().to_bytes(),
        proof.as_bytes(),
    );
    session.release();

    let json = serde_json::to_string_pretty(&bundle)?;
    fs::write(output, json).with_context(|| format!("failed to write {:?}", output))?;

    println!("\n✅ Proof bundle saved to {:?}", output);
    println!("   Verify with: zkbind verify -b {}", output.display());
    Ok(())
}

fn cmd_verify(bundle_path: &Path, srs: Option<&Path>) -> Result<()> {
    println!("🔍 zkbind - Verifying proof\n");

    let json = fs::read_to_string(bundle_path)
        .with_context(|| format!("failed to read {:?}", bundle_path))?;
    let bundle: ProofBundle = serde_json::from_str(&json).context("invalid proof bundle")?;

    let srs = provider(srs).reference_string(0)?;
    let vk = VerificationKey::from_bytes(&bundle.verification_key_bytes()?, &srs)?;
    if vk.log_rows() != bundle.circuit.log_rows {
        bail!(
            "bundle claims log_rows {} but the key has {}",
            bundle.circuit.log_rows,
            vk.log_rows()
        );
    }
    let public_inputs = bundle.public_inputs()?;
    let proof = bundle.proof_bytes()?;

    println!("   Circuit: {} ({} rows)", vk.circuit_id(), vk.num_rows());
    println!("   Proof size: {} bytes", proof.len());

    let start = Instant::now();
    let verdict = Verifier::new().check(&vk, &SimpleAir, &proof, &public_inputs)?;
    println!("   Verification: {:?}", start.elapsed());

    match verdict {
        Verdict::Accepted => {
            println!("\n✅ Proof is valid");
            Ok(())
        }
        Verdict::Rejected(reason) => {
            println!("\n❌ Proof rejected: {}", reason);
            Err(anyhow!("proof rejected: {}", reason))
        }
    }
}

fn cmd_run(srs: Option<&Path>, iterations: usize, threads: usize) -> Result<()> {
    println!("🚀 zkbind - Running the C entry point\n");

    if let Some(path) = srs {
        let path = CString::new(path.to_string_lossy().into_owned())?;
        if let Some(diag) = diagnostic(zkbind_srs_init_from_file(path.as_ptr())) {
            bail!("{}", diag);
        }
    }

    let start = Instant::now();
    let workers: Vec<_> = (0..threads.max(1))
        .map(|worker| {
            thread::spawn(move || {
                (0..iterations)
                    .map(|i| {
                        let mut valid = false;
                        let diag = diagnostic(zkbind_simple_create_and_verify_proof(&mut valid));
                        debug!(worker, iteration = i, valid, "boundary call returned");
                        (valid, diag)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut failures = 0usize;
    let mut total = 0usize;
    for worker in workers {
        let outcomes = worker.join().map_err(|_| anyhow!("worker thread panicked"))?;
        for (valid, diag) in outcomes {
            total += 1;
            match diag {
                None if valid => {}
                None => {
                    failures += 1;
                    println!("   ❌ proof rejected");
                }
                Some(diag) => {
                    failures += 1;
                    println!("   ❌ {}", diag);
                }
            }
        }
    }

    println!("   Calls: {} in {:?}", total, start.elapsed());
    println!("   Live sessions: {}", zkbind_live_sessions());
    if failures > 0 {
        bail!("{} of {} calls failed", failures, total);
    }
    println!("\n✅ All proofs verified");
    Ok(())
}

fn cmd_sizes(log_rows: u32) -> Result<()> {
    let sizes = circuit_sizes(log_rows)?;
    println!("📐 Simple circuit at 2^{} rows", log_rows);
    println!("   Exact:    {}", sizes.exact);
    println!("   Total:    {}", sizes.total);
    println!("   Subgroup: {}", sizes.subgroup);
    Ok(())
}

fn diagnostic(ptr: *const std::ffi::c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        // SAFETY: non-null diagnostics are NUL-terminated and live until the next
        // call on this thread.
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}
