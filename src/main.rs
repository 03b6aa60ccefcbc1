//! `fwup-rs` command-line frontend: maps `create`/`apply`/`verify`
//! subcommands onto the archive creator, the task/requirement application
//! loop, and a signature-only check, respectively. This is the only layer
//! allowed to print directly to the user-facing stream outside of the
//! progress reporter's own output; everything else logs through `tracing`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ed25519_dalek::{SigningKey, VerifyingKey};
use tracing_subscriber::EnvFilter;

use fwup::archive::hash::HashCapability;
use fwup::config::{ConfigSource, JsonConfigSource};
use fwup::error;
use fwup::progress::ProgressMode;

#[derive(Parser)]
#[command(name = "fwup-rs", about = "Firmware update packager and applier for embedded Linux devices")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Progress reporting discipline.
    #[arg(long, global = true, default_value = "normal")]
    progress: ProgressMode,

    /// Suppress progress output (equivalent to `--progress off`).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Raise the log level; repeat for more detail.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Build a signed firmware archive from a declarative configuration.
    Create {
        #[arg(short = 'c', long = "config")]
        config: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        /// Path to a raw 32-byte ed25519 signing key seed.
        #[arg(long)]
        sign: Option<PathBuf>,
    },
    /// Apply a firmware archive to a target block device.
    Apply {
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        #[arg(short = 'd', long = "device")]
        device: PathBuf,
        /// Path to a raw 32-byte ed25519 public key, required if the archive
        /// is signed.
        #[arg(long)]
        public_key: Option<PathBuf>,
    },
    /// Check an archive's signature without applying it.
    Verify {
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        #[arg(long)]
        public_key: Option<PathBuf>,
    },
}

fn load_signing_key(path: &Path) -> Result<SigningKey, fwup::Error> {
    let bytes = std::fs::read(path).map_err(fwup::Error::from)?;
    let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| error::Error::MalformedSignature)?;
    Ok(SigningKey::from_bytes(&seed))
}

fn load_verifying_key(path: &Path) -> Result<VerifyingKey, fwup::Error> {
    let bytes = std::fs::read(path).map_err(fwup::Error::from)?;
    let array: [u8; 32] = bytes.as_slice().try_into().map_err(|_| error::Error::MalformedSignature)?;
    VerifyingKey::from_bytes(&array).map_err(|source| error::Error::BadSigningKey { source })
}

fn effective_progress(cli: &Cli) -> ProgressMode {
    if cli.quiet {
        ProgressMode::Off
    } else {
        cli.progress
    }
}

fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "fwup=info",
        1 => "fwup=debug",
        _ => "fwup=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run(cli: &Cli) -> Result<(), fwup::Error> {
    let progress_mode = effective_progress(cli);

    match &cli.command {
        Command::Create { config, output, sign } => {
            let source = JsonConfigSource;
            let mut meta_config = source.load(config)?;

            let signing_key = sign.as_deref().map(load_signing_key).transpose()?;
            let capability = HashCapability { blake2b: signing_key.is_some() };

            fwup::archive::create(&mut meta_config, output, signing_key.as_ref(), capability, progress_mode)
        }
        Command::Apply { input, device, public_key } => {
            let verifying_key = public_key.as_deref().map(load_verifying_key).transpose()?;
            fwup::apply::apply(input, device, verifying_key.as_ref(), progress_mode)
        }
        Command::Verify { input, public_key } => {
            let verifying_key = public_key.as_deref().map(load_verifying_key).transpose()?;
            fwup::apply::verify(input, verifying_key.as_ref()).map(|_| ())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = error::last_error().unwrap_or_else(|| err.to_string());
            eprintln!("fwup-rs: {message}");
            ExitCode::FAILURE
        }
    }
}
