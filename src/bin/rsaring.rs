//! `rsaring`: the CLI facade over the ring-signature core.
//!
//! Thin boundary only: parses arguments, loads PEM key material from disk,
//! prompts for a password when one wasn't given on the command line, and
//! hands bytes to [`rsaring::ring::Ring`] / [`rsaring::codec`]. All of the
//! interesting math lives in the library crate.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use num_bigint::BigUint;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rsaring::key::{generate_keypair_pem, RsaPrivateKey, RsaPublicKey};
use rsaring::ring::Ring;
use rsaring::{codec, Error};

#[derive(Parser)]
#[command(name = "rsaring")]
#[command(about = "RSA ring signatures (Rivest-Shamir-Tauman, Asiacrypt 2001)")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a message as one member of a ring
    Sign {
        /// PEM file containing the ring's public keys, in ring order
        #[arg(long)]
        ring: PathBuf,

        /// Index of the signer within `--ring`
        #[arg(long)]
        index: usize,

        /// PEM file containing the signer's private key
        #[arg(long)]
        key: PathBuf,

        /// Message to sign
        #[arg(long, conflicts_with = "message_file")]
        message: Option<String>,

        /// Read the message to sign from a file instead of `--message`
        #[arg(long = "message-file", conflicts_with = "message")]
        message_file: Option<PathBuf>,

        /// Where to write the signature file
        #[arg(long)]
        out: PathBuf,

        /// Password for an encrypted private key (prompted interactively if omitted
        /// and the key is encrypted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Verify a ring signature
    Verify {
        /// Signature file produced by `sign`
        #[arg(long)]
        signature: PathBuf,

        /// Message that was supposedly signed
        #[arg(long, conflicts_with = "message_file")]
        message: Option<String>,

        /// Read the message from a file instead of `--message`
        #[arg(long = "message-file", conflicts_with = "message")]
        message_file: Option<PathBuf>,
    },

    /// Generate a test/demo RSA keypair
    ///
    /// Not part of the ring-signature protocol: RSA keypair generation is out
    /// of scope for the scheme itself. Provided so `sign`/`verify` can be
    /// exercised without an external `openssl` dependency.
    Keygen {
        /// Modulus size in bits
        #[arg(long, default_value_t = 2048)]
        bits: u32,

        /// Where to write the public key PEM
        #[arg(long = "out-public")]
        out_public: PathBuf,

        /// Where to write the private key PEM
        #[arg(long = "out-private")]
        out_private: PathBuf,

        /// Password to encrypt the private key with (left unencrypted if omitted)
        #[arg(long)]
        password: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let result = match cli.command {
        Commands::Sign {
            ring,
            index,
            key,
            message,
            message_file,
            out,
            password,
        } => sign(&ring, index, &key, message, message_file, &out, password),
        Commands::Verify {
            signature,
            message,
            message_file,
        } => {
            return match verify(&signature, message, message_file) {
                Ok(true) => {
                    println!("valid");
                    ExitCode::SUCCESS
                }
                Ok(false) => {
                    println!("invalid");
                    ExitCode::FAILURE
                }
                Err(err) => {
                    eprintln!("rsaring: {err}");
                    ExitCode::FAILURE
                }
            };
        }
        Commands::Keygen {
            bits,
            out_public,
            out_private,
            password,
        } => keygen(bits, &out_public, &out_private, password),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rsaring: {err}");
            ExitCode::FAILURE
        }
    }
}

fn resolve_message(message: Option<String>, message_file: Option<PathBuf>) -> Result<Vec<u8>, Error> {
    match (message, message_file) {
        (Some(m), None) => Ok(m.into_bytes()),
        (None, Some(path)) => Ok(fs::read(path)?),
        _ => Err(Error::InvalidArgument(
            "exactly one of --message or --message-file is required".to_string(),
        )),
    }
}

fn prompt_password(prompt: &str) -> std::io::Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    rpassword::read_password()
}

fn sign(
    ring_path: &Path,
    index: usize,
    key_path: &Path,
    message: Option<String>,
    message_file: Option<PathBuf>,
    out: &Path,
    password: Option<String>,
) -> Result<(), Error> {
    let message = resolve_message(message, message_file)?;

    let ring_pem = fs::read_to_string(ring_path)?;
    let keys = RsaPublicKey::load_ring_pem(&ring_pem)?;
    let ring = Ring::new(keys);

    let key_pem = fs::read_to_string(key_path)?;
    let is_encrypted = key_pem.contains("ENCRYPTED PRIVATE KEY");
    let password = match (password, is_encrypted) {
        (Some(pw), _) => Some(pw),
        (None, true) => Some(prompt_password("Private key password: ")?),
        (None, false) => None,
    };
    let sk = RsaPrivateKey::from_pem(&key_pem, password.as_deref())?;

    let sigma = ring.sign(&message, index, &sk)?;
    let encoded = codec::encode(&ring, &sigma)?;
    fs::write(out, encoded)?;

    println!("wrote signature to {}", out.display());
    Ok(())
}

fn verify(
    signature_path: &Path,
    message: Option<String>,
    message_file: Option<PathBuf>,
) -> Result<bool, Error> {
    let message = resolve_message(message, message_file)?;

    let contents = fs::read_to_string(signature_path)?;
    let (ring, sigma) = codec::parse(&contents)?;

    ring.verify(&message, &sigma)
}

fn keygen(
    bits: u32,
    out_public: &Path,
    out_private: &Path,
    password: Option<String>,
) -> Result<(), Error> {
    let e = BigUint::from(65537u32);
    let (_pk, _sk, public_pem, private_pem) = generate_keypair_pem(bits, &e, password.as_deref())?;

    fs::write(out_public, public_pem)?;
    fs::write(out_private, private_pem)?;

    println!(
        "wrote {}-bit keypair to {} / {}",
        bits,
        out_public.display(),
        out_private.display()
    );
    Ok(())
}
