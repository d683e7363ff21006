//! Command line arguments.

use {clap::Parser, std::path::PathBuf};

#[derive(clap::Parser)]
#[command(name = "yasb", about = "Key management and image signing for yasb")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
pub enum Command {
    /// Dump the image header to stdout.
    Dump {
        /// The image file.
        #[clap(short, long)]
        input: PathBuf,
        /// Key file to check the signature against.
        #[clap(short, long)]
        key: Option<PathBuf>,
    },
    /// Generate a new signing key pair.
    Keygen {
        /// Path to write the key file to.
        #[clap(short, long)]
        output: PathBuf,
    },
    /// Print the public key of a key file as a C array.
    ShowKey {
        /// The key file.
        #[clap(short, long)]
        key: PathBuf,
    },
    /// Wrap a payload in a signed image.
    Sign {
        /// The raw payload to sign.
        #[clap(short, long)]
        input: PathBuf,
        /// The key file to sign with.
        #[clap(short, long)]
        key: PathBuf,
        /// Version to write in the header.
        #[clap(long)]
        image_version: u32,
        /// Path to write the signed image to.
        #[clap(short, long)]
        output: PathBuf,
    },
}

pub fn args<I, T>(args: I) -> Result<Command, Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args).map(|cli| cli.command).map_err(Error::Cli)
}

#[derive(Debug)]
pub enum Error {
    Cli(clap::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Cli(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}
