use {
    colored::Colorize,
    std::{
        ffi::OsString,
        io::{Read, Write},
        path::Path,
    },
    yasb::{ImageHeader, ImageVerifier, Sha256Stream, SignatureCheck, VerificationResult},
};

mod args;


fn main() -> std::process::ExitCode {
    main_args(
        std::env::args_os(),
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )
    .into()
}

fn main_args<I, T>(args: I, stdout: impl Write, mut stderr: impl Write) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match run(args, stdout) {
        Ok(()) => ExitCode(0),
        Err(Error::Args(e)) => {
            // Clap already does the "error: {}" formatting.
            writeln!(stderr, "{e}").expect("write error to stderr");
            ExitCode(1)
        }
        Err(e) => {
            writeln!(stderr, "{} {e}", "error:".bold().red()).expect("write error to stderr");
            ExitCode(1)
        }
    }
}

fn run<I, T>(args: I, mut stdout: impl Write) -> Result<(), Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match args::args(args)? {
        args::Command::Dump { input, key } => {
            let mut input_buf = Vec::new();
            std::fs::File::open(input)
                .map_err(Error::OpenInputFile)?
                .read_to_end(&mut input_buf)
                .map_err(Error::ReadInputFile)?;
            match ImageHeader::parse(&input_buf) {
                Some(header) => {
                    writeln!(&mut stdout, "{:10} YASB", "magic".bold()).map_err(Error::Stdout)?;
                    writeln!(&mut stdout, "{:10} {}", "version".bold(), header.version())
                        .map_err(Error::Stdout)?;
                    writeln!(&mut stdout, "{:10} {}", "length".bold(), header.length())
                        .map_err(Error::Stdout)?;
                    writeln!(&mut stdout, "{:10} {}", "size".bold(), header.total_size())
                        .map_err(Error::Stdout)?;
                    writeln!(
                        &mut stdout,
                        "{:10} {}",
                        "signature".bold(),
                        hex::encode(header.signature_r),
                    )
                    .map_err(Error::Stdout)?;
                    writeln!(
                        &mut stdout,
                        "{} {}",
                        " ".repeat(10),
                        hex::encode(header.signature_s),
                    )
                    .map_err(Error::Stdout)?;
                    if let Some(key) = key {
                        let key = KeyFile::load(&key)?;
                        match verify(&input_buf, &key.public) {
                            VerificationResult::Valid(version) => {
                                writeln!(
                                    &mut stdout,
                                    "{:10} valid, version {version}",
                                    "check".bold(),
                                )
                                .map_err(Error::Stdout)?;
                            }
                            result => {
                                writeln!(
                                    &mut stdout,
                                    "{:10} {}",
                                    "check".bold(),
                                    format!("invalid: {result:?}").red(),
                                )
                                .map_err(Error::Stdout)?;
                            }
                        }
                    }
                }
                None => {
                    writeln!(&mut stdout, "{}", "no header found".bold()).map_err(Error::Stdout)?
                }
            }
        }
        args::Command::Keygen { output } => {
            // Rejection sample until the bytes are a valid scalar.
            let secret = loop {
                let bytes: [u8; 32] = rand::random();
                if let Ok(secret) = secp256k1::SecretKey::from_slice(&bytes) {
                    break secret;
                }
            };
            let secp = secp256k1::Secp256k1::new();
            let public = secret.public_key(&secp).serialize_uncompressed();

            let mut file = std::fs::File::create(&output).map_err(Error::CreateKeyFile)?;
            file.write_all(&secret.secret_bytes())
                .map_err(Error::WriteKeyFile)?;
            file.write_all(&public[1..]).map_err(Error::WriteKeyFile)?;

            writeln!(&mut stdout, "{:10} {}", "pubkey".bold(), hex::encode(&public[1..]))
                .map_err(Error::Stdout)?;
        }
        args::Command::ShowKey { key } => {
            let key = KeyFile::load(&key)?;
            writeln!(&mut stdout, "{}", "public verification key:".bold())
                .map_err(Error::Stdout)?;
            // One line per 16 bytes, ready for pasting into a C or
            // Rust array.
            for chunk in key.public.chunks(16) {
                let line = chunk
                    .iter()
                    .map(|b| format!("0x{b:02x}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(&mut stdout, "{line},").map_err(Error::Stdout)?;
            }
        }
        args::Command::Sign {
            input,
            key,
            image_version,
            output,
        } => {
            let key = KeyFile::load(&key)?;

            let mut payload = Vec::new();
            std::fs::File::open(input)
                .map_err(Error::OpenInputFile)?
                .read_to_end(&mut payload)
                .map_err(Error::ReadInputFile)?;

            let sha = Sha256Engine;
            let stream = Sha256Stream::new(&sha);
            let signer = Secp256k1Sign::new(key.secret);
            let mut image = vec![0u8; yasb::HEADER_SIZE + payload.len()];
            let written =
                ImageHeader::sign_to(&payload, image_version, &mut image, &stream, &signer)?;
            image.truncate(written);

            std::fs::File::create(&output)
                .map_err(Error::CreateOutputFile)?
                .write_all(&image)
                .map_err(Error::WriteOutputFile)?;

            // Sanity check that the output file verifies. If not, it's
            // possible the file was being used by another process.
            let mut output_buf = Vec::new();
            std::fs::File::open(&output)
                .map_err(Error::OpenOutputFile)?
                .read_to_end(&mut output_buf)
                .map_err(Error::ReadOutputFile)?;
            match verify(&output_buf, &key.public) {
                VerificationResult::Valid(version) if version == image_version => {}
                result => return Err(Error::VerifyOutputFile(result)),
            }

            writeln!(
                &mut stdout,
                "signed {written} bytes as image version {image_version}",
            )
            .map_err(Error::Stdout)?;
        }
    }
    Ok(())
}

fn verify(image: &[u8], public_key: &[u8; 64]) -> VerificationResult {
    let sha = Sha256Engine;
    let ecdsa = Secp256k1Verify::default();
    ImageVerifier::new(&sha, &ecdsa, &yasb::SECP256K1, public_key).verify(image)
}

/// Key file layout: 32 byte secret key followed by the 64 byte
/// uncompressed public key, all big endian.
struct KeyFile {
    secret: secp256k1::SecretKey,
    public: [u8; 64],
}

impl KeyFile {
    const SIZE: usize = 96;

    fn load(path: &Path) -> Result<Self, Error> {
        let buf = std::fs::read(path).map_err(Error::ReadKeyFile)?;
        if buf.len() != Self::SIZE {
            return Err(Error::InvalidKeyFile);
        }
        let secret = secp256k1::SecretKey::from_slice(&buf[..32])
            .map_err(|_| Error::InvalidKeyFile)?;

        // Check the stored public key against the secret key to catch
        // a corrupted or hand edited key file before signing with it.
        let secp = secp256k1::Secp256k1::new();
        let derived = secret.public_key(&secp).serialize_uncompressed();
        if derived[1..] != buf[32..] {
            return Err(Error::KeyMismatch);
        }

        let mut public = [0u8; 64];
        public.copy_from_slice(&buf[32..]);
        Ok(KeyFile { secret, public })
    }
}

#[derive(Debug)]
struct Secp256k1Sign {
    secp256k1: secp256k1::Secp256k1<secp256k1::All>,
    key: secp256k1::SecretKey,
}

impl Secp256k1Sign {
    fn new(key: secp256k1::SecretKey) -> Self {
        Self {
            secp256k1: secp256k1::Secp256k1::new(),
            key,
        }
    }
}

impl yasb::EcdsaSign for Secp256k1Sign {
    fn sign(&self, digest: &[u8; 32]) -> ([u8; 32], [u8; 32]) {
        let signature = self
            .secp256k1
            .sign_ecdsa(&secp256k1::Message::from_digest(*digest), &self.key)
            .serialize_compact();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&signature[..32]);
        s.copy_from_slice(&signature[32..]);
        (r, s)
    }
}

#[derive(Debug, Default)]
struct Secp256k1Verify(secp256k1::Secp256k1<secp256k1::All>);

impl yasb::EcdsaVerify for Secp256k1Verify {
    fn verify(
        &self,
        _curve: &yasb::CurveParams,
        public_key: &[u8; 64],
        digest: &[u8; 32],
        r: &[u8; 32],
        s: &[u8; 32],
    ) -> Result<SignatureCheck, yasb::MediumError> {
        let mut uncompressed = [0u8; 65];
        uncompressed[0] = 0x04;
        uncompressed[1..].copy_from_slice(public_key);
        let Ok(pubkey) = secp256k1::PublicKey::from_slice(&uncompressed) else {
            return Ok(SignatureCheck::Fail);
        };

        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(r);
        compact[32..].copy_from_slice(s);
        let Ok(signature) = secp256k1::ecdsa::Signature::from_compact(&compact) else {
            return Ok(SignatureCheck::Fail);
        };

        if self
            .0
            .verify_ecdsa(
                &secp256k1::Message::from_digest(*digest),
                &signature,
                &pubkey,
            )
            .is_ok()
        {
            Ok(SignatureCheck::Pass)
        } else {
            Ok(SignatureCheck::Fail)
        }
    }
}

#[derive(Debug, Default)]
struct Sha256Engine;

impl yasb::Sha256Compress for Sha256Engine {
    fn compress(
        &self,
        state: &mut [u8; yasb::DIGEST_SIZE],
        block: &[u8; yasb::BLOCK_SIZE],
    ) -> Result<(), yasb::MediumError> {
        let mut words = [0u32; 8];
        for (word, chunk) in words.iter_mut().zip(state.chunks_exact(4)) {
            *word = u32::from_be_bytes(chunk.try_into().expect("4 bytes"));
        }
        sha2::compress256(
            &mut words,
            core::slice::from_ref(sha2::digest::generic_array::GenericArray::from_slice(block)),
        );
        for (chunk, word) in state.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExitCode(u8);

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        code.0.into()
    }
}

#[derive(Debug)]
enum Error {
    Args(args::Error),
    CreateKeyFile(std::io::Error),
    CreateOutputFile(std::io::Error),
    InvalidKeyFile,
    KeyMismatch,
    OpenInputFile(std::io::Error),
    OpenOutputFile(std::io::Error),
    ReadInputFile(std::io::Error),
    ReadKeyFile(std::io::Error),
    ReadOutputFile(std::io::Error),
    Sign(yasb::SignError),
    Stdout(std::io::Error),
    VerifyOutputFile(VerificationResult),
    WriteKeyFile(std::io::Error),
    WriteOutputFile(std::io::Error),
}

impl From<args::Error> for Error {
    fn from(e: args::Error) -> Self {
        Error::Args(e)
    }
}

impl From<yasb::SignError> for Error {
    fn from(e: yasb::SignError) -> Self {
        Error::Sign(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Args(e) => write!(f, "{e}"),
            Error::CreateKeyFile(e) => write!(f, "failed to create key file: {e}"),
            Error::CreateOutputFile(e) => write!(f, "failed to create output file: {e}"),
            Error::InvalidKeyFile => write!(
                f,
                "key file is not a 96 byte secret and public key pair"
            ),
            Error::KeyMismatch => write!(f, "public key does not match secret key"),
            Error::OpenInputFile(e) => write!(f, "failed to open input file: {e}"),
            Error::OpenOutputFile(e) => write!(f, "failed to open output file: {e}"),
            Error::ReadInputFile(e) => write!(f, "failed to read input file: {e}"),
            Error::ReadKeyFile(e) => write!(f, "failed to read key file: {e}"),
            Error::ReadOutputFile(e) => write!(f, "failed to read output file: {e}"),
            Error::Sign(e) => write!(f, "{e}"),
            Error::Stdout(e) => write!(f, "failed to write to stdout: {e}"),
            Error::VerifyOutputFile(result) => write!(
                f,
                "output file failed verification after writing ({result:?}); \
                 is another process using it?"
            ),
            Error::WriteKeyFile(e) => write!(f, "failed to write key file: {e}"),
            Error::WriteOutputFile(e) => write!(f, "failed to write to output file: {e}"),
        }
    }
}

impl std::error::Error for Error {}
