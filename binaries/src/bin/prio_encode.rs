// SPDX-License-Identifier: MPL-2.0

use color_eyre::eyre::{eyre, Result, WrapErr};
use prio_encoder::{
    packet::ServerId,
    verify::{reconstruct_totals, Verifier},
    Client, MeasurementSet, MetricSchema, PrivateKey, PublicKey,
};
use std::{
    fs::{read_to_string, File},
    io::{stdin, stdout, Read, Write},
    path::{Path, PathBuf},
    str::FromStr,
};
use structopt::StructOpt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, StructOpt)]
#[structopt(rename_all = "kebab-case")]
enum Subcommand {
    /// Generate a server key pair. The base64 private key is written to the output, the hex
    /// public key to stderr.
    Keygen {
        /// Where to write the private key. Pass "-" for stdout.
        #[structopt(short, long, default_value = "-")]
        output: Output,
    },
    /// Encode measurements into a packet and print both ciphertexts as hex, separated by "$"
    Encode {
        /// Batch the measurements belong to
        #[structopt(long)]
        batch_id: String,
        /// Hex encoded public key of server A
        #[structopt(long)]
        public_key_a: String,
        /// Hex encoded public key of server B
        #[structopt(long)]
        public_key_b: String,
        /// Measurements as name=value pairs
        #[structopt(required = true)]
        measurements: Vec<Measurement>,
        /// Where to write the packet. Pass "-" for stdout.
        #[structopt(short, long, default_value = "-")]
        output: Output,
    },
    /// Decrypt and verify a packet produced by `encode`, and print the measurements as JSON
    Decrypt {
        /// Batch the packet is expected to belong to
        #[structopt(long)]
        batch_id: String,
        /// Path to a file containing the base64 encoded private key of server A
        #[structopt(long, value_name = "path")]
        server_a_private_key: PathBuf,
        /// Path to a file containing the base64 encoded private key of server B
        #[structopt(long, value_name = "path")]
        server_b_private_key: PathBuf,
        /// The packet as printed by `encode`. Pass "-" for stdin.
        #[structopt(short, long, default_value = "-")]
        input: Input,
    },
}

#[derive(Debug)]
struct Measurement {
    name: String,
    value: u64,
}

impl FromStr for Measurement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| format!("measurement {s:?} is not of the form name=value"))?;
        let value = value
            .parse()
            .map_err(|e| format!("measurement {name:?} has invalid value: {e}"))?;
        Ok(Self {
            name: name.to_string(),
            value,
        })
    }
}

#[derive(Debug)]
enum Input {
    /// Read input from the provided path
    Path(PathBuf),
    /// Read input from stdin
    Stdin,
}

impl FromStr for Input {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq("-") {
            return Ok(Self::Stdin);
        }

        Ok(Self::Path(PathBuf::from_str(s).map_err(|e| {
            format!("argument could not be parsed as path: {e:?}")
        })?))
    }
}

impl Input {
    fn contents(self) -> Result<String> {
        let mut reader = match self {
            Self::Path(path_buf) => {
                Box::new(File::open(path_buf).wrap_err("failed to open input path")?)
                    as Box<dyn Read>
            }
            Self::Stdin => Box::new(stdin()) as Box<dyn Read>,
        };
        let mut contents = String::new();
        reader
            .read_to_string(&mut contents)
            .wrap_err("failed to read to end of input")?;

        Ok(contents)
    }
}

#[derive(Debug)]
enum Output {
    /// Write output to the provided path
    Path(PathBuf),
    /// Write output to process stdout
    Stdout,
}

impl FromStr for Output {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq("-") {
            return Ok(Self::Stdout);
        }

        Ok(Self::Path(PathBuf::from_str(s).map_err(|e| {
            format!("argument could not be parsed as path: {e:?}")
        })?))
    }
}

impl Output {
    fn into_writer(self) -> Result<Box<dyn Write>> {
        match self {
            Self::Path(path_buf) => Ok(Box::new(
                File::create(path_buf).wrap_err("failed to open output path")?,
            ) as Box<dyn Write>),
            Self::Stdout => Ok(Box::new(stdout()) as Box<dyn Write>),
        }
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "prio-encode",
    about = "Encode, encrypt and verify Prio measurements",
    rename_all = "kebab-case",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Options {
    /// Path to a JSON schema listing the metrics in protocol order. Defaults to the three
    /// browser flags.
    #[structopt(long, value_name = "path")]
    schema: Option<PathBuf>,

    #[structopt(subcommand)]
    command: Subcommand,
}

fn load_schema(path: Option<PathBuf>) -> Result<MetricSchema> {
    let Some(path) = path else {
        return Ok(MetricSchema::browser_default());
    };
    let contents = read_to_string(&path).wrap_err("could not read schema file")?;
    serde_json::from_str(&contents).wrap_err("could not parse schema")
}

fn read_private_key(path: &Path) -> Result<PrivateKey> {
    PrivateKey::from_base64(
        read_to_string(path)
            .wrap_err("could not read private key from file")?
            .trim(),
    )
    .wrap_err("could not decode base64 private key")
}

fn keygen(output: Output) -> Result<()> {
    let private_key = PrivateKey::generate().wrap_err("could not generate key")?;
    writeln!(output.into_writer()?, "{}", private_key.to_base64())
        .wrap_err("could not write private key")?;
    eprintln!("{}", PublicKey::from(&private_key).to_hex());
    Ok(())
}

fn encode(
    schema: MetricSchema,
    batch_id: &str,
    public_key_a: &str,
    public_key_b: &str,
    measurements: Vec<Measurement>,
    output: Output,
) -> Result<()> {
    let public_key_a = PublicKey::from_hex(public_key_a).wrap_err("bad public key for A")?;
    let public_key_b = PublicKey::from_hex(public_key_b).wrap_err("bad public key for B")?;
    let client =
        Client::new(schema, public_key_a, public_key_b).wrap_err("could not create client")?;

    let measurements: MeasurementSet = measurements
        .into_iter()
        .map(|m| (m.name, m.value))
        .collect();
    let packet = client
        .encode(batch_id.as_bytes(), &measurements)
        .wrap_err("could not encode measurements")?;
    info!(
        batch_id,
        a = packet.a().len(),
        b = packet.b().len(),
        "encoded packet"
    );

    writeln!(
        output.into_writer()?,
        "{}${}",
        hex::encode(packet.a()),
        hex::encode(packet.b())
    )
    .wrap_err("could not write packet")
}

fn decrypt(
    schema: MetricSchema,
    batch_id: &str,
    private_key_a: PrivateKey,
    private_key_b: PrivateKey,
    input: Input,
) -> Result<()> {
    let contents = input.contents()?;
    let (a, b) = contents
        .trim()
        .split_once('$')
        .ok_or_else(|| eyre!("packet must be two hex strings separated by '$'"))?;
    let share_a = hex::decode(a).wrap_err("could not decode share for A")?;
    let share_b = hex::decode(b).wrap_err("could not decode share for B")?;

    let dimension = schema.dimension();
    let batch_id = batch_id.as_bytes();
    let mut server_a = Verifier::new(dimension, ServerId::A, private_key_a, batch_id);
    let mut server_b = Verifier::new(dimension, ServerId::B, private_key_b, batch_id);

    let bundle_a = server_a
        .decrypt(&share_a)
        .wrap_err("failed to decrypt share for A")?;
    let bundle_b = server_b
        .decrypt(&share_b)
        .wrap_err("failed to decrypt share for B")?;

    let eval_at = server_a
        .choose_eval_at()
        .wrap_err("could not choose evaluation point")?;
    let verification_a = server_a
        .generate_verification_message(eval_at, &bundle_a)
        .wrap_err("failed to verify share for A")?;
    let verification_b = server_b
        .generate_verification_message(eval_at, &bundle_b)
        .wrap_err("failed to verify share for B")?;

    if !server_a
        .aggregate(&bundle_a, &verification_a, &verification_b)
        .wrap_err("failed to verify input")?
    {
        return Err(eyre!("server A share proof validation failed"));
    }
    if !server_b
        .aggregate(&bundle_b, &verification_a, &verification_b)
        .wrap_err("failed to verify input")?
    {
        return Err(eyre!("server B share proof validation failed"));
    }
    debug!("proof accepted");

    let slots = reconstruct_totals(server_a.total_shares(), server_b.total_shares())
        .wrap_err("failed to reconstruct input shares")?;
    let measurements: MeasurementSet = schema
        .decode_sums(&slots)
        .wrap_err("failed to decode measurements")?
        .into_iter()
        .collect();

    let mut writer = stdout();
    serde_json::to_writer_pretty(&mut writer, &measurements)
        .wrap_err("could not write measurements")?;
    writeln!(writer).wrap_err("could not write measurements")
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let options = Options::from_args();
    let schema = load_schema(options.schema)?;

    match options.command {
        Subcommand::Keygen { output } => keygen(output),
        Subcommand::Encode {
            batch_id,
            public_key_a,
            public_key_b,
            measurements,
            output,
        } => encode(
            schema,
            &batch_id,
            &public_key_a,
            &public_key_b,
            measurements,
            output,
        ),
        Subcommand::Decrypt {
            batch_id,
            server_a_private_key,
            server_b_private_key,
            input,
        } => decrypt(
            schema,
            &batch_id,
            read_private_key(&server_a_private_key)?,
            read_private_key(&server_b_private_key)?,
            input,
        ),
    }
}
