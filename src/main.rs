use anyhow::Context;
use clap::{Parser, Subcommand};
use lambda_envelope::builder::{DEFAULT_THRESHOLD, DEFAULT_URL_TTL};
use lambda_envelope::{
    aws, BuilderConfig, RawInvocationResult, Response, ResponseBuilder, ResponseResolver,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;

#[derive(Parser)]
#[command(name = "lambda-envelope")]
#[command(about = "Encode and decode size-limited Lambda responses", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level
    #[arg(long, env = "ENVELOPE_LOG_LEVEL", default_value = "info")]
    log_level: log::Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a response on stdin and print the envelope to return from a function
    Encode {
        /// Bucket that oversized responses are uploaded to
        #[arg(long, env = "ENVELOPE_BUCKET")]
        bucket: String,

        /// Largest inline or gzip envelope in bytes
        #[arg(long, env = "ENVELOPE_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
        threshold: usize,

        /// Seconds a pre-signed url stays valid
        #[arg(long, env = "ENVELOPE_URL_TTL", default_value_t = DEFAULT_URL_TTL.as_secs())]
        url_ttl: u64,
    },
    /// Read an invocation result on stdin and print the decoded response
    Decode,
    /// Read a response on stdin and print its size on the wire
    Size,
}

async fn read_stdin() -> Result<String, anyhow::Error> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("reading stdin")?;
    Ok(input)
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    simple_logger::init_with_level(cli.log_level).context("initializing logging")?;

    let input = read_stdin().await?;

    match cli.command {
        Command::Encode {
            bucket,
            threshold,
            url_ttl,
        } => {
            let response: Response =
                serde_json::from_str(&input).context("parsing response from stdin")?;
            let config = BuilderConfig::new(bucket)
                .with_threshold(threshold)
                .with_url_ttl(Duration::from_secs(url_ttl));
            let store = aws::S3Store::new(aws::config().await);
            let envelope = ResponseBuilder::new(config, Arc::new(store))?
                .build(response)
                .await?;
            println!("{}", envelope);
        }
        Command::Decode => {
            let raw: RawInvocationResult =
                serde_json::from_str(&input).context("parsing invocation result from stdin")?;
            let response = ResponseResolver::default().from_raw_result(&raw).await?;
            println!("{}", response);
        }
        Command::Size => {
            let response: Response =
                serde_json::from_str(&input).context("parsing response from stdin")?;
            println!("{}", ResponseBuilder::byte_size(&response));
        }
    }

    Ok(())
}
