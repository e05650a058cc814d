//! ldap-collect-support-data: stream a server's support-data archive to a
//! local file.
//!
//! Part of the async-ldap CLI utilities.

use async_ldap::extop::collect_support_data::{CollectSupportDataRequest, SecurityLevel};
use async_ldap::Client;
use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Collect a support-data archive from a directory server.
#[derive(Debug, Parser)]
#[command(name = "ldap-collect-support-data", version, about)]
struct Args {
    /// Server address as host:port.
    #[arg(short = 'H', long, value_name = "HOST:PORT")]
    host: String,

    /// DN to bind as.
    #[arg(short = 'D', long, value_name = "DN")]
    bind_dn: Option<String>,

    /// Password for the bind DN.
    #[arg(short = 'w', long, value_name = "PASSWORD")]
    bind_password: Option<String>,

    /// Where to write the archive.
    #[arg(short, long, value_name = "PATH", default_value = "support-data.zip")]
    output: PathBuf,

    /// Include data that is expensive for the server to capture.
    #[arg(long)]
    include_expensive_data: bool,

    /// Include a replication state dump.
    #[arg(long)]
    include_replication_state_dump: bool,

    /// Include binary files.
    #[arg(long)]
    include_binary_files: bool,

    /// Secret-scrubbing level: none, obscure-secrets, or maximum.
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    security_level: String,

    /// Capture only logs from this duration before now (e.g. "10m").
    #[arg(long, value_name = "DURATION")]
    log_duration: Option<String>,

    /// Comment to embed in the archive.
    #[arg(long, value_name = "TEXT")]
    comment: Option<String>,

    /// Per-response timeout in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 300)]
    timeout: u64,

    /// Print tool output lines as they arrive.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_security_level(s: &str) -> Option<SecurityLevel> {
    match s {
        "none" => Some(SecurityLevel::None),
        "obscure-secrets" => Some(SecurityLevel::ObscureSecrets),
        "maximum" => Some(SecurityLevel::Maximum),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let security_level = match parse_security_level(&args.security_level) {
        Some(level) => level,
        None => {
            eprintln!(
                "Error: unknown security level {:?} (expected none, obscure-secrets, or maximum)",
                args.security_level
            );
            return ExitCode::FAILURE;
        }
    };

    let mut builder = Client::builder(&args.host).timeout(Duration::from_secs(args.timeout));
    if let (Some(dn), Some(password)) = (&args.bind_dn, &args.bind_password) {
        builder = builder.bind(dn.clone(), password.as_str());
    }

    let client = match builder.connect().await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: failed to connect to {}: {}", args.host, e);
            return ExitCode::FAILURE;
        }
    };

    let request = CollectSupportDataRequest {
        archive_file_name: args
            .output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
        include_expensive_data: args.include_expensive_data,
        include_replication_state_dump: args.include_replication_state_dump,
        include_binary_files: args.include_binary_files,
        security_level,
        log_duration: args.log_duration.clone(),
        comment: args.comment.clone(),
        ..Default::default()
    };

    let mut file = match File::create(&args.output) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: cannot create {}: {}", args.output.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = client
        .collect_support_data(&request, |fragment| file.write_all(fragment))
        .await;

    client.unbind().await;

    match outcome {
        Ok(result) => {
            if args.verbose {
                for line in &result.output_messages {
                    eprintln!("[{}] {}", line.stream, line.message);
                }
            }
            println!(
                "{}: {} bytes in {} fragments",
                args.output.display(),
                result.archive_bytes_received,
                result.fragments_received
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
