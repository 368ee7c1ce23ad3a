//! A thin manual-smoke-testing driver over [`nfs_client_mamont::Client`] -
//! a consumer of the library, not part of the protocol engine.

use std::net::IpAddr;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nfs_client_mamont::{Client, ClientOptions, NfsVersion};

#[derive(Parser)]
#[command(name = "nfs-client-cli", about = "Manual smoke-testing driver for nfs-client-mamont")]
struct Cli {
    /// NFS server address.
    #[arg(long)]
    server: IpAddr,

    /// Export path to mount (not needed for `mount-info`).
    #[arg(long)]
    export: Option<String>,

    /// Wire version to speak.
    #[arg(long, value_enum, default_value = "v3")]
    version: Version,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, clap::ValueEnum)]
enum Version {
    V2,
    V3,
    V4,
}

impl From<Version> for NfsVersion {
    fn from(v: Version) -> Self {
        match v {
            Version::V2 => NfsVersion::V2,
            Version::V3 => NfsVersion::V3,
            Version::V4 => NfsVersion::V4_1,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Lists a directory's entries.
    Ls {
        /// Path to list, relative to the export root.
        #[arg(default_value = "/")]
        path: String,
    },
    /// Reads a file and writes its contents to stdout.
    Cat {
        /// Path of the file to read.
        path: String,
    },
    /// Writes stdin to a file, creating it if necessary.
    Put {
        /// Path of the file to write.
        path: String,
    },
    /// Connects (skipping mount) and prints the exports the server offers.
    MountInfo,
}

async fn run(cli: Cli) -> Result<(), nfs_client_mamont::NfsError> {
    let mut client = Client::new(cli.version.into());
    client.connect(cli.server, ClientOptions::default()).await?;

    if let Command::MountInfo = cli.command {
        let exports = client.list_exports().await?;
        for export in exports {
            println!("{export}");
        }
        client.disconnect().await?;
        return Ok(());
    }

    let export = cli.export.as_deref().unwrap_or("/");
    client.mount(export).await?;

    match cli.command {
        Command::Ls { path } => {
            for name in client.list_dir(&path, false).await? {
                println!("{name}");
            }
        }
        Command::Cat { path } => {
            let attrs = client
                .get_attributes(&path, true)
                .await?
                .expect("must_exist=true never yields None");
            let mut buf = vec![0u8; attrs.size as usize];
            let n = client.read(&path, 0, attrs.size, &mut buf).await?;
            use std::io::Write;
            std::io::stdout().write_all(&buf[..n]).expect("writing to stdout");
        }
        Command::Put { path } => {
            use std::io::Read;
            let mut data = Vec::new();
            std::io::stdin().read_to_end(&mut data).expect("reading stdin");
            if !client.exists(&path).await? {
                client.create_file(&path, 0o644).await?;
            }
            let n = client.write(&path, 0, &data).await?;
            eprintln!("wrote {n} bytes to {path}");
        }
        Command::MountInfo => unreachable!("handled above"),
    }

    client.disconnect().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
