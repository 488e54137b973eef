//! snmp-lite: query SNMP agents from the command line.

use clap::{Parser, Subcommand};
use snmp_lite::cli::args::{CommonArgs, OutputArgs, TypeSpec, WalkArgs, parse_oid};
use snmp_lite::{CancellationToken, Client, Error, VarBind};
use std::process::ExitCode;
use std::time::Instant;

#[derive(Debug, Parser)]
#[command(name = "snmp-lite", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Retrieve one or more OID values.
    Get {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// OIDs to retrieve, in dotted notation.
        #[arg(required = true, value_name = "OID")]
        oids: Vec<String>,
    },

    /// Set one OID value.
    Set {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// OID to set.
        #[arg(value_name = "OID")]
        oid: String,

        /// Value type: i, u, s, x, o, a, t, c, C.
        #[arg(value_name = "TYPE")]
        kind: TypeSpec,

        /// Value to set.
        #[arg(value_name = "VALUE", allow_hyphen_values = true)]
        value: String,
    },

    /// Walk the subtree under an OID.
    Walk {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        walk: WalkArgs,

        /// Subtree root (default: 1.3.6.1.2.1).
        #[arg(value_name = "OID", default_value = "1.3.6.1.2.1")]
        oid: String,
    },
}

impl Command {
    fn output(&self) -> &OutputArgs {
        match self {
            Command::Get { output, .. }
            | Command::Set { output, .. }
            | Command::Walk { output, .. } => output,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = cli.command.output();
    output.init_tracing();

    let start = Instant::now();
    let result = run(&cli.command).await;
    if output.timing {
        eprintln!("elapsed: {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

async fn connect(common: &CommonArgs, walk: Option<&WalkArgs>) -> Result<Client, String> {
    let mut builder = Client::builder(common.target_addr(), common.auth())
        .timeout(common.timeout_duration()?)
        .retry(common.retry_config());
    if let Some(walk) = walk {
        builder = builder
            .walk_mode(walk.walk_mode())
            .max_repetitions(walk.max_repetitions);
        if let Some(limit) = walk.max_results {
            builder = builder.max_walk_results(limit);
        }
    }
    builder.connect().await.map_err(|e| e.to_string())
}

fn print(output: &OutputArgs, vb: &VarBind) {
    println!("{}", output.format_varbind(vb));
}

async fn run(command: &Command) -> Result<(), String> {
    match command {
        Command::Get {
            common,
            output,
            oids,
        } => {
            let oids = oids
                .iter()
                .map(|s| parse_oid(s))
                .collect::<Result<Vec<_>, _>>()?;
            let client = connect(common, None).await?;
            let varbinds = client.get_many(&oids).await.map_err(|e| e.to_string())?;
            for vb in &varbinds {
                print(output, vb);
            }
            Ok(())
        }
        Command::Set {
            common,
            output,
            oid,
            kind,
            value,
        } => {
            let varbind = VarBind::new(parse_oid(oid)?, kind.parse_value(value)?);
            let client = connect(common, None).await?;
            let vb = client.set(varbind).await.map_err(|e| e.to_string())?;
            print(output, &vb);
            Ok(())
        }
        Command::Walk {
            common,
            output,
            walk,
            oid,
        } => {
            let root = parse_oid(oid)?;
            let client = connect(common, Some(walk)).await?;

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let mut count = 0usize;
            let result = client
                .walk_with_cancel(&root, &cancel, |vb| {
                    print(output, &vb);
                    count += 1;
                    Ok::<_, Error>(())
                })
                .await;
            tracing::debug!(target: "snmp_lite::cli", { count, bulk = ?client.bulk_support() }, "walk finished");
            match result {
                Err(Error::Cancelled) => Err(format!("interrupted after {} results", count)),
                other => other.map_err(|e| e.to_string()),
            }
        }
    }
}
