//! RankPool CLI Client
//!
//! Command-line interface for interacting with a RankPool server.

use clap::{Parser, Subcommand};
use rankpool::network::Client;
use rankpool::{DeleteResult, Percentile, PoolError, PoolId};

/// RankPool CLI
#[derive(Parser, Debug)]
#[command(name = "rankpool-cli")]
#[command(about = "CLI for the RankPool percentile store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append values to a pool (created on first use)
    Add {
        /// Pool ID (positive integer)
        pool_id: u64,

        /// Values to append
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<f64>,
    },

    /// Query a percentile and the total count of a pool
    Query {
        /// Pool ID (positive integer)
        pool_id: u64,

        /// Percentile in (0, 100]
        percentile: f64,
    },

    /// Delete a pool
    Delete {
        /// Pool ID (positive integer)
        pool_id: u64,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(exit_code(&e));
    }
}

/// Exit status for a failed command: 2 when the pool is absent, 1 otherwise
fn exit_code(error: &PoolError) -> i32 {
    match error {
        PoolError::PoolNotFound(_) => 2,
        _ => 1,
    }
}

fn run(args: Args) -> Result<(), PoolError> {
    let mut client = Client::connect(&args.server)?;

    match args.command {
        Commands::Add { pool_id, values } => {
            let kind = client.add(PoolId::new(pool_id)?, &values)?;
            println!("{}", kind.as_str());
        }
        Commands::Query {
            pool_id,
            percentile,
        } => {
            let q = client.query(PoolId::new(pool_id)?, Percentile::new(percentile)?)?;
            println!("quantile={} total={}", q.quantile, q.total);
        }
        Commands::Delete { pool_id } => {
            let result = client.delete(PoolId::new(pool_id)?)?;
            println!("{}", result.as_str());
            if result == DeleteResult::NotFound {
                std::process::exit(2);
            }
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
    }

    Ok(())
}
