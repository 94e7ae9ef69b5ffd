use std::path::PathBuf;

use clap::Parser;

use bridge_server::store::CorrelationStore;

#[derive(Parser, Debug)]
#[command(
    name = "dump_store",
    about = "List every correlation recorded by the bridge"
)]
struct Args {
    /// Path of the correlation store snapshot.
    #[arg(long, default_value = "./correlations.bin")]
    store: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let store = CorrelationStore::open(&args.store)?;

    for (message_id, issue_number) in store.list_all() {
        println!("{message_id} -> issue #{issue_number}");
    }
    println!("{} correlation(s) in {}", store.len(), args.store.display());

    Ok(())
}
