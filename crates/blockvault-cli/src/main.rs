use anyhow::Result;
use blockvault_storage::ChainStore;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "blockvault-cli")]
#[command(about = "CLI for the blockvault append-only chain")]
struct Cli {
    /// Data directory for the local store (local subcommands only)
    #[arg(long, default_value = "./data")]
    data_dir: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine and append a block to the local store
    AddBlock {
        /// Block payload
        #[arg(long)]
        data: String,
    },
    /// Print every block from the tip back to genesis
    PrintChain,
    /// Print the current tip hash
    Tip,
    /// Submit a payload to a running node over HTTP
    Submit {
        /// Node base URL (e.g. http://127.0.0.1:8080)
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        node: String,
        /// Block payload
        #[arg(long)]
        data: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::AddBlock { data } => {
            let store = ChainStore::open(&cli.data_dir)?;
            let block = store.append(data.into_bytes())?;
            println!("Block has been added: {}", hex::encode(block.hash));
        }
        Command::PrintChain => {
            let store = ChainStore::open(&cli.data_dir)?;
            for block in store.iter() {
                let block = block?;
                println!("Prev. hash: {}", hex::encode(&block.prev_hash));
                println!("Data: {}", String::from_utf8_lossy(&block.payload));
                println!("Hash: {}", hex::encode(block.hash));
                println!("PoW: {}", block.verify());
                println!();
            }
        }
        Command::Tip => {
            let store = ChainStore::open(&cli.data_dir)?;
            println!("{}", hex::encode(store.tip()));
        }
        Command::Submit { node, data } => {
            let client = reqwest::Client::new();
            let res = client
                .post(format!("{node}/chain/blocks"))
                .json(&serde_json::json!({ "payload": data }))
                .send()
                .await?;
            let status = res.status();
            let body = res.text().await?;
            println!("status: {status}");
            println!("{body}");
        }
    }
    Ok(())
}
