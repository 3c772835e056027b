use std::{path::PathBuf, time::Duration};

use bytes::Bytes;
use clap::{Parser, Subcommand};
use hashkv::{
    client::{db_client::DbClientFactory, routed::RoutedClient},
    cmd::get::GetResponse,
    routing::{NodeSet, ROUTING_ALGORITHM},
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

#[derive(Debug, Parser)]
#[command(name = "hashkv-client")]
#[command(about = "hashkv client - routes every key to the node that owns it", long_about = None)]
struct Cli {
    /// json file with the ordered list of node addresses
    #[arg(long, default_value = "conf/directory.json")]
    directory: PathBuf,
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Store a key-value pair
    Put { key: String, value: String },
    /// Retrieve the value stored under a key
    Get { key: String },
    /// Delete a key
    Delete { key: String },
    /// Print the node that owns a key (no network calls)
    Route { key: String },
    /// List the nodes of the directory in routing order
    Nodes,
    /// Menu driven session
    Interactive,
}

type Client = RoutedClient<DbClientFactory>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let nodes = NodeSet::from_file(&args.directory).await?;
    let mut client = RoutedClient::new(
        nodes,
        DbClientFactory::new(Duration::from_millis(args.timeout_ms)),
    );

    match args.command {
        Commands::Put { key, value } => put(&mut client, key, value).await?,
        Commands::Get { key } => get(&mut client, key).await?,
        Commands::Delete { key } => delete(&mut client, key).await?,
        Commands::Route { key } => {
            let index = client.nodes().owner_index(key.as_bytes())?;
            let owner = client.owner(key.as_bytes())?;
            println!(
                "key '{}' is stored in node {} ({}) [{}]",
                key,
                index,
                String::from_utf8_lossy(&owner),
                ROUTING_ALGORITHM
            );
        }
        Commands::Nodes => {
            println!("{} nodes, routing: {}", client.nodes().len(), ROUTING_ALGORITHM);
            for (index, addr) in client.nodes().nodes().iter().enumerate() {
                println!("  node {}: {}", index, String::from_utf8_lossy(addr));
            }
        }
        Commands::Interactive => interactive(&mut client).await?,
    }

    Ok(())
}

async fn put(client: &mut Client, key: String, value: String) -> anyhow::Result<()> {
    let response = client.put(Bytes::from(key), Bytes::from(value)).await?;
    println!("{}", response.message);
    Ok(())
}

async fn get(client: &mut Client, key: String) -> anyhow::Result<()> {
    match client.get(Bytes::from(key)).await? {
        GetResponse::Found { value } => println!("{}", String::from_utf8_lossy(&value)),
        GetResponse::NotFound => println!("(not found)"),
    }
    Ok(())
}

async fn delete(client: &mut Client, key: String) -> anyhow::Result<()> {
    let response = client.delete(Bytes::from(key)).await?;
    println!("{}", response.message);
    Ok(())
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, text: &str) -> anyhow::Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?.map(|l| l.trim().to_string()))
}

async fn interactive(client: &mut Client) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!("\n--- Key-Value Store Menu ---");
        println!("1. Add a Key-Value Pair");
        println!("2. Retrieve a Value by Key");
        println!("3. Delete a Key");
        println!("4. Exit");

        let Some(choice) = prompt(&mut lines, "Enter your choice (1/2/3/4): ").await? else {
            return Ok(());
        };

        // errors are reported and the menu keeps going
        let res = match choice.as_str() {
            "1" => {
                let Some(key) = prompt(&mut lines, "Enter the key: ").await? else {
                    return Ok(());
                };
                let Some(value) = prompt(&mut lines, "Enter the value: ").await? else {
                    return Ok(());
                };
                put(client, key, value).await
            }
            "2" => {
                let Some(key) = prompt(&mut lines, "Enter the key to retrieve: ").await? else {
                    return Ok(());
                };
                get(client, key).await
            }
            "3" => {
                let Some(key) = prompt(&mut lines, "Enter the key to delete: ").await? else {
                    return Ok(());
                };
                delete(client, key).await
            }
            "4" => {
                println!("Exiting... Goodbye!");
                return Ok(());
            }
            _ => {
                println!("Invalid choice. Please try again.");
                Ok(())
            }
        };

        if let Err(err) = res {
            println!("error: {}", err);
        }
    }
}
