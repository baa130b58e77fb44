//! Cardwire CLI: run a chat client or the key directory server.

use std::io::Write;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cardwire::chat::config::DEFAULT_KEYSERVER_ADDR;
use cardwire::chat::transport::{MessageTransport, TcpConnection, TcpListener};
use cardwire::chat::{run_handshake, ChatConfig, ChatError, Role, Session, WireMessage};
use cardwire::crypto::knapsack;
use cardwire::directory::{KeyDirectory, KeyServer, RemoteDirectory};

/// Cardwire - encrypted chat from a deck of cards and a knapsack
///
/// A P2P chat demonstrator: knapsack-encrypted half-keys seed a
/// deck-of-cards stream cipher. Not production cryptography.
#[derive(Parser)]
#[command(name = "cardwire")]
#[command(version)]
#[command(about = "P2P encrypted chat demo over a knapsack key exchange and a deck stream cipher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the key directory server
    Keyserver {
        /// Address to listen on
        #[arg(long, default_value = DEFAULT_KEYSERVER_ADDR)]
        listen: String,
    },

    /// Chat with a peer
    Chat {
        /// Port to listen on; doubles as this client's id in the directory
        port: u16,

        /// Peer's port; when given, dial the peer instead of listening
        peer: Option<u16>,

        /// Key server address
        #[arg(long, default_value = DEFAULT_KEYSERVER_ADDR)]
        keyserver: String,

        /// Number of knapsack elements in the generated key
        #[arg(long, default_value_t = knapsack::DEFAULT_KEY_SIZE)]
        key_size: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Keyserver { listen } => run_keyserver(&listen).await,
        Commands::Chat {
            port,
            peer,
            keyserver,
            key_size,
        } => {
            let config = ChatConfig {
                keyserver_addr: keyserver,
                key_size,
            };
            run_chat(port, peer, config).await
        }
    }
}

async fn run_keyserver(listen: &str) -> Result<()> {
    let server = KeyServer::bind(listen)
        .await
        .context("failed to start key server")?;
    server.run().await.context("key server terminated")?;
    Ok(())
}

async fn run_chat(port: u16, peer: Option<u16>, config: ChatConfig) -> Result<()> {
    let mut rng = rand::thread_rng();

    let (private_key, public_key) =
        knapsack::generate_keys(config.key_size, &mut rng).context("key generation failed")?;
    info!(key_size = config.key_size, "key pair generated");

    let mut directory = RemoteDirectory::new(config.keyserver_addr.clone());
    directory
        .register(port, &public_key)
        .await
        .context("failed to register public key")?;
    info!(client_id = port, keyserver = %config.keyserver_addr, "public key registered");

    let (mut transport, role, peer_hint) = match peer {
        Some(peer_port) => {
            let conn = TcpConnection::connect(("127.0.0.1", peer_port))
                .await
                .context("failed to connect to peer")?;
            info!(peer = peer_port, "connected to peer");
            (conn, Role::Initiator, Some(peer_port))
        }
        None => {
            let listener = TcpListener::bind(("127.0.0.1", port))
                .await
                .context("failed to listen")?;
            info!(port, "listening for a peer");
            let conn = listener.accept().await.context("failed to accept peer")?;
            info!(peer = %conn.peer_addr().unwrap_or_default(), "peer connected");
            (conn, Role::Responder, None)
        }
    };

    let session = run_handshake(
        role,
        port,
        peer_hint,
        &private_key,
        &mut directory,
        &mut transport,
        &mut rng,
    )
    .await
    .context("handshake failed")?;

    message_loop(session, transport).await
}

/// Alternating message loop: the initiator speaks first, then turns swap.
///
/// Strict alternation keeps both decks advancing in the same order.
async fn message_loop<T: MessageTransport>(mut session: Session, mut transport: T) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut my_turn = session.role() == Role::Initiator;

    println!(
        "Session established with peer {}. Type 'exit' to leave.",
        session.peer_id()
    );

    loop {
        if my_turn {
            print!(">  you: ");
            std::io::stdout().flush()?;

            let line = match lines.next_line().await? {
                Some(line) => line,
                None => {
                    transport.send(&WireMessage::Close).await?;
                    break;
                }
            };
            if line == "exit" {
                transport.send(&WireMessage::Close).await?;
                break;
            }

            let payload = session.encrypt(line.as_bytes());
            transport.send(&WireMessage::Chat { payload }).await?;
        } else {
            match transport.receive().await {
                Ok(WireMessage::Chat { payload }) => {
                    let plaintext = session.decrypt(&payload);
                    println!("> peer: {}", String::from_utf8_lossy(&plaintext));
                }
                Ok(WireMessage::Close) | Err(ChatError::ConnectionClosed) => {
                    println!("peer left");
                    break;
                }
                Ok(other) => {
                    warn!(frame = other.kind(), "unexpected frame, closing");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }
        my_turn = !my_turn;
    }

    if let Err(e) = transport.close().await {
        warn!(error = %e, "close failed");
    }
    session.close();
    info!("session closed");
    Ok(())
}
