//! `etherpipe send`: send ether from an account the daemon has unlocked.

use etherpipe_core::config::ClientConfig;
use etherpipe_ipc::ClientEvent;

use super::util::Session;

/// Run the `send` subcommand.
pub async fn run(
    config: ClientConfig,
    from: String,
    to: String,
    value: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n=== Send Summary ===");
    println!("  From:   {from}");
    println!("  To:     {to}");
    println!("  Value:  {value} ETH");
    println!("  Socket: {}", config.socket_path.display());
    println!("====================\n");

    let mut session = Session::open(config).await?;
    session.handle.send_transaction(from, to, value)?;

    let hash = session
        .wait(|event| match event {
            ClientEvent::SendTransactionDone { hash } => Some(hash),
            _ => None,
        })
        .await?;
    session.close();

    println!("✅ Transaction sent! Hash: {hash}");
    Ok(())
}
