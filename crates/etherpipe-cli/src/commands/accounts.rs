//! `etherpipe accounts`: list the daemon's accounts as JSON.

use etherpipe_core::config::ClientConfig;
use etherpipe_ipc::ClientEvent;

use super::util::Session;

/// Run the `accounts` subcommand.
pub async fn run(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(config).await?;
    session.handle.get_accounts()?;

    let accounts = session
        .wait(|event| match event {
            ClientEvent::AccountsReady(accounts) => Some(accounts),
            _ => None,
        })
        .await?;
    session.close();

    println!("{}", serde_json::to_string_pretty(&accounts)?);
    Ok(())
}
