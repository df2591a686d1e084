//! Account management: `new-account`, `delete-account`, `unlock`.
//!
//! The `--index` value is passed through to the daemon call and echoed back
//! with its completion, so callers driving several operations can tell the
//! results apart.

use etherpipe_core::config::ClientConfig;
use etherpipe_ipc::ClientEvent;

use super::util::Session;

pub async fn create(
    config: ClientConfig,
    password: String,
    index: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(config).await?;
    session.handle.new_account(password, index)?;

    let address = session
        .wait(|event| match event {
            ClientEvent::NewAccountDone { address, .. } => Some(address),
            _ => None,
        })
        .await?;
    session.close();

    println!("✅ Created account {address}");
    Ok(())
}

pub async fn delete(
    config: ClientConfig,
    account: String,
    password: String,
    index: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(config).await?;
    session.handle.delete_account(account.as_str(), password, index)?;

    let deleted = session
        .wait(|event| match event {
            ClientEvent::DeleteAccountDone { result, .. } => Some(result),
            _ => None,
        })
        .await?;
    session.close();

    if !deleted {
        return Err(format!("daemon refused to delete {account}").into());
    }
    println!("✅ Deleted account {account}");
    Ok(())
}

pub async fn unlock(
    config: ClientConfig,
    account: String,
    password: String,
    duration: u64,
    index: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(config).await?;
    session
        .handle
        .unlock_account(account.as_str(), password, duration, index)?;

    let unlocked = session
        .wait(|event| match event {
            ClientEvent::UnlockAccountDone { result, .. } => Some(result),
            _ => None,
        })
        .await?;
    session.close();

    if !unlocked {
        return Err(format!("daemon refused to unlock {account}").into());
    }
    println!("🔓 Unlocked {account} for {duration}s");
    Ok(())
}
