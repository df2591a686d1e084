//! Read-only chain queries: `block-number`, `peer-count`, `gas-price`.

use etherpipe_core::config::ClientConfig;
use etherpipe_ipc::{ClientEvent, ConnectionQuality, ConnectionState};

use super::util::Session;

pub async fn block_number(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(config).await?;
    session.handle.get_block_number()?;

    let number = session
        .wait(|event| match event {
            ClientEvent::BlockNumberDone(number) => Some(number),
            _ => None,
        })
        .await?;
    session.close();

    println!("{number}");
    Ok(())
}

/// Prints the peer count followed by the resulting connection quality.
pub async fn peer_count(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let tiers = config.peer_tiers;
    let mut session = Session::open(config).await?;
    session.handle.get_peer_count()?;

    let count = session
        .wait(|event| match event {
            ClientEvent::PeerCountChanged(count) => Some(count),
            _ => None,
        })
        .await?;
    session.close();

    let quality = ConnectionQuality::classify(ConnectionState::Connected, count, &tiers);
    println!("{count} ({quality})");
    Ok(())
}

pub async fn gas_price(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(config).await?;
    session.handle.get_gas_price()?;

    let price = session
        .wait(|event| match event {
            ClientEvent::GasPriceDone(price) => Some(price),
            _ => None,
        })
        .await?;
    session.close();

    println!("{price} ETH");
    Ok(())
}
