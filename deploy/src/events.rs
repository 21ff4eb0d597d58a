//! Host side of the programs' log events.
//!
//! Every confirmed transaction's logs are decoded into `ChainEvent`s and
//! published on an `EventBus`. Listeners subscribe once, wait with a
//! deadline and unsubscribe when they are dropped.

use std::time::Duration;

use log::trace;
use raffle::events::{RaffleEvent, VrfEvent};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::DeployError;

const BUS_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainEvent {
    Raffle(RaffleEvent),
    Vrf(VrfEvent),
}

impl ChainEvent {
    pub fn from_log(line: &str) -> Option<Self> {
        RaffleEvent::from_log(line)
            .map(ChainEvent::Raffle)
            .or_else(|| VrfEvent::from_log(line).map(ChainEvent::Vrf))
    }

    /// Events in emission order; unrelated log lines are skipped.
    pub fn parse_logs<S: AsRef<str>>(logs: &[S]) -> Vec<Self> {
        logs.iter()
            .filter_map(|line| Self::from_log(line.as_ref()))
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChainEvent::Raffle(RaffleEvent::RaffleEnter { .. }) => "RaffleEnter",
            ChainEvent::Raffle(RaffleEvent::RequestedRaffleWinner { .. }) => "RequestedRaffleWinner",
            ChainEvent::Raffle(RaffleEvent::WinnerPicked { .. }) => "WinnerPicked",
            ChainEvent::Vrf(VrfEvent::SubscriptionCreated { .. }) => "SubscriptionCreated",
            ChainEvent::Vrf(VrfEvent::SubscriptionFunded { .. }) => "SubscriptionFunded",
            ChainEvent::Vrf(VrfEvent::ConsumerAdded { .. }) => "ConsumerAdded",
            ChainEvent::Vrf(VrfEvent::ConsumerRemoved { .. }) => "ConsumerRemoved",
            ChainEvent::Vrf(VrfEvent::RandomWordsRequested { .. }) => "RandomWordsRequested",
            ChainEvent::Vrf(VrfEvent::RandomWordsFulfilled { .. }) => "RandomWordsFulfilled",
        }
    }
}

/// Fan-out of decoded events to any number of one-shot listeners.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<ChainEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, events: &[ChainEvent]) {
        for event in events {
            trace!("event {}: {:?}", event.name(), event);
            // no listeners is fine
            let _ = self.sender.send(event.clone());
        }
    }

    /// Subscribes now, so events published before `wait` is polled are not missed.
    pub fn once(&self, name: &'static str) -> EventListener {
        EventListener {
            name,
            receiver: self.sender.subscribe(),
        }
    }

    /// Listeners currently subscribed.
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A single pending subscription; consumed by `wait`.
pub struct EventListener {
    name: &'static str,
    receiver: broadcast::Receiver<ChainEvent>,
}

impl EventListener {
    /// Resolves with the first event named `name`, or fails once `timeout` elapses.
    /// The subscription is released either way.
    pub async fn wait(mut self, timeout: Duration) -> Result<ChainEvent, DeployError> {
        let name = self.name;
        let next_match = async {
            loop {
                match self.receiver.recv().await {
                    Ok(event) if event.name() == name => return Ok(event),
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return Err(DeployError::EventStreamClosed),
                }
            }
        };
        tokio::time::timeout(timeout, next_match)
            .await
            .map_err(|_| DeployError::EventTimeout {
                event: name,
                timeout,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    #[tokio::test]
    async fn listener_skips_other_events() {
        let bus = EventBus::new();
        let listener = bus.once("WinnerPicked");
        let winner = Pubkey::new_unique();
        bus.publish(&[
            ChainEvent::Raffle(RaffleEvent::RaffleEnter { player: winner }),
            ChainEvent::Raffle(RaffleEvent::WinnerPicked { winner }),
        ]);
        let event = listener.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(event, ChainEvent::Raffle(RaffleEvent::WinnerPicked { winner }));
        assert_eq!(bus.listener_count(), 0);
    }

    #[tokio::test]
    async fn missing_event_times_out_and_unsubscribes() {
        let bus = EventBus::new();
        let listener = bus.once("WinnerPicked");
        assert_eq!(bus.listener_count(), 1);
        let err = listener.wait(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, DeployError::EventTimeout { event: "WinnerPicked", .. }));
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn unrelated_log_lines_are_ignored() {
        let logs = ["Program log: Instruction: Enter Raffle", "Program 11111111111111111111111111111111 success"];
        assert!(ChainEvent::parse_logs(&logs).is_empty());
    }
}
