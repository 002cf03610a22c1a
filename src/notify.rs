//! Availability change feed for channel managers.
//!
//! Every committed ledger mutation publishes one [`InventoryChange`] holding
//! the post-commit state of each night it touched, so a subscriber can push
//! fresh availability without reading the ledger back.

use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{Channel, InventoryDay, ReservationToken, RoomTypeKey};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Opened,
    Reserved {
        token: ReservationToken,
        channel: Channel,
        quantity: i32,
    },
    Released {
        token: ReservationToken,
        channel: Channel,
        quantity: i32,
    },
    BucketsAdjusted,
    RestrictionsUpdated,
    ChannelAllocationSet {
        channel: Channel,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryChange {
    pub room_type: RoomTypeKey,
    pub cause: ChangeCause,
    /// Touched nights after the commit, ascending by date.
    pub days: Vec<InventoryDay>,
}

impl InventoryChange {
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.iter().map(|d| d.date)
    }

    /// Rooms `channel` may now sell on each touched night.
    pub fn channel_availability(&self, channel: Channel) -> Vec<(NaiveDate, i32)> {
        self.days
            .iter()
            .map(|d| (d.date, crate::channel::allocate(d, channel)))
            .collect()
    }
}

/// Per-room-type broadcast of committed changes. Senders whose last
/// subscriber has gone are pruned on the next publish.
#[derive(Default)]
pub struct NotifyHub {
    feeds: DashMap<RoomTypeKey, broadcast::Sender<Arc<InventoryChange>>>,
}

impl NotifyHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, room_type: RoomTypeKey) -> broadcast::Receiver<Arc<InventoryChange>> {
        self.feeds
            .entry(room_type)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn publish(&self, change: InventoryChange) {
        let room_type = change.room_type;
        let delivered = match self.feeds.get(&room_type) {
            Some(sender) => sender.send(Arc::new(change)).is_ok(),
            None => return,
        };
        if !delivered {
            self.feeds
                .remove_if(&room_type, |_, sender| sender.receiver_count() == 0);
        }
    }

    pub fn is_watched(&self, room_type: &RoomTypeKey) -> bool {
        self.feeds.contains_key(room_type)
    }
}
