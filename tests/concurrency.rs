use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio_test::{assert_err, assert_ok};
use ulid::Ulid;

use roomyield::config::LedgerConfig;
use roomyield::ledger::{DayTemplate, Ledger};
use roomyield::model::{Channel, RoomTypeKey, StayRange};
use roomyield::BookingError;

fn d(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2027, month, day).unwrap()
}

/// Lock budget wide enough that heavy fan-out never degrades into `Contention`.
fn patient() -> LedgerConfig {
    LedgerConfig {
        lock_timeout: Duration::from_secs(5),
        lock_attempts: 5,
        lock_backoff: Duration::from_millis(5),
    }
}

async fn open(total: i32, from: NaiveDate, nights: u32) -> (Arc<Ledger>, RoomTypeKey) {
    let ledger = Arc::new(Ledger::in_memory(patient()));
    let rt = RoomTypeKey::new(Ulid::new(), Ulid::new());
    assert_ok!(ledger.open_range(rt, from, nights, &DayTemplate::new(total)).await);
    (ledger, rt)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn fifty_buyers_for_ten_rooms() {
    let (ledger, rt) = open(10, d(7, 15), 1).await;
    let night = StayRange::new(d(7, 15), d(7, 16));

    let mut handles = Vec::new();
    for i in 0..50 {
        let ledger = ledger.clone();
        let channel = if i % 2 == 0 { Channel::Direct } else { Channel::Ota };
        handles.push(tokio::spawn(async move {
            ledger.reserve_range(rt, night, channel, 1, None).await
        }));
    }

    let mut ok = 0;
    let mut sold_out = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => ok += 1,
            Err(BookingError::SoldOut { date }) => {
                assert_eq!(date, d(7, 15));
                sold_out += 1;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(ok, 10);
    assert_eq!(sold_out, 40);

    let day = assert_ok!(ledger.get_availability(rt, d(7, 15)).await);
    assert_eq!(day.available_rooms(), 0);
    assert_eq!(day.sold_rooms, 10);
    assert_eq!(ledger.active_reservations().await.unwrap(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn overlapping_ranges_stay_consistent() {
    let (ledger, rt) = open(12, d(9, 1), 10).await;

    // Staggered three-night stays so every night is contended by several ranges.
    let mut handles = Vec::new();
    for i in 0..60u64 {
        let ledger = ledger.clone();
        let check_in = d(9, 1) + chrono::Days::new(i % 8);
        let stay = StayRange::new(check_in, check_in + chrono::Days::new(3));
        handles.push(tokio::spawn(async move {
            ledger
                .reserve_range(rt, stay, Channel::Direct, 1, None)
                .await
                .map(|token| (token, stay))
        }));
    }

    let mut booked = Vec::new();
    for h in handles {
        match h.await.unwrap() {
            Ok(b) => booked.push(b),
            Err(BookingError::SoldOut { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert!(!booked.is_empty());

    let horizon = StayRange::new(d(9, 1), d(9, 11));
    for night in assert_ok!(ledger.get_range(rt, horizon).await) {
        let expected = booked
            .iter()
            .filter(|(_, stay)| stay.check_in <= night.date && night.date < stay.check_out)
            .count() as i32;
        assert_eq!(night.sold_rooms, expected, "night {}", night.date);
        assert!(night.invariant_holds());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn reserve_and_release_churn_returns_to_empty() {
    let (ledger, rt) = open(5, d(10, 1), 4).await;
    let stay = StayRange::new(d(10, 1), d(10, 5));

    let mut handles = Vec::new();
    for _ in 0..40 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            match ledger.reserve_range(rt, stay, Channel::Direct, 1, None).await {
                Ok(token) => {
                    tokio::task::yield_now().await;
                    assert!(ledger.release_range(token).await.unwrap());
                    true
                }
                Err(BookingError::SoldOut { .. }) => false,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }));
    }
    let mut reserved = 0;
    for h in handles {
        if h.await.unwrap() {
            reserved += 1;
        }
    }
    assert!(reserved >= 5);

    for night in assert_ok!(ledger.get_range(rt, stay).await) {
        assert_eq!(night.sold_rooms, 0);
        assert_eq!(night.available_rooms(), 5);
    }
    assert_eq!(ledger.active_reservations().await.unwrap(), 0);
}

#[tokio::test]
async fn sold_out_night_blocks_whole_stay() {
    let (ledger, rt) = open(3, d(11, 1), 3).await;
    assert_ok!(
        ledger
            .reserve_range(rt, StayRange::new(d(11, 2), d(11, 3)), Channel::Gds, 3, None)
            .await
    );

    let err = assert_err!(
        ledger
            .reserve_range(rt, StayRange::new(d(11, 1), d(11, 4)), Channel::Direct, 1, None)
            .await
    );
    assert_eq!(err, BookingError::SoldOut { date: d(11, 2) });
    assert_eq!(assert_ok!(ledger.get_availability(rt, d(11, 1)).await).sold_rooms, 0);
    assert_eq!(assert_ok!(ledger.get_availability(rt, d(11, 3)).await).sold_rooms, 0);
}
