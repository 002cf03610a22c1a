use crate::error::{BookingError, Rule};
use crate::model::{Channel, InventoryDay, StayRange};

fn violation(rule: Rule, day: &InventoryDay) -> BookingError {
    BookingError::RestrictionViolation { rule, date: day.date }
}

/// Validate a candidate stay against the restrictions attached to its nights.
///
/// `nights` must hold exactly one snapshot per night of `stay`, in stay order.
/// Pure: nothing is mutated, and the first failing rule is returned.
pub fn evaluate(
    nights: &[InventoryDay],
    stay: &StayRange,
    channel: Channel,
) -> Result<(), BookingError> {
    let expected = stay.nights() as usize;
    if nights.len() != expected || !nights.iter().zip(stay.dates()).all(|(d, date)| d.date == date) {
        return Err(BookingError::Validation("restriction set does not cover the stay"));
    }
    let (Some(arrival), Some(last)) = (nights.first(), nights.last()) else {
        return Err(BookingError::Validation("stay has no nights"));
    };

    for night in nights {
        if night.restrictions.stop_sell {
            return Err(violation(Rule::StopSell, night));
        }
        if night
            .channel_restrictions
            .get(&channel)
            .is_some_and(|pool| pool.stop_sell)
        {
            return Err(violation(Rule::ChannelStopSell, night));
        }
    }

    if arrival.restrictions.closed_to_arrival {
        return Err(violation(Rule::ClosedToArrival, arrival));
    }
    if last.restrictions.closed_to_departure {
        return Err(violation(Rule::ClosedToDeparture, last));
    }

    let los = stay.nights();
    if los < arrival.restrictions.minimum_stay {
        return Err(violation(Rule::MinimumStay, arrival));
    }
    if let Some(max) = arrival.restrictions.maximum_stay
        && los > max
    {
        return Err(violation(Rule::MaximumStay, arrival));
    }
    Ok(())
}
