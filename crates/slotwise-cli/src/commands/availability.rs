//! `slotwise availability`.

use std::fmt::Write as _;

use slotwise_engine::{Availability, Engine};

use super::format_span;
use crate::cli::RangeArgs;
use crate::error::CliResult;

pub async fn run(engine: &Engine, range: &RangeArgs, json: bool) -> CliResult<()> {
    let window = range.window()?;
    let availability = engine
        .resolver
        .resolve(&range.resource, window, range.external)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&availability)?);
    } else {
        print!("{}", render(&availability));
    }
    Ok(())
}

/// Available slots first, then conflicting slots with what blocks them.
pub fn render(availability: &Availability) -> String {
    let mut out = format!(
        "{}: {} available, {} conflicting\n",
        availability.resource_id,
        availability.available.len(),
        availability.conflicting.len()
    );
    for slot in &availability.available {
        let _ = write!(out, "  free     {}", format_span(slot.start, slot.end));
        for note in &slot.schedules {
            let _ = write!(out, " [{}]", note.title);
        }
        out.push('\n');
    }
    for conflicting in &availability.conflicting {
        let titles: Vec<_> = conflicting.conflicts.iter().map(|c| c.title()).collect();
        let _ = writeln!(
            out,
            "  conflict {}  {}",
            format_span(conflicting.slot.start, conflicting.slot.end),
            titles.join(", ")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use slotwise_core::{ReservationStatus, TimeWindow};
    use slotwise_engine::{ConflictSource, ConflictingSlot, Slot};

    fn slot(hour: u32) -> Slot {
        let start = Utc.with_ymd_and_hms(2025, 3, 3, hour, 0, 0).unwrap();
        Slot {
            start,
            end: start + chrono::Duration::hours(1),
            window_id: "hours".into(),
            schedules: Vec::new(),
        }
    }

    #[test]
    fn renders_both_partitions() {
        let range = TimeWindow::new(slot(9).start, slot(10).end).unwrap();
        let availability = Availability {
            resource_id: "room-1".into(),
            range,
            available: vec![slot(9)],
            conflicting: vec![ConflictingSlot {
                slot: slot(10),
                conflicts: vec![ConflictSource::Reservation {
                    reservation_id: "r1".into(),
                    title: "Lab meeting".into(),
                    status: ReservationStatus::Approved,
                }],
            }],
        };
        assert_eq!(
            render(&availability),
            "room-1: 1 available, 1 conflicting\n\
             \x20 free     2025-03-03 09:00-10:00\n\
             \x20 conflict 2025-03-03 10:00-11:00  Lab meeting\n"
        );
    }
}
