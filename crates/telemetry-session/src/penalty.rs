//! Penalty events to outbound records.

use lapsync_telemetry_packets::PenaltyEvent;
use lapsync_telemetry_sync::PenaltyRecord;

use crate::session::Session;

/// Build the record for a penalty event, bound to the session's current lap.
///
/// Only penalties against the player's car are recorded. The session is not
/// modified.
pub fn record_penalty(
    session: &Session,
    player_index: u8,
    event: &PenaltyEvent,
) -> Option<PenaltyRecord> {
    if event.vehicle_idx != player_index {
        return None;
    }
    Some(PenaltyRecord {
        session_uid: session.uid,
        session_remote_id: session.remote_id.clone(),
        active_lap: session.laps.current_lap_number(),
        penalty_type: event.penalty_type,
        infringement_type: event.infringement_type,
        vehicle_index: event.vehicle_idx,
        other_vehicle_index: event.other_vehicle_idx,
        time: event.time,
        lap_number: event.lap_num,
        places_gained: event.places_gained,
    })
}
