/// Width of one slot. Fixed for the whole system.
pub const SLOT_MINUTES: i32 = 30;

/// Number of contiguous slots a service occupies: ceil(duration / 30),
/// never less than one.
pub fn slot_count(duration_minutes: i32) -> i32 {
    if duration_minutes <= SLOT_MINUTES {
        return 1;
    }
    (duration_minutes + SLOT_MINUTES - 1) / SLOT_MINUTES
}
