//! Pure domain rules: no I/O, unit tested in place.

pub mod roles;
pub mod schedule;
pub mod squad;
pub mod status;
pub mod validate;

use uuid::Uuid;

/// Two-party threads store participants smaller-id first so each pair has one row.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
