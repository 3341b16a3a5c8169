//! Weekly availability: day → set of time slots.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
    Night,
}

/// Days without slots are dropped, so `{}` means "no standing availability".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<Day, BTreeSet<TimeSlot>>")]
pub struct WeeklySchedule(BTreeMap<Day, BTreeSet<TimeSlot>>);

impl From<BTreeMap<Day, BTreeSet<TimeSlot>>> for WeeklySchedule {
    fn from(mut days: BTreeMap<Day, BTreeSet<TimeSlot>>) -> Self {
        days.retain(|_, slots| !slots.is_empty());
        WeeklySchedule(days)
    }
}

impl WeeklySchedule {
    pub fn slots(&self, day: Day) -> impl Iterator<Item = TimeSlot> + '_ {
        self.0.get(&day).into_iter().flatten().copied()
    }

    pub fn is_free(&self, day: Day, slot: TimeSlot) -> bool {
        self.0.get(&day).is_some_and(|slots| slots.contains(&slot))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_slots_collapse_and_empty_days_vanish() {
        let schedule: WeeklySchedule = serde_json::from_str(
            r#"{"saturday": ["morning", "morning", "evening"], "monday": []}"#,
        )
        .unwrap();
        assert_eq!(
            schedule.slots(Day::Saturday).collect::<Vec<_>>(),
            vec![TimeSlot::Morning, TimeSlot::Evening]
        );
        assert!(schedule.is_free(Day::Saturday, TimeSlot::Evening));
        assert!(!schedule.is_free(Day::Monday, TimeSlot::Morning));
        assert_eq!(
            serde_json::to_string(&schedule).unwrap(),
            r#"{"saturday":["morning","evening"]}"#
        );
    }

    #[test]
    fn unknown_day_is_rejected() {
        assert!(serde_json::from_str::<WeeklySchedule>(r#"{"funday": ["morning"]}"#).is_err());
    }
}
