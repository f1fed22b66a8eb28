use crate::models::{ActivityType, EstimatedBudget, SlotTime, TimelineItem};

/// Dining slots starting at or after this time are priced as dinner.
pub const DINNER_CUTOFF: SlotTime = SlotTime::from_hm(17, 0);

const LUNCH: (u32, u32) = (1_500, 3_000);
const DINNER: (u32, u32) = (4_000, 8_000);
const CAFE: (u32, u32) = (800, 1_500);
const ENTERTAINMENT: (u32, u32) = (2_000, 4_000);

/// Slot prices are per person; the plan is for two.
pub const PARTICIPANTS: u32 = 2;

fn slot_cost(item: &TimelineItem) -> (u32, u32) {
    match item.kind {
        ActivityType::Dining if item.time >= DINNER_CUTOFF => DINNER,
        ActivityType::Dining => LUNCH,
        ActivityType::Cafe => CAFE,
        ActivityType::Entertainment => ENTERTAINMENT,
        _ => (0, 0),
    }
}

pub fn estimate<'a>(timeline: impl IntoIterator<Item = &'a TimelineItem>) -> EstimatedBudget {
    let (min, max) = timeline
        .into_iter()
        .map(slot_cost)
        .fold((0, 0), |(lo, hi), (a, b)| (lo + a, hi + b));
    let (min, max) = (min * PARTICIPANTS, max * PARTICIPANTS);
    EstimatedBudget { min, max, display: format!("¥{}〜{}", group_thousands(min), group_thousands(max)) }
}

/// Formats with comma grouping every three digits, as yen amounts are shown in ja-JP.
pub fn group_thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
