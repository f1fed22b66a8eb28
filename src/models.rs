use std::{fmt, str::FromStr};

use chrono::{NaiveTime, Timelike};
use serde::{de::{self, value::StrDeserializer, IntoDeserializer}, Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{serde_as, DefaultOnError, NoneAsEmptyString};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Duration {
    Short,
    Half,
    Full,
    Overnight,
    #[serde(other)]
    Unknown,
}

impl Duration {
    pub fn is_known(self) -> bool { self != Duration::Unknown }
}

impl FromStr for Duration {
    type Err = de::value::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let d: StrDeserializer<'_, Self::Err> = s.into_deserializer();
        Duration::deserialize(d)
    }
}

/// Activity category shared by request preferences and template classification.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Shopping,
    Sightseeing,
    Dining,
    Cafe,
    Entertainment,
    Nature,
    Night,
    #[serde(other)]
    #[default]
    Unknown,
}

impl Tag {
    pub fn is_known(self) -> bool { self != Tag::Unknown }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    First,
    Anniversary,
    Casual,
    Special,
    Proposal,
    #[serde(other)]
    Other,
}

impl FromStr for Purpose {
    type Err = de::value::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let d: StrDeserializer<'_, Self::Err> = s.into_deserializer();
        Purpose::deserialize(d)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Start,
    Move,
    Dining,
    Shopping,
    Sightseeing,
    Cafe,
    Entertainment,
    Nature,
    Night,
}

/// Wall-clock slot start, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(u16);

impl SlotTime {
    pub const fn from_hm(hour: u16, minute: u16) -> Self { SlotTime(hour * 60 + minute) }

    pub fn minutes(self) -> u16 { self.0 }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid slot time {0:?}, expected zero-padded HH:MM")]
pub struct SlotTimeError(String);

impl FromStr for SlotTime {
    type Err = SlotTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 5 {
            return Err(SlotTimeError(s.to_string()));
        }
        let t = NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| SlotTimeError(s.to_string()))?;
        Ok(SlotTime::from_hm(t.hour() as u16, t.minute() as u16))
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.minutes();
        write!(f, "{:02}:{:02}", m / 60, m % 60)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Area {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub station: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    pub time: SlotTime,
    pub activity: String,
    pub duration: u32, // minutes, 0 for meeting points
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub needs_restaurant: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlanTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration: Duration,
    pub tags: Vec<Tag>,
    pub areas: Vec<String>, // first entry is the main area
    pub timeline: Vec<TimelineItem>,
}

impl PlanTemplate {
    pub fn has_tag(&self, tag: Tag) -> bool { self.tags.contains(&tag) }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Genre { pub name: String }

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BudgetLabel { pub average: String }

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RestaurantUrls { pub pc: String }

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub address: String,
    pub genre: Genre,
    pub budget: BudgetLabel,
    pub access: String,
    pub urls: RestaurantUrls,
}

/// Body of `POST /api/plan/generate`.
///
/// Every field is optional and decoded leniently: a missing, `null`, empty
/// or mistyped value means "no filter". A tag entry that is not a string
/// becomes `Tag::Unknown`. Wizard-only fields (`departure`, `date`,
/// `budget`, `hasLicense`) are accepted and ignored.
#[serde_as]
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde_as(deserialize_as = "DefaultOnError<NoneAsEmptyString>")]
    #[serde(default)]
    pub duration: Option<Duration>,
    #[serde_as(deserialize_as = "DefaultOnError<Vec<DefaultOnError>>")]
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde_as(deserialize_as = "DefaultOnError<NoneAsEmptyString>")]
    #[serde(default)]
    pub purpose: Option<Purpose>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Weather {
    pub icon: String,
    pub description: String,
    pub temp: i32,
}

impl Weather {
    pub fn placeholder() -> Self {
        Weather { icon: "☀️".into(), description: "晴れ".into(), temp: 22 }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub total_time: u32,
    pub fare: u32,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RouteSection { pub line: String }

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Route {
    pub summary: RouteSummary,
    pub sections: Vec<RouteSection>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RouteInfo { pub routes: Vec<Route> }

impl RouteInfo {
    pub fn placeholder() -> Self {
        RouteInfo {
            routes: vec![Route {
                summary: RouteSummary { total_time: 30, fare: 500 },
                sections: vec![RouteSection { line: "JR線".into() }],
            }],
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct EstimatedBudget {
    pub min: u32,
    pub max: u32,
    pub display: String,
}

/// A timeline slot after enrichment.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlannedSlot {
    #[serde(flatten)]
    pub item: TimelineItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_restaurant: Option<Restaurant>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedPlan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration: Duration,
    pub tags: Vec<Tag>,
    pub areas: Vec<String>,
    pub timeline: Vec<PlannedSlot>,
    pub score: f64,
    pub weather: Weather,
    pub route_info: RouteInfo,
    pub estimated_budget: EstimatedBudget,
    pub main_area: String,
}
