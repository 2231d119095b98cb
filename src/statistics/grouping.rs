//! Calendar grouping of time indices

use crate::errors::{ClimaError, Result};
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// How time steps are grouped before reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// One group per calendar month, keys 1..=12
    Monthly,
    /// One group per meteorological season, keys 0..=3 (DJF, MAM, JJA, SON)
    Seasonal,
    /// A single group covering the whole record, key 0
    All,
}

impl Grouping {
    /// Number of groups this grouping produces
    #[must_use]
    pub const fn group_count(self) -> usize {
        match self {
            Self::Monthly => 12,
            Self::Seasonal => 4,
            Self::All => 1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Seasonal => "seasonal",
            Self::All => "all",
        }
    }
}

impl std::str::FromStr for Grouping {
    type Err = ClimaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "seasonal" | "seasonally" => Ok(Self::Seasonal),
            "all" | "all_time" => Ok(Self::All),
            other => Err(ClimaError::invalid(
                "grouping",
                format!("unknown grouping '{other}', expected monthly, seasonal or all"),
            )),
        }
    }
}

/// Meteorological season
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Djf,
    Mam,
    Jja,
    Son,
}

impl Season {
    pub const ALL: [Self; 4] = [Self::Djf, Self::Mam, Self::Jja, Self::Son];

    /// Calendar months (1..=12) belonging to the season
    #[must_use]
    pub const fn months(self) -> [u32; 3] {
        match self {
            Self::Djf => [12, 1, 2],
            Self::Mam => [3, 4, 5],
            Self::Jja => [6, 7, 8],
            Self::Son => [9, 10, 11],
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Djf => 0,
            Self::Mam => 1,
            Self::Jja => 2,
            Self::Son => 3,
        }
    }

    /// Season containing calendar month `month` (1..=12)
    #[must_use]
    pub const fn of_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Mam,
            6..=8 => Self::Jja,
            9..=11 => Self::Son,
            _ => Self::Djf,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Djf => "DJF",
            Self::Mam => "MAM",
            Self::Jja => "JJA",
            Self::Son => "SON",
        }
    }
}

/// Time indices sharing a group key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: usize,
    pub indices: Vec<usize>,
}

/// Partition time steps, given by their calendar month, into groups.
///
/// Every group of the grouping is returned, in key order, even when it holds
/// no time steps.
#[must_use]
pub fn group_indices(months: &[u32], grouping: Grouping) -> Vec<Group> {
    match grouping {
        Grouping::Monthly => (1..=12_u32)
            .map(|m| Group {
                key: m as usize,
                indices: positions(months, |month| month == m),
            })
            .collect(),
        Grouping::Seasonal => Season::ALL
            .iter()
            .map(|season| Group {
                key: season.index(),
                indices: positions(months, |month| season.months().contains(&month)),
            })
            .collect(),
        Grouping::All => vec![Group {
            key: 0,
            indices: (0..months.len()).collect(),
        }],
    }
}

fn positions(months: &[u32], keep: impl Fn(u32) -> bool) -> Vec<usize> {
    months
        .iter()
        .enumerate()
        .filter(|(_, &m)| keep(m))
        .map(|(i, _)| i)
        .collect()
}

/// Time indices of one calendar month of one year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearMonthGroup {
    pub year: i32,
    pub month: u32,
    pub indices: Vec<usize>,
}

/// Group time steps by (year, month), in chronological order.
///
/// The axis must be increasing, as [`TimeSeries3D`](crate::series::TimeSeries3D)
/// guarantees, so each step either extends the last group or opens a new one.
/// Only year-months that actually occur on the axis are returned.
#[must_use]
pub fn year_month_groups(time: &[NaiveDateTime]) -> Vec<YearMonthGroup> {
    let mut groups: Vec<YearMonthGroup> = Vec::new();
    for (i, t) in time.iter().enumerate() {
        let (year, month) = (t.year(), t.month());
        match groups.last_mut() {
            Some(group) if group.year == year && group.month == month => group.indices.push(i),
            _ => groups.push(YearMonthGroup {
                year,
                month,
                indices: vec![i],
            }),
        }
    }
    groups
}
