use crate::error::SessionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// region:    --- Bid Duration
/// 입찰 기간 (네 가지 고정 선택지)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BidDuration {
    #[serde(rename = "1hr")]
    OneHour,
    #[default]
    #[serde(rename = "4hrs")]
    FourHours,
    #[serde(rename = "12hrs")]
    TwelveHours,
    #[serde(rename = "24hrs")]
    TwentyFourHours,
}

impl BidDuration {
    pub const ALL: [BidDuration; 4] = [
        BidDuration::OneHour,
        BidDuration::FourHours,
        BidDuration::TwelveHours,
        BidDuration::TwentyFourHours,
    ];

    pub fn minutes(self) -> u64 {
        match self {
            BidDuration::OneHour => 60,
            BidDuration::FourHours => 240,
            BidDuration::TwelveHours => 720,
            BidDuration::TwentyFourHours => 1440,
        }
    }

    pub fn total_seconds(self) -> u64 {
        self.minutes() * 60
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BidDuration::OneHour => "1hr",
            BidDuration::FourHours => "4hrs",
            BidDuration::TwelveHours => "12hrs",
            BidDuration::TwentyFourHours => "24hrs",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BidDuration::OneHour => "1 Hour",
            BidDuration::FourHours => "4 Hours",
            BidDuration::TwelveHours => "12 Hours",
            BidDuration::TwentyFourHours => "24 Hours",
        }
    }

    pub fn is_popular(self) -> bool {
        self == BidDuration::FourHours
    }
}

impl fmt::Display for BidDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BidDuration {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BidDuration::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| SessionError::InvalidDuration(s.to_string()))
    }
}

/// 기간 선택지 (화면 표시용)
#[derive(Debug, Clone, Serialize)]
pub struct DurationOption {
    pub value: BidDuration,
    pub label: &'static str,
    pub minutes: u64,
    pub popular: bool,
}

impl From<BidDuration> for DurationOption {
    fn from(value: BidDuration) -> Self {
        Self {
            value,
            label: value.label(),
            minutes: value.minutes(),
            popular: value.is_popular(),
        }
    }
}
// endregion: --- Bid Duration

// region:    --- Bid
// 판매자 입찰 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: String,
    pub seller_id: String,
    pub seller_name: String,
    pub price: i64,
    pub delivery_time: String,
    pub freebies: Vec<String>,
    pub message: String,
    pub rating: f64,
    pub submitted_at: DateTime<Utc>,
}
// endregion: --- Bid

// region:    --- Phase
/// 세션 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    SelectingDuration,
    LiveBidding,
    Results,
}
// endregion: --- Phase

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_convert_to_exact_seconds() {
        let expected = [3600, 14400, 43200, 86400];
        for (duration, seconds) in BidDuration::ALL.into_iter().zip(expected) {
            assert_eq!(duration.total_seconds(), seconds);
        }
    }

    #[test]
    fn popular_duration_is_the_default() {
        assert!(BidDuration::default().is_popular());
        assert_eq!(
            BidDuration::ALL.iter().filter(|d| d.is_popular()).count(),
            1
        );
    }

    #[test]
    fn parses_wire_values_and_rejects_others() {
        assert_eq!("12hrs".parse::<BidDuration>(), Ok(BidDuration::TwelveHours));
        assert_eq!(
            "2hrs".parse::<BidDuration>(),
            Err(SessionError::InvalidDuration("2hrs".to_string()))
        );
        let json = serde_json::to_string(&BidDuration::OneHour).unwrap();
        assert_eq!(json, "\"1hr\"");
    }
}
