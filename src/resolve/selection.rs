//! Active lane/platform selection
//!
//! Both names come from the environment at query time. An empty lane means
//! no lane; an empty or whitespace-only platform means no platform. Names are
//! otherwise kept verbatim and matched case-sensitively.

use std::env;

use serde::Serialize;

/// Environment variable holding the active lane
pub const LANE_ENV: &str = "ACTIVE_LANE";

/// Environment variable holding the active platform
pub const PLATFORM_ENV: &str = "ACTIVE_PLATFORM";

/// The lane and platform a query resolves for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    #[serde(skip_serializing_if = "Option::is_none")]
    lane: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    platform: Option<String>,
}

impl Selection {
    pub fn new(lane: Option<&str>, platform: Option<&str>) -> Self {
        Self {
            lane: lane.filter(|l| !l.is_empty()).map(str::to_string),
            platform: platform
                .filter(|p| !p.trim().is_empty())
                .map(str::to_string),
        }
    }

    /// No lane, no platform: defaults only
    pub fn none() -> Self {
        Self::default()
    }

    /// Read `ACTIVE_LANE` / `ACTIVE_PLATFORM`
    pub fn from_env() -> Self {
        let lane = env::var(LANE_ENV).ok();
        let platform = env::var(PLATFORM_ENV).ok();
        Self::new(lane.as_deref(), platform.as_deref())
    }

    pub fn with_lane(self, lane: &str) -> Self {
        Self::new(Some(lane), self.platform.as_deref())
    }

    pub fn with_platform(self, platform: &str) -> Self {
        Self::new(self.lane.as_deref(), Some(platform))
    }

    pub fn lane(&self) -> Option<&str> {
        self.lane.as_deref()
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }
}
