//! Data transfer objects for web requests and responses.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{
    CommutePreference, RpaTask, RpaTaskId, SeatClass, Station, StationCode, TrainNumber, UserId,
    WatchTask,
};
use crate::purchase::WatchRequest;

/// Query for the station picker.
#[derive(Debug, Deserialize)]
pub struct StationSearchRequest {
    /// Name fragment, pinyin or acronym prefix
    pub q: String,

    /// Maximum results (default 10, capped at 50)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct StationSearchResponse {
    pub stations: Vec<Station>,
}

/// Exact-name lookup.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub name: String,
    pub code: StationCode,
}

/// Result of saving a commute preference.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceResponse {
    pub user_id: UserId,
    pub preference: CommutePreference,
    /// Whether a previous preference (and its poller) was replaced.
    pub replaced: bool,
}

/// Request to create a watch task.
///
/// Train numbers and seat types arrive as plain strings so that a bad
/// value is reported as a 400 with the offending field.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWatchTaskRequest {
    pub user_id: UserId,
    pub from_station: String,
    pub to_station: String,
    pub travel_date: NaiveDate,
    pub preferred_trains: Vec<String>,
    #[serde(default)]
    pub seat_types: Vec<String>,
}

impl CreateWatchTaskRequest {
    pub fn into_watch_request(self) -> Result<WatchRequest, String> {
        let preferred_trains = self
            .preferred_trains
            .iter()
            .map(|t| TrainNumber::parse(t.trim()).map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        let seat_types = self
            .seat_types
            .iter()
            .map(|s| s.trim().parse::<SeatClass>().map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WatchRequest {
            user_id: self.user_id,
            from_station: self.from_station,
            to_station: self.to_station,
            travel_date: self.travel_date,
            preferred_trains,
            seat_types,
        })
    }
}

/// A watch task with its automation runs, oldest first.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchTaskResponse {
    #[serde(flatten)]
    pub task: WatchTask,
    pub rpa_tasks: Vec<RpaTask>,
}

/// The provider's report on one run.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRequest {
    pub task_id: RpaTaskId,
    pub success: bool,
    #[serde(default, alias = "error")]
    pub error_message: Option<String>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
