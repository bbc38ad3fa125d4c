//! crates/life_engine_core/src/schedule.rs
//!
//! The weekly schedule grid. A `WeekWindow` always starts on a Monday; time
//! blocks are fetched for a padded range and projected onto a 7 x 24 grid.
//! Overlapping blocks are placed as-is.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::binding::BindingRequest;
use crate::domain::{Collection, CollectionPath, Document, TimeBlock, UserContext};
use crate::ports::{
    DocumentStore, FieldFilter, FilterOp, FilterValue, OrderBy, PortError, PortResult,
};
use crate::projects::toggle_completed;

pub const HOUR_HEIGHT: f64 = 56.0;
pub const HEADER_HEIGHT: f64 = 40.0;
const DAYS_PER_WEEK: i64 = 7;

//=========================================================================================
// Week Window
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekNav {
    #[serde(rename = "prev")]
    Previous,
    Next,
    Today,
}

/// Seven days starting on a Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekWindow {
    start: NaiveDate,
}

impl WeekWindow {
    /// The window whose week contains `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let back = i64::from(date.weekday().num_days_from_monday());
        Self {
            start: date - Duration::days(back),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day after the window.
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(DAYS_PER_WEEK)
    }

    pub fn next(&self) -> Self {
        Self {
            start: self.start + Duration::days(DAYS_PER_WEEK),
        }
    }

    pub fn previous(&self) -> Self {
        Self {
            start: self.start - Duration::days(DAYS_PER_WEEK),
        }
    }

    pub fn navigate(&self, nav: WeekNav, today: NaiveDate) -> Self {
        match nav {
            WeekNav::Previous => self.previous(),
            WeekNav::Next => self.next(),
            WeekNav::Today => Self::containing(today),
        }
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        (0..DAYS_PER_WEEK)
            .map(|offset| self.start + Duration::days(offset))
            .collect()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end()
    }

    /// `[start, start + 7 days + 1 day)` at local midnight. The extra day
    /// catches blocks near the end of Sunday in offsets behind UTC.
    pub fn fetch_range(&self, offset: FixedOffset) -> PortResult<(DateTime<Utc>, DateTime<Utc>)> {
        let from = local_midnight(self.start, offset)?;
        let to = local_midnight(self.end() + Duration::days(1), offset)?;
        Ok((from, to))
    }

    pub fn binding_request(&self, offset: FixedOffset) -> PortResult<BindingRequest> {
        let (from, to) = self.fetch_range(offset)?;
        Ok(BindingRequest::new(Collection::TimeBlocks)
            .filter(FieldFilter::new("startTime", FilterOp::Gte, FilterValue::Timestamp(from)))
            .filter(FieldFilter::new("startTime", FilterOp::Lt, FilterValue::Timestamp(to)))
            .order_by(OrderBy::asc("startTime")))
    }
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> PortResult<DateTime<Utc>> {
    offset
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| PortError::Unexpected(format!("Cannot resolve midnight of {}", date)))
}

//=========================================================================================
// Grid Projection
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridGeometry {
    pub hour_height: f64,
    pub header_height: f64,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            hour_height: HOUR_HEIGHT,
            header_height: HEADER_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedBlock {
    pub id: Uuid,
    pub description: String,
    pub domain: String,
    pub completed: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// ISO weekday of the local start, Monday = 1.
    pub column: u32,
    pub top: f64,
    pub height: f64,
    pub left_percent: f64,
    pub width_percent: f64,
}

impl GridGeometry {
    pub fn total_height(&self) -> f64 {
        24.0 * self.hour_height + self.header_height
    }

    pub fn place(&self, block: &TimeBlock, offset: FixedOffset) -> PlacedBlock {
        let local_start = block.start_time.with_timezone(&offset);
        let column = local_start.weekday().number_from_monday();
        let hours = f64::from(local_start.hour()) + f64::from(local_start.minute()) / 60.0;
        let minutes = (block.end_time - block.start_time).num_minutes() as f64;
        let width = 100.0 / DAYS_PER_WEEK as f64;
        PlacedBlock {
            id: block.id,
            description: block.description.clone(),
            domain: block.domain.clone(),
            completed: block.completed,
            start_time: block.start_time,
            end_time: block.end_time,
            column,
            top: hours * self.hour_height + self.header_height,
            height: minutes / 60.0 * self.hour_height,
            left_percent: f64::from(column - 1) * width,
            width_percent: width,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayHeader {
    pub date: NaiveDate,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekGrid {
    pub window_start: NaiveDate,
    pub days: Vec<DayHeader>,
    pub geometry: GridGeometry,
    pub total_height: f64,
    pub blocks: Vec<PlacedBlock>,
}

/// Projects every block whose local start day is inside the window. Blocks
/// from the padding day are fetched but not drawn.
pub fn layout_week(
    window: &WeekWindow,
    blocks: &[TimeBlock],
    geometry: &GridGeometry,
    offset: FixedOffset,
) -> WeekGrid {
    let days = window
        .days()
        .into_iter()
        .map(|date| DayHeader {
            date,
            label: date.format("%a %d").to_string(),
        })
        .collect();
    let blocks = blocks
        .iter()
        .filter(|block| window.contains(block.start_time.with_timezone(&offset).date_naive()))
        .map(|block| geometry.place(block, offset))
        .collect();
    WeekGrid {
        window_start: window.start(),
        days,
        geometry: *geometry,
        total_height: geometry.total_height(),
        blocks,
    }
}

//=========================================================================================
// Schedule State Machine
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScheduleState {
    Idle,
    Loading,
    Loaded { grid: WeekGrid },
    Error { message: String },
}

/// One schedule view. Every window change goes back through `Loading`.
#[derive(Debug, Clone)]
pub struct WeeklySchedule {
    window: WeekWindow,
    state: ScheduleState,
    geometry: GridGeometry,
    offset: FixedOffset,
}

impl WeeklySchedule {
    pub fn new(reference: NaiveDate, offset: FixedOffset) -> Self {
        Self {
            window: WeekWindow::containing(reference),
            state: ScheduleState::Idle,
            geometry: GridGeometry::default(),
            offset,
        }
    }

    pub fn window(&self) -> WeekWindow {
        self.window
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    /// Moves to another week and enters `Loading` for it.
    pub fn navigate(&mut self, nav: WeekNav, today: NaiveDate) -> PortResult<BindingRequest> {
        self.window = self.window.navigate(nav, today);
        self.begin_load()
    }

    /// Enters `Loading` and returns the request for the current window.
    pub fn begin_load(&mut self) -> PortResult<BindingRequest> {
        self.state = ScheduleState::Loading;
        self.window.binding_request(self.offset)
    }

    pub fn finish_load(&mut self, result: PortResult<Vec<Document>>) {
        self.state = match result {
            Ok(docs) => {
                let blocks: Vec<TimeBlock> = docs
                    .iter()
                    .filter_map(|doc| match doc.decode::<TimeBlock>() {
                        Ok(block) => Some(block),
                        Err(e) => {
                            warn!("Skipping time block {}: {}", doc.id, e);
                            None
                        }
                    })
                    .collect();
                ScheduleState::Loaded {
                    grid: layout_week(&self.window, &blocks, &self.geometry, self.offset),
                }
            }
            Err(e) => {
                warn!("Failed to load week of {}: {}", self.window.start(), e);
                ScheduleState::Error {
                    message: e.to_string(),
                }
            }
        };
    }

    /// Runs one full load of the current window.
    pub async fn refresh(
        &mut self,
        store: &dyn DocumentStore,
        ctx: &UserContext,
    ) -> &ScheduleState {
        let result = match self.begin_load() {
            Ok(request) => store.query(&request.resolve(ctx)).await,
            Err(e) => Err(e),
        };
        self.finish_load(result);
        &self.state
    }
}

/// Flips a time block's `completed` flag. No other document is touched.
pub async fn toggle_time_block(
    store: &dyn DocumentStore,
    ctx: &UserContext,
    block_id: Uuid,
) -> PortResult<Document> {
    let path = CollectionPath::new(&ctx.user_id, Collection::TimeBlocks);
    let updated = toggle_completed(store, &path, block_id).await?;
    info!("Toggled time block {}", block_id);
    Ok(updated)
}
