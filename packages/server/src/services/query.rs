use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use common::storage::BlobStore;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Select,
};

use crate::config::QueryConfig;
use crate::entity::{detected_sub_image, recognition_task, uploaded_file};
use crate::error::AppError;
use crate::models::location::{LocationListQuery, TaskListResponse};
use crate::models::map::{MapQuery, MapResponse};
use crate::models::shared::{PageRequest, parse_date};
use crate::utils::geo::{Coordinates, RadiusFilter};
use crate::views;

/// Inclusive date bounds on `created_at`, evaluated in UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub after: Option<NaiveDate>,
    pub before: Option<NaiveDate>,
}

impl DateRange {
    pub fn parse(after: Option<&str>, before: Option<&str>) -> Result<Self, AppError> {
        Ok(Self {
            after: parse_date(after, "date_after")?,
            before: parse_date(before, "date_before")?,
        })
    }

    /// Half-open `[start, end)` instant bounds covering the inclusive dates.
    pub fn instant_bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let start = self.after.map(start_of_day);
        let end = self.before.and_then(|d| d.succ_opt()).map(start_of_day);
        (start, end)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Coarse SQL prefilter for a radius search: known coordinates inside the
/// latitude band. The exact distance is checked afterwards.
fn within_band<E, C>(select: Select<E>, filter: &RadiusFilter, lat: C, lon: C) -> Select<E>
where
    E: EntityTrait,
    C: ColumnTrait,
{
    let (low, high) = filter.latitude_band();
    select
        .filter(lat.is_not_null())
        .filter(lon.is_not_null())
        .filter(lat.between(low, high))
}

/// Lists the caller's tasks, newest first, filtered by date and radius.
pub async fn list_tasks(
    db: &DatabaseConnection,
    store: &dyn BlobStore,
    config: &QueryConfig,
    preview_expiry: Duration,
    user_id: i32,
    query: &LocationListQuery,
) -> Result<TaskListResponse, AppError> {
    let dates = DateRange::parse(query.date_after.as_deref(), query.date_before.as_deref())?;
    let page = PageRequest::parse(query.page.as_deref(), query.page_size.as_deref(), config)?;
    let radius = RadiusFilter::parse(
        query.lat.as_deref(),
        query.lon.as_deref(),
        query.radius_km.as_deref(),
        config.default_radius_km,
    );

    let mut select =
        recognition_task::Entity::find().filter(recognition_task::Column::UserId.eq(user_id));
    let (start, end) = dates.instant_bounds();
    if let Some(start) = start {
        select = select.filter(recognition_task::Column::CreatedAt.gte(start));
    }
    if let Some(end) = end {
        select = select.filter(recognition_task::Column::CreatedAt.lt(end));
    }
    let select = select
        .order_by_desc(recognition_task::Column::CreatedAt)
        .order_by_desc(recognition_task::Column::Id);

    let (count, links, tasks) = match radius {
        None => {
            let count = select.clone().count(db).await?;
            let links = page.links(count)?;
            let tasks = select
                .offset(Some(page.offset()))
                .limit(Some(page.page_size))
                .all(db)
                .await?;
            (count, links, tasks)
        }
        Some(filter) => {
            let matching: Vec<recognition_task::Model> = within_band(
                select,
                &filter,
                recognition_task::Column::Lat,
                recognition_task::Column::Lon,
            )
            .all(db)
            .await?
            .into_iter()
            .filter(|task| {
                Coordinates::from_pair(task.lat, task.lon).is_some_and(|p| filter.contains(p))
            })
            .collect();
            let count = matching.len() as u64;
            let links = page.links(count)?;
            let tasks = matching
                .into_iter()
                .skip(page.offset() as usize)
                .take(page.page_size as usize)
                .collect();
            (count, links, tasks)
        }
    };

    let results = views::task_views(db, store, preview_expiry, &tasks).await?;

    Ok(TaskListResponse {
        count,
        next: links.next,
        previous: links.previous,
        results,
    })
}

/// Lists detections on files owned by the caller, optionally within a radius.
pub async fn list_detections(
    db: &DatabaseConnection,
    store: &dyn BlobStore,
    config: &QueryConfig,
    preview_expiry: Duration,
    user_id: i32,
    query: &MapQuery,
) -> Result<MapResponse, AppError> {
    let owned_files = uploaded_file::Entity::find()
        .select_only()
        .column(uploaded_file::Column::Id)
        .filter(uploaded_file::Column::UserId.eq(user_id))
        .into_query();

    let mut select = detected_sub_image::Entity::find()
        .filter(detected_sub_image::Column::FileId.in_subquery(owned_files))
        .order_by_desc(detected_sub_image::Column::CreatedAt)
        .order_by_desc(detected_sub_image::Column::Id);

    let radius = RadiusFilter::parse(
        query.lat.as_deref(),
        query.lon.as_deref(),
        query.radius_km.as_deref(),
        config.default_radius_km,
    );
    if let Some(filter) = &radius {
        select = within_band(
            select,
            filter,
            detected_sub_image::Column::Lat,
            detected_sub_image::Column::Lon,
        );
    }

    let detections: Vec<detected_sub_image::Model> = select
        .all(db)
        .await?
        .into_iter()
        .filter(|d| {
            radius.is_none_or(|filter| filter.contains(Coordinates { lat: d.lat, lon: d.lon }))
        })
        .collect();

    let data = views::detection_views(db, store, preview_expiry, &detections).await?;
    Ok(MapResponse { data })
}
