use crate::common::{TestApp, routes};
use ::common::TaskStatus;
use chrono::{Duration, TimeZone, Utc};
use geosight_server::utils::geo::{Coordinates, great_circle_km};

fn day(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn requires_token() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::IMAGE_LOCATIONS).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn lists_only_own_tasks_newest_first() {
        let app = TestApp::spawn().await;
        let now = Utc::now();
        let older = app.seed_task(7, None, now - Duration::hours(2)).await;
        let newer = app.seed_task(7, None, now - Duration::hours(1)).await;
        app.seed_task(8, None, now).await;
        let token = app.token(7, "alice");

        let res = app.get_with_token(routes::IMAGE_LOCATIONS, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["count"], 2);
        assert!(res.body["next"].is_null());
        assert!(res.body["previous"].is_null());
        let results = res.body["results"].as_array().unwrap();
        assert_eq!(results[0]["id"], newer);
        assert_eq!(results[1]["id"], older);
    }

    #[tokio::test]
    async fn task_view_carries_owner_image_and_detections() {
        let app = TestApp::spawn().await;
        let task_id = app
            .seed_task(7, Some(Coordinates { lat: 55.0, lon: 37.0 }), Utc::now())
            .await;
        app.report_detections(task_id, &[("crops/a.jpg", 55.0, 37.0)])
            .await;
        let token = app.token(7, "alice");

        let res = app.get_with_token(routes::IMAGE_LOCATIONS, &token).await;

        let task = &res.body["results"][0];
        assert_eq!(task["status"], "done");
        assert_eq!(task["user"]["id"], 7);
        assert_eq!(task["user"]["username"], "user7");
        assert_eq!(task["main_coordinates"]["lat"], 55.0);
        assert_eq!(task["main_coordinates"]["lon"], 37.0);
        assert!(
            task["main_image"]["preview_url"]
                .as_str()
                .unwrap()
                .contains("expires=")
        );
        let trash = task["trash_images"].as_array().unwrap();
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0]["image"]["filename"], "crops/a.jpg");
        assert_eq!(trash[0]["lat"], 55.0);
    }

    #[tokio::test]
    async fn unknown_coordinates_are_null() {
        let app = TestApp::spawn().await;
        app.seed_task(7, None, Utc::now()).await;
        let token = app.token(7, "alice");

        let res = app.get_with_token(routes::IMAGE_LOCATIONS, &token).await;

        assert!(res.body["results"][0]["main_coordinates"].is_null());
    }
}

mod pagination {
    use super::*;

    async fn seed_five(app: &TestApp) {
        let now = Utc::now();
        for i in 0..5 {
            app.seed_task(7, None, now - Duration::minutes(i)).await;
        }
    }

    #[tokio::test]
    async fn middle_page_links_both_ways() {
        let app = TestApp::spawn().await;
        seed_five(&app).await;
        let token = app.token(7, "alice");

        let res = app
            .get_with_token(
                &format!("{}?page=2&page_size=2", routes::IMAGE_LOCATIONS),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["count"], 5);
        assert_eq!(res.body["next"], 3);
        assert_eq!(res.body["previous"], 1);
        assert_eq!(res.body["results"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn page_past_the_end_is_not_found() {
        let app = TestApp::spawn().await;
        seed_five(&app).await;
        let token = app.token(7, "alice");

        let res = app
            .get_with_token(
                &format!("{}?page=4&page_size=2", routes::IMAGE_LOCATIONS),
                &token,
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn first_page_of_empty_listing_is_ok() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let res = app.get_with_token(routes::IMAGE_LOCATIONS, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["count"], 0);
        assert!(res.body["results"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn page_size_is_capped() {
        let app = TestApp::spawn().await;
        seed_five(&app).await;
        let token = app.token(7, "alice");

        let res = app
            .get_with_token(
                &format!("{}?page_size=1000", routes::IMAGE_LOCATIONS),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["results"].as_array().unwrap().len(), 5);
    }
}

mod filters {
    use super::*;

    #[tokio::test]
    async fn date_bounds_are_inclusive_days() {
        let app = TestApp::spawn().await;
        app.seed_task(7, None, day(2024, 1, 1)).await;
        let inside = app.seed_task(7, None, day(2024, 1, 10)).await;
        let edge = app.seed_task(7, None, day(2024, 1, 20)).await;
        app.seed_task(7, None, day(2024, 1, 21)).await;
        let token = app.token(7, "alice");

        let res = app
            .get_with_token(
                &format!(
                    "{}?date_after=2024-01-05&date_before=2024-01-20",
                    routes::IMAGE_LOCATIONS
                ),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let ids: Vec<i64> = res.body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![edge as i64, inside as i64]);
    }

    #[tokio::test]
    async fn malformed_date_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let res = app
            .get_with_token(
                &format!("{}?date_after=01/05/2024", routes::IMAGE_LOCATIONS),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn radius_keeps_nearby_tasks_only() {
        let app = TestApp::spawn().await;
        let now = Utc::now();
        let near = app
            .seed_task(7, Some(Coordinates { lat: 55.7539, lon: 37.6208 }), now)
            .await;
        // Roughly 6 km north.
        app.seed_task(7, Some(Coordinates { lat: 55.81, lon: 37.6208 }), now)
            .await;
        app.seed_task(7, None, now).await;
        let token = app.token(7, "alice");

        let res = app
            .get_with_token(
                &format!(
                    "{}?lat=55.7558&lon=37.6173&radius_km=2",
                    routes::IMAGE_LOCATIONS
                ),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["count"], 1);
        assert_eq!(res.body["results"][0]["id"], near);
    }

    #[tokio::test]
    async fn negative_radius_matches_nothing() {
        let app = TestApp::spawn().await;
        app.seed_task(7, Some(Coordinates { lat: 55.0, lon: 37.0 }), Utc::now())
            .await;
        app.seed_task(7, None, Utc::now()).await;
        let token = app.token(7, "alice");

        let res = app
            .get_with_token(
                &format!("{}?lat=55&lon=37&radius_km=-1", routes::IMAGE_LOCATIONS),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["count"], 0);
        assert!(res.body["results"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_center_matches_nothing() {
        let app = TestApp::spawn().await;
        app.seed_task(7, Some(Coordinates { lat: 89.9, lon: 37.0 }), Utc::now())
            .await;
        let token = app.token(7, "alice");

        let res = app
            .get_with_token(
                &format!("{}?lat=95&lon=37&radius_km=1000", routes::IMAGE_LOCATIONS),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["count"], 0);
    }

    #[tokio::test]
    async fn task_exactly_on_the_radius_due_north_is_included() {
        let app = TestApp::spawn().await;
        let center = Coordinates { lat: 55.0, lon: 37.0 };
        let edge = Coordinates { lat: 55.05, lon: 37.0 };
        let radius_km = great_circle_km(center, edge);
        let on_edge = app.seed_task(7, Some(edge), Utc::now()).await;
        app.seed_task(7, Some(Coordinates { lat: 55.0501, lon: 37.0 }), Utc::now())
            .await;
        let token = app.token(7, "alice");

        let res = app
            .get_with_token(
                &format!(
                    "{}?lat={}&lon={}&radius_km={radius_km}",
                    routes::IMAGE_LOCATIONS,
                    center.lat,
                    center.lon
                ),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["count"], 1);
        assert_eq!(res.body["results"][0]["id"], on_edge);
    }

    #[tokio::test]
    async fn non_numeric_center_disables_radius() {
        let app = TestApp::spawn().await;
        app.seed_task(7, Some(Coordinates { lat: 10.0, lon: 10.0 }), Utc::now())
            .await;
        app.seed_task(7, None, Utc::now()).await;
        let token = app.token(7, "alice");

        let res = app
            .get_with_token(
                &format!("{}?lat=abc&lon=37.6", routes::IMAGE_LOCATIONS),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["count"], 2);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn removes_task_files_and_blobs() {
        let app = TestApp::spawn().await;
        let task_id = app.seed_task(7, None, Utc::now()).await;
        app.report_detections(task_id, &[("crops/a.jpg", 1.0, 2.0)])
            .await;
        let token = app.token(7, "alice");

        let res = app
            .delete_with_token(&routes::image_location(task_id), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["message"], "Task deleted");
        assert!(app.task(task_id).await.is_none());
        assert!(app.detections_of(task_id).await.is_empty());
        assert!(app.all_files().await.is_empty());
        assert!(app.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn other_users_task_is_not_found() {
        let app = TestApp::spawn().await;
        let task_id = app.seed_task(7, None, Utc::now()).await;
        let token = app.token(8, "mallory");

        let res = app
            .delete_with_token(&routes::image_location(task_id), &token)
            .await;

        assert_eq!(res.status, 404);
        assert!(app.task(task_id).await.is_some());
    }

    #[tokio::test]
    async fn missing_task_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let res = app
            .delete_with_token(&routes::image_location(12345), &token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod retry {
    use super::*;

    #[tokio::test]
    async fn resets_recognised_results_and_redispatches() {
        let app = TestApp::spawn().await;
        let task_id = app.seed_task(7, None, Utc::now()).await;
        app.report_detections(task_id, &[("crops/a.jpg", 1.0, 2.0)])
            .await;
        let token = app.token(7, "alice");

        let res = app
            .post_with_token(&routes::image_location_retry(task_id), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["message"], "Task resubmitted for recognition");

        let task = app.task(task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.error_reason, None);
        assert!(app.detections_of(task_id).await.is_empty());
        assert!(!app.blobs.contains("crops/a.jpg"));

        let jobs = app.dispatcher.wait_for(1).await;
        assert_eq!(jobs[0].task_id, task_id.to_string());
    }

    #[tokio::test]
    async fn keeps_user_supplied_location() {
        let app = TestApp::spawn().await;
        let given = Coordinates { lat: 10.0, lon: 20.0 };
        let task_id = app.seed_task(7, Some(given), Utc::now()).await;
        app.post_json(
            routes::UPDATE_RESULT,
            &serde_json::json!({"TaskId": task_id, "Status": "Failed", "ErrorMessage": "x"}),
        )
        .await;
        let token = app.token(7, "alice");

        app.post_with_token(&routes::image_location_retry(task_id), &token)
            .await;

        let task = app.task(task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.lat, Some(10.0));
        assert_eq!(task.lon, Some(20.0));
    }

    #[tokio::test]
    async fn clears_recognised_coordinates() {
        let app = TestApp::spawn().await;
        let task_id = app.seed_task(7, None, Utc::now()).await;
        app.post_json(
            routes::UPDATE_RESULT,
            &serde_json::json!({
                "TaskId": task_id,
                "Status": "Succeeded",
                "Result": {"Latitude": 1.0, "Longitude": 2.0},
            }),
        )
        .await;
        let token = app.token(7, "alice");

        app.post_with_token(&routes::image_location_retry(task_id), &token)
            .await;

        let task = app.task(task_id).await.unwrap();
        assert_eq!(task.lat, None);
        assert_eq!(task.lon, None);
        assert_eq!(task.address, None);
        assert!(!task.coordinates_recognized);
    }

    #[tokio::test]
    async fn other_users_task_is_not_found() {
        let app = TestApp::spawn().await;
        let task_id = app.seed_task(7, None, Utc::now()).await;
        let token = app.token(8, "mallory");

        let res = app
            .post_with_token(&routes::image_location_retry(task_id), &token)
            .await;

        assert_eq!(res.status, 404);
        assert!(app.dispatcher.jobs().is_empty());
    }
}
