use crate::common::{RED_SQUARE, TestApp, TestItem, reverse_label};
use ::common::TaskStatus;
use std::sync::atomic::Ordering;

mod accepted_uploads {
    use super::*;

    #[tokio::test]
    async fn creates_one_processing_task_per_item() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let res = app
            .upload_images(
                vec![TestItem::at(55.0, 37.0), TestItem::at(56.0, 38.0)],
                Some(&token),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body, serde_json::json!({}));

        let tasks = app.tasks_of(7).await;
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.status == TaskStatus::Processing));
        assert_eq!(app.blobs.keys().len(), 2);
        assert_eq!(app.all_files().await.len(), 2);
    }

    #[tokio::test]
    async fn dispatches_every_created_task() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let item = TestItem {
            angle: Some("45".into()),
            height: Some("3.5".into()),
            ..TestItem::at(55.0, 37.0)
        };
        let res = app.upload_images(vec![item], Some(&token)).await;
        assert_eq!(res.status, 200, "{}", res.text);

        let jobs = app.dispatcher.wait_for(1).await;
        let task = &app.tasks_of(7).await[0];
        assert_eq!(jobs[0].task_id, task.id.to_string());
        assert_eq!(jobs[0].angle, Some(45.0));
        assert_eq!(jobs[0].height, Some(3.5));
        assert!(app.blobs.contains(&jobs[0].image_path));
    }

    #[tokio::test]
    async fn missing_angle_and_height_use_defaults() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        app.upload_images(vec![TestItem::at(55.0, 37.0)], Some(&token))
            .await;

        let task = &app.tasks_of(7).await[0];
        assert_eq!(task.angle, Some(0.0));
        assert_eq!(task.height, Some(2.0));
    }

    #[tokio::test]
    async fn stored_key_keeps_original_name_suffix() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        app.upload_images(vec![TestItem::image()], Some(&token))
            .await;

        let files = app.all_files().await;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].original_filename.as_deref(), Some("photo 0.jpg"));
        assert_ne!(files[0].filename, "photo 0.jpg");
        assert_eq!(files[0].filename, files[0].file_path);
        assert_eq!(
            files[0].storage_url,
            format!("http://blobs.test/{}", files[0].filename)
        );
    }

    #[tokio::test]
    async fn same_user_uploading_twice_reuses_account() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        app.upload_images(vec![TestItem::image()], Some(&token))
            .await;
        let res = app
            .upload_images(vec![TestItem::image()], Some(&token))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(app.tasks_of(7).await.len(), 2);
    }
}

mod geocoding {
    use super::*;

    #[tokio::test]
    async fn address_without_coordinates_is_forward_geocoded() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let item = TestItem {
            address: Some("Red Square".into()),
            ..TestItem::image()
        };
        app.upload_images(vec![item], Some(&token)).await;

        let task = &app.tasks_of(7).await[0];
        assert_eq!(task.lat, Some(RED_SQUARE.lat));
        assert_eq!(task.lon, Some(RED_SQUARE.lon));
        assert_eq!(task.address.as_deref(), Some("Red Square"));
    }

    #[tokio::test]
    async fn coordinates_without_address_are_reverse_geocoded() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        app.upload_images(vec![TestItem::at(55.0, 37.0)], Some(&token))
            .await;

        let task = &app.tasks_of(7).await[0];
        let expected = reverse_label(geosight_server::utils::geo::Coordinates {
            lat: 55.0,
            lon: 37.0,
        });
        assert_eq!(task.address.as_deref(), Some(expected.as_str()));
        assert_eq!(app.geocoder.forward_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn geocoder_failure_does_not_reject_upload() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let item = TestItem {
            address: Some("unreachable street".into()),
            ..TestItem::image()
        };
        let res = app.upload_images(vec![item], Some(&token)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let task = &app.tasks_of(7).await[0];
        assert_eq!(task.lat, None);
        assert_eq!(task.lon, None);
        assert_eq!(task.address.as_deref(), Some("unreachable street"));
    }

    #[tokio::test]
    async fn unknown_address_leaves_coordinates_empty() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let item = TestItem {
            address: Some("Nowhere Lane".into()),
            ..TestItem::image()
        };
        app.upload_images(vec![item], Some(&token)).await;

        let task = &app.tasks_of(7).await[0];
        assert_eq!(task.lat, None);
        assert_eq!(task.address.as_deref(), Some("Nowhere Lane"));
    }
}

mod validation {
    use super::*;

    #[tokio::test]
    async fn requires_token() {
        let app = TestApp::spawn().await;

        let res = app.upload_images(vec![TestItem::image()], None).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn rejects_token_signed_with_other_secret() {
        let app = TestApp::spawn().await;
        let forged = geosight_server::utils::jwt::sign(
            "not-the-secret",
            7,
            "alice",
            chrono::Duration::hours(1),
        )
        .unwrap();

        let res = app.upload_images(vec![TestItem::image()], Some(&forged)).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn empty_request_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let res = app.upload_images(vec![], Some(&token)).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn too_many_items_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let res = app
            .upload_images(vec![TestItem::image(); 11], Some(&token))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(app.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn one_bad_item_rejects_whole_batch() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let no_image = TestItem {
            image: None,
            address: Some("Red Square".into()),
            ..Default::default()
        };
        let bad_lat = TestItem {
            lat: Some("91".into()),
            lon: Some("10".into()),
            ..TestItem::image()
        };
        let res = app
            .upload_images(
                vec![TestItem::at(55.0, 37.0), no_image, bad_lat],
                Some(&token),
            )
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        let errors = res.body["validation_errors"].as_array().unwrap();
        assert!(
            errors
                .iter()
                .any(|e| e["index"] == 1 && e["field"] == "image")
        );
        assert!(errors.iter().any(|e| e["index"] == 2 && e["field"] == "lat"));
        assert!(errors.iter().all(|e| e["index"] != 0));

        assert!(app.tasks_of(7).await.is_empty());
        assert!(app.blobs.keys().is_empty());
        assert!(app.dispatcher.jobs().is_empty());
    }

    #[tokio::test]
    async fn lone_latitude_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let item = TestItem {
            lat: Some("55".into()),
            ..TestItem::image()
        };
        let res = app.upload_images(vec![item], Some(&token)).await;

        assert_eq!(res.status, 400);
        let errors = res.body["validation_errors"].as_array().unwrap();
        assert_eq!(errors[0]["index"], 0);
    }

    #[tokio::test]
    async fn non_numeric_angle_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let item = TestItem {
            angle: Some("steep".into()),
            ..TestItem::image()
        };
        let res = app.upload_images(vec![item], Some(&token)).await;

        assert_eq!(res.status, 400);
        let errors = res.body["validation_errors"].as_array().unwrap();
        assert_eq!(errors[0]["field"], "angle");
    }
}

mod storage_failures {
    use super::*;

    #[tokio::test]
    async fn failed_put_rolls_back_earlier_blobs() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");
        app.blobs.fail_put_at(2);

        let res = app
            .upload_images(
                vec![TestItem::image(), TestItem::image(), TestItem::image()],
                Some(&token),
            )
            .await;

        assert_eq!(res.status, 500, "{}", res.text);
        assert_eq!(res.body["code"], "STORAGE_ERROR");
        assert!(app.blobs.keys().is_empty());
        assert!(app.tasks_of(7).await.is_empty());
        assert!(app.all_files().await.is_empty());
        assert!(app.dispatcher.jobs().is_empty());
    }
}
