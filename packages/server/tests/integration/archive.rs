use std::io::{Cursor, Write};

use crate::common::TestApp;
use geosight_server::entity::upload_archive;
use sea_orm::EntityTrait;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn zip_bytes() -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut cursor);
        writer
            .start_file("photo.jpg", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"jpeg-bytes").unwrap();
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

mod archive_upload {
    use super::*;

    #[tokio::test]
    async fn accepts_zip_with_metadata() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let res = app
            .upload_archive(Some(zip_bytes()), Some(r#"{"camera":"north"}"#), &token)
            .await;

        assert_eq!(res.status, 202, "{}", res.text);
        assert_eq!(res.body["message"], "Archive accepted for processing");
        let archive_id = res.body["archive_id"].as_i64().unwrap() as i32;

        let row = upload_archive::Entity::find_by_id(archive_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.user_id, 7);
        assert_eq!(row.status, "pending");
        assert_eq!(row.original_filename, "bundle.zip");
        assert!(row.filename.starts_with("archives/"));
        assert!(app.blobs.contains(&row.filename));
        let metadata_key = row.metadata_filename.unwrap();
        assert_eq!(
            app.blobs.get(&metadata_key).unwrap(),
            br#"{"camera":"north"}"#.to_vec()
        );
    }

    #[tokio::test]
    async fn metadata_is_optional() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let res = app.upload_archive(Some(zip_bytes()), None, &token).await;

        assert_eq!(res.status, 202, "{}", res.text);
        assert_eq!(app.blobs.keys().len(), 1);
    }

    #[tokio::test]
    async fn rejects_non_zip_payload() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let res = app
            .upload_archive(Some(b"definitely not a zip".to_vec()), None, &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(app.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn rejects_malformed_metadata() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let res = app
            .upload_archive(Some(zip_bytes()), Some("{not json"), &token)
            .await;

        assert_eq!(res.status, 400);
        assert!(app.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn requires_archive_field() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");

        let res = app.upload_archive(None, Some("{}"), &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn metadata_put_failure_removes_archive_blob() {
        let app = TestApp::spawn().await;
        let token = app.token(7, "alice");
        app.blobs.fail_put_at(2);

        let res = app
            .upload_archive(Some(zip_bytes()), Some("{}"), &token)
            .await;

        assert_eq!(res.status, 500, "{}", res.text);
        assert_eq!(res.body["code"], "STORAGE_ERROR");
        assert!(app.blobs.keys().is_empty());
        assert!(
            upload_archive::Entity::find()
                .all(&app.db)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
