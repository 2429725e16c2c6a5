use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use server::config::UploadConfig;
use storage::BlobStore;
use storage::local::LocalBlobStore;

use crate::common::{
    Backends, CountingBlobStore, FailingRepository, InMemoryRepository, TestApp, image_part,
    jpeg, jpeg_with_metadata, png, routes,
};

async fn scratch_store() -> (Arc<dyn BlobStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalBlobStore::new(dir.path().join("blobs"), "http://cdn.test/files")
        .await
        .unwrap();
    (Arc::new(store), dir)
}

mod accepted {
    use super::*;

    #[tokio::test]
    async fn small_png_is_stored_and_described() {
        let app = TestApp::spawn_in_memory().await;
        let data = png(40, 30);
        assert!(data.len() < 5 * 1024 * 1024);

        let res = app.upload("cat.png", data.clone(), "image/png").await;

        assert_eq!(res.status, 200, "upload failed: {}", res.text);
        assert_eq!(res.body["metadata"]["format"], "png");
        assert_eq!(res.body["metadata"]["width"], 40);
        assert_eq!(res.body["metadata"]["height"], 30);
        assert_eq!(res.body["metadata"]["bytes"], data.len() as u64);
        let identifier = res.body["identifier"].as_str().unwrap();
        assert!(identifier.starts_with("uploads/"));
        let url = res.body["url"].as_str().unwrap();
        assert!(url.starts_with(&format!("http://{}/files/", app.addr)));
        assert!(url.ends_with(&format!("{identifier}.png")));
    }

    #[tokio::test]
    async fn jpeg_with_large_metadata_is_accepted() {
        let app = TestApp::spawn_in_memory().await;
        let data = jpeg_with_metadata(3, 60_000);
        assert!(data.len() > 128 * 1024);

        let res = app.upload("camera.jpg", data.clone(), "image/jpeg").await;

        assert_eq!(res.status, 200, "upload failed: {}", res.text);
        assert_eq!(res.body["metadata"]["format"], "jpg");
        assert_eq!(res.body["metadata"]["width"], 16);
        assert_eq!(res.body["metadata"]["height"], 16);
        assert_eq!(res.body["metadata"]["bytes"], data.len() as u64);
    }

    #[tokio::test]
    async fn stored_image_is_served_back() {
        let app = TestApp::spawn_in_memory().await;
        let data = png(8, 8);

        let res = app.upload("dot.png", data.clone(), "image/png").await;
        assert_eq!(res.status, 200, "upload failed: {}", res.text);

        let fetched = app
            .client
            .get(res.body["url"].as_str().unwrap())
            .send()
            .await
            .unwrap();
        assert_eq!(fetched.status(), 200);
        assert_eq!(fetched.bytes().await.unwrap().as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn folder_field_overrides_default() {
        let app = TestApp::spawn_in_memory().await;
        let form = Form::new()
            .text("folder", "avatars")
            .part("file", image_part("me.jpg", jpeg(16, 16), "image/jpeg"));

        let res = app.post_form(form).await;

        assert_eq!(res.status, 200, "upload failed: {}", res.text);
        assert!(res.body["identifier"].as_str().unwrap().starts_with("avatars/"));
        assert_eq!(res.body["metadata"]["format"], "jpg");
    }

    #[tokio::test]
    async fn missing_part_type_is_guessed_from_name() {
        let app = TestApp::spawn_in_memory().await;
        let part = Part::bytes(png(4, 4)).file_name("guess.png");

        let res = app.post_form(Form::new().part("file", part)).await;

        assert_eq!(res.status, 200, "upload failed: {}", res.text);
    }

    #[tokio::test]
    async fn spooled_upload_succeeds() {
        let app = TestApp::spawn_with(
            Backends::LocalInMemory,
            UploadConfig {
                spool_threshold: Some(64),
                ..Default::default()
            },
        )
        .await;

        let res = app.upload("big.png", png(64, 64), "image/png").await;

        assert_eq!(res.status, 200, "upload failed: {}", res.text);
        assert_eq!(res.body["metadata"]["width"], 64);
    }
}

mod rejected {
    use super::*;

    #[tokio::test]
    async fn oversized_jpeg_never_reaches_storage() {
        let (inner, _dir) = scratch_store().await;
        let blobs = Arc::new(CountingBlobStore::wrapping(inner));
        let uploads = Arc::new(InMemoryRepository::default());
        let app = TestApp::spawn_with(
            Backends::Custom {
                blob_store: blobs.clone(),
                uploads: uploads.clone(),
            },
            UploadConfig::default(),
        )
        .await;

        let mut data = jpeg(8, 8);
        data.resize(12 * 1024 * 1024, 0);
        let res = app.upload("huge.jpg", data, "image/jpeg").await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.body["error"], "TooLarge");
        assert_eq!(blobs.calls(), 0);
        assert_eq!(uploads.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn request_without_file() {
        let app = TestApp::spawn_in_memory().await;
        let res = app.post_form(Form::new().text("folder", "uploads")).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "MissingFile");
    }

    #[tokio::test]
    async fn non_image_type() {
        let app = TestApp::spawn_in_memory().await;
        let res = app
            .upload("notes.pdf", b"%PDF-1.7".to_vec(), "application/pdf")
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "UnsupportedType");
    }

    #[tokio::test]
    async fn content_that_lies_about_its_type() {
        let app = TestApp::spawn_in_memory().await;
        let res = app.upload("cat.png", png(4, 4), "image/gif").await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "ContentMismatch");
    }

    #[tokio::test]
    async fn traversal_folder() {
        let app = TestApp::spawn_in_memory().await;
        let form = Form::new()
            .text("folder", "../secrets")
            .part("file", image_part("cat.png", png(4, 4), "image/png"));

        let res = app.post_form(form).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "InvalidFolder");
    }

    #[tokio::test]
    async fn body_that_is_not_multipart() {
        let app = TestApp::spawn_in_memory().await;
        let res = app
            .client
            .post(app.url(routes::UPLOAD))
            .header("Content-Type", "multipart/form-data; boundary=XYZ")
            .body("this is not a multipart body")
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 400);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "TransportError");
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn storage_failure_skips_metadata() {
        let blobs = Arc::new(CountingBlobStore::failing());
        let uploads = Arc::new(InMemoryRepository::default());
        let app = TestApp::spawn_with(
            Backends::Custom {
                blob_store: blobs.clone(),
                uploads: uploads.clone(),
            },
            UploadConfig::default(),
        )
        .await;

        let res = app.upload("cat.png", png(4, 4), "image/png").await;

        assert_eq!(res.status, 500, "{}", res.text);
        assert_eq!(res.body["error"], "StorageError");
        assert_eq!(blobs.calls(), 1);
        assert_eq!(uploads.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn metadata_failure_reports_the_stored_asset() {
        let (blobs, _dir) = scratch_store().await;
        let uploads = Arc::new(FailingRepository::default());
        let app = TestApp::spawn_with(
            Backends::Custom {
                blob_store: blobs,
                uploads: uploads.clone(),
            },
            UploadConfig::default(),
        )
        .await;

        let res = app.upload("cat.png", png(4, 4), "image/png").await;

        assert_eq!(res.status, 500, "{}", res.text);
        assert_eq!(res.body["error"], "RepositoryError");
        let identifier = res.body["identifier"].as_str().unwrap();
        assert!(identifier.starts_with("uploads/"));
        assert!(
            res.body["url"]
                .as_str()
                .unwrap()
                .starts_with("http://cdn.test/files/uploads/")
        );
        assert_eq!(uploads.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn listing_failure() {
        let (blobs, _dir) = scratch_store().await;
        let app = TestApp::spawn_with(
            Backends::Custom {
                blob_store: blobs,
                uploads: Arc::new(FailingRepository::default()),
            },
            UploadConfig::default(),
        )
        .await;

        let res = app.get(routes::UPLOADS).await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["error"], "RepositoryError");
    }
}
