use crate::common::{TestApp, noisy_png, png, routes};

mod listing {
    use super::*;

    #[tokio::test]
    async fn empty_listing() {
        let app = TestApp::spawn().await;
        let res = app.get(routes::UPLOADS).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn same_asset_twice_is_listed_once() {
        let app = TestApp::spawn().await;
        let data = png(20, 20);

        let first = app.upload("a.png", data.clone(), "image/png").await;
        let second = app.upload("b.png", data, "image/png").await;
        assert_eq!(first.status, 200, "{}", first.text);
        assert_eq!(second.status, 200, "{}", second.text);
        assert_eq!(first.body["identifier"], second.body["identifier"]);

        let res = app.get(routes::UPLOADS).await;
        let records = res.body.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["identifier"], first.body["identifier"]);
        // The latest upsert wins.
        assert_eq!(records[0]["original_name"], "b.png");
        assert_eq!(records[0]["metadata"]["format"], "png");
    }

    #[tokio::test]
    async fn newest_first_and_paged() {
        let app = TestApp::spawn().await;
        let mut identifiers = Vec::new();
        for seed in 1..=3 {
            let res = app
                .upload("n.png", noisy_png(8, 8, seed), "image/png")
                .await;
            assert_eq!(res.status, 200, "{}", res.text);
            identifiers.push(res.body["identifier"].as_str().unwrap().to_string());
        }

        let res = app.get(routes::UPLOADS).await;
        let listed: Vec<_> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["identifier"].as_str().unwrap().to_string())
            .collect();
        let expected: Vec<_> = identifiers.iter().rev().cloned().collect();
        assert_eq!(listed, expected);

        let page = app.get(&routes::uploads_page(2, 2)).await;
        let page = page.body.as_array().unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["identifier"], identifiers[0].as_str());
    }

    #[tokio::test]
    async fn reupload_moves_record_to_the_front() {
        let app = TestApp::spawn().await;
        let old = noisy_png(8, 8, 7);

        let first = app.upload("old.png", old.clone(), "image/png").await;
        app.upload("new.png", noisy_png(8, 8, 9), "image/png").await;
        app.upload("old.png", old, "image/png").await;

        let res = app.get(routes::UPLOADS).await;
        let records = res.body.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["identifier"], first.body["identifier"]);
    }
}

mod service {
    use super::*;

    #[tokio::test]
    async fn health_and_docs() {
        let app = TestApp::spawn_in_memory().await;

        let res = app.get(routes::HEALTH).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "ok");

        let res = app.get(routes::OPENAPI).await;
        assert_eq!(res.status, 200);
        assert!(res.body["paths"]["/upload"]["post"].is_object());
        assert!(res.body["paths"]["/uploads"]["get"].is_object());
    }
}
