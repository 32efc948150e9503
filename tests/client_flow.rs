use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use brainscan::{
    AppState, ClientError, Config,
    api::HttpScanApi,
    routes::{Navigation, View},
    services::editor::{NoteEditor, NoteState},
    services::starred::Clock,
    storage::MemoryStore,
};

struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    fn set(&self, ts: DateTime<Utc>) {
        *self.0.lock().unwrap() = ts;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

fn t(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
}

// Shared test context
struct TestContext {
    server: MockServer,
    state: AppState,
    clock: Arc<TestClock>,
}

impl TestContext {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let base_url = format!("{}/api", server.uri());

        let config = Config::from_env()
            .unwrap()
            .with_api_url(&base_url)
            .unwrap();
        let api = Arc::new(HttpScanApi::with_base_url(&base_url).unwrap());
        let clock = Arc::new(TestClock(Mutex::new(t(9))));

        let state = AppState::with_parts(config, Arc::new(MemoryStore::new()), api, clock.clone());

        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"message": "Login successful", "user": {"id": "u1", "name": "Ada", "email": "ada@example.com"}}"#,
            ))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/starred/u1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"starred_images": {}}"#))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/history/u1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"history": [{
                    "image_id": "abc123",
                    "filename": "mri.png",
                    "upload_time": "2025-02-28T17:30:00",
                    "image_data": "aGVsbG8=",
                    "ml_results": {"prediction": "Positive", "confidence": 0.91, "tumor_type": "Glioma"}
                }]}"#,
            ))
            .mount(&server)
            .await;

        Self { server, state, clock }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_star_edit_remove_flow() {
        let context = TestContext::new().await;
        let state = &context.state;

        // Step 1: protected views need a login
        assert_eq!(state.navigate("/starred"), Navigation::Redirect(View::Login));

        let session = state.session.login("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(session.user_id(), "u1");
        assert!(matches!(
            state.navigate("/starred"),
            Navigation::Render(View::Starred, Some(_))
        ));

        // Step 2: load history and the (empty) starred collection
        let history = state.scans.history("u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].ml_results.is_positive());
        assert!(state.starred.list("u1").await.unwrap().is_empty());

        Mock::given(method("POST"))
            .and(path("/api/starred"))
            .and(body_string_contains(r#""image_id":"abc123""#))
            .respond_with(ResponseTemplate::new(201).set_body_string(
                r#"{"message": "Image starred successfully", "starred_id": "s1"}"#,
            ))
            .expect(2)
            .mount(&context.server)
            .await;

        // Step 3: star at T1
        context.clock.set(t(10));
        let mut editor = NoteEditor::for_image(&state.starred, "abc123");
        editor.begin();
        editor.set_draft("check again");
        let first = editor.save(&state.starred, "u1").await.unwrap();
        assert_eq!(first.timestamp, t(10));
        assert_eq!(first.image_data.as_deref(), Some("aGVsbG8="));
        assert_eq!(first.filename, "mri.png");

        // Step 4: edit at T2 keeps the creation time
        context.clock.set(t(11));
        let mut editor = NoteEditor::for_image(&state.starred, "abc123");
        editor.begin();
        assert_eq!(
            editor.state(),
            &NoteState::Editing {
                draft: "check again".to_string(),
                existing: Some("check again".to_string())
            }
        );
        editor.set_draft("looks benign");
        let second = editor.save(&state.starred, "u1").await.unwrap();
        assert_eq!(second.note, "looks benign");
        assert_eq!(second.timestamp, t(10));
        assert_eq!(state.starred.cached().len(), 1);

        // Step 5: remove
        Mock::given(method("DELETE"))
            .and(path("/api/starred/u1/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"message": "Starred image removed successfully"}"#,
            ))
            .expect(1)
            .mount(&context.server)
            .await;

        state.starred.select("abc123").unwrap();
        state.starred.remove("u1", "abc123").await.unwrap();
        assert!(!state.starred.is_starred("abc123"));
        assert!(state.starred.selected().is_none());

        // Step 6: logout
        state.logout().unwrap();
        assert!(matches!(state.require_session(), Err(ClientError::NotAuthenticated)));
        assert_eq!(state.navigate("/history"), Navigation::Redirect(View::Login));
        assert_eq!(state.navigate("/about"), Navigation::Render(View::About, None));
    }

    #[tokio::test]
    async fn test_failed_star_keeps_cache_and_reports_server_message() {
        let context = TestContext::new().await;
        let state = &context.state;
        state.session.login("ada@example.com", "hunter22").await.unwrap();

        Mock::given(method("POST"))
            .and(path("/api/starred"))
            .respond_with(
                ResponseTemplate::new(500).set_body_string(r#"{"error": "Database unavailable"}"#),
            )
            .expect(1)
            .mount(&context.server)
            .await;

        let mut editor = NoteEditor::for_image(&state.starred, "abc123");
        editor.begin();
        editor.set_draft("check again");

        match editor.save(&state.starred, "u1").await {
            Err(ClientError::RemoteUnavailable(msg)) => assert_eq!(msg, "Database unavailable"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(editor.state(), &NoteState::Unstarred);
        assert_eq!(editor.error(), Some("Database unavailable"));
        assert!(state.starred.cached().is_empty());
    }

    #[tokio::test]
    async fn test_login_failure_leaves_no_session() {
        let server = MockServer::start().await;
        let base_url = format!("{}/api", server.uri());

        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error": "Invalid credentials"}"#))
            .mount(&server)
            .await;

        let config = Config::from_env().unwrap().with_api_url(&base_url).unwrap();
        let api = Arc::new(HttpScanApi::with_base_url(&base_url).unwrap());
        let clock = Arc::new(TestClock(Mutex::new(t(9))));
        let state = AppState::with_parts(config, Arc::new(MemoryStore::new()), api, clock);

        let err = state.session.login("ada@example.com", "wrongpass").await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid credentials");
        assert!(state.session.current_session().is_none());
        assert_eq!(state.navigate("/upload"), Navigation::Redirect(View::Login));
    }
}
