use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use okra_core::db::open_db_in_memory;
use okra_core::{
    AuthService, Participant, ParticipantRepository, SqliteParticipantRepository,
    SqliteUserRepository,
};
use okra_server::{build_router, AppState};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

const USERNAME: &str = "researcher";
const PASSWORD: &str = "correct-horse";

struct TestApp {
    router: Router,
    participants: Vec<Participant>,
}

impl TestApp {
    /// One researcher account and two unregistered participants.
    fn new() -> Self {
        let conn = open_db_in_memory().unwrap();
        AuthService::new(
            SqliteUserRepository::try_new(&conn).unwrap(),
            Duration::from_secs(60),
        )
        .create_user(USERNAME, PASSWORD)
        .unwrap();

        let repo = SqliteParticipantRepository::try_new(&conn).unwrap();
        let participants: Vec<Participant> = (0..2).map(|_| Participant::new()).collect();
        for participant in &participants {
            repo.create_participant(participant).unwrap();
        }
        drop(repo);

        Self {
            router: build_router(AppState::new(conn, Duration::from_secs(3600))),
            participants,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn login(&self) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/login",
                json!({"username": USERNAME, "password": PASSWORD}),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        cookie.split(';').next().unwrap().to_string()
    }

    async fn register_device(&self, participant: &Participant) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/api/register",
                json!({
                    "participantId": participant.id,
                    "registrationKey": participant.registration_key.as_deref().unwrap()
                }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["deviceKey"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_cookie(mut request: Request<Body>, cookie: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(COOKIE, cookie.parse().unwrap());
    request
}

fn with_device(mut request: Request<Body>, device_key: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(AUTHORIZATION, format!("Bearer {device_key}").parse().unwrap());
    request
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn experiment_payload(app: &TestApp, task_ids: &[Uuid]) -> Value {
    json!({
        "taskType": "question-answering",
        "title": "Test experiment",
        "instructions": "Read carefully.",
        "practiceTask": {"id": Uuid::new_v4(), "label": "practice", "data": {"question": "?"}},
        "tasks": task_ids.iter().map(|id| json!({"id": id, "label": "", "data": {"question": id.to_string()}})).collect::<Vec<_>>(),
        "ratings": [
            {"id": Uuid::new_v4(), "question": "How difficult?", "type": "emoticon", "lowExtreme": null, "highExtreme": null}
        ],
        "assignments": [
            {"participant": app.participants[0].id, "tasks": task_ids.iter().map(|id| json!({"id": id, "started": false})).collect::<Vec<_>>()},
            {"participant": app.participants[1].id, "tasks": []}
        ]
    })
}

#[tokio::test]
async fn private_views_redirect_to_login() {
    let app = TestApp::new();
    let experiment = Uuid::new_v4();
    let participant = app.participants[0].id;

    for uri in [
        "/experiments".to_string(),
        "/experiments/new".to_string(),
        format!("/experiments/{experiment}"),
        "/participants".to_string(),
    ] {
        let response = app.send(get(&uri)).await;
        assert_eq!(response.status(), StatusCode::FOUND, "{uri}");
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            format!("/login?next={uri}").as_str()
        );
    }

    for uri in [
        format!("/experiments/{experiment}/delete"),
        format!("/participants/{participant}/unregister"),
    ] {
        let response = app.send(json_request("POST", &uri, json!({}))).await;
        assert_eq!(response.status(), StatusCode::FOUND, "{uri}");
    }
}

#[tokio::test]
async fn registration_view_is_public_and_single_use() {
    let app = TestApp::new();
    let participant = &app.participants[0];
    let uri = format!("/registration/{}", participant.id);

    let response = app.send(get(&uri)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["participantId"], json!(participant.id));
    assert_eq!(
        body["registrationKey"].as_str(),
        participant.registration_key.as_deref()
    );

    app.register_device(participant).await;

    let response = app.send(get(&uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("already registered"));

    let response = app
        .send(get(&format!("/registration/{}", Uuid::new_v4())))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn login_sets_session_cookie_and_logout_clears_it() {
    let app = TestApp::new();

    let response = app
        .send(json_request(
            "POST",
            "/login",
            json!({"username": USERNAME, "password": "wrong-password"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(json_request(
            "POST",
            "/login?next=/participants",
            json!({"username": USERNAME, "password": PASSWORD}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/participants");
    let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with("okra_session="));
    assert!(set_cookie.contains("HttpOnly"));
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let response = app.send(with_cookie(get("/participants"), &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);

    let response = app.send(with_cookie(get("/logout"), &cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");

    let response = app.send(with_cookie(get("/participants"), &cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn experiment_create_detail_and_idempotent_update() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let task_ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

    let response = app
        .send(with_cookie(
            json_request("POST", "/experiments", experiment_payload(&app, &task_ids)),
            &cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["taskType"], "question-answering");
    assert_eq!(created["tasks"].as_array().unwrap().len(), 3);
    assert_eq!(created["ratings"][0]["type"], "emoticon");

    let response = app
        .send(with_cookie(get(&format!("/experiments/{id}")), &cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail = body_json(response).await;
    assert_eq!(detail, created);

    for _ in 0..2 {
        let response = app
            .send(with_cookie(
                json_request("POST", &format!("/experiments/{id}"), detail.clone()),
                &cookie,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, detail);
    }

    let response = app.send(with_cookie(get("/experiments"), &cookie)).await;
    let listed = body_json(response).await;
    assert_eq!(listed[0]["nTasks"], 3);
    assert_eq!(listed[0]["nParticipants"], 1);
}

#[tokio::test]
async fn empty_update_removes_all_children() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let task_ids: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();

    let response = app
        .send(with_cookie(
            json_request("POST", "/experiments", experiment_payload(&app, &task_ids)),
            &cookie,
        ))
        .await;
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .send(with_cookie(
            json_request(
                "POST",
                &format!("/experiments/{id}"),
                json!({
                    "taskType": "cloze",
                    "title": "Test experiment",
                    "instructions": "",
                    "practiceTask": null,
                    "tasks": [],
                    "ratings": [],
                    "assignments": []
                }),
            ),
            &cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["taskType"], "cloze");
    assert_eq!(body["practiceTask"], Value::Null);
    assert!(body["tasks"].as_array().unwrap().is_empty());
    assert!(body["ratings"].as_array().unwrap().is_empty());
    assert!(body["assignments"]
        .as_array()
        .unwrap()
        .iter()
        .all(|assignment| assignment["tasks"].as_array().unwrap().is_empty()));
}

#[tokio::test]
async fn bad_drafts_map_to_client_errors() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let task_ids = vec![Uuid::new_v4()];

    let response = app
        .send(with_cookie(
            json_request("POST", "/experiments", json!({"title": "missing type"})),
            &cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(with_cookie(
            json_request("POST", "/experiments", json!({"taskType": "cloze", "title": ""})),
            &cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(with_cookie(
            json_request("POST", "/experiments", experiment_payload(&app, &task_ids)),
            &cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send(with_cookie(
            json_request(
                "POST",
                "/experiments",
                json!({
                    "taskType": "cloze",
                    "title": "Thief",
                    "tasks": [{"id": task_ids[0], "data": {}}]
                }),
            ),
            &cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .send(with_cookie(
            json_request("POST", &format!("/experiments/{}", Uuid::new_v4()), json!({"taskType": "cloze", "title": "Nope"})),
            &cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn device_runs_through_assigned_tasks() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let task_ids: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();

    let response = app
        .send(with_cookie(
            json_request("POST", "/experiments", experiment_payload(&app, &task_ids)),
            &cookie,
        ))
        .await;
    let experiment_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let device_key = app.register_device(&app.participants[0]).await;

    let response = app
        .send(with_device(get("/api/experiments"), &device_key))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let experiments = body_json(response).await;
    assert_eq!(experiments[0]["id"], experiment_id.as_str());
    assert_eq!(experiments[0]["nTasks"], 2);
    assert_eq!(experiments[0]["nTasksDone"], 0);

    let response = app
        .send(with_device(
            get(&format!("/api/experiments/{experiment_id}")),
            &device_key,
        ))
        .await;
    let detail = body_json(response).await;
    assert_eq!(detail["instructions"], "Read carefully.");
    assert_eq!(detail["practiceTask"]["label"], "practice");
    assert_eq!(detail["ratings"].as_array().unwrap().len(), 1);

    let start_uri = format!("/api/experiments/{experiment_id}/start");
    for expected in &task_ids {
        let response = app
            .send(with_device(json_request("POST", &start_uri, json!({})), &device_key))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let task = body_json(response).await;
        assert_eq!(task["id"], json!(expected));

        let response = app
            .send(with_device(
                json_request(
                    "POST",
                    &format!("/api/tasks/{expected}/finish"),
                    json!({"results": {"answer": "42"}}),
                ),
                &device_key,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["results"]["answer"], "42");
    }

    let response = app
        .send(with_device(json_request("POST", &start_uri, json!({})), &device_key))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "no tasks available");
}

#[tokio::test]
async fn device_routes_reject_unknown_keys() {
    let app = TestApp::new();

    let response = app.send(get("/api/experiments")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(with_device(get("/api/experiments"), "not-a-device-key"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(json_request(
            "POST",
            "/api/register",
            json!({"participantId": app.participants[0].id, "registrationKey": "wrong"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn device_unregister_revokes_key() {
    let app = TestApp::new();
    let participant = &app.participants[1];
    let device_key = app.register_device(participant).await;

    let response = app
        .send(with_device(json_request("POST", "/api/unregister", json!({})), &device_key))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(with_device(get("/api/experiments"), &device_key))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(get(&format!("/registration/{}", participant.id)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn researcher_manages_participants() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let response = app
        .send(with_cookie(json_request("POST", "/participants", json!({})), &cookie))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["registrationUrl"], format!("/registration/{id}"));

    let response = app.send(with_cookie(get("/participants"), &cookie)).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 3);

    let response = app
        .send(with_cookie(
            json_request("POST", &format!("/participants/{id}/unregister"), json!({})),
            &cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_ne!(body["registrationKey"], created["registrationKey"]);
}

#[tokio::test]
async fn new_experiment_view_lists_participants() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let response = app.send(with_cookie(get("/experiments/new"), &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let draft = body_json(response).await;
    assert_eq!(draft["title"], "");
    assert_eq!(draft["assignments"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let response = app.send(get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}
