//! Drives the router end to end over in-memory storage.

use api::types::{
    ActivityResponse, AuthResponse, AwardResponse, LeaderboardResponse, ModuleResponse, ProgressResponse,
    SubmissionResponse, UserResponse,
};
use api::{AppState, router};
use aware_core::model::{
    ALREADY_AWARDED_MESSAGE, ActivitySubmission, CompletionStatus, ModuleProgress, PublicAssessment, Role,
};
use aware_core::time::fixed_now;
use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use serde_json::{Value, json};
use services::{AppServices, Clock, Registration, ServiceSettings};

fn services() -> AppServices {
    AppServices::in_memory(
        Clock::fixed(fixed_now()),
        &ServiceSettings::with_secret("http-test-secret"),
    )
}

fn server(services: &AppServices) -> TestServer {
    TestServer::new(router(AppState::new(services.clone(), 70))).unwrap()
}

fn bearer(token: &str) -> HeaderValue {
    format!("Bearer {token}").parse::<HeaderValue>().unwrap()
}

async fn admin_token(services: &AppServices) -> String {
    let auth = services.auth();
    let admin = auth
        .register_with_role(
            Registration {
                username: "admin".into(),
                email: "admin@example.com".into(),
                password: "admin-password".into(),
                ..Registration::default()
            },
            Role::Admin,
        )
        .await
        .unwrap();
    auth.issue(&admin).unwrap().token
}

async fn register(server: &TestServer, username: &str) -> AuthResponse {
    let response = server
        .post("/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "correct horse",
            "first_name": "Ada",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<AuthResponse>()
}

fn quiz(module_id: u64) -> Value {
    let questions: Vec<Value> = (1..=5)
        .map(|n| {
            json!({
                "text": format!("Question {n}"),
                "answers": [
                    { "text": "right", "is_correct": true },
                    { "text": "wrong", "is_correct": false },
                ],
            })
        })
        .collect();
    json!({
        "module_id": module_id,
        "title": "Phishing check",
        "questions": questions,
    })
}

#[tokio::test]
async fn health_is_public() {
    let server = server(&services());
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_login_and_me() {
    let server = server(&services());
    let registered = register(&server, "learner").await;
    assert_eq!(registered.user.role, Role::User);
    assert_eq!(registered.user.display_name, "Ada");

    let login = server
        .post("/auth/login")
        .json(&json!({ "username": "learner@example.com", "password": "correct horse" }))
        .await;
    login.assert_status_ok();
    let session: AuthResponse = login.json();

    let me = server
        .get("/auth/me")
        .add_header(header::AUTHORIZATION, bearer(&session.token))
        .await;
    me.assert_status_ok();
    let user: UserResponse = me.json();
    assert_eq!(user.username, "learner");
}

#[tokio::test]
async fn rejects_bad_password_and_duplicate_username() {
    let server = server(&services());
    register(&server, "learner").await;

    let wrong = server
        .post("/auth/login")
        .json(&json!({ "login": "learner", "password": "nope nope nope" }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);

    let duplicate = server
        .post("/auth/register")
        .json(&json!({
            "username": "learner",
            "email": "other@example.com",
            "password": "correct horse",
        }))
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);
    let body: Value = duplicate.json();
    assert!(body["error"].as_str().unwrap().contains("already in use"));
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let server = server(&services());

    server.get("/dashboard").await.assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/dashboard")
        .add_header(header::AUTHORIZATION, bearer("not-a-token"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn learners_cannot_author_modules() {
    let server = server(&services());
    let learner = register(&server, "learner").await;

    let response = server
        .post("/modules")
        .add_header(header::AUTHORIZATION, bearer(&learner.token))
        .json(&json!({ "title": "Sneaky" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn untouched_module_reports_not_started_and_unknown_module_is_404() {
    let services = services();
    let server = server(&services);
    let admin = admin_token(&services).await;
    let learner = register(&server, "learner").await;

    let module: ModuleResponse = server
        .post("/modules")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "title": "Safe Browsing", "section_count": 2 }))
        .await
        .json();

    let fresh = server
        .get(&format!("/progress/{}", module.id))
        .add_header(header::AUTHORIZATION, bearer(&learner.token))
        .await;
    fresh.assert_status_ok();
    let progress: ModuleProgress = fresh.json();
    assert_eq!(progress.status(), CompletionStatus::NotStarted);

    server
        .get("/progress/999")
        .add_header(header::AUTHORIZATION, bearer(&learner.token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn passing_quiz_completes_module_awards_badge_once_and_ranks_learner() {
    let services = services();
    let server = server(&services);
    let admin = admin_token(&services).await;
    let learner = register(&server, "learner").await;

    let created = server
        .post("/modules")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({
            "title": "Phishing Awareness",
            "description": "Spot the phish",
            "difficulty": "BEGINNER",
            "section_count": 3,
            "points": 100,
        }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let module: ModuleResponse = created.json();

    let badge = server
        .post("/badges")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({
            "name": "Phish Spotter",
            "description": "Completed phishing awareness",
            "module_id": module.id,
        }))
        .await;
    badge.assert_status(StatusCode::CREATED);
    let badge: Value = badge.json();

    server
        .post("/assessments")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&quiz(module.id.value()))
        .await
        .assert_status(StatusCode::CREATED);

    let sections = server
        .post(&format!("/progress/{}/sections", module.id))
        .add_header(header::AUTHORIZATION, bearer(&learner.token))
        .json(&json!({ "completed_sections": 1 }))
        .await;
    sections.assert_status_ok();
    let partial: ProgressResponse = sections.json();
    assert_eq!(partial.progress.status(), CompletionStatus::InProgress);
    assert_eq!(partial.progress.progress_percentage(), 33);

    let assessment: PublicAssessment = server
        .get(&format!("/assessments/module/{}", module.id))
        .add_header(header::AUTHORIZATION, bearer(&learner.token))
        .await
        .json();
    assert_eq!(assessment.passing_score, 70);

    // Answers are listed in authoring order, so index 0 is the right one.
    let answers: Vec<Value> = assessment
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let pick = if i < 4 { 0 } else { 1 };
            json!({ "question_id": q.id, "answer_id": q.answers[pick].id })
        })
        .collect();
    let submitted = server
        .post("/assessments/submit")
        .add_header(header::AUTHORIZATION, bearer(&learner.token))
        .json(&json!({ "assessment_id": assessment.id, "answers": answers }))
        .await;
    submitted.assert_status_ok();
    let result: SubmissionResponse = submitted.json();
    assert_eq!(result.score.score, 80);
    assert!(result.score.passed);
    assert!(result.module_completed);
    assert_eq!(result.awarded_badges.len(), 1);

    let again = server
        .post("/badges/award")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "user_id": learner.user.id, "badge_id": badge["id"] }))
        .await;
    again.assert_status_ok();
    let again: AwardResponse = again.json();
    assert!(!again.success);
    assert_eq!(again.message, ALREADY_AWARDED_MESSAGE);
    assert!(again.badge.is_none());

    let mine: Vec<Value> = server
        .get("/badges/me")
        .add_header(header::AUTHORIZATION, bearer(&learner.token))
        .await
        .json();
    assert_eq!(mine.len(), 1);

    let board: LeaderboardResponse = server.get("/leaderboard?limit=5").await.json();
    assert_eq!(board.limit, 5);
    assert_eq!(board.entries.len(), 1);
    assert_eq!(board.entries[0].username, "learner");
    assert_eq!(board.entries[0].total_points, 100);

    let dashboard: Value = server
        .get("/dashboard")
        .add_header(header::AUTHORIZATION, bearer(&learner.token))
        .await
        .json();
    assert_eq!(dashboard["modules_completed"], 1);
    assert_eq!(dashboard["rank"], 1);
}

#[tokio::test]
async fn duplicate_assessment_for_module_conflicts() {
    let services = services();
    let server = server(&services);
    let admin = admin_token(&services).await;

    let module: ModuleResponse = server
        .post("/modules")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "title": "Password Security" }))
        .await
        .json();

    server
        .post("/assessments")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&quiz(module.id.value()))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/assessments")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&quiz(module.id.value()))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn activities_credit_points_and_list_newest_first() {
    let services = services();
    let server = server(&services);
    let admin = admin_token(&services).await;
    let learner = register(&server, "learner").await;

    let module: ModuleResponse = server
        .post("/modules")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "title": "Spot the Phish", "section_count": 4 }))
        .await
        .json();

    let first = server
        .post("/activities/submit")
        .add_header(header::AUTHORIZATION, bearer(&learner.token))
        .json(&json!({ "module_id": module.id, "activity_key": "inbox-triage", "score": 80 }))
        .await;
    first.assert_status_ok();
    let first: ActivityResponse = first.json();
    assert_eq!(first.submission.points, 8);
    assert_eq!(first.progress.status(), CompletionStatus::InProgress);
    assert_eq!(first.progress.points_earned(), 8);

    let second: ActivityResponse = server
        .post("/activities/submit")
        .add_header(header::AUTHORIZATION, bearer(&learner.token))
        .json(&json!({ "module_id": module.id, "activity_key": "link-hover", "score": 50 }))
        .await
        .json();
    assert_eq!(second.submission.points, 5);
    assert_eq!(second.progress.points_earned(), 13);

    server
        .post("/activities/submit")
        .add_header(header::AUTHORIZATION, bearer(&learner.token))
        .json(&json!({ "module_id": module.id, "activity_key": "too-good", "score": 101 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .post("/activities/submit")
        .add_header(header::AUTHORIZATION, bearer(&learner.token))
        .json(&json!({ "module_id": 999, "activity_key": "inbox-triage", "score": 80 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let history = server
        .get("/activities")
        .add_header(header::AUTHORIZATION, bearer(&learner.token))
        .await;
    history.assert_status_ok();
    let history: Vec<ActivitySubmission> = history.json();
    let keys: Vec<&str> = history.iter().map(|a| a.activity_key.as_str()).collect();
    assert_eq!(keys, ["link-hover", "inbox-triage"]);
}
