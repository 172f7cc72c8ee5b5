use aware_core::model::{
    AnswerDraft, AssessmentAttempt, AssessmentDraft, AwardOutcome, CompletionStatus, Difficulty,
    ModuleDraft, ModuleProgress, Profile, QuestionDraft, Role, Selection,
};
use aware_core::time::fixed_now;
use chrono::Duration;
use storage::repository::{
    AssessmentRepository, AttemptRepository, BadgeRepository, ModuleRepository, NewBadgeRecord,
    NewUserRecord, ProgressRepository, StorageError, UserRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn user(name: &str) -> NewUserRecord {
    NewUserRecord {
        username: name.to_string(),
        email: format!("{name}@example.com"),
        role: Role::User,
        profile: Profile::default(),
        password_hash: "$argon2id$placeholder".into(),
        created_at: fixed_now(),
    }
}

fn module(title: &str, order_index: u32) -> ModuleDraft {
    ModuleDraft {
        title: title.into(),
        description: format!("{title} basics"),
        difficulty: Difficulty::Beginner,
        content: String::new(),
        order_index,
        section_count: 4,
        points: 100,
    }
}

fn quiz(module_id: aware_core::model::ModuleId) -> AssessmentDraft {
    let question = |text: &str| QuestionDraft {
        text: text.into(),
        explanation: Some("Check the sender domain.".into()),
        answers: vec![
            AnswerDraft {
                text: "Report it".into(),
                is_correct: true,
            },
            AnswerDraft {
                text: "Click the link".into(),
                is_correct: false,
            },
        ],
    };
    AssessmentDraft {
        module_id,
        title: "Phishing check".into(),
        passing_score: 70,
        time_limit_secs: Some(300),
        questions: vec![question("Unexpected invoice?"), question("Urgent password reset?")],
    }
}

#[tokio::test]
async fn sqlite_progress_upsert_keeps_one_row() {
    let repo = connect("memdb_progress_upsert").await;
    let alice = repo.insert_user(user("alice")).await.unwrap();
    let phishing = repo
        .insert_module(module("Phishing", 1), fixed_now())
        .await
        .unwrap();

    let mut progress = ModuleProgress::new(alice.id(), phishing.id(), fixed_now());
    progress.start(fixed_now());
    repo.upsert_progress(&progress).await.unwrap();
    progress.record_sections(2, 4, phishing.points(), fixed_now() + Duration::minutes(5));
    repo.upsert_progress(&progress).await.unwrap();

    let rows = repo.list_user_progress(alice.id()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status(), CompletionStatus::InProgress);
    assert_eq!(rows[0].completed_sections(), 2);
    assert_eq!(rows[0].progress_percentage(), 50);
    assert_eq!(rows[0], progress);
}

#[tokio::test]
async fn sqlite_assessment_roundtrip_preserves_order_and_scoring() {
    let repo = connect("memdb_assessment_roundtrip").await;
    let phishing = repo
        .insert_module(module("Phishing", 1), fixed_now())
        .await
        .unwrap();

    let stored = repo.insert_assessment(quiz(phishing.id())).await.unwrap();
    assert_eq!(stored.questions().len(), 2);
    assert_eq!(stored.questions()[0].text, "Unexpected invoice?");
    assert_eq!(stored.time_limit_secs(), Some(300));

    let fetched = repo
        .assessment_for_module(phishing.id())
        .await
        .unwrap()
        .expect("assessment");
    assert_eq!(fetched, stored);

    let selections: Vec<Selection> = fetched
        .questions()
        .iter()
        .map(|q| Selection {
            question_id: q.id,
            answer_id: q.correct_answer().expect("correct answer"),
        })
        .collect();
    let score = fetched.score(&selections);
    assert_eq!(score.score, 100);
    assert!(score.passed);

    let err = repo.insert_assessment(quiz(phishing.id())).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_badge_award_is_idempotent() {
    let repo = connect("memdb_badge_award").await;
    let bob = repo.insert_user(user("bob")).await.unwrap();
    let badge = repo
        .insert_badge(NewBadgeRecord {
            name: "Phish Finder".into(),
            description: "Completed the phishing module".into(),
            image_url: None,
            module_id: None,
            created_at: fixed_now(),
        })
        .await
        .unwrap();

    let first = repo.award_badge(bob.id(), badge.id(), fixed_now()).await.unwrap();
    assert!(first.is_awarded());
    let second = repo
        .award_badge(bob.id(), badge.id(), fixed_now() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(second, AwardOutcome::AlreadyAwarded);

    let held = repo.user_badges(bob.id()).await.unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].badge.name(), "Phish Finder");
    assert_eq!(held[0].awarded_at, fixed_now());
}

#[tokio::test]
async fn sqlite_points_totals_order_by_points_then_user() {
    let repo = connect("memdb_points_totals").await;
    let a = repo.insert_user(user("ann")).await.unwrap();
    let b = repo.insert_user(user("ben")).await.unwrap();
    let c = repo.insert_user(user("cat")).await.unwrap();
    let m1 = repo.insert_module(module("Passwords", 1), fixed_now()).await.unwrap();
    let m2 = repo.insert_module(module("Browsing", 2), fixed_now()).await.unwrap();

    for (who, modules) in [(a.id(), vec![m1.id()]), (b.id(), vec![m1.id(), m2.id()]), (c.id(), vec![m2.id()])] {
        for module_id in modules {
            let mut p = ModuleProgress::new(who, module_id, fixed_now());
            p.complete(100, fixed_now());
            repo.upsert_progress(&p).await.unwrap();
        }
    }

    let totals = repo.points_totals(10).await.unwrap();
    let order: Vec<_> = totals.iter().map(|t| t.user_id).collect();
    assert_eq!(order, vec![b.id(), a.id(), c.id()]);
    assert_eq!(totals[0].total_points, 200);
    assert_eq!(totals[0].modules_completed, 2);

    let top = repo.points_totals(1).await.unwrap();
    assert_eq!(top.len(), 1);
}

#[tokio::test]
async fn sqlite_attempts_list_newest_first() {
    let repo = connect("memdb_attempts").await;
    let dana = repo.insert_user(user("dana")).await.unwrap();
    let m = repo.insert_module(module("Social", 1), fixed_now()).await.unwrap();
    let assessment = repo.insert_assessment(quiz(m.id())).await.unwrap();

    let miss = assessment.score(&[]);
    let first = AssessmentAttempt::from_score(dana.id(), assessment.id(), m.id(), &miss, fixed_now());
    repo.append_attempt(&first).await.unwrap();
    let later = AssessmentAttempt::from_score(
        dana.id(),
        assessment.id(),
        m.id(),
        &miss,
        fixed_now() + Duration::minutes(10),
    );
    let later_id = repo.append_attempt(&later).await.unwrap();

    let attempts = repo.list_attempts(dana.id()).await.unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].id, Some(later_id));
    assert!(!attempts[0].passed);
    assert_eq!(attempts[0].total, 2);
}

#[tokio::test]
async fn sqlite_deleting_module_cascades_progress() {
    let repo = connect("memdb_delete_cascade").await;
    let eve = repo.insert_user(user("eve")).await.unwrap();
    let m = repo.insert_module(module("Browsing", 1), fixed_now()).await.unwrap();
    repo.insert_assessment(quiz(m.id())).await.unwrap();
    repo.upsert_progress(&ModuleProgress::new(eve.id(), m.id(), fixed_now()))
        .await
        .unwrap();

    repo.delete_module(m.id()).await.unwrap();

    assert!(repo.get_module(m.id()).await.unwrap().is_none());
    assert!(repo.assessment_for_module(m.id()).await.unwrap().is_none());
    assert!(repo.list_user_progress(eve.id()).await.unwrap().is_empty());
    assert!(matches!(
        repo.delete_module(m.id()).await.unwrap_err(),
        StorageError::NotFound
    ));
}

#[tokio::test]
async fn sqlite_credentials_match_username_or_email() {
    let repo = connect("memdb_credentials").await;
    let frank = repo.insert_user(user("frank")).await.unwrap();

    let by_name = repo.find_credentials("frank").await.unwrap().expect("by name");
    assert_eq!(by_name.user.id(), frank.id());
    let by_email = repo
        .find_credentials("frank@example.com")
        .await
        .unwrap()
        .expect("by email");
    assert_eq!(by_email.password_hash, "$argon2id$placeholder");

    let err = repo.insert_user(user("frank")).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}
