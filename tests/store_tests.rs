// tests/store_tests.rs

use examsim::{
    db,
    error::AppError,
    models::{
        attempt::RecordResponseRequest,
        exam::{AddExamQuestionRequest, CreateExamRequest, UpdateExamQuestionRequest},
        question::{ContentStatus, CreateQuestionRequest, OptionInput, QuestionDetail, QuestionType},
        topic::{CreateTopicRequest, Topic, UpdateTopicRequest},
        user::{NewUser, User, VerificationState},
    },
    store::{attempts, exams, questions, topics, users},
    utils::hash::hash_password,
};
use sqlx::SqlitePool;

async fn pool() -> SqlitePool {
    let pool = db::connect("sqlite::memory:").await.unwrap();
    db::migrate(&pool).await.unwrap();
    pool
}

async fn user(pool: &SqlitePool, email: &str) -> User {
    users::create(
        pool,
        &NewUser::registration(email, hash_password("password123").unwrap(), "Test", "User"),
    )
    .await
    .unwrap()
}

async fn topic(pool: &SqlitePool, name: &str, parent_id: Option<i64>) -> Topic {
    topics::create(
        pool,
        &CreateTopicRequest {
            name: name.to_string(),
            slug: None,
            parent_id,
        },
    )
    .await
    .unwrap()
}

async fn question(pool: &SqlitePool, text: &str, topic_id: Option<i64>) -> QuestionDetail {
    questions::create(
        pool,
        &CreateQuestionRequest {
            topic_id,
            text: text.to_string(),
            question_type: QuestionType::Multi,
            difficulty: 3,
            explanation: None,
            options: vec![
                OptionInput { text: "a".into(), is_correct: true },
                OptionInput { text: "b".into(), is_correct: true },
                OptionInput { text: "c".into(), is_correct: false },
            ],
        },
    )
    .await
    .unwrap()
}

fn exam_request(title: &str) -> CreateExamRequest {
    CreateExamRequest {
        title: title.to_string(),
        slug: None,
        description: String::new(),
        duration_minutes: 45,
    }
}

fn add(question_id: i64, position: i64) -> AddExamQuestionRequest {
    AddExamQuestionRequest {
        question_id,
        marks: 1.0,
        position,
    }
}

#[tokio::test]
async fn confirm_consumes_the_code() {
    let pool = pool().await;
    let created = user(&pool, "Mixed@Example.com").await;
    assert_eq!(created.verification_state(), VerificationState::UnverifiedNoCode);
    assert!(!created.is_active);

    users::set_verification_code(&pool, created.id, "123456").await.unwrap();
    let pending = users::get(&pool, created.id).await.unwrap();
    assert_eq!(pending.verification_state(), VerificationState::CodeSent);

    assert!(matches!(
        users::confirm(&pool, "mixed@example.com", "654321").await,
        Err(AppError::CodeMismatch)
    ));
    assert!(matches!(
        users::confirm(&pool, "nobody@example.com", "123456").await,
        Err(AppError::NotFound(_))
    ));

    // Email lookup ignores case
    let verified = users::confirm(&pool, "mixed@example.com", "123456").await.unwrap();
    assert_eq!(verified.verification_state(), VerificationState::Verified);
    assert!(verified.is_active && verified.is_verified);

    assert!(matches!(
        users::confirm(&pool, "mixed@example.com", "123456").await,
        Err(AppError::CodeMismatch)
    ));
}

#[tokio::test]
async fn authenticate_hides_which_part_failed() {
    let pool = pool().await;
    user(&pool, "auth@example.com").await;

    assert!(users::authenticate(&pool, "auth@example.com", "password123").await.is_ok());
    assert!(matches!(
        users::authenticate(&pool, "auth@example.com", "nope").await,
        Err(AppError::InvalidCredentials)
    ));
    assert!(matches!(
        users::authenticate(&pool, "ghost@example.com", "password123").await,
        Err(AppError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn duplicate_email_is_a_duplicate_key() {
    let pool = pool().await;
    user(&pool, "same@example.com").await;

    let again = users::create(
        &pool,
        &NewUser::registration("SAME@example.com", "hash".into(), "", ""),
    )
    .await;
    match again {
        Err(AppError::DuplicateKey(msg)) => {
            assert_eq!(msg, "A user with this email already exists.")
        }
        other => panic!("expected a duplicate email, got {:?}", other),
    }
}

fn with_phone(email: &str, phone: Option<&str>) -> NewUser {
    NewUser {
        phone_number: phone.map(str::to_string),
        ..NewUser::registration(email, "hash".into(), "", "")
    }
}

#[tokio::test]
async fn duplicate_phone_number_is_a_duplicate_key() {
    let pool = pool().await;
    users::create(&pool, &with_phone("first@example.com", Some("+15550100")))
        .await
        .unwrap();

    match users::create(&pool, &with_phone("second@example.com", Some("+15550100"))).await {
        Err(AppError::DuplicateKey(msg)) => {
            assert_eq!(msg, "A user with this phone number already exists.")
        }
        other => panic!("expected a duplicate phone number, got {:?}", other),
    }
}

#[tokio::test]
async fn users_without_phone_numbers_coexist() {
    let pool = pool().await;
    users::create(&pool, &with_phone("one@example.com", None)).await.unwrap();
    users::create(&pool, &with_phone("two@example.com", None)).await.unwrap();

    assert_eq!(users::list(&pool).await.unwrap().len(), 2);
}

#[tokio::test]
async fn topic_slugs_get_suffixes_unless_explicit() {
    let pool = pool().await;
    let first = topic(&pool, "Linear Algebra", None).await;
    let second = topic(&pool, "Linear  algebra!", None).await;
    let third = topic(&pool, "linear algebra", None).await;
    assert_eq!(first.slug, "linear-algebra");
    assert_eq!(second.slug, "linear-algebra-2");
    assert_eq!(third.slug, "linear-algebra-3");

    let explicit = topics::create(
        &pool,
        &CreateTopicRequest {
            name: "Other".into(),
            slug: Some("linear-algebra".into()),
            parent_id: None,
        },
    )
    .await;
    assert!(matches!(explicit, Err(AppError::DuplicateKey(_))));
}

#[tokio::test]
async fn topic_cannot_move_under_its_descendant() {
    let pool = pool().await;
    let root = topic(&pool, "Science", None).await;
    let child = topic(&pool, "Physics", Some(root.id)).await;
    let grandchild = topic(&pool, "Optics", Some(child.id)).await;

    let moved = topics::update(
        &pool,
        root.id,
        &UpdateTopicRequest {
            parent_id: Some(Some(grandchild.id)),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(moved, Err(AppError::Validation(_))));

    let own = topics::update(
        &pool,
        root.id,
        &UpdateTopicRequest {
            parent_id: Some(Some(root.id)),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(own, Err(AppError::Validation(_))));
    assert_eq!(topics::get(&pool, root.id).await.unwrap().parent_id, None);

    // Detaching is always allowed
    let detached = topics::update(
        &pool,
        grandchild.id,
        &UpdateTopicRequest {
            parent_id: Some(None),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(detached.parent_id, None);
    assert_eq!(topics::tree(&pool).await.unwrap().len(), 2);
}

#[tokio::test]
async fn topic_delete_cascades_and_unfiles_questions() {
    let pool = pool().await;
    let root = topic(&pool, "History", None).await;
    let child = topic(&pool, "Ancient", Some(root.id)).await;
    let filed = question(&pool, "Who built it?", Some(child.id)).await;

    topics::delete(&pool, root.id).await.unwrap();

    assert!(matches!(topics::get(&pool, child.id).await, Err(AppError::NotFound(_))));
    let after = questions::get(&pool, filed.question.id).await.unwrap();
    assert_eq!(after.question.topic_id, None);
    assert!(matches!(topics::delete(&pool, root.id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn question_option_rules_are_enforced() {
    let pool = pool().await;

    let true_false = questions::create(
        &pool,
        &CreateQuestionRequest {
            topic_id: None,
            text: "The sky is green.".into(),
            question_type: QuestionType::TrueFalse,
            difficulty: 1,
            explanation: None,
            options: vec![
                OptionInput { text: "True".into(), is_correct: true },
                OptionInput { text: "False".into(), is_correct: true },
            ],
        },
    )
    .await;
    assert!(matches!(true_false, Err(AppError::Validation(_))));

    // Two correct options do not fit a SINGLE question
    let multi = question(&pool, "Pick all", None).await;
    let changed = questions::update(
        &pool,
        multi.question.id,
        &examsim::models::question::UpdateQuestionRequest {
            question_type: Some(QuestionType::Single),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(changed, Err(AppError::Validation(_))));

    let sanitized = question(&pool, "<script>alert(1)</script>Safe", None).await;
    assert_eq!(sanitized.question.text, "Safe");
}

#[tokio::test]
async fn exam_questions_sort_by_position_then_insertion() {
    let pool = pool().await;
    let creator = user(&pool, "creator@example.com").await;
    let exam = exams::create(&pool, creator.id, &exam_request("Ordering")).await.unwrap();

    let a = question(&pool, "a", None).await.question.id;
    let b = question(&pool, "b", None).await.question.id;
    let c = question(&pool, "c", None).await.question.id;
    let d = question(&pool, "d", None).await.question.id;

    exams::add_question(&pool, exam.id, &add(a, 5)).await.unwrap();
    exams::add_question(&pool, exam.id, &add(b, 1)).await.unwrap();
    exams::add_question(&pool, exam.id, &add(c, 5)).await.unwrap();
    exams::add_question(&pool, exam.id, &add(d, 0)).await.unwrap();

    let order: Vec<i64> = exams::list_questions(&pool, exam.id)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.question_id)
        .collect();
    assert_eq!(order, vec![d, b, a, c]);

    exams::update_question(
        &pool,
        exam.id,
        c,
        &UpdateExamQuestionRequest {
            position: Some(2),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let order: Vec<i64> = exams::list_questions(&pool, exam.id)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.question_id)
        .collect();
    assert_eq!(order, vec![d, b, c, a]);

    let duplicate = exams::add_question(&pool, exam.id, &add(a, 9)).await;
    assert!(matches!(duplicate, Err(AppError::DuplicateKey(_))));

    exams::remove_question(&pool, exam.id, a).await.unwrap();
    assert!(matches!(
        exams::remove_question(&pool, exam.id, a).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn retired_question_cannot_join_an_exam() {
    let pool = pool().await;
    let creator = user(&pool, "retire@example.com").await;
    let exam = exams::create(&pool, creator.id, &exam_request("Retired")).await.unwrap();
    let retired = question(&pool, "Old", None).await.question.id;

    questions::retire(&pool, retired).await.unwrap();
    assert_eq!(
        questions::get(&pool, retired).await.unwrap().question.status,
        ContentStatus::Retired
    );

    let added = exams::add_question(&pool, exam.id, &add(retired, 0)).await;
    assert!(matches!(added, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn deleting_a_user_removes_their_exams_and_attempts() {
    let pool = pool().await;
    let creator = user(&pool, "owner@example.com").await;
    let exam = exams::create(&pool, creator.id, &exam_request("Owned")).await.unwrap();
    let attempt = attempts::start(&pool, creator.id, exam.id).await.unwrap();

    users::delete(&pool, creator.id).await.unwrap();

    assert!(matches!(exams::get(&pool, exam.id).await, Err(AppError::NotFound(_))));
    assert!(matches!(attempts::get(&pool, attempt.id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn responses_are_checked_against_the_exam() {
    let pool = pool().await;
    let taker = user(&pool, "taker@example.com").await;
    let exam = exams::create(&pool, taker.id, &exam_request("Responses")).await.unwrap();
    let asked = question(&pool, "asked", None).await;
    let second = question(&pool, "second", None).await;
    let outside = question(&pool, "outside", None).await;
    exams::add_question(&pool, exam.id, &add(asked.question.id, 0)).await.unwrap();
    exams::add_question(&pool, exam.id, &add(second.question.id, 1)).await.unwrap();

    let attempt = attempts::start(&pool, taker.id, exam.id).await.unwrap();
    let correct: Vec<i64> = asked
        .options
        .iter()
        .filter(|o| o.is_correct)
        .map(|o| o.id)
        .collect();

    let response = |question_id: i64, selected_options: Vec<i64>| RecordResponseRequest {
        question_id,
        selected_options,
        time_taken_seconds: 5,
    };

    // Order of the selection does not matter
    let mut reversed = correct.clone();
    reversed.reverse();
    let recorded = attempts::record_response(&pool, &attempt, &response(asked.question.id, reversed))
        .await
        .unwrap();
    assert!(recorded.response.is_correct);

    let again = attempts::record_response(&pool, &attempt, &response(asked.question.id, vec![correct[0]])).await;
    assert!(matches!(again, Err(AppError::DuplicateKey(_))));

    let second_correct = second.options.iter().find(|o| o.is_correct).unwrap().id;
    let partial = attempts::record_response(&pool, &attempt, &response(second.question.id, vec![second_correct]))
        .await
        .unwrap();
    assert!(!partial.response.is_correct);

    let foreign = attempts::record_response(
        &pool,
        &attempt,
        &response(asked.question.id, vec![outside.options[0].id]),
    )
    .await;
    assert!(matches!(foreign, Err(AppError::Validation(_))));

    let not_in_exam =
        attempts::record_response(&pool, &attempt, &response(outside.question.id, vec![])).await;
    assert!(matches!(not_in_exam, Err(AppError::Validation(_))));

    let closed = attempts::submit(&pool, attempt.id).await.unwrap();
    assert!(closed.is_closed());
    assert!(matches!(attempts::submit(&pool, attempt.id).await, Err(AppError::Validation(_))));

    let late = attempts::record_response(&pool, &closed, &response(asked.question.id, correct.clone())).await;
    assert!(matches!(late, Err(AppError::Validation(_))));

    // A stale open copy is still refused once the row is closed
    let stale = attempts::record_response(&pool, &attempt, &response(asked.question.id, correct)).await;
    assert!(matches!(stale, Err(AppError::Validation(_))));

    let detail = attempts::detail(&pool, attempt.id).await.unwrap();
    assert_eq!(detail.responses.len(), 2);

    let graded = attempts::grade(&pool, attempt.id, 1.0, false).await.unwrap();
    assert_eq!(graded.score, Some(1.0));
    assert_eq!(graded.passed, Some(false));
}

#[tokio::test]
async fn retired_exam_refuses_new_attempts() {
    let pool = pool().await;
    let taker = user(&pool, "late@example.com").await;
    let exam = exams::create(&pool, taker.id, &exam_request("Closed")).await.unwrap();

    exams::retire(&pool, exam.id).await.unwrap();

    assert!(matches!(
        attempts::start(&pool, taker.id, exam.id).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        exams::public_view(&pool, &exam.slug).await,
        Err(AppError::NotFound(_))
    ));
}
