use okra_core::db::open_db_in_memory;
use okra_core::{
    AssignmentRepository, AssignmentService, AssignmentServiceError, ExperimentDraft,
    ExperimentId, ExperimentService, Participant, ParticipantId, ParticipantRepository,
    RepoError, SqliteAssignmentRepository, SqliteExperimentRepository,
    SqliteParticipantRepository, TaskId,
};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

struct Fixture {
    conn: Connection,
    participant: ParticipantId,
    experiment: ExperimentId,
    tasks: Vec<TaskId>,
}

/// One experiment with three tasks, all assigned to one participant in
/// reverse list order.
fn fixture() -> Fixture {
    let mut conn = open_db_in_memory().unwrap();
    let participant = Participant::new();
    SqliteParticipantRepository::try_new(&conn)
        .unwrap()
        .create_participant(&participant)
        .unwrap();

    let tasks: Vec<TaskId> = (0..3).map(|_| Uuid::new_v4()).collect();
    let draft: ExperimentDraft = serde_json::from_value(json!({
        "taskType": "lexical-decision",
        "title": "Words",
        "practiceTask": {"label": "practice", "data": {"word": "tabel"}},
        "tasks": tasks.iter().map(|id| json!({"id": id, "data": {"word": id.to_string()}})).collect::<Vec<_>>(),
        "ratings": [{"question": "Confidence?", "type": "radio"}],
        "assignments": [{
            "participant": participant.id,
            "tasks": tasks.iter().rev().map(|id| json!({"id": id})).collect::<Vec<_>>()
        }]
    }))
    .unwrap();

    let experiment = ExperimentService::new(SqliteExperimentRepository::try_new(&mut conn).unwrap())
        .create_experiment(&draft)
        .unwrap()
        .id;

    Fixture {
        conn,
        participant: participant.id,
        experiment,
        tasks,
    }
}

#[test]
fn start_task_hands_out_tasks_in_assignment_order_until_exhausted() {
    let mut fx = fixture();
    let mut service =
        AssignmentService::new(SqliteAssignmentRepository::try_new(&mut fx.conn).unwrap());

    assert_eq!(service.n_tasks(fx.experiment, fx.participant).unwrap(), 3);
    assert_eq!(service.n_tasks_done(fx.experiment, fx.participant).unwrap(), 0);

    let handed_out: Vec<TaskId> = (0..3)
        .map(|_| service.start_task(fx.experiment, fx.participant).unwrap().id)
        .collect();
    let expected: Vec<TaskId> = fx.tasks.iter().rev().copied().collect();
    assert_eq!(handed_out, expected);
    assert_eq!(service.n_tasks_done(fx.experiment, fx.participant).unwrap(), 3);

    let err = service
        .start_task(fx.experiment, fx.participant)
        .unwrap_err();
    assert!(matches!(err, AssignmentServiceError::NoTasksAvailable(id) if id == fx.experiment));
    assert_eq!(err.to_string(), "no tasks available");
}

#[test]
fn start_task_is_scoped_to_the_experiment() {
    let mut fx = fixture();
    let mut service =
        AssignmentService::new(SqliteAssignmentRepository::try_new(&mut fx.conn).unwrap());

    let err = service
        .start_task(Uuid::new_v4(), fx.participant)
        .unwrap_err();
    assert!(matches!(err, AssignmentServiceError::NoTasksAvailable(_)));
    assert_eq!(service.n_tasks_done(fx.experiment, fx.participant).unwrap(), 0);
}

#[test]
fn finish_task_stores_results_once() {
    let mut fx = fixture();
    let mut service =
        AssignmentService::new(SqliteAssignmentRepository::try_new(&mut fx.conn).unwrap());
    let task = service.start_task(fx.experiment, fx.participant).unwrap();

    let results = json!({"answer": "word", "reactionMs": 532});
    let finished = service
        .finish_task(task.id, fx.participant, &results)
        .unwrap();
    assert_eq!(finished.results.as_ref(), Some(&results));
    assert!(finished.finished_time.unwrap() >= finished.started_time.unwrap());

    let err = service
        .finish_task(task.id, fx.participant, &results)
        .unwrap_err();
    assert!(matches!(err, AssignmentServiceError::AssignmentNotFound(id) if id == task.id));

    let rows = service
        .assignments_for(fx.experiment, fx.participant)
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].task_id, task.id);
    assert!(rows[0].is_finished());
    assert!(rows[1..].iter().all(|row| row.is_available()));
}

#[test]
fn finish_task_requires_an_assignment() {
    let mut fx = fixture();
    let mut service =
        AssignmentService::new(SqliteAssignmentRepository::try_new(&mut fx.conn).unwrap());

    let err = service
        .finish_task(fx.tasks[0], Uuid::new_v4(), &json!({}))
        .unwrap_err();
    assert!(matches!(err, AssignmentServiceError::AssignmentNotFound(_)));
}

#[test]
fn finishing_an_unstarted_task_is_rejected() {
    let mut fx = fixture();
    let first = fx.tasks[2];
    {
        let mut service =
            AssignmentService::new(SqliteAssignmentRepository::try_new(&mut fx.conn).unwrap());

        let err = service
            .finish_task(first, fx.participant, &json!({"answer": "early"}))
            .unwrap_err();
        assert!(matches!(err, AssignmentServiceError::AssignmentNotFound(id) if id == first));

        let started = service.start_task(fx.experiment, fx.participant).unwrap();
        assert_eq!(started.id, first);
        let finished = service
            .finish_task(first, fx.participant, &json!({"answer": "late"}))
            .unwrap();
        assert!(finished.finished_time.unwrap() >= finished.started_time.unwrap());

        let rows = service
            .assignments_for(fx.experiment, fx.participant)
            .unwrap();
        assert!(rows[0].is_finished());
    }

    let detail = ExperimentService::new(SqliteExperimentRepository::try_new(&mut fx.conn).unwrap())
        .experiment_detail(fx.experiment)
        .unwrap();
    assert_eq!(detail.id, fx.experiment);
}

#[test]
fn out_of_order_stamps_do_not_block_reads() {
    let mut fx = fixture();
    fx.conn
        .execute(
            "UPDATE task_assignments SET started_time = 2000, finished_time = 1000, results = '{}'
             WHERE task_id = ?1;",
            [fx.tasks[0].to_string()],
        )
        .unwrap();

    {
        let service =
            AssignmentService::new(SqliteAssignmentRepository::try_new(&mut fx.conn).unwrap());
        let rows = service
            .assignments_for(fx.experiment, fx.participant)
            .unwrap();
        let stored = rows.iter().find(|row| row.task_id == fx.tasks[0]).unwrap();
        assert_eq!(stored.started_time, Some(2000));
        assert_eq!(stored.finished_time, Some(1000));
    }

    let mut experiments =
        ExperimentService::new(SqliteExperimentRepository::try_new(&mut fx.conn).unwrap());
    let detail = experiments.experiment_detail(fx.experiment).unwrap();
    assert_eq!(experiments.update_experiment(fx.experiment, &detail.draft).unwrap(), detail);
}

#[test]
fn experiments_for_reports_progress() {
    let mut fx = fixture();
    let mut service =
        AssignmentService::new(SqliteAssignmentRepository::try_new(&mut fx.conn).unwrap());
    service.start_task(fx.experiment, fx.participant).unwrap();

    let experiments = service.experiments_for(fx.participant).unwrap();
    assert_eq!(experiments.len(), 1);
    assert_eq!(experiments[0].id, fx.experiment);
    assert_eq!(experiments[0].title, "Words");
    assert_eq!(experiments[0].n_tasks, 3);
    assert_eq!(experiments[0].n_tasks_done, 1);

    let detail = service
        .experiment_for(fx.experiment, fx.participant)
        .unwrap();
    assert_eq!(detail.summary.n_tasks_done, 1);
    assert_eq!(detail.ratings.len(), 1);
    assert_eq!(detail.practice_task.unwrap().label, "practice");

    assert!(service.experiments_for(Uuid::new_v4()).unwrap().is_empty());
    assert!(matches!(
        service
            .experiment_for(fx.experiment, Uuid::new_v4())
            .unwrap_err(),
        AssignmentServiceError::ExperimentNotFound(_)
    ));
}

#[test]
fn duplicate_assignment_is_a_conflict() {
    let mut fx = fixture();
    let repo = SqliteAssignmentRepository::try_new(&mut fx.conn).unwrap();

    let err = repo
        .create_assignment(fx.participant, fx.tasks[0])
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));
}
