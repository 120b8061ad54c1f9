use prepline_coordination_rs::audit::AuditTrail;
use prepline_coordination_rs::claimer::{ClaimOutcome, TaskClaimer, TaskStatus};
use prepline_coordination_rs::context::CoordinationContext;

fn create_claimer() -> TaskClaimer {
    TaskClaimer::new(CoordinationContext::new_simulated(0), AuditTrail::default())
}

#[test]
fn test_second_worker_sees_first_claim() {
    let claimer = create_claimer();

    assert_eq!(claimer.claim("t1", "w1"), ClaimOutcome::Claimed);

    match claimer.claim("t1", "w2") {
        ClaimOutcome::AlreadyClaimed { current } => {
            assert_eq!(current.worker_id, "w1");
            assert_eq!(current.status, TaskStatus::InProgress);
        }
        other => panic!("expected AlreadyClaimed, got {:?}", other),
    }
}

#[test]
fn test_concurrent_claims_exactly_one_winner() {
    let claimer = create_claimer();

    let mut handles = Vec::new();
    for i in 0..16 {
        let claimer = claimer.clone();
        handles.push(std::thread::spawn(move || {
            matches!(
                claimer.claim("t-race", &format!("w{}", i)),
                ClaimOutcome::Claimed
            )
        }));
    }

    let wins: usize = handles
        .into_iter()
        .map(|h| h.join().unwrap() as usize)
        .sum();
    assert_eq!(wins, 1, "exactly one worker must win the claim");

    let claim = claimer.status("t-race").unwrap();
    assert_eq!(claim.status, TaskStatus::InProgress);
}

#[test]
fn test_completion_is_idempotent_and_terminal() {
    let claimer = create_claimer();
    claimer.claim("t1", "w1");

    claimer.complete("t1");
    assert_eq!(claimer.status("t1").unwrap().status, TaskStatus::Completed);

    // Repeated completion and completion of unknown tasks are no-ops
    claimer.complete("t1");
    claimer.complete("t-unknown");
    assert_eq!(claimer.status("t1").unwrap().status, TaskStatus::Completed);

    // No transition out of Completed, even for a fresh claim attempt
    match claimer.claim("t1", "w2") {
        ClaimOutcome::AlreadyClaimed { current } => {
            assert_eq!(current.status, TaskStatus::Completed);
            assert_eq!(current.worker_id, "w1");
        }
        other => panic!("expected AlreadyClaimed, got {:?}", other),
    }
}

#[test]
fn test_claims_audited_per_task() {
    let audit = AuditTrail::default();
    let claimer = TaskClaimer::new(CoordinationContext::new_simulated(0), audit.clone());

    claimer.claim("t1", "w1");
    claimer.complete("t1");

    let history = audit.history("t1");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].action, "TASK_CLAIMED");
    assert_eq!(history[0].actor, "w1");
    assert_eq!(history[1].action, "TASK_COMPLETED");
}
