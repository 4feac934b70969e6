use proptest::prelude::*;
use renderq::engine::retry::{AttemptOutcome, Decision, RetryMachine};
use renderq::types::FailPolicy;

fn policy() -> impl Strategy<Value = FailPolicy> {
    prop_oneof![
        Just(FailPolicy::RetryThenNext),
        Just(FailPolicy::SkipNext),
        Just(FailPolicy::StopQueue),
    ]
}

/// Run the machine over `codes` until it reaches a terminal decision.
fn drive(machine: &mut RetryMachine, codes: &[i32]) -> (Decision, u32) {
    let mut last = Decision::Retry;
    for &code in codes {
        machine.begin_attempt();
        last = machine.record(AttemptOutcome::Exited(code), false);
        if last != Decision::Retry {
            break;
        }
    }
    (last, machine.attempts())
}

proptest! {
    // A job that always fails is attempted exactly retry_limit + 1 times,
    // except under stop_queue which gives up after the first failure.
    #[test]
    fn always_failing_job_uses_its_budget(limit in 0u32..6, code in 1i32..255, policy in policy()) {
        let mut machine = RetryMachine::new(limit, policy);
        let codes = vec![code; limit as usize + 1];
        let (decision, attempts) = drive(&mut machine, &codes);

        if policy == FailPolicy::StopQueue {
            prop_assert_eq!(attempts, 1);
            prop_assert_eq!(decision, Decision::Failed { exit_code: Some(code), stop_queue: true });
        } else {
            prop_assert_eq!(attempts, limit + 1);
            prop_assert_eq!(decision, Decision::Failed { exit_code: Some(code), stop_queue: false });
        }
        prop_assert!(machine.state().is_terminal());
    }

    // Success on attempt k (within the budget) ends the job there.
    #[test]
    fn success_within_budget_stops_retrying(limit in 0u32..6, k in 0u32..6, policy in policy()) {
        prop_assume!(k <= limit);
        prop_assume!(policy != FailPolicy::StopQueue || k == 0);
        let mut codes = vec![1; k as usize];
        codes.push(0);

        let mut machine = RetryMachine::new(limit, policy);
        let (decision, attempts) = drive(&mut machine, &codes);
        prop_assert_eq!(decision, Decision::Succeeded);
        prop_assert_eq!(attempts, k + 1);
    }

    // A cancelled attempt never retries, whatever the budget.
    #[test]
    fn cancellation_wins_over_retries(limit in 0u32..6, code in 1i32..255, policy in policy()) {
        let mut machine = RetryMachine::new(limit, policy);
        machine.begin_attempt();
        prop_assert_eq!(
            machine.record(AttemptOutcome::Exited(code), true),
            Decision::Cancelled
        );
    }
}
