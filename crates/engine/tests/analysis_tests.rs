use std::collections::BTreeSet;

use etp_common::{OperatorCandidate, OperatorKind, Position, Snippet, VariableState};
use etp_engine::{
    assignment_targets, lang::parse_program, numeric_literals, operators, HarnessPolicy,
    LineTracer, MutationHarness, OperatorMasking, Reference, Rejection, Sampler,
};
use tracing::info;

fn operator_at(symbol: char, line: usize, column: usize) -> OperatorCandidate {
    OperatorCandidate { symbol, position: Position::new(line, column), kind: OperatorKind::Arithmetic }
}

#[test]
fn test_operator_determinism() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let tracer = LineTracer::default();
    let harness = MutationHarness::new(&tracer, HarnessPolicy::default());

    let recoverable = Snippet::new("a = 5 + 3");
    let reference = tracer.run(&recoverable).unwrap();
    let verdict = harness
        .check_operator(&recoverable, &operator_at('+', 1, 6), &['-'], Reference::Final(&reference.variables))
        .unwrap();
    assert!(verdict.deterministic);
    assert_eq!(verdict.rejection, None);

    let hidden = Snippet::new("a = 5 + 0");
    let reference = tracer.run(&hidden).unwrap();
    let verdict = harness
        .check_operator(&hidden, &operator_at('+', 1, 6), &['-'], Reference::Final(&reference.variables))
        .unwrap();
    assert!(!verdict.deterministic);
    assert_eq!(verdict.rejection, Some(Rejection::SameOutcome { replacement: "-".to_string() }));

    let verdict = harness
        .check_operator(&hidden, &operator_at('+', 1, 6), &[], Reference::Final(&reference.variables))
        .unwrap();
    assert_eq!(verdict.rejection, Some(Rejection::NoAlternatives));
}

#[test]
fn test_step_mode_determinism() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let tracer = LineTracer::default();
    let harness = MutationHarness::new(&tracer, HarnessPolicy::default());
    let snippet = Snippet::new("a = 2 + 2\nb = a\nc = b");
    let Ok(etp_engine::StepOutcome::Reached(snapshot)) = tracer.run_to_step(&snippet, 2) else {
        panic!("step not reached");
    };
    // `a = 2 - 2` leaves a different snapshot on the same line
    let verdict = harness
        .check_operator(&snippet, &operator_at('+', 1, 6), &['-'], Reference::Step { step: 2, result: &snapshot })
        .unwrap();
    assert!(verdict.deterministic);

    // `*` also yields 4
    let verdict = harness
        .check_operator(
            &snippet,
            &operator_at('+', 1, 6),
            &['-', '*'],
            Reference::Step { step: 2, result: &snapshot },
        )
        .unwrap();
    assert_eq!(verdict.rejection, Some(Rejection::SameOutcome { replacement: "*".to_string() }));
}

#[test]
fn test_extraction_is_stable() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let source = "a = 1 + 2\nb = [a - 1, a * 3]\nif b[0] < a:\n    c = b[1] // 2\nd = -4.5";
    let snippet = Snippet::new(source);
    let program = parse_program(source).unwrap();
    let lines: BTreeSet<usize> = (1..=5).collect();

    let first = operators(&program, &snippet, &lines, OperatorMasking::default());
    let second = operators(&parse_program(source).unwrap(), &snippet, &lines, OperatorMasking::default());
    assert_eq!(first, second);
    let found: Vec<(char, usize, usize)> = first
        .candidates
        .iter()
        .map(|c| (c.symbol, c.position.line, c.position.column))
        .collect();
    assert_eq!(found, vec![('+', 1, 6), ('-', 2, 7), ('*', 2, 14), ('/', 4, 13)]);

    let with_comparisons =
        operators(&program, &snippet, &lines, OperatorMasking { arithmetic: false, comparison: true });
    assert_eq!(with_comparisons.candidates.len(), 1);
    assert_eq!(with_comparisons.candidates[0].symbol, '<');

    let names: Vec<String> = assignment_targets(&program).into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["a", "b", "c", "d"]);

    let literals: Vec<String> = numeric_literals(&program).iter().map(|l| l.value.to_string()).collect();
    // extraction stops at the `if`
    assert_eq!(literals, vec!["1", "2"]);
}

#[test]
fn test_sampler_bounds() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut sampler = Sampler::new(Some(42));
    assert_eq!(sampler.sample_steps(3..=7, 0), vec![3, 4, 5, 6, 7]);
    assert_eq!(sampler.sample_steps(3..=7, 10), vec![3, 4, 5, 6, 7]);
    for limit in 1..5 {
        let steps = sampler.sample_steps(1..=20, limit);
        assert_eq!(steps.len(), limit);
        assert_eq!(steps.iter().collect::<BTreeSet<_>>().len(), limit);
        assert!(steps.iter().all(|step| (1..=20).contains(step)));
    }
    assert_eq!(Sampler::new(Some(9)).sample_steps(1..=50, 5), Sampler::new(Some(9)).sample_steps(1..=50, 5));
}

#[test]
fn test_state_round_trip() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let tracer = LineTracer::default();
    let result = tracer
        .run(&Snippet::new("s = 'a?b'\nn = None\nd = {'k': [1, 2.5]}\nt = (True,)"))
        .unwrap();
    let state = result.variables.to_state();
    let encoded = state.encode();
    assert_eq!(encoded, "s?'a?b';n?None;d?{'k': [1, 2.5]};t?(True,)");
    assert_eq!(VariableState::parse(&encoded), state);
}
