use etp_common::{join_artifacts, split_snippets};
use etp_engine::{EngineConfig, PipelineKind, Sampler, SkipReason};
use tracing::info;

const CORPUS: &str = "a = 5 + 3\nb = a - 1\n\nx = [1, 2]\nx.append(len(x) * 4)\n\nq = 1 / 0\n\nprint('hi')";

fn run_corpus(kind: PipelineKind, config: &EngineConfig) -> Vec<Result<Vec<String>, SkipReason>> {
    let pipeline = kind.build(config).unwrap();
    split_snippets(CORPUS)
        .iter()
        .enumerate()
        .map(|(index, snippet)| {
            let mut sampler = Sampler::new(config.sampling.seed.map(|seed| seed + index as u64));
            pipeline.process(snippet, &mut sampler)
        })
        .collect()
}

#[test]
fn test_line_count_corpus() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let results = run_corpus(PipelineKind::LineCount, &EngineConfig::default());
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].as_ref().unwrap(), &vec!["a = 5 + 3\nb = a - 1\n# count?2".to_string()]);
    assert_eq!(results[1].as_ref().unwrap(), &vec!["x = [1, 2]\nx.append(len(x) * 4)\n# count?2".to_string()]);
    assert_eq!(results[2].as_ref().unwrap_err().kind(), "ZeroDivisionError");
    assert_eq!(results[3].as_ref().unwrap(), &vec!["print('hi')\n# count?1".to_string()]);
}

#[test]
fn test_output_corpus() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let results = run_corpus(PipelineKind::Output, &EngineConfig::default());
    let accepted: Vec<String> = results.iter().filter_map(|r| r.as_ref().ok()).flatten().cloned().collect();
    assert_eq!(
        join_artifacts(&accepted),
        "a = 5 + 3\nb = a - 1\n# a?8;b?7\n\nx = [1, 2]\nx.append(len(x) * 4)\n# x?[1, 2, 8]"
    );
    assert_eq!(results[3], Err(SkipReason::NoBindings));
}

#[test]
fn test_operator_corpus() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let results = run_corpus(PipelineKind::Operator, &EngineConfig::default());
    assert_eq!(
        results[0].as_ref().unwrap(),
        &vec![
            "a = 5 ? 3\nb = a - 1\n# a?8;b?7;operator?+".to_string(),
            "a = 5 + 3\nb = a ? 1\n# a?8;b?7;operator?-".to_string(),
        ]
    );
    // `*` has no alternative in the default table
    assert!(results[1].as_ref().unwrap().is_empty());
}

#[test]
fn test_seeded_runs_are_reproducible() {
    etp_common::logging::ensure_test_logging(None);
    info!("Running test");
    let mut config = EngineConfig::default();
    config.sampling.seed = Some(11);
    config.stepped_operator.step_limit = 1;
    config.stepped_input.step_limit = 1;
    for kind in [PipelineKind::SteppedInput, PipelineKind::SteppedOperator] {
        assert_eq!(run_corpus(kind, &config), run_corpus(kind, &config));
    }
}
