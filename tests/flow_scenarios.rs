// Flow scenarios: target resolution, tracking propagation across calls, and
// the change events recorded on each step.

use std::collections::HashMap;

use cyberbrain::domain::diff;
use cyberbrain::infrastructure::SynSourceParser;
use cyberbrain::{
    ChangeEvent, Flow, Identifier, MalformedTargetReason, MarkerConfig, ParamBinding, ScopeId,
    Snapshot, StepId, StepMetadata, Trace, TraceError, Value,
};

const MAIN: ScopeId = ScopeId(0);
const CALLEE: ScopeId = ScopeId(1);

fn id(name: &str, scope: ScopeId) -> Identifier {
    Identifier::new(name, scope)
}

fn snap(scope: ScopeId, pairs: &[(&str, i64)]) -> Snapshot {
    pairs
        .iter()
        .map(|(name, v)| (id(name, scope), Value::Int(*v)))
        .collect()
}

fn step(trace: &mut Trace, scope: ScopeId, src: &str, pairs: &[(&str, i64)]) -> StepId {
    let meta = StepMetadata::builder(snap(scope, pairs))
        .source_text(src)
        .build(&SynSourceParser)
        .unwrap();
    trace.add_step(scope, meta)
}

fn call_step(
    trace: &mut Trace,
    src: &str,
    pairs: &[(&str, i64)],
    bindings: &[(&str, &str)],
) -> StepId {
    let mut binding = ParamBinding::new();
    for (param, arg) in bindings {
        binding
            .entry(id(param, CALLEE))
            .or_default()
            .insert(id(arg, MAIN));
    }
    let meta = StepMetadata::builder(snap(MAIN, pairs))
        .source_text(src)
        .param_to_arg(binding)
        .build(&SynSourceParser)
        .unwrap();
    trace.add_step(MAIN, meta)
}

fn changes(flow: &Flow, step: StepId) -> Vec<ChangeEvent> {
    flow.trace()[step].metadata().changes().collect()
}

fn assert_invariants(flow: &Flow) {
    for step in flow.trace().steps() {
        let meta = step.metadata();
        for tracked in meta.tracking() {
            assert!(
                meta.data().contains(tracked),
                "{} tracks {} without a value",
                step.id(),
                tracked
            );
        }
        for event in meta.changes() {
            assert!(
                meta.tracking().contains(event.id()),
                "{} explains untracked {}",
                step.id(),
                event.id()
            );
        }
    }
}

#[test]
fn scenario_a_appearance() {
    let mut trace = Trace::new();
    let s1 = step(&mut trace, MAIN, "pass", &[]);
    let s2 = step(&mut trace, MAIN, "x = 1;", &[("x", 1)]);
    trace.link(s1, s2).unwrap();
    trace.get_mut(s2).unwrap().metadata_mut().add_tracking([id("x", MAIN)]);

    assert_eq!(diff::record_pair(&mut trace, s1, s2).unwrap(), 1);
    assert_eq!(
        trace[s2].metadata().var_appearances()[0].value.to_string(),
        "1"
    );
}

#[test]
fn scenario_b_modification_through_flow() {
    let mut trace = Trace::new();
    let s1 = step(&mut trace, MAIN, "x = 1;", &[("x", 1)]);
    let s2 = step(&mut trace, MAIN, "x = 2;", &[("x", 2)]);
    let s3 = step(&mut trace, MAIN, "cyberbrain::register(x);", &[("x", 2)]);
    trace.link(s1, s2).unwrap();
    trace.link(s2, s3).unwrap();

    let mut flow = Flow::new(trace, s1, s3, &MarkerConfig::default()).unwrap();
    assert_eq!(flow.target_id(), &id("x", MAIN));
    flow.backtrace().unwrap();

    let x = id("x", MAIN);
    assert_eq!(changes(&flow, s1), vec![ChangeEvent::appearance(x.clone(), Value::Int(1))]);
    assert_eq!(
        changes(&flow, s2),
        vec![ChangeEvent::modification(x, Value::Int(1), Value::Int(2))]
    );
    assert!(changes(&flow, s3).is_empty());
    assert_invariants(&flow);
}

/// y = 5; f(y) binds p to y; the callee's first step sees p = 5.
fn call_trace() -> (Trace, [StepId; 5]) {
    let mut trace = Trace::new();
    let s0 = step(&mut trace, MAIN, "y = 5;", &[("y", 5)]);
    let s1 = call_step(&mut trace, "z = f(y);", &[("y", 5)], &[("p", "y")]);
    let s2 = step(&mut trace, CALLEE, "let r = p * 2;", &[("p", 5), ("r", 10)]);
    let s3 = step(&mut trace, CALLEE, "return r;", &[("p", 5), ("r", 10)]);
    let s4 = step(&mut trace, MAIN, "cyberbrain::register(y);", &[("y", 5), ("z", 10)]);
    trace.link(s0, s1).unwrap();
    trace.link(s2, s3).unwrap();
    trace.link(s1, s4).unwrap();
    trace
        .set_relations(s1, [("step_into", Some(s2))])
        .unwrap();
    trace
        .set_relations(s4, [("returned_from", Some(s3))])
        .unwrap();
    (trace, [s0, s1, s2, s3, s4])
}

#[test]
fn scenario_c_switch_instead_of_appearance() {
    let (trace, [s0, s1, s2, s3, s4]) = call_trace();
    let mut flow = Flow::new(trace, s0, s4, &MarkerConfig::default()).unwrap();
    let summary = flow.backtrace().unwrap();

    let y = id("y", MAIN);
    let p = id("p", CALLEE);
    assert!(flow.trace()[s1].metadata().tracking().contains(&y));
    assert!(flow.trace()[s3].metadata().tracking().contains(&p));
    assert!(!flow.trace()[s2].metadata().tracking().contains(&id("r", CALLEE)));

    assert_eq!(changes(&flow, s0), vec![ChangeEvent::appearance(y.clone(), Value::Int(5))]);
    assert_eq!(changes(&flow, s2), vec![ChangeEvent::switch(y, p, Value::Int(5))]);
    assert!(flow.trace()[s2].metadata().var_appearances().is_empty());
    assert_eq!(summary.switches, 1);
    assert_eq!(summary.appearances, 1);
    assert_invariants(&flow);
}

#[test]
fn target_inside_callee_climbs_to_caller() {
    let mut trace = Trace::new();
    let s0 = step(&mut trace, MAIN, "a = 3;", &[("a", 3)]);
    let s1 = call_step(&mut trace, "g(a);", &[("a", 3)], &[("q", "a")]);
    let s2 = step(&mut trace, CALLEE, "let w = q;", &[("q", 3)]);
    let s3 = step(&mut trace, CALLEE, "cyberbrain::register(q);", &[("q", 3), ("w", 3)]);
    trace.link(s0, s1).unwrap();
    trace.link(s2, s3).unwrap();
    trace.set_relations(s1, [("step_into", Some(s2))]).unwrap();

    let mut flow = Flow::new(trace, s0, s3, &MarkerConfig::default()).unwrap();
    assert_eq!(flow.target_id(), &id("q", CALLEE));
    flow.backtrace().unwrap();

    let a = id("a", MAIN);
    assert!(flow.trace()[s0].metadata().tracking().contains(&a));
    assert_eq!(changes(&flow, s0), vec![ChangeEvent::appearance(a.clone(), Value::Int(3))]);
    assert_eq!(changes(&flow, s2), vec![ChangeEvent::switch(a, id("q", CALLEE), Value::Int(3))]);
    assert_invariants(&flow);
}

#[test]
fn scenario_d_target_resolution() {
    let mut trace = Trace::new();
    let s0 = step(&mut trace, ScopeId(9), "cyberbrain::register(result);", &[("result", 3)]);
    let flow = Flow::new(trace, s0, s0, &MarkerConfig::default()).unwrap();
    assert_eq!(flow.target_id(), &Identifier::new("result", ScopeId(9)));
    assert!(flow.target_step().metadata().tracking().contains(flow.target_id()));
    assert_eq!(flow.start_step().prev(), None);

    let mut trace = Trace::new();
    let s0 = step(&mut trace, MAIN, "cyberbrain::register(1 + 2);", &[]);
    let err = Flow::new(trace, s0, s0, &MarkerConfig::default()).unwrap_err();
    assert_eq!(
        err,
        TraceError::MalformedTarget {
            step: s0,
            reason: MalformedTargetReason::NotAnIdentifier,
        }
    );
}

#[test]
fn target_must_be_a_single_argument_marker_call() {
    for (src, reason) in [
        ("cyberbrain::register(a, b);", MalformedTargetReason::ArgumentCount(2)),
        ("cyberbrain::register();", MalformedTargetReason::ArgumentCount(0)),
        ("x = 1;", MalformedTargetReason::NotACall),
        ("while true {", MalformedTargetReason::Unparsed),
    ] {
        let mut trace = Trace::new();
        let s0 = step(&mut trace, MAIN, src, &[]);
        match Flow::new(trace, s0, s0, &MarkerConfig::default()) {
            Err(TraceError::MalformedTarget { reason: got, .. }) => {
                assert_eq!(got, reason, "{}", src)
            }
            other => panic!(
                "{}: expected malformed target, got {:?}",
                src,
                other.map(|f| f.target())
            ),
        }
    }
}

#[test]
fn start_loses_its_predecessor() {
    let mut trace = Trace::new();
    let s0 = step(&mut trace, MAIN, "x = 0;", &[("x", 0)]);
    let s1 = step(&mut trace, MAIN, "cyberbrain::register(x);", &[("x", 0)]);
    trace.link(s0, s1).unwrap();

    let flow = Flow::new(trace, s1, s1, &MarkerConfig::default()).unwrap();
    assert_eq!(flow.start_step().prev(), None);
}

#[test]
fn scenario_e_pre_return_modification() {
    let mut trace = Trace::new();
    let meta = StepMetadata::builder(snap(CALLEE, &[("x", 1)]))
        .source_text("x.push(2);")
        .data_before_return(snap(CALLEE, &[("x", 2)]))
        .build(&SynSourceParser)
        .unwrap();
    let last = trace.add_step(CALLEE, meta);
    trace.get_mut(last).unwrap().metadata_mut().add_tracking([id("x", CALLEE)]);

    assert_eq!(diff::record_before_return(&mut trace, last).unwrap(), 1);
    let events: Vec<_> = trace[last].metadata().changes().collect();
    assert_eq!(
        events,
        vec![ChangeEvent::modification(id("x", CALLEE), Value::Int(1), Value::Int(2))]
    );
}

/// The caller prepares `y` and `z` through `prep`, whose last step changes `p`
/// just before returning, then hands both to `g`, where the target sits.
#[test]
fn pre_return_change_is_recorded_during_backtrace() {
    let helper = ScopeId(2);
    let mut trace = Trace::new();

    let prep = call_step(
        &mut trace,
        "prep(y, z);",
        &[("y", 5), ("z", 1)],
        &[("p", "y"), ("r", "z")],
    );
    let body = step(&mut trace, CALLEE, "let t = p + r;", &[("p", 5), ("r", 1)]);
    let last_meta = StepMetadata::builder(snap(CALLEE, &[("p", 5), ("r", 1), ("t", 6)]))
        .source_text("p += 1;")
        // `r` has no value here and must be skipped.
        .data_before_return(snap(CALLEE, &[("p", 6), ("t", 6)]))
        .build(&SynSourceParser)
        .unwrap();
    let last = trace.add_step(CALLEE, last_meta);

    let mut binding = ParamBinding::new();
    binding.insert(id("q", helper), [id("y", MAIN), id("z", MAIN)].into_iter().collect());
    let site_meta = StepMetadata::builder(snap(MAIN, &[("y", 5), ("z", 1)]))
        .source_text("g(y, z);")
        .param_to_arg(binding)
        .build(&SynSourceParser)
        .unwrap();
    let site = trace.add_step(MAIN, site_meta);
    let target = step(&mut trace, helper, "cyberbrain::register(q);", &[("q", 5)]);

    trace.link(prep, site).unwrap();
    trace.link(body, last).unwrap();
    trace.set_relations(prep, [("step_into", Some(body))]).unwrap();
    trace.set_relations(site, [("step_into", Some(target))]).unwrap();

    let mut flow = Flow::new(trace, prep, target, &MarkerConfig::default()).unwrap();
    let summary = flow.backtrace().unwrap();

    let (p, r) = (id("p", CALLEE), id("r", CALLEE));
    assert!(flow.trace()[last].metadata().tracking().contains(&p));
    assert!(flow.trace()[last].metadata().tracking().contains(&r));
    assert_eq!(
        changes(&flow, last),
        vec![ChangeEvent::modification(p.clone(), Value::Int(5), Value::Int(6))]
    );
    assert_eq!(summary.modifications, 1);
    assert_eq!(
        changes(&flow, body),
        vec![
            ChangeEvent::switch(id("y", MAIN), p, Value::Int(5)),
            ChangeEvent::switch(id("z", MAIN), r, Value::Int(1)),
        ]
    );
    assert_invariants(&flow);
}

#[test]
fn snapshots_ignore_later_mutation_of_live_values() {
    let x = id("xs", MAIN);
    let mut live: HashMap<Identifier, Value> = HashMap::new();
    live.insert(x.clone(), Value::List(vec![Value::Int(1)]));

    let mut trace = Trace::new();
    let before = Snapshot::capture(&live);
    if let Some(Value::List(items)) = live.get_mut(&x) {
        items.push(Value::Int(2));
    }
    let after = Snapshot::capture(&live);

    let s0 = trace.add_step(
        MAIN,
        StepMetadata::builder(before).source_text("xs = [1];").build(&SynSourceParser).unwrap(),
    );
    let s1 = trace.add_step(
        MAIN,
        StepMetadata::builder(after).source_text("xs.append(2);").build(&SynSourceParser).unwrap(),
    );
    trace.link(s0, s1).unwrap();
    trace.get_mut(s1).unwrap().metadata_mut().add_tracking([x.clone()]);
    diff::record_pair(&mut trace, s0, s1).unwrap();

    // Mutating the live value again must not reach the recorded history.
    live.insert(x.clone(), Value::None);

    let modification = &trace[s1].metadata().var_modifications()[0];
    assert_eq!(modification.old_value.to_string(), "[1]");
    assert_eq!(modification.new_value.to_string(), "[1, 2]");
    assert_eq!(trace[s0].metadata().data().get(&x).unwrap().to_string(), "[1]");
}

#[test]
fn backtrace_runs_once() {
    let (trace, [s0, _, s2, _, s4]) = call_trace();
    let mut flow = Flow::new(trace, s0, s4, &MarkerConfig::default()).unwrap();
    let first = flow.backtrace().unwrap();
    let second = flow.backtrace().unwrap();
    assert_eq!(first, second);
    assert_eq!(flow.trace()[s2].metadata().var_switches().len(), 1);
}

#[test]
fn untracked_callee_is_not_entered() {
    let mut trace = Trace::new();
    let s0 = step(&mut trace, MAIN, "y = 5;", &[("y", 5)]);
    let s1 = call_step(&mut trace, "f(k);", &[("y", 5), ("k", 1)], &[("p", "k")]);
    let s2 = step(&mut trace, CALLEE, "return p;", &[("p", 1)]);
    let s3 = step(&mut trace, MAIN, "cyberbrain::register(y);", &[("y", 5)]);
    trace.link(s0, s1).unwrap();
    trace.link(s1, s3).unwrap();
    trace.set_relations(s1, [("step_into", Some(s2))]).unwrap();

    let mut flow = Flow::new(trace, s0, s3, &MarkerConfig::default()).unwrap();
    flow.backtrace().unwrap();
    assert!(flow.trace()[s2].metadata().tracking().is_empty());
    assert!(changes(&flow, s2).is_empty());
    assert_invariants(&flow);
}
