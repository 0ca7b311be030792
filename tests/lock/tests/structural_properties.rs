//! Property tests over the structural fold: window span, alignment and
//! posture bounds, and alphabet completeness for arbitrary magnitude
//! streams and configurations.

use proptest::prelude::*;

use sbm_kernel::alphabet::{AlphabetAssigner, Symbol, Thresholds};
use sbm_kernel::structural::engine::{
    AlignmentRule, EngineConfig, PosturePolicy, PostureRule, StructuralStateEngine,
};
use sbm_kernel::structural::window::TrailingWindow;

fn alignment() -> impl Strategy<Value = AlignmentRule> {
    prop::sample::select(AlignmentRule::ALL.to_vec())
}

fn policy() -> impl Strategy<Value = PosturePolicy> {
    prop::sample::select(vec![PosturePolicy::Clamp, PosturePolicy::Wrap])
}

proptest! {
    #[test]
    fn window_spans_the_trailing_h_ticks(
        h in 1usize..40,
        stream in prop::collection::vec(any::<u64>(), 1..200),
    ) {
        let mut w = TrailingWindow::new(h).unwrap();
        for (i, &m) in stream.iter().enumerate() {
            w.push(m);
            let t = i as u64 + 1;
            let start = if t < h as u64 { 1 } else { t - h as u64 + 1 };
            prop_assert_eq!(w.span(), Some((start, t)));
            prop_assert_eq!(w.len() as u64, t - start + 1);
            prop_assert_eq!(w.newest(), Some(m));
            let expected: Vec<u64> = stream[(start - 1) as usize..=i].to_vec();
            prop_assert_eq!(w.values().collect::<Vec<_>>(), expected);
        }
    }

    #[test]
    fn fold_respects_bounds_and_always_assigns(
        h in 1usize..32,
        rule in alignment(),
        pol in policy(),
        b in 1i64..50,
        align_band in 0i64..5,
        posture_band in 0i64..50,
        stream in prop::collection::vec(0u64..16, 1..300),
    ) {
        prop_assume!(posture_band < b);
        let mut engine = StructuralStateEngine::new(EngineConfig {
            horizon: h,
            alignment: rule,
            posture: PostureRule::new(pol, b).unwrap(),
        })
        .unwrap();
        let assigner = AlphabetAssigner::new(Thresholds::new(align_band, posture_band).unwrap());
        let bound = rule.bound(h);

        let (mut a_prev, mut s_prev) = (0i64, 0i64);
        for (i, &m) in stream.iter().enumerate() {
            let state = engine.push(m);
            prop_assert_eq!(state.t, i as u64 + 1);
            prop_assert_eq!(state.m, m);
            prop_assert!(state.a.abs() <= bound, "a={} bound={}", state.a, bound);
            prop_assert!((-b..=b).contains(&state.s), "s={} B={}", state.s, b);
            prop_assert_eq!(state.d_a, state.a - a_prev);
            prop_assert_eq!(state.d_s, state.s - s_prev);
            let symbol = assigner.assign(&state);
            prop_assert!(symbol.is_ok());
            prop_assert!(Symbol::ALL.contains(&symbol.unwrap()));
            a_prev = state.a;
            s_prev = state.s;
        }
    }

    #[test]
    fn equal_streams_fold_to_equal_states(
        h in 1usize..16,
        rule in alignment(),
        stream in prop::collection::vec(any::<u64>(), 1..100),
    ) {
        let config = EngineConfig {
            horizon: h,
            alignment: rule,
            posture: PostureRule::new(PosturePolicy::Clamp, 64).unwrap(),
        };
        let mut left = StructuralStateEngine::new(config).unwrap();
        let mut right = StructuralStateEngine::new(config).unwrap();
        for &m in &stream {
            prop_assert_eq!(left.push(m), right.push(m));
        }
    }
}
