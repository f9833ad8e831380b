//! Property-based tests for the playback session
//!
//! Random sequences of control calls, render-clock readings and completions
//! must never move the position outside the active segment, and must never
//! let an old completion change the active segment.

mod common;

use common::{segment, session_with, MockGraph};
use proptest::prelude::*;
use verso_playback::{build_segments, ChapterOffset, PlaybackSession, ReadingBucket};

// ===== Helpers =====

#[derive(Debug, Clone)]
enum Op {
    Select(usize, Option<f64>),
    SeekTo(f64),
    SeekBy(f64),
    BeginScrub(f64),
    UpdateScrub(f64),
    CommitScrub(f64),
    CancelScrub,
    Play,
    Pause,
    Next,
    Previous,
    SetRate(f32),
    Clock(f64),
    FireCompletion(usize),
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..6, proptest::option::of(-50.0f64..200.0)).prop_map(|(i, t)| Op::Select(i, t)),
        (-50.0f64..200.0).prop_map(Op::SeekTo),
        (-1000.0f64..1000.0).prop_map(Op::SeekBy),
        (-50.0f64..200.0).prop_map(Op::BeginScrub),
        (-50.0f64..200.0).prop_map(Op::UpdateScrub),
        (-50.0f64..200.0).prop_map(Op::CommitScrub),
        Just(Op::CancelScrub),
        Just(Op::Play),
        Just(Op::Pause),
        Just(Op::Next),
        Just(Op::Previous),
        (0.25f32..3.0).prop_map(Op::SetRate),
        (0.0f64..100.0).prop_map(Op::Clock),
        (0usize..64).prop_map(Op::FireCompletion),
    ]
}

/// Contiguous segments built from random durations
fn arbitrary_segments() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec(0.5f64..40.0, 1..5).prop_map(|durations| {
        let mut start = 0.0;
        durations
            .into_iter()
            .map(|d| {
                let bounds = (start, start + d);
                start += d;
                bounds
            })
            .collect()
    })
}

fn apply(session: &mut PlaybackSession, graph: &MockGraph, op: Op) {
    match op {
        Op::Select(i, t) => session.select_segment(i, t),
        Op::SeekTo(t) => session.seek_to(t),
        Op::SeekBy(d) => session.seek_by(d),
        Op::BeginScrub(t) => session.begin_scrub(t),
        Op::UpdateScrub(t) => session.update_scrub(t),
        Op::CommitScrub(t) => session.commit_scrub(t),
        Op::CancelScrub => session.cancel_scrub(),
        Op::Play => session.play(),
        Op::Pause => session.pause(),
        Op::Next => session.next_segment(),
        Op::Previous => session.previous_segment(),
        Op::SetRate(r) => {
            session.set_rate(r).ok();
        }
        Op::Clock(seconds) => {
            graph.set_clock_seconds(seconds);
            session.tick();
        }
        Op::FireCompletion(n) => {
            let count = graph.schedule_count();
            if count > 0 {
                // A completion fires at most once
                if let Some(completion) = graph.try_take_completion(n % count) {
                    completion();
                }
            }
            session.process_pending();
        }
    }
}

// ===== Property Tests =====

proptest! {
    /// Property: position always lies within the active segment
    #[test]
    fn position_stays_within_active_segment(
        bounds in arbitrary_segments(),
        ops in prop::collection::vec(arbitrary_op(), 1..60)
    ) {
        let segments = bounds
            .iter()
            .enumerate()
            .map(|(i, (start, end))| segment(&format!("S{}", i), *start, *end))
            .collect();
        let (mut session, graph) = session_with(segments);

        for op in ops {
            apply(&mut session, &graph, op);

            let active = session.active_segment().unwrap();
            prop_assert!(session.active_index() < session.segments().len());
            prop_assert!(
                active.start_offset() <= session.position()
                    && session.position() <= active.end_offset(),
                "position {} outside [{}, {}]",
                session.position(),
                active.start_offset(),
                active.end_offset()
            );
        }
    }

    /// Property: the epoch never decreases, and grows on every accepted selection
    #[test]
    fn epoch_is_monotonic(ops in prop::collection::vec(arbitrary_op(), 1..60)) {
        let (mut session, graph) = session_with(vec![
            segment("A", 0.0, 10.0),
            segment("B", 10.0, 25.0),
            segment("C", 25.0, 60.0),
        ]);

        for op in ops {
            let before = session.epoch();
            let scheduled_before = graph.schedule_count();
            apply(&mut session, &graph, op);

            prop_assert!(session.epoch() >= before);
            if graph.schedule_count() > scheduled_before {
                prop_assert!(session.epoch() > before);
            }
        }
    }

    /// Property: completions from superseded schedules never change the active segment
    #[test]
    fn stale_completions_never_advance(
        selections in prop::collection::vec(0usize..3, 2..20)
    ) {
        let (mut session, graph) = session_with(vec![
            segment("A", 0.0, 10.0),
            segment("B", 10.0, 25.0),
            segment("C", 25.0, 60.0),
        ]);
        for index in &selections {
            session.select_segment(*index, None);
        }
        let active = session.active_index();
        let position = session.position();

        for n in 0..graph.schedule_count() - 1 {
            graph.fire_completion(n);
        }
        session.process_pending();

        prop_assert_eq!(session.active_index(), active);
        prop_assert_eq!(session.position(), position);
        prop_assert!(session.is_playing());
    }

    /// Property: built segments follow table order and never invert
    #[test]
    fn built_segments_are_well_formed(
        durations in prop::collection::vec(0.0f64..600.0, 1..40),
        start in 1u32..20,
        len in 0u32..30
    ) {
        let mut offset = 0.0;
        let table: Vec<ChapterOffset> = durations
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let chapter = ChapterOffset {
                    id: i as u32 + 1,
                    name: format!("Psalms {}", i + 1),
                    start_offset: offset,
                    end_offset: offset + d,
                };
                offset += d;
                chapter
            })
            .collect();

        let segments = build_segments(&[ReadingBucket::new("Psalms", start, start + len)], &table);

        prop_assert!(segments.len() <= (len + 1) as usize);
        for pair in segments.windows(2) {
            prop_assert!(pair[0].start_offset() <= pair[1].start_offset());
        }
        for s in &segments {
            prop_assert!(s.end_offset() > s.start_offset());
        }
    }
}
