//! Shared test helpers: a recording render graph whose completions the test
//! fires by hand.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use verso_playback::{
    AssetInfo, CompletionFn, PlaybackConfig, PlaybackError, PlaybackSession, RenderClock,
    RenderGraph, VirtualSegment,
};

/// Sample rate of the mock asset; 1 kHz keeps frame arithmetic readable
pub const SAMPLE_RATE: u32 = 1000;

/// Calls observed by the mock graph
#[derive(Debug, Clone, PartialEq)]
pub enum GraphCall {
    Open,
    Schedule { start_frame: u64, frame_count: u64 },
    Play,
    Pause,
    Stop,
    SetRate(f32),
}

#[derive(Default)]
pub struct MockState {
    pub calls: Vec<GraphCall>,
    pub completions: Vec<Option<CompletionFn>>,
    pub clock: Option<RenderClock>,
    pub rate: Option<f32>,
    pub fail_open: bool,
    pub fail_schedule: bool,
    /// Fire each completion from inside `schedule_range`
    pub complete_inline: bool,
}

/// Render graph that records every call
#[derive(Clone, Default)]
pub struct MockGraph {
    state: Arc<Mutex<MockState>>,
}

impl MockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<GraphCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Number of `schedule_range` calls so far
    pub fn schedule_count(&self) -> usize {
        self.state.lock().unwrap().completions.len()
    }

    /// Last scheduled (start_frame, frame_count)
    pub fn last_schedule(&self) -> Option<(u64, u64)> {
        self.calls().into_iter().rev().find_map(|call| match call {
            GraphCall::Schedule {
                start_frame,
                frame_count,
            } => Some((start_frame, frame_count)),
            _ => None,
        })
    }

    /// Take the completion for the n-th schedule call (0-based)
    pub fn try_take_completion(&self, n: usize) -> Option<CompletionFn> {
        self.state
            .lock()
            .unwrap()
            .completions
            .get_mut(n)
            .and_then(Option::take)
    }

    pub fn take_completion(&self, n: usize) -> CompletionFn {
        self.try_take_completion(n)
            .expect("completion already fired")
    }

    /// Fire the completion for the n-th schedule call
    pub fn fire_completion(&self, n: usize) {
        let completion = self.take_completion(n);
        completion();
    }

    /// Fire the completion for the most recent schedule call
    pub fn fire_last_completion(&self) {
        let n = self.schedule_count() - 1;
        self.fire_completion(n);
    }

    /// Report `seconds` of rendered asset time
    pub fn set_clock_seconds(&self, seconds: f64) {
        self.state.lock().unwrap().clock = Some(RenderClock {
            sample_time: (seconds * f64::from(SAMPLE_RATE)).round() as u64,
            sample_rate: SAMPLE_RATE,
        });
    }

    pub fn clear_clock(&self) {
        self.state.lock().unwrap().clock = None;
    }

    pub fn applied_rate(&self) -> Option<f32> {
        self.state.lock().unwrap().rate
    }

    pub fn fail_open(&self) {
        self.state.lock().unwrap().fail_open = true;
    }

    pub fn fail_schedule(&self, fail: bool) {
        self.state.lock().unwrap().fail_schedule = fail;
    }

    pub fn complete_inline(&self, inline: bool) {
        self.state.lock().unwrap().complete_inline = inline;
    }
}

impl RenderGraph for MockGraph {
    fn open(&mut self, _source: &Path) -> verso_playback::Result<AssetInfo> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GraphCall::Open);
        if state.fail_open {
            return Err(PlaybackError::AssetUnavailable("missing file".to_string()));
        }
        Ok(AssetInfo {
            duration: 3600.0,
            sample_rate: SAMPLE_RATE,
        })
    }

    fn schedule_range(
        &mut self,
        start_frame: u64,
        frame_count: u64,
        on_complete: CompletionFn,
    ) -> verso_playback::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GraphCall::Schedule {
            start_frame,
            frame_count,
        });
        if state.fail_schedule {
            return Err(PlaybackError::Render("device lost".to_string()));
        }
        state.clock = None;
        if state.complete_inline {
            on_complete();
            state.completions.push(None);
        } else {
            state.completions.push(Some(on_complete));
        }
        Ok(())
    }

    fn play(&mut self) -> verso_playback::Result<()> {
        self.state.lock().unwrap().calls.push(GraphCall::Play);
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().calls.push(GraphCall::Pause);
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GraphCall::Stop);
        state.clock = None;
    }

    fn set_rate(&mut self, rate: f32) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(GraphCall::SetRate(rate));
        state.rate = Some(rate);
    }

    fn render_clock(&self) -> Option<RenderClock> {
        self.state.lock().unwrap().clock
    }
}

pub fn segment(title: &str, start: f64, end: f64) -> VirtualSegment {
    VirtualSegment::new(title, start, end).unwrap()
}

/// Session over a mock graph with the asset loaded and segments set
pub fn session_with(segments: Vec<VirtualSegment>) -> (PlaybackSession, MockGraph) {
    let graph = MockGraph::new();
    let mut session = PlaybackSession::new(PlaybackConfig::default(), Box::new(graph.clone()));
    session.load_asset(Path::new("/audio/asset.mp3")).unwrap();
    session.set_segments(segments);
    graph.clear_calls();
    (session, graph)
}

/// Segments A(0,10) and B(10,25)
pub fn two_segments() -> Vec<VirtualSegment> {
    vec![segment("A", 0.0, 10.0), segment("B", 10.0, 25.0)]
}
