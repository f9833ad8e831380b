/// Day reading assembly and display helpers
use verso_playback::{
    build_segments, total_duration, ChapterOffset, DailyReading, ReadingPlan, VirtualSegment,
};

/// Everything needed to play one plan day
#[derive(Debug, Clone)]
pub struct DayReading {
    pub day: u32,
    pub readings: Vec<DailyReading>,
    pub segments: Vec<VirtualSegment>,
}

impl DayReading {
    /// Resolve `day` against the plan and chapter table
    ///
    /// Chapters missing from the table are left out of `segments` but stay
    /// in `readings`, so the listing still shows them.
    pub fn resolve(plan: &ReadingPlan, table: &[ChapterOffset], day: u32) -> Self {
        let readings = plan.readings_for_day(day);
        let buckets: Vec<_> = readings.iter().map(|r| r.bucket.clone()).collect();
        let segments = build_segments(&buckets, table);
        Self {
            day: day.max(1),
            readings,
            segments,
        }
    }

    pub fn total_duration(&self) -> f64 {
        total_duration(&self.segments)
    }

    /// Printable listing of the day's chapters
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Day {} ({} chapters, {})\n",
            self.day,
            self.segments.len(),
            format_time(self.total_duration())
        );
        for reading in &self.readings {
            out.push_str(&format!(
                "  list {}: {:<20} {:>4}/{}\n",
                reading.list_id,
                reading.label(),
                reading.progress,
                reading.total
            ));
        }
        for (i, segment) in self.segments.iter().enumerate() {
            out.push_str(&format!(
                "  {:>2}. {:<20} {}\n",
                i + 1,
                segment.title(),
                format_time(segment.duration())
            ));
        }
        out
    }
}

/// Format seconds as `m:ss`, or `h:mm:ss` past an hour
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() {
        seconds.max(0.0).floor() as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
