//! Source time-course ("butterfly") browser adapter

use cortex_core::aggregate::ButterflyTrace;
use cortex_core::data::SourceEstimate;
use cortex_core::Hemisphere;
use rayon::prelude::*;

use super::peaks::{timed_peaks, TracePoint};
use super::{drawable_range, TraceWindow};

/// One decimated line of the butterfly plot
#[derive(Debug, Clone, PartialEq)]
pub struct TraceLine {
    /// Source vertex, `None` for the aggregate curve
    pub vertex: Option<usize>,
    pub points: Vec<TracePoint>,
}

/// Everything the source browser draws for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTraceView {
    pub window: TraceWindow,
    pub lines: Vec<TraceLine>,
    pub aggregate: Option<TraceLine>,
    /// Shared vertical range of all lines
    pub range: (f32, f32),
    pub cursor_x: Option<f32>,
    /// Hemisphere the estimate belongs to, picks the aggregate colour
    pub hemisphere: Option<Hemisphere>,
}

impl SourceTraceView {
    pub fn empty(window: TraceWindow, time: f64) -> Self {
        Self {
            window,
            lines: Vec::new(),
            aggregate: None,
            range: (-1.0, 1.0),
            cursor_x: window.x_of(time),
            hemisphere: None,
        }
    }

    pub fn with_hemisphere(mut self, hemisphere: Hemisphere) -> Self {
        self.hemisphere = Some(hemisphere);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceBrowserAdapter {
    /// Upper bound on per-vertex lines
    pub max_lines: usize,
}

impl SourceBrowserAdapter {
    pub fn new(max_lines: usize) -> Self {
        Self { max_lines }
    }

    /// Vertices drawn for an estimate with `vertex_count` rows, evenly strided
    pub fn line_vertices(&self, vertex_count: usize) -> Vec<usize> {
        let lines = self.max_lines.min(vertex_count);
        (0..lines).map(|i| i * vertex_count / lines).collect()
    }

    pub fn render(
        &self,
        estimate: &SourceEstimate,
        butterfly: Option<&ButterflyTrace>,
        window: &TraceWindow,
        time: f64,
    ) -> SourceTraceView {
        let timestamps = estimate.timestamps();
        let lines: Vec<TraceLine> = self
            .line_vertices(estimate.vertex_count())
            .into_par_iter()
            .map(|vertex| TraceLine {
                vertex: Some(vertex),
                points: timed_peaks(timestamps, estimate.row(vertex), window),
            })
            .collect();

        let aggregate = butterfly.map(|trace| TraceLine {
            vertex: None,
            points: timed_peaks(trace.timestamps(), trace.values(), window),
        });

        let range = drawable_range(
            lines
                .iter()
                .chain(aggregate.iter())
                .flat_map(|line| line.points.iter())
                .map(|p| (p.min, p.max)),
        );

        SourceTraceView {
            window: *window,
            lines,
            aggregate,
            range,
            cursor_x: window.x_of(time),
            hemisphere: None,
        }
    }
}
