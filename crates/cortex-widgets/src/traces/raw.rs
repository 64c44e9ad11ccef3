//! Raw sensor-waveform browser adapter

use cortex_core::data::RawRecording;
use rayon::prelude::*;

use super::peaks::uniform_peaks;
use super::{drawable_range, TraceWindow};

/// Channels shown at once unless configured otherwise
pub const DEFAULT_VISIBLE_CHANNELS: usize = 16;

/// Decimated trace of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTrace {
    pub index: usize,
    pub name: String,
    pub unit: String,
    /// (min, max) per window column, `None` outside the recording
    pub peaks: Vec<Option<(f32, f32)>>,
    /// Vertical range of the visible peaks, never zero-width
    pub range: (f32, f32),
}

/// Everything the raw browser draws for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RawTraceView {
    pub window: TraceWindow,
    pub channels: Vec<ChannelTrace>,
    /// Cursor column when the current time is inside the window
    pub cursor_x: Option<f32>,
}

impl RawTraceView {
    /// View with no channels (no recording loaded)
    pub fn empty(window: TraceWindow, time: f64) -> Self {
        Self {
            window,
            channels: Vec::new(),
            cursor_x: window.x_of(time),
        }
    }
}

/// Scrollable selection of channels to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBrowserAdapter {
    pub first_channel: usize,
    pub visible_channels: usize,
}

impl Default for RawBrowserAdapter {
    fn default() -> Self {
        Self {
            first_channel: 0,
            visible_channels: DEFAULT_VISIBLE_CHANNELS,
        }
    }
}

impl RawBrowserAdapter {
    /// Scroll the channel list, keeping at least one channel in view
    pub fn scroll_to(&mut self, first_channel: usize, channel_count: usize) {
        self.first_channel = first_channel.min(channel_count.saturating_sub(1));
    }

    pub fn render(&self, recording: &RawRecording, window: &TraceWindow, time: f64) -> RawTraceView {
        let timebase = recording.timebase();
        let last = (self.first_channel + self.visible_channels).min(recording.channel_count());
        let infos = recording.channels();

        let channels = (self.first_channel.min(last)..last)
            .into_par_iter()
            .filter_map(|index| {
                let samples = recording.channel(index)?;
                let peaks = uniform_peaks(samples, timebase, window);
                let info = &infos[index];
                Some(ChannelTrace {
                    index,
                    name: info.name.clone(),
                    unit: info.unit.clone(),
                    range: drawable_range(peaks.iter().flatten().copied()),
                    peaks,
                })
            })
            .collect();

        RawTraceView {
            window: *window,
            channels,
            cursor_x: window.x_of(time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::data::ChannelInfo;

    fn recording(channels: usize) -> RawRecording {
        let infos = (0..channels).map(|i| ChannelInfo::new(format!("EEG {:03}", i), "uV")).collect();
        let data = (0..channels)
            .map(|c| (0..200).map(|s| (c * 1000 + s) as f32).collect())
            .collect();
        RawRecording::new(infos, data, 100.0).unwrap()
    }

    #[test]
    fn test_renders_visible_channels_only() {
        let adapter = RawBrowserAdapter {
            first_channel: 2,
            visible_channels: 3,
        };
        let window = TraceWindow::new(0.0, 2.0, 20);
        let view = adapter.render(&recording(10), &window, 1.0);
        let indices: Vec<usize> = view.channels.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![2, 3, 4]);
        assert_eq!(view.channels[0].name, "EEG 002");
        assert!(view.channels.iter().all(|c| c.peaks.len() == 20));
        assert_eq!(view.cursor_x, Some(10.0));
    }

    #[test]
    fn test_selection_past_end_is_truncated() {
        let adapter = RawBrowserAdapter {
            first_channel: 4,
            visible_channels: 16,
        };
        let window = TraceWindow::new(0.0, 1.0, 10);
        assert_eq!(adapter.render(&recording(5), &window, 0.0).channels.len(), 1);

        let mut adapter = RawBrowserAdapter::default();
        adapter.scroll_to(99, 5);
        assert_eq!(adapter.first_channel, 4);
    }

    #[test]
    fn test_cursor_hidden_outside_window() {
        let window = TraceWindow::new(0.0, 1.0, 10);
        let view = RawBrowserAdapter::default().render(&recording(1), &window, 1.5);
        assert_eq!(view.cursor_x, None);
    }

    #[test]
    fn test_tesla_scale_channel_keeps_its_range() {
        let samples: Vec<f32> = (0..200).map(|s| if s % 2 == 0 { 1e-12 } else { -1e-12 }).collect();
        let recording = RawRecording::new(vec![ChannelInfo::new("MEG 0111", "T")], vec![samples], 100.0).unwrap();
        let window = TraceWindow::new(0.0, 2.0, 20);
        let view = RawBrowserAdapter::default().render(&recording, &window, 0.0);
        assert_eq!(view.channels[0].range, (-1e-12, 1e-12));
    }

    #[test]
    fn test_range_ignores_columns_outside_recording() {
        let recording = RawRecording::new(vec![ChannelInfo::new("EEG 001", "V")], vec![vec![5.0, 7.0]], 1.0).unwrap();
        // Half of the window lies before the first sample
        let window = TraceWindow::new(-2.0, 4.0, 4);
        let view = RawBrowserAdapter::default().render(&recording, &window, 0.0);
        let channel = &view.channels[0];
        assert_eq!(channel.peaks[..2], [None, None]);
        assert_eq!(channel.range, (5.0, 7.0));
    }
}
