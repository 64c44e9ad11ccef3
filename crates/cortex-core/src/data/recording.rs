//! Raw sensor recording

use crate::error::DataIntegrityError;
use crate::timeline::RawTimebase;

/// Channel descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub name: String,
    /// Physical unit label (e.g. "T", "T/m", "V")
    pub unit: String,
}

impl ChannelInfo {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }
}

/// Multichannel recording at a fixed sample rate
///
/// Samples are stored per channel (`[channel][sample]`). The first sample sits
/// at `start_time` seconds on the virtual timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecording {
    channels: Vec<ChannelInfo>,
    samples: Vec<Vec<f32>>,
    sample_rate: f64,
    start_time: f64,
}

impl RawRecording {
    pub fn new(
        channels: Vec<ChannelInfo>,
        samples: Vec<Vec<f32>>,
        sample_rate: f64,
    ) -> Result<Self, DataIntegrityError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DataIntegrityError::InvalidSampleRate(sample_rate));
        }
        if channels.len() != samples.len() {
            return Err(DataIntegrityError::ChannelCountMismatch {
                descriptors: channels.len(),
                rows: samples.len(),
            });
        }
        let sample_count = samples.first().map(Vec::len).unwrap_or(0);
        if samples.iter().any(|row| row.len() != sample_count) {
            return Err(DataIntegrityError::MatrixShapeMismatch {
                rows: samples.len(),
                cols: sample_count,
                actual: samples.iter().map(Vec::len).sum(),
            });
        }

        Ok(Self {
            channels,
            samples,
            sample_rate,
            start_time: 0.0,
        })
    }

    /// Place the first sample at `start_time` seconds
    pub fn with_start_time(mut self, start_time: f64) -> Self {
        if start_time.is_finite() {
            self.start_time = start_time;
        }
        self
    }

    pub fn channels(&self) -> &[ChannelInfo] {
        &self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples of one channel
    pub fn channel(&self, idx: usize) -> Option<&[f32]> {
        self.samples.get(idx).map(Vec::as_slice)
    }

    pub fn sample_count(&self) -> usize {
        self.samples.first().map(Vec::len).unwrap_or(0)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Recording length in seconds
    pub fn duration(&self) -> f64 {
        self.sample_count() as f64 / self.sample_rate
    }

    /// Time base used by the time axis resolver
    pub fn timebase(&self) -> RawTimebase {
        RawTimebase {
            start: self.start_time,
            sample_rate: self.sample_rate,
            sample_count: self.sample_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_shape() {
        let rec = RawRecording::new(
            vec![ChannelInfo::new("MEG 0111", "T"), ChannelInfo::new("EEG 001", "V")],
            vec![vec![0.0; 600], vec![1.0; 600]],
            600.0,
        )
        .unwrap()
        .with_start_time(2.0);

        assert_eq!(rec.sample_count(), 600);
        assert_eq!(rec.duration(), 1.0);
        assert_eq!(rec.timebase().start, 2.0);
        assert_eq!(rec.channel(1).map(|c| c[0]), Some(1.0));
    }

    #[test]
    fn test_recording_rejects_bad_rate() {
        let err = RawRecording::new(Vec::new(), Vec::new(), 0.0).unwrap_err();
        assert_eq!(err, DataIntegrityError::InvalidSampleRate(0.0));
    }

    #[test]
    fn test_recording_rejects_ragged_rows() {
        let err = RawRecording::new(
            vec![ChannelInfo::new("a", "V"), ChannelInfo::new("b", "V")],
            vec![vec![0.0; 10], vec![0.0; 9]],
            100.0,
        )
        .unwrap_err();
        assert!(matches!(err, DataIntegrityError::MatrixShapeMismatch { .. }));
    }

    #[test]
    fn test_recording_rejects_descriptor_mismatch() {
        let err = RawRecording::new(vec![ChannelInfo::new("a", "V")], Vec::new(), 100.0).unwrap_err();
        assert_eq!(
            err,
            DataIntegrityError::ChannelCountMismatch { descriptors: 1, rows: 0 }
        );
    }
}
