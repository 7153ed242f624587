//! Module implementing spike-train recordings and the format-sniffing reader.
//!
//! A recording mirrors the block/segment layout written by the simulation
//! toolchain: a file holds one or more data blocks, each block one or more
//! segments, each segment the spike trains recorded from one population.
//! [`Recording::open`] sniffs the on-disk format (JSON dump or plain-text
//! raster) and returns the parsed recording; the file handle never outlives
//! the call.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};

use crate::error::SweepError;

/// Time units of the spike times in a train.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnits {
    /// Milliseconds.
    #[default]
    #[serde(rename = "ms")]
    Ms,
    /// Seconds.
    #[serde(rename = "s")]
    S,
}

impl TimeUnits {
    /// The number of seconds per unit.
    fn seconds(&self) -> f64 {
        match self {
            TimeUnits::Ms => 1e-3,
            TimeUnits::S => 1.0,
        }
    }
}

/// The spike times emitted by one unit over an observation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeTrain {
    /// The spike times, sorted in increasing order.
    times: Vec<f64>,
    /// The start of the observation window.
    t_start: f64,
    /// The end of the observation window.
    t_stop: f64,
    /// The units of the times and the window bounds.
    #[serde(default)]
    units: TimeUnits,
}

impl SpikeTrain {
    /// Create a spike train with the specified parameters.
    /// If necessary, the spike times are sorted.
    /// The function returns an error for an empty observation window or non-finite times.
    pub fn new(
        times: Vec<f64>,
        t_start: f64,
        t_stop: f64,
        units: TimeUnits,
    ) -> Result<Self, SweepError> {
        if !(t_stop > t_start) {
            return Err(SweepError::InvalidParameter(format!(
                "The observation window [{}, {}] is empty.",
                t_start, t_stop
            )));
        }

        if times.iter().any(|t| !t.is_finite()) {
            return Err(SweepError::InvalidParameter(
                "Spike times must be finite numbers.".to_string(),
            ));
        }

        let mut times = times;
        times.sort_by(|t1, t2| {
            t1.partial_cmp(t2)
                .expect("Comparison failed: NaN values should have been caught earlier")
        });

        Ok(SpikeTrain {
            times,
            t_start,
            t_stop,
            units,
        })
    }

    /// Sample a homogeneous Poisson spike train with the specified rate (in spikes/second)
    /// over the window `[0, duration)` (in milliseconds).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use brunel_phase::recording::SpikeTrain;
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let train = SpikeTrain::rand(10.0, 1000.0, &mut rng).unwrap();
    /// assert!(train.times().iter().all(|&t| (0.0..1000.0).contains(&t)));
    /// ```
    pub fn rand<R: Rng>(rate: f64, duration: f64, rng: &mut R) -> Result<Self, SweepError> {
        if rate < 0.0 {
            return Err(SweepError::InvalidParameter(
                "The firing rate must be non-negative.".to_string(),
            ));
        }
        if duration <= 0.0 {
            return Err(SweepError::InvalidParameter(
                "The duration must be a positive number.".to_string(),
            ));
        }

        let mut times = Vec::new();
        if rate > 0.0 {
            // inter-spike intervals in ms
            let exp = Exp::new(rate * 1e-3)
                .map_err(|e| SweepError::InvalidParameter(e.to_string()))?;
            let mut t: f64 = exp.sample(rng);
            while t < duration {
                times.push(t);
                t += exp.sample(rng);
            }
        }

        SpikeTrain::new(times, 0.0, duration, TimeUnits::Ms)
    }

    /// Returns the spike times.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Returns the number of spikes in the train.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Returns true if the train contains no spike.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Returns the start of the observation window.
    pub fn t_start(&self) -> f64 {
        self.t_start
    }

    /// Returns the end of the observation window.
    pub fn t_stop(&self) -> f64 {
        self.t_stop
    }

    /// Returns the units of the times and the window bounds.
    pub fn units(&self) -> TimeUnits {
        self.units
    }

    /// Returns the duration of the observation window, in seconds.
    pub fn duration_s(&self) -> f64 {
        (self.t_stop - self.t_start) * self.units.seconds()
    }

    /// Returns the mean firing rate of the train, in spikes/second.
    pub fn mean_rate(&self) -> f64 {
        self.times.len() as f64 / self.duration_s()
    }

    /// Returns the start of the observation window, in milliseconds.
    pub fn t_start_ms(&self) -> f64 {
        self.t_start * self.units.seconds() * 1e3
    }

    /// Returns the end of the observation window, in milliseconds.
    pub fn t_stop_ms(&self) -> f64 {
        self.t_stop * self.units.seconds() * 1e3
    }

    /// Returns the spike times rescaled to milliseconds.
    pub fn times_ms(&self) -> Vec<f64> {
        let scale = self.units.seconds() * 1e3;
        self.times.iter().map(|t| t * scale).collect()
    }
}

/// The spike trains recorded from one population over one time window.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub spiketrains: Vec<SpikeTrain>,
}

/// A group of segments recorded together.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub segments: Vec<Segment>,
}

/// The full content of one recording file.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub blocks: Vec<Block>,
}

/// The supported on-disk recording formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordingFormat {
    /// A JSON dump of the block/segment/spike-train structure.
    Json,
    /// A plain-text raster of `source_id time` lines, times in milliseconds.
    Text,
}

impl Recording {
    /// Wrap a collection of spike trains into a single-block, single-segment recording.
    pub fn from_spiketrains(spiketrains: Vec<SpikeTrain>) -> Self {
        Recording {
            blocks: vec![Block {
                segments: vec![Segment { spiketrains }],
            }],
        }
    }

    /// Open a recording file, sniffing its format from the extension and content.
    ///
    /// The file handle is acquired for the duration of this call only and is
    /// released whether parsing succeeds or fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Recording, SweepError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| SweepError::IOError(format!("{}: {}", path.display(), e)))?;
        let mut reader = BufReader::new(file);

        let recording = match Self::sniff(path, &mut reader)? {
            RecordingFormat::Json => serde_json::from_reader(reader)
                .map_err(|e| SweepError::ParseError(format!("{}: {}", path.display(), e)))?,
            RecordingFormat::Text => Self::read_text(reader)
                .map_err(|e| match e {
                    SweepError::ParseError(msg) => {
                        SweepError::ParseError(format!("{}: {}", path.display(), msg))
                    }
                    other => other,
                })?,
        };

        Ok(recording)
    }

    /// Save the recording as pretty-printed JSON.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SweepError> {
        let file = File::create(path).map_err(|e| SweepError::IOError(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| SweepError::IOError(e.to_string()))
    }

    /// Returns the spike trains of the first segment of the first data block.
    /// The function returns an error if the recording holds no spike train.
    pub fn spiketrains(&self) -> Result<&[SpikeTrain], SweepError> {
        self.blocks
            .first()
            .and_then(|block| block.segments.first())
            .map(|segment| segment.spiketrains.as_slice())
            .filter(|spiketrains| !spiketrains.is_empty())
            .ok_or_else(|| {
                SweepError::EmptyRecording(
                    "The first segment of the first block contains no spike train.".to_string(),
                )
            })
    }

    /// Determine the format from the file extension, falling back to the first
    /// non-whitespace byte of the content.
    fn sniff<R: BufRead>(path: &Path, reader: &mut R) -> Result<RecordingFormat, SweepError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => return Ok(RecordingFormat::Json),
            Some("gdf") | Some("dat") | Some("txt") => return Ok(RecordingFormat::Text),
            _ => {}
        }

        let buffer = reader
            .fill_buf()
            .map_err(|e| SweepError::IOError(e.to_string()))?;
        match buffer.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Ok(RecordingFormat::Json),
            Some(b) if b.is_ascii_digit() || *b == b'#' => Ok(RecordingFormat::Text),
            _ => Err(SweepError::UnknownFormat(format!(
                "{}: the content matches neither a JSON dump nor a spike raster.",
                path.display()
            ))),
        }
    }

    /// Parse a plain-text spike raster: one `source_id time` pair per line,
    /// times in milliseconds, `#`-prefixed comments ignored. An optional
    /// `# t_stop <time>` comment fixes the observation window; otherwise the
    /// window ends at the latest spike.
    fn read_text<R: BufRead>(reader: R) -> Result<Recording, SweepError> {
        let mut sources: Vec<u64> = Vec::new();
        let mut times_by_source: Vec<Vec<f64>> = Vec::new();
        let mut t_stop: Option<f64> = None;

        for (num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| SweepError::IOError(e.to_string()))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(comment) = line.strip_prefix('#') {
                let mut fields = comment.split_whitespace();
                if fields.next() == Some("t_stop") {
                    let value = fields.next().and_then(|v| v.parse::<f64>().ok()).ok_or_else(
                        || {
                            SweepError::ParseError(format!(
                                "line {}: malformed t_stop comment",
                                num + 1
                            ))
                        },
                    )?;
                    t_stop = Some(value);
                }
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 2 {
                return Err(SweepError::ParseError(format!(
                    "line {}: expected `source_id time`, got {:?}",
                    num + 1,
                    line
                )));
            }
            let source = fields[0].parse::<u64>().map_err(|e| {
                SweepError::ParseError(format!("line {}: invalid source id: {}", num + 1, e))
            })?;
            let time = fields[1].parse::<f64>().map_err(|e| {
                SweepError::ParseError(format!("line {}: invalid spike time: {}", num + 1, e))
            })?;

            match sources.iter().position(|&s| s == source) {
                Some(idx) => times_by_source[idx].push(time),
                None => {
                    sources.push(source);
                    times_by_source.push(vec![time]);
                }
            }
        }

        let latest = times_by_source
            .iter()
            .flatten()
            .fold(f64::NEG_INFINITY, |max, &t| max.max(t));
        let t_stop = t_stop.unwrap_or(latest);

        let spiketrains = times_by_source
            .into_iter()
            .map(|times| SpikeTrain::new(times, 0.0, t_stop, TimeUnits::Ms))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Recording::from_spiketrains(spiketrains))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    const SEED: u64 = 42;

    #[test]
    fn test_spike_train_new() {
        // Unsorted times are sorted on construction
        let train = SpikeTrain::new(vec![5.0, 1.0, 3.0], 0.0, 10.0, TimeUnits::Ms).unwrap();
        assert_eq!(train.times(), &[1.0, 3.0, 5.0]);

        // Empty window
        let train = SpikeTrain::new(vec![], 10.0, 10.0, TimeUnits::Ms);
        assert!(matches!(train, Err(SweepError::InvalidParameter(_))));

        // Non-finite times
        let train = SpikeTrain::new(vec![1.0, f64::NAN], 0.0, 10.0, TimeUnits::Ms);
        assert!(matches!(train, Err(SweepError::InvalidParameter(_))));
    }

    #[test]
    fn test_spike_train_rates_and_units() {
        let train = SpikeTrain::new(vec![100.0, 300.0, 500.0], 0.0, 1000.0, TimeUnits::Ms).unwrap();
        assert_eq!(train.duration_s(), 1.0);
        assert_eq!(train.mean_rate(), 3.0);

        let train = SpikeTrain::new(vec![0.1, 0.3, 0.5], 0.0, 1.0, TimeUnits::S).unwrap();
        assert_eq!(train.duration_s(), 1.0);
        assert_eq!(train.mean_rate(), 3.0);
        assert_eq!(train.times_ms(), vec![100.0, 300.0, 500.0]);
        assert_eq!(train.t_stop_ms(), 1000.0);
    }

    #[test]
    fn test_spike_train_rand() {
        let mut rng = StdRng::seed_from_u64(SEED);

        assert!(SpikeTrain::rand(-1.0, 100.0, &mut rng).is_err());
        assert!(SpikeTrain::rand(10.0, 0.0, &mut rng).is_err());

        let train = SpikeTrain::rand(50.0, 10_000.0, &mut rng).unwrap();
        assert!(train.times().windows(2).all(|w| w[0] <= w[1]));
        assert!(train.times().iter().all(|&t| (0.0..10_000.0).contains(&t)));
        // 50 spikes/s over 10 s, within loose sampling bounds
        assert!(train.len() > 300 && train.len() < 700);

        let train = SpikeTrain::rand(0.0, 100.0, &mut rng).unwrap();
        assert!(train.is_empty());
    }

    #[test]
    fn test_recording_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_0.json");

        let recording = Recording::from_spiketrains(vec![
            SpikeTrain::new(vec![1.0, 2.0], 0.0, 100.0, TimeUnits::Ms).unwrap(),
            SpikeTrain::new(vec![50.0], 0.0, 100.0, TimeUnits::Ms).unwrap(),
        ]);
        recording.save_to(&path).unwrap();

        let reread = Recording::open(&path).unwrap();
        assert_eq!(reread, recording);
    }

    #[test]
    fn test_recording_sniff_json_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_0.out");

        Recording::from_spiketrains(vec![SpikeTrain::new(
            vec![1.0],
            0.0,
            10.0,
            TimeUnits::Ms,
        )
        .unwrap()])
        .save_to(&path)
        .unwrap();

        let recording = Recording::open(&path).unwrap();
        assert_eq!(recording.spiketrains().unwrap().len(), 1);
    }

    #[test]
    fn test_recording_text_raster() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_0.gdf");

        let mut file = File::create(&path).unwrap();
        writeln!(file, "# spikes recorded from Exc").unwrap();
        writeln!(file, "# t_stop 1000.0").unwrap();
        writeln!(file, "3 12.5").unwrap();
        writeln!(file, "1 40.0").unwrap();
        writeln!(file, "3 110.0").unwrap();
        writeln!(file, "1 2.5").unwrap();
        drop(file);

        let recording = Recording::open(&path).unwrap();
        let spiketrains = recording.spiketrains().unwrap();
        assert_eq!(spiketrains.len(), 2);

        // trains keep first-appearance order, times are sorted
        assert_eq!(spiketrains[0].times(), &[12.5, 110.0]);
        assert_eq!(spiketrains[1].times(), &[2.5, 40.0]);
        assert!(spiketrains.iter().all(|st| st.t_stop() == 1000.0));
    }

    #[test]
    fn test_recording_text_raster_without_t_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_0.gdf");

        let mut file = File::create(&path).unwrap();
        writeln!(file, "0 10.0").unwrap();
        writeln!(file, "0 250.0").unwrap();
        drop(file);

        let recording = Recording::open(&path).unwrap();
        let spiketrains = recording.spiketrains().unwrap();
        assert_eq!(spiketrains[0].t_stop(), 250.0);
    }

    #[test]
    fn test_recording_text_raster_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_0.gdf");

        let mut file = File::create(&path).unwrap();
        writeln!(file, "0 10.0 extra").unwrap();
        drop(file);

        assert!(matches!(
            Recording::open(&path),
            Err(SweepError::ParseError(_))
        ));
    }

    #[test]
    fn test_recording_missing_file() {
        assert!(matches!(
            Recording::open("no/such/recording.json"),
            Err(SweepError::IOError(_))
        ));
    }

    #[test]
    fn test_recording_empty_segment() {
        let recording = Recording::from_spiketrains(vec![]);
        assert!(matches!(
            recording.spiketrains(),
            Err(SweepError::EmptyRecording(_))
        ));
    }
}
