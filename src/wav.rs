//! WAV export for synthetic stimuli.
//!
//! Mono 16-bit PCM, used by the simulator to dump generated chirp trains
//! for inspection in external tools.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

/// Write mono 16-bit samples to `path`.
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    samples: &[i16],
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_hound() {
        let dir = std::env::temp_dir().join("chirploc_wav_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tone.wav");

        let samples: Vec<i16> = (0..64).map(|i| (i * 100) as i16).collect();
        write_wav(&path, 44100, &samples).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 44100);
        let back: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(back, samples);

        std::fs::remove_file(&path).ok();
    }
}
