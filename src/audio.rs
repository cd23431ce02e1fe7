//! Audio I/O: decoding input files and resampling to the pipeline rate

use crate::config::Config;
use crate::error::{Result, ScoreError};
use hound::WavReader;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded mono waveform
#[derive(Debug, Clone)]
pub struct Waveform {
    /// Samples normalized to [-1, 1]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    pub fn duration_sec(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }
}

/// Load an audio file, downmix to mono and resample to the configured rate
pub fn load_audio_file<P: AsRef<Path>>(path: P, config: &Config) -> Result<Waveform> {
    let path = path.as_ref();

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    let waveform = match extension.as_str() {
        "wav" => load_wav_file(path)?,
        "mp3" => load_mp3_file(path)?,
        _ => {
            return Err(ScoreError::InvalidAudioFormat(format!(
                "Unsupported audio format: {}",
                extension
            )))
        }
    };

    if waveform.samples.is_empty() {
        return Err(ScoreError::InvalidAudioFormat(
            "Audio file contains no samples".to_string(),
        ));
    }
    if !(8000..=192000).contains(&waveform.sample_rate) {
        return Err(ScoreError::UnsupportedSampleRate(waveform.sample_rate));
    }

    resample(waveform, config)
}

/// Load WAV file via hound
fn load_wav_file<P: AsRef<Path>>(path: P) -> Result<Waveform> {
    let mut reader =
        WavReader::open(path).map_err(|e| ScoreError::AudioFileError(e.to_string()))?;
    let spec = reader.spec();

    if spec.channels == 0 || spec.channels > 2 {
        return Err(ScoreError::InvalidAudioFormat(format!(
            "Unsupported channel count: {}",
            spec.channels
        )));
    }
    if spec.bits_per_sample > 32 {
        return Err(ScoreError::InvalidAudioFormat(format!(
            "Unsupported bit depth: {}",
            spec.bits_per_sample
        )));
    }

    let mut samples: Vec<f32> = Vec::with_capacity(reader.len() as usize);
    match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            for sample in reader.samples::<i32>() {
                let sample =
                    sample.map_err(|e| ScoreError::AudioFileError(e.to_string()))? as f32
                        / max_value;
                samples.push(sample);
            }
        }
        hound::SampleFormat::Float => {
            for sample in reader.samples::<f32>() {
                samples.push(sample.map_err(|e| ScoreError::AudioFileError(e.to_string()))?);
            }
        }
    }

    // Interleaved stereo to mono
    let samples = if spec.channels == 2 {
        samples
            .chunks_exact(2)
            .map(|frame| (frame[0] + frame[1]) / 2.0)
            .collect()
    } else {
        samples
    };

    Ok(Waveform {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Load MP3 file via symphonia
fn load_mp3_file<P: AsRef<Path>>(path: P) -> Result<Waveform> {
    let path = path.as_ref();
    let src = File::open(path).map_err(|e| ScoreError::AudioFileError(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ScoreError::InvalidAudioFormat(format!("Probe failed: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| {
            ScoreError::InvalidAudioFormat("No supported audio tracks found".to_string())
        })?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| ScoreError::InvalidAudioFormat(format!("No decoder: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(_) => break,
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => mix_to_mono(&decoded, &mut samples)?,
            // Corrupted packets are skipped, not fatal
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => {
                return Err(ScoreError::AudioFileError(format!("Decode failed: {}", e)));
            }
        }
    }

    Ok(Waveform {
        samples,
        sample_rate,
    })
}

/// Convert a decoded buffer to f32 mono and append to `out`
fn mix_to_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) -> Result<()> {
    let channels = decoded.spec().channels.count();
    match decoded {
        AudioBufferRef::F32(buf) => {
            for i in 0..buf.frames() {
                let sum: f32 = (0..channels).map(|ch| buf.chan(ch)[i]).sum();
                out.push(sum / channels as f32);
            }
        }
        AudioBufferRef::S16(buf) => {
            for i in 0..buf.frames() {
                let sum: f32 = (0..channels).map(|ch| buf.chan(ch)[i] as f32 / 32768.0).sum();
                out.push(sum / channels as f32);
            }
        }
        AudioBufferRef::S32(buf) => {
            for i in 0..buf.frames() {
                let sum: f32 = (0..channels)
                    .map(|ch| buf.chan(ch)[i] as f32 / 2147483648.0)
                    .sum();
                out.push(sum / channels as f32);
            }
        }
        AudioBufferRef::F64(buf) => {
            for i in 0..buf.frames() {
                let sum: f64 = (0..channels).map(|ch| buf.chan(ch)[i]).sum();
                out.push((sum / channels as f64) as f32);
            }
        }
        AudioBufferRef::U8(buf) => {
            for i in 0..buf.frames() {
                let sum: f32 = (0..channels)
                    .map(|ch| (buf.chan(ch)[i] as f32 - 128.0) / 128.0)
                    .sum();
                out.push(sum / channels as f32);
            }
        }
        _ => {
            return Err(ScoreError::InvalidAudioFormat(
                "Unsupported decoded sample format".to_string(),
            ));
        }
    }
    Ok(())
}

/// Resample a waveform to the configured target rate with sinc interpolation
fn resample(waveform: Waveform, config: &Config) -> Result<Waveform> {
    let target_rate = config.audio.target_sample_rate;
    if waveform.sample_rate == target_rate {
        return Ok(waveform);
    }

    let params = SincInterpolationParameters {
        sinc_len: config.audio.resample_sinc_len,
        f_cutoff: config.audio.resample_cutoff,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let channel_data: Vec<Vec<f64>> = vec![waveform.samples.iter().map(|&s| s as f64).collect()];
    let mut resampler = SincFixedIn::<f64>::new(
        target_rate as f64 / waveform.sample_rate as f64,
        2.0,
        params,
        waveform.samples.len(),
        1,
    )
    .map_err(|e| ScoreError::ResampleError(e.to_string()))?;

    let resampled = resampler
        .process(&channel_data, None)
        .map_err(|e| ScoreError::ResampleError(e.to_string()))?;
    let mut samples: Vec<f32> = resampled[0].iter().map(|&s| s as f32).collect();

    // Drain the filter delay so the trailing audio is not dropped
    let tail = resampler
        .process_partial(None::<&[Vec<f64>]>, None)
        .map_err(|e| ScoreError::ResampleError(e.to_string()))?;
    if let Some(channel) = tail.first() {
        samples.extend(channel.iter().map(|&s| s as f32));
    }

    Ok(Waveform {
        samples,
        sample_rate: target_rate,
    })
}

/// Validate that the input path exists and looks like a supported audio file
pub fn validate_audio_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ScoreError::InputValidationError(format!(
            "Audio file does not exist: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !matches!(extension.as_str(), "wav" | "mp3") {
        return Err(ScoreError::InvalidAudioFormat(format!(
            "Unsupported audio format: {}",
            extension
        )));
    }

    Ok(())
}
