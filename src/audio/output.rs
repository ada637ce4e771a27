use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig, SupportedStreamConfig};
use tracing::{error, info};

use super::graph::AudioGraph;
use crate::error::EngineError;

/// Default output device and its preferred configuration
pub fn default_output() -> Result<(Device, SupportedStreamConfig), EngineError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| EngineError::UnsupportedPlatform("No output device available".into()))?;
    let config = device
        .default_output_config()
        .map_err(|e| EngineError::UnsupportedPlatform(e.to_string()))?;
    info!(
        "Output device: {} ({} Hz, {} ch, {:?})",
        device.name().unwrap_or_else(|_| "unknown".into()),
        config.sample_rate().0,
        config.channels(),
        config.sample_format()
    );
    Ok((device, config))
}

/// Build the output stream for the device's sample format. The graph moves into the callback.
pub fn build_stream(
    device: &Device,
    config: &SupportedStreamConfig,
    graph: AudioGraph,
) -> Result<Stream, EngineError> {
    let stream_config: StreamConfig = config.clone().into();
    match config.sample_format() {
        SampleFormat::F32 => build_typed::<f32>(device, &stream_config, graph),
        SampleFormat::I16 => build_typed::<i16>(device, &stream_config, graph),
        SampleFormat::U16 => build_typed::<u16>(device, &stream_config, graph),
        format => Err(EngineError::UnsupportedPlatform(format!(
            "Unsupported sample format: {:?}",
            format
        ))),
    }
}

fn build_typed<T>(
    device: &Device,
    config: &StreamConfig,
    mut graph: AudioGraph,
) -> Result<Stream, EngineError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let mut mono: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                mono.resize(frames, 0.0);
                graph.render(&mut mono);
                for (frame, &sample) in data.chunks_mut(channels).zip(mono.iter()) {
                    let value = T::from_sample(sample);
                    for out in frame.iter_mut() {
                        *out = value;
                    }
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| EngineError::Stream(e.to_string()))
}

pub fn start(stream: &Stream) -> Result<(), EngineError> {
    stream.play().map_err(|e| EngineError::Stream(e.to_string()))
}
