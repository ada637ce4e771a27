pub mod clock;
pub mod graph;
pub mod output;

use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use tracing::info;

pub use clock::AudioClock;
pub use graph::{AudioGraph, GraphStatus};

use crate::command::{CommandBus, CommandSender};
use crate::error::EngineError;
use crate::fx::{BusProcessor, DriveCurve, EffectsBusState};
use crate::record::{capture_channel, CaptureMessage, RecordingTap};

/// Where rendered audio goes
enum Output {
    /// Realtime device; the graph lives inside the stream callback
    Device { stream: cpal::Stream, started: bool },
    /// Rendered on demand by the caller
    Offline(Box<AudioGraph>),
}

/// The audio context: clock, command path into the graph, and the output that drives
/// rendering. Created by `Engine::initialize`, dropped on shutdown.
pub struct AudioContext {
    clock: AudioClock,
    sender: CommandSender,
    capture: Option<Receiver<CaptureMessage>>,
    status: Arc<RwLock<GraphStatus>>,
    output: Output,
}

fn build_graph(
    sample_rate: u32,
    bus_state: &EffectsBusState,
    curve: DriveCurve,
) -> (AudioGraph, AudioClock, CommandSender, Receiver<CaptureMessage>, Arc<RwLock<GraphStatus>>) {
    let commands = CommandBus::new();
    let clock = AudioClock::new(sample_rate);
    let (capture_tx, capture_rx) = capture_channel();
    let status = Arc::new(RwLock::new(GraphStatus::default()));
    let graph = AudioGraph::new(
        clock.clone(),
        commands.receiver(),
        BusProcessor::new(sample_rate as f32, bus_state, curve),
        RecordingTap::new(capture_tx),
        status.clone(),
    );
    (graph, clock, commands.sender(), capture_rx, status)
}

impl AudioContext {
    /// Open the default output device. The stream is built but not started until `resume`.
    pub fn realtime(bus_state: &EffectsBusState, curve: DriveCurve) -> Result<Self, EngineError> {
        let (device, config) = output::default_output()?;
        let (graph, clock, sender, capture, status) =
            build_graph(config.sample_rate().0, bus_state, curve);
        let stream = output::build_stream(&device, &config, graph)?;
        Ok(Self {
            clock,
            sender,
            capture: Some(capture),
            status,
            output: Output::Device {
                stream,
                started: false,
            },
        })
    }

    /// A context rendered by the caller through `render_offline`
    pub fn offline(sample_rate: u32, bus_state: &EffectsBusState, curve: DriveCurve) -> Self {
        let (graph, clock, sender, capture, status) = build_graph(sample_rate, bus_state, curve);
        info!("Offline audio context at {} Hz", sample_rate);
        Self {
            clock,
            sender,
            capture: Some(capture),
            status,
            output: Output::Offline(Box::new(graph)),
        }
    }

    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    pub fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.output, Output::Offline(_))
    }

    /// Hand the capture receiver to the recorder (once)
    pub fn take_capture(&mut self) -> Option<Receiver<CaptureMessage>> {
        self.capture.take()
    }

    pub fn status(&self) -> GraphStatus {
        self.status.read().clone()
    }

    /// Start the device stream. Offline contexts are always running.
    pub fn resume(&mut self) -> Result<(), EngineError> {
        match &mut self.output {
            Output::Device { stream, started } => {
                if !*started {
                    output::start(stream)?;
                    *started = true;
                    info!("Audio stream started");
                }
                Ok(())
            }
            Output::Offline(_) => Ok(()),
        }
    }

    /// Apply queued commands without rendering. Only meaningful offline; a device graph
    /// drains its queue on every callback.
    pub fn flush(&mut self) {
        if let Output::Offline(graph) = &mut self.output {
            graph.drain_commands();
        }
    }

    /// Render `frames` mono samples. Device contexts render on their own and return nothing.
    pub fn render_offline(&mut self, frames: usize) -> Vec<f32> {
        match &mut self.output {
            Output::Offline(graph) => {
                let mut out = vec![0.0f32; frames];
                graph.render(&mut out);
                out
            }
            Output::Device { .. } => Vec::new(),
        }
    }
}
