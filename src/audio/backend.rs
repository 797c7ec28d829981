//! Audio backend abstraction
//!
//! A thin Web Audio shaped interface: oscillators, gains and biquad filters
//! addressed by [`NodeId`], automated on the backend's own clock. The engine
//! only talks to this trait, so the scheduler runs the same against a browser
//! `AudioContext` or the in-memory [`super::RecordingBackend`].

use thiserror::Error;

/// Handle to a node owned by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Oscillator shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Biquad filter responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
}

/// Automatable parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// Gain node level
    Gain,
    /// Oscillator or filter frequency (Hz)
    Frequency,
    /// Filter resonance
    Q,
}

/// Connection target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Node(NodeId),
    /// The device output
    Destination,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("no audio context available")]
    Unavailable,
    #[error("failed to schedule start/stop on {0:?}")]
    Schedule(NodeId),
    #[error("failed to allocate {0} node")]
    NodeAllocation(&'static str),
    #[error("failed to connect {from:?} to {to:?}")]
    Connect { from: NodeId, to: Output },
    #[error("failed to automate {param:?} on {node:?}")]
    Param { node: NodeId, param: Param },
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
}

/// Operations the engine needs from a sound device
pub trait AudioBackend {
    /// Audio clock in seconds
    fn current_time(&self) -> f64;

    fn is_suspended(&self) -> bool;

    /// Ask a suspended context to resume (best effort)
    fn resume(&mut self);

    fn create_gain(&mut self) -> Result<NodeId, AudioError>;

    fn create_oscillator(&mut self, waveform: Waveform) -> Result<NodeId, AudioError>;

    fn create_filter(&mut self, kind: FilterKind) -> Result<NodeId, AudioError>;

    fn connect(&mut self, from: NodeId, to: Output) -> Result<(), AudioError>;

    /// Jump to `value` at time `at`
    fn set_value_at(&mut self, node: NodeId, param: Param, value: f32, at: f64)
    -> Result<(), AudioError>;

    /// Exponential ramp ending at `value` at time `end`
    fn exponential_ramp_to(
        &mut self,
        node: NodeId,
        param: Param,
        value: f32,
        end: f64,
    ) -> Result<(), AudioError>;

    /// Exponential approach toward `target` starting at `at`
    fn set_target_at(
        &mut self,
        node: NodeId,
        param: Param,
        target: f32,
        at: f64,
        time_constant: f64,
    ) -> Result<(), AudioError>;

    /// Drop automation scheduled at or after `from`
    fn cancel_scheduled(&mut self, node: NodeId, param: Param, from: f64)
    -> Result<(), AudioError>;

    fn start_at(&mut self, node: NodeId, at: f64) -> Result<(), AudioError>;

    fn stop_at(&mut self, node: NodeId, at: f64) -> Result<(), AudioError>;

    /// Forget a handle; the device keeps playing whatever was already scheduled
    fn release(&mut self, node: NodeId);
}
