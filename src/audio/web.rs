//! Web Audio backend
//!
//! Maps [`AudioBackend`] calls onto a browser `AudioContext`. Handles are kept
//! in a table until released; the browser keeps a node alive until its
//! scheduled stop regardless of whether we still hold it.

use std::collections::HashMap;

use web_sys::{
    AudioContext, AudioContextState, AudioNode, AudioParam, BiquadFilterNode, BiquadFilterType,
    GainNode, OscillatorNode, OscillatorType,
};

use super::backend::{AudioBackend, AudioError, FilterKind, NodeId, Output, Param, Waveform};

enum WebNode {
    Gain(GainNode),
    Oscillator(OscillatorNode),
    Filter(BiquadFilterNode),
}

impl WebNode {
    fn audio_node(&self) -> &AudioNode {
        match self {
            WebNode::Gain(node) => node,
            WebNode::Oscillator(node) => node,
            WebNode::Filter(node) => node,
        }
    }

    fn param(&self, param: Param) -> Option<AudioParam> {
        match (self, param) {
            (WebNode::Gain(node), Param::Gain) => Some(node.gain()),
            (WebNode::Oscillator(node), Param::Frequency) => Some(node.frequency()),
            (WebNode::Filter(node), Param::Frequency) => Some(node.frequency()),
            (WebNode::Filter(node), Param::Q) => Some(node.q()),
            _ => None,
        }
    }
}

pub struct WebAudioBackend {
    ctx: Option<AudioContext>,
    next_id: u32,
    nodes: HashMap<NodeId, WebNode>,
}

impl Default for WebAudioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl WebAudioBackend {
    pub fn new() -> Self {
        // Try to create audio context (may fail if not in secure context)
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            next_id: 0,
            nodes: HashMap::new(),
        }
    }

    fn ctx(&self) -> Result<&AudioContext, AudioError> {
        self.ctx.as_ref().ok_or(AudioError::Unavailable)
    }

    fn insert(&mut self, node: WebNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.nodes.insert(id, node);
        id
    }

    fn node(&self, id: NodeId) -> Result<&WebNode, AudioError> {
        self.nodes.get(&id).ok_or(AudioError::UnknownNode(id))
    }

    fn audio_param(&self, id: NodeId, param: Param) -> Result<AudioParam, AudioError> {
        self.node(id)?
            .param(param)
            .ok_or(AudioError::Param { node: id, param })
    }
}

impl AudioBackend for WebAudioBackend {
    fn current_time(&self) -> f64 {
        self.ctx.as_ref().map_or(0.0, |ctx| ctx.current_time())
    }

    fn is_suspended(&self) -> bool {
        self.ctx
            .as_ref()
            .is_some_and(|ctx| ctx.state() == AudioContextState::Suspended)
    }

    fn resume(&mut self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    fn create_gain(&mut self) -> Result<NodeId, AudioError> {
        let gain = self
            .ctx()?
            .create_gain()
            .map_err(|_| AudioError::NodeAllocation("gain"))?;
        Ok(self.insert(WebNode::Gain(gain)))
    }

    fn create_oscillator(&mut self, waveform: Waveform) -> Result<NodeId, AudioError> {
        let osc = self
            .ctx()?
            .create_oscillator()
            .map_err(|_| AudioError::NodeAllocation("oscillator"))?;
        osc.set_type(match waveform {
            Waveform::Sine => OscillatorType::Sine,
            Waveform::Square => OscillatorType::Square,
            Waveform::Sawtooth => OscillatorType::Sawtooth,
            Waveform::Triangle => OscillatorType::Triangle,
        });
        Ok(self.insert(WebNode::Oscillator(osc)))
    }

    fn create_filter(&mut self, kind: FilterKind) -> Result<NodeId, AudioError> {
        let filter = self
            .ctx()?
            .create_biquad_filter()
            .map_err(|_| AudioError::NodeAllocation("filter"))?;
        filter.set_type(match kind {
            FilterKind::LowPass => BiquadFilterType::Lowpass,
        });
        Ok(self.insert(WebNode::Filter(filter)))
    }

    fn connect(&mut self, from: NodeId, to: Output) -> Result<(), AudioError> {
        let source = self.node(from)?.audio_node();
        let connected = match to {
            Output::Node(target) => source.connect_with_audio_node(self.node(target)?.audio_node()),
            Output::Destination => source.connect_with_audio_node(&self.ctx()?.destination()),
        };
        connected
            .map(|_| ())
            .map_err(|_| AudioError::Connect { from, to })
    }

    fn set_value_at(
        &mut self,
        node: NodeId,
        param: Param,
        value: f32,
        at: f64,
    ) -> Result<(), AudioError> {
        self.audio_param(node, param)?
            .set_value_at_time(value, at)
            .map(|_| ())
            .map_err(|_| AudioError::Param { node, param })
    }

    fn exponential_ramp_to(
        &mut self,
        node: NodeId,
        param: Param,
        value: f32,
        end: f64,
    ) -> Result<(), AudioError> {
        self.audio_param(node, param)?
            .exponential_ramp_to_value_at_time(value, end)
            .map(|_| ())
            .map_err(|_| AudioError::Param { node, param })
    }

    fn set_target_at(
        &mut self,
        node: NodeId,
        param: Param,
        target: f32,
        at: f64,
        time_constant: f64,
    ) -> Result<(), AudioError> {
        self.audio_param(node, param)?
            .set_target_at_time(target, at, time_constant)
            .map(|_| ())
            .map_err(|_| AudioError::Param { node, param })
    }

    fn cancel_scheduled(&mut self, node: NodeId, param: Param, from: f64) -> Result<(), AudioError> {
        self.audio_param(node, param)?
            .cancel_scheduled_values(from)
            .map(|_| ())
            .map_err(|_| AudioError::Param { node, param })
    }

    fn start_at(&mut self, node: NodeId, at: f64) -> Result<(), AudioError> {
        match self.node(node)? {
            WebNode::Oscillator(osc) => osc
                .start_with_when(at)
                .map_err(|_| AudioError::Schedule(node)),
            _ => Err(AudioError::Schedule(node)),
        }
    }

    fn stop_at(&mut self, node: NodeId, at: f64) -> Result<(), AudioError> {
        match self.node(node)? {
            WebNode::Oscillator(osc) => osc
                .stop_with_when(at)
                .map_err(|_| AudioError::Schedule(node)),
            _ => Err(AudioError::Schedule(node)),
        }
    }

    fn release(&mut self, node: NodeId) {
        self.nodes.remove(&node);
    }
}
