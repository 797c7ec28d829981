//! In-memory audio backend with a manual clock
//!
//! Records every command instead of making sound. Used by headless runs and
//! tests to drive the scheduler tick-by-tick and inspect what was queued.

use std::collections::BTreeMap;

use super::backend::{AudioBackend, AudioError, FilterKind, NodeId, Output, Param, Waveform};

/// What a node was created as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Gain,
    Oscillator(Waveform),
    Filter(FilterKind),
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create { node: NodeId, kind: NodeKind },
    Connect { from: NodeId, to: Output },
    SetValue { node: NodeId, param: Param, value: f32, at: f64 },
    ExponentialRamp { node: NodeId, param: Param, value: f32, end: f64 },
    SetTarget { node: NodeId, param: Param, target: f32, at: f64, time_constant: f64 },
    Cancel { node: NodeId, param: Param, from: f64 },
    Start { node: NodeId, at: f64 },
    Stop { node: NodeId, at: f64 },
    Release { node: NodeId },
    Resume,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    time: f64,
    suspended: bool,
    /// Fail every allocation (simulates a missing or blocked device)
    pub fail_allocations: bool,
    next_id: u32,
    nodes: BTreeMap<NodeId, NodeKind>,
    commands: Vec<Command>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that starts suspended, like a browser before a user gesture
    pub fn suspended() -> Self {
        Self {
            suspended: true,
            ..Self::default()
        }
    }

    /// A backend whose every allocation fails
    pub fn failing() -> Self {
        Self {
            fail_allocations: true,
            ..Self::default()
        }
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn advance(&mut self, secs: f64) {
        self.time += secs;
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn kind_of(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).copied()
    }

    /// Oscillators started so far, with their start times
    pub fn started_oscillators(&self) -> Vec<(NodeId, Waveform, f64)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Start { node, at } => match self.nodes.get(node) {
                    Some(NodeKind::Oscillator(w)) => Some((*node, *w, *at)),
                    _ => None,
                },
                _ => None,
            })
            .collect()
    }

    /// Where `node` was connected to
    pub fn outputs_of(&self, node: NodeId) -> Vec<Output> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Connect { from, to } if *from == node => Some(*to),
                _ => None,
            })
            .collect()
    }

    fn allocate(&mut self, kind: NodeKind, label: &'static str) -> Result<NodeId, AudioError> {
        if self.fail_allocations {
            return Err(AudioError::NodeAllocation(label));
        }
        let node = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(node, kind);
        self.commands.push(Command::Create { node, kind });
        Ok(node)
    }

    fn check_source(&self, node: NodeId) -> Result<(), AudioError> {
        match self.nodes.get(&node) {
            Some(NodeKind::Oscillator(_)) => Ok(()),
            Some(_) => Err(AudioError::Schedule(node)),
            None => Err(AudioError::UnknownNode(node)),
        }
    }

    fn check(&self, node: NodeId) -> Result<(), AudioError> {
        if self.nodes.contains_key(&node) {
            Ok(())
        } else {
            Err(AudioError::UnknownNode(node))
        }
    }
}

impl AudioBackend for RecordingBackend {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn resume(&mut self) {
        self.suspended = false;
        self.commands.push(Command::Resume);
    }

    fn create_gain(&mut self) -> Result<NodeId, AudioError> {
        self.allocate(NodeKind::Gain, "gain")
    }

    fn create_oscillator(&mut self, waveform: Waveform) -> Result<NodeId, AudioError> {
        self.allocate(NodeKind::Oscillator(waveform), "oscillator")
    }

    fn create_filter(&mut self, kind: FilterKind) -> Result<NodeId, AudioError> {
        self.allocate(NodeKind::Filter(kind), "filter")
    }

    fn connect(&mut self, from: NodeId, to: Output) -> Result<(), AudioError> {
        self.check(from)?;
        if let Output::Node(target) = to {
            self.check(target)?;
        }
        self.commands.push(Command::Connect { from, to });
        Ok(())
    }

    fn set_value_at(&mut self, node: NodeId, param: Param, value: f32, at: f64) -> Result<(), AudioError> {
        self.check(node)?;
        self.commands.push(Command::SetValue { node, param, value, at });
        Ok(())
    }

    fn exponential_ramp_to(
        &mut self,
        node: NodeId,
        param: Param,
        value: f32,
        end: f64,
    ) -> Result<(), AudioError> {
        self.check(node)?;
        // Web Audio rejects exponential ramps to zero
        if value <= 0.0 {
            return Err(AudioError::Param { node, param });
        }
        self.commands.push(Command::ExponentialRamp { node, param, value, end });
        Ok(())
    }

    fn set_target_at(
        &mut self,
        node: NodeId,
        param: Param,
        target: f32,
        at: f64,
        time_constant: f64,
    ) -> Result<(), AudioError> {
        self.check(node)?;
        self.commands.push(Command::SetTarget {
            node,
            param,
            target,
            at,
            time_constant,
        });
        Ok(())
    }

    fn cancel_scheduled(&mut self, node: NodeId, param: Param, from: f64) -> Result<(), AudioError> {
        self.check(node)?;
        self.commands.push(Command::Cancel { node, param, from });
        Ok(())
    }

    fn start_at(&mut self, node: NodeId, at: f64) -> Result<(), AudioError> {
        self.check_source(node)?;
        self.commands.push(Command::Start { node, at });
        Ok(())
    }

    fn stop_at(&mut self, node: NodeId, at: f64) -> Result<(), AudioError> {
        self.check_source(node)?;
        self.commands.push(Command::Stop { node, at });
        Ok(())
    }

    fn release(&mut self, node: NodeId) {
        self.commands.push(Command::Release { node });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_graph_and_clock() {
        let mut backend = RecordingBackend::new();
        let osc = backend.create_oscillator(Waveform::Sine).unwrap();
        let gain = backend.create_gain().unwrap();
        backend.connect(osc, Output::Node(gain)).unwrap();
        backend.connect(gain, Output::Destination).unwrap();
        backend.advance(0.5);
        backend.start_at(osc, backend.current_time()).unwrap();

        assert_eq!(backend.outputs_of(osc), vec![Output::Node(gain)]);
        assert_eq!(backend.started_oscillators(), vec![(osc, Waveform::Sine, 0.5)]);
    }

    #[test]
    fn test_rejects_invalid_calls() {
        let mut backend = RecordingBackend::new();
        let gain = backend.create_gain().unwrap();
        assert_eq!(
            backend.exponential_ramp_to(gain, Param::Gain, 0.0, 1.0),
            Err(AudioError::Param {
                node: gain,
                param: Param::Gain
            })
        );
        assert_eq!(backend.start_at(gain, 0.0), Err(AudioError::Schedule(gain)));
        assert_eq!(
            backend.connect(NodeId(99), Output::Destination),
            Err(AudioError::UnknownNode(NodeId(99)))
        );
    }

    #[test]
    fn test_failing_backend_allocates_nothing() {
        let mut backend = RecordingBackend::failing();
        assert!(backend.create_gain().is_err());
        assert!(backend.commands().is_empty());
    }
}
