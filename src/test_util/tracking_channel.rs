use std::collections::VecDeque;
use tracing::{debug, error};
use crate::channel::Channel;
use crate::config::ProtocolConfig;
use crate::frame::{Frame, SimTime};

/// An in-memory [Channel] that records everything an engine does, for driving a single engine
///  event by event in tests. Timer discipline violations are recorded rather than panicking, so
///  tests can assert on them.
#[derive(Debug)]
pub struct TrackingChannel {
    pub config: ProtocolConfig,
    pub now: SimTime,
    pub outgoing: VecDeque<String>,
    pub accept_deliveries: bool,
    emitted: Vec<Frame>,
    delivered: Vec<String>,
    log_lines: Vec<String>,
    violations: Vec<String>,
    data_timer_active: bool,
    ack_timer_active: bool,
    data_timer_starts: usize,
}

impl TrackingChannel {
    pub fn new(config: ProtocolConfig) -> TrackingChannel {
        TrackingChannel {
            config,
            now: 0,
            outgoing: VecDeque::new(),
            accept_deliveries: true,
            emitted: Vec::new(),
            delivered: Vec::new(),
            log_lines: Vec::new(),
            violations: Vec::new(),
            data_timer_active: false,
            ack_timer_active: false,
            data_timer_starts: 0,
        }
    }

    /// a channel whose upper layer has the given payloads to send
    pub fn with_payloads(config: ProtocolConfig, payloads: &[&str]) -> TrackingChannel {
        let mut result = TrackingChannel::new(config);
        result.outgoing = payloads.iter().map(|p| p.to_string()).collect();
        result
    }

    /// returns the frames emitted since the last call, clearing the buffer
    pub fn take_emitted(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.emitted)
    }

    pub fn emitted_count(&self) -> usize {
        self.emitted.len()
    }

    pub fn delivered(&self) -> &[String] {
        &self.delivered
    }

    pub fn log_lines(&self) -> &[String] {
        &self.log_lines
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    pub fn data_timer_active(&self) -> bool {
        self.data_timer_active
    }

    pub fn ack_timer_active(&self) -> bool {
        self.ack_timer_active
    }

    /// number of times the data timer was started or restarted
    pub fn data_timer_starts(&self) -> usize {
        self.data_timer_starts
    }

    /// simulates a timer firing: the timer is inactive once its event is delivered
    pub fn expire_data_timer(&mut self) {
        self.data_timer_active = false;
    }

    pub fn expire_ack_timer(&mut self) {
        self.ack_timer_active = false;
    }

    fn violation(&mut self, msg: &str) {
        error!("timer discipline violation: {}", msg);
        self.violations.push(msg.to_string());
    }
}

impl Channel for TrackingChannel {
    fn send_window(&self) -> u32 {
        self.config.send_window
    }

    fn recv_window(&self) -> u32 {
        self.config.recv_window
    }

    fn max_sequence(&self) -> u32 {
        self.config.max_sequence
    }

    fn timeout(&self) -> SimTime {
        self.config.timeout
    }

    fn now(&self) -> SimTime {
        self.now
    }

    fn emit(&mut self, frame: Frame) {
        debug!("emitting {}", frame);
        self.emitted.push(frame);
    }

    fn start_data_timer(&mut self) {
        if self.data_timer_active {
            self.violation("data timer started while active");
        }
        self.data_timer_active = true;
        self.data_timer_starts += 1;
    }

    fn restart_data_timer(&mut self) {
        self.data_timer_active = true;
        self.data_timer_starts += 1;
    }

    fn cancel_data_timer(&mut self) {
        if !self.data_timer_active {
            self.violation("inactive data timer cancelled");
        }
        self.data_timer_active = false;
    }

    fn is_data_timer_active(&self) -> bool {
        self.data_timer_active
    }

    fn start_ack_timer(&mut self) {
        if self.ack_timer_active {
            self.violation("ack timer started while active");
        }
        self.ack_timer_active = true;
    }

    fn cancel_ack_timer(&mut self) {
        if !self.ack_timer_active {
            self.violation("inactive ack timer cancelled");
        }
        self.ack_timer_active = false;
    }

    fn is_ack_timer_active(&self) -> bool {
        self.ack_timer_active
    }

    fn deliver_upward(&mut self, payload: String) -> bool {
        self.delivered.push(payload);
        self.accept_deliveries
    }

    fn fetch_downward(&mut self) -> Option<String> {
        self.outgoing.pop_front()
    }

    fn log(&mut self, line: &str) {
        self.log_lines.push(line.to_string());
    }
}
