//! A deterministic discrete-event simulation of two terminals connected by a point-to-point
//!  channel. Each terminal runs a protocol engine, and the engines see the simulation only
//!  through their [Endpoint], which implements [Channel].
//!
//! Frames travel as encoded text and are decoded on arrival, so frames garbled by the
//!  [LossModel] are rejected by the codec like on a real line. Data frames are serialized on the
//!  sending terminal's transmitter and produce a transmission-complete event. ACK and NAK frames
//!  occupy no transmitter time, but they leave after any data frame already on the transmitter,
//!  so frames never overtake each other in one direction.
//!
//! Events with the same time are processed in the order they were scheduled.

use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use anyhow::bail;
use tracing::{debug, error, info, trace, warn};
use crate::channel::Channel;
use crate::config::{ProtocolConfig, ProtocolKind};
use crate::diagnostics::TracingSink;
use crate::frame::{Frame, FrameKind, SimTime};
use crate::protocol::{new_protocol, Protocol};
use crate::sequence_space::SeqNo;
use crate::test_util::loss_model::{Fate, LossModel};
use crate::test_util::network_layer::NetworkLayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::A, Side::B];

    fn idx(&self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    pub fn other(&self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Side::A => "A",
            Side::B => "B",
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// time it takes to put a data frame on the wire
    pub transmission_time: SimTime,
    /// time between a frame leaving the transmitter and its arrival at the other side
    pub propagation_delay: SimTime,
    /// delay of the deferred-ack timer
    pub ack_delay: SimTime,
    /// the simulation stops when the next event is later than this
    pub max_time: SimTime,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            transmission_time: 10,
            propagation_delay: 50,
            ack_delay: 20,
            max_time: 1_000_000,
        }
    }
}

impl LinkConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.transmission_time == 0 {
            bail!("transmission time must be positive");
        }
        // a frame's receive time must be after its send time
        if self.propagation_delay == 0 {
            bail!("propagation delay must be positive");
        }
        if self.ack_delay == 0 {
            bail!("ack delay must be positive");
        }
        Ok(())
    }
}

/// What to simulate: terminal A runs `protocol`, terminal B runs its peer protocol
#[derive(Debug, Clone)]
pub struct SimulationSetup {
    pub protocol: ProtocolKind,
    pub config: ProtocolConfig,
    pub link: LinkConfig,
    /// number of payloads each terminal's network layer has to send
    pub packets: [u32; 2],
}

impl SimulationSetup {
    pub fn new(protocol: ProtocolKind, packets_a: u32, packets_b: u32) -> SimulationSetup {
        SimulationSetup {
            protocol,
            config: ProtocolConfig::default(),
            link: LinkConfig::default(),
            packets: [packets_a, packets_b],
        }
    }

    fn protocol_for(&self, side: Side) -> ProtocolKind {
        match side {
            Side::A => self.protocol,
            Side::B => self.protocol.peer(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TerminalReport {
    pub delivered: Vec<String>,
    pub payloads_sent: u32,
    pub out_of_order: u32,
    pub invalid: u32,
    pub emitted: Vec<Frame>,
    pub transmissions_completed: u32,
    pub data_timeouts: u32,
    pub ack_timeouts: u32,
    pub malformed_received: u32,
    pub log_lines: Vec<String>,
}

impl TerminalReport {
    pub fn count_emitted(&self, kind: FrameKind) -> usize {
        self.emitted.iter()
            .filter(|f| f.kind() == kind)
            .count()
    }
}

#[derive(Debug)]
pub struct SimulationReport {
    pub end_time: SimTime,
    /// false if the simulation was stopped by the time limit rather than running out of events
    pub finished: bool,
    pub terminals: [TerminalReport; 2],
    pub violations: Vec<String>,
}

impl SimulationReport {
    pub fn terminal(&self, side: Side) -> &TerminalReport {
        &self.terminals[side.idx()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Data,
    Ack,
}

#[derive(Debug)]
enum Event {
    TransmissionComplete(SeqNo),
    Arrival(String),
    Timeout(TimerKind, u64),
}

#[derive(Debug)]
struct Scheduled {
    time: SimTime,
    order: u64,
    side: Side,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.order == other.order
    }
}
impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.order).cmp(&(other.time, other.order))
    }
}

#[derive(Default)]
struct Terminal {
    network: NetworkLayer,
    /// generation of the running timer, `None` if inactive
    data_timer: Option<u64>,
    ack_timer: Option<u64>,
    busy_until: SimTime,
    report: TerminalReport,
}

impl Terminal {
    fn timer_mut(&mut self, kind: TimerKind) -> &mut Option<u64> {
        match kind {
            TimerKind::Data => &mut self.data_timer,
            TimerKind::Ack => &mut self.ack_timer,
        }
    }

    fn timer(&self, kind: TimerKind) -> Option<u64> {
        match kind {
            TimerKind::Data => self.data_timer,
            TimerKind::Ack => self.ack_timer,
        }
    }

    fn into_report(self) -> TerminalReport {
        TerminalReport {
            payloads_sent: self.network.sent(),
            out_of_order: self.network.out_of_order(),
            invalid: self.network.invalid(),
            delivered: self.network.into_delivered(),
            ..self.report
        }
    }
}

struct World {
    now: SimTime,
    next_order: u64,
    timer_generation: u64,
    queue: BinaryHeap<Reverse<Scheduled>>,
    config: ProtocolConfig,
    link: LinkConfig,
    loss: Box<dyn LossModel>,
    terminals: [Terminal; 2],
    violations: Vec<String>,
}

impl World {
    fn schedule(&mut self, time: SimTime, side: Side, event: Event) {
        trace!("scheduling {:?} for {} at {}", event, side, time);
        let order = self.next_order;
        self.next_order += 1;
        self.queue.push(Reverse(Scheduled { time, order, side, event }));
    }

    fn violation(&mut self, side: Side, msg: &str) {
        error!("{} at {}: {}", side, self.now, msg);
        self.violations.push(format!("{} at {}: {}", side, self.now, msg));
    }

    fn transmit(&mut self, side: Side, frame: Frame) {
        let now = self.now;
        let frame = frame.with_send_time(now);
        let line = match frame.encode() {
            Some(line) => line,
            None => return self.violation(side, "undefined frame emitted"),
        };

        let terminal = &mut self.terminals[side.idx()];
        let departure = match frame.seq() {
            Some(seq) => {
                let start = terminal.busy_until.max(now);
                terminal.busy_until = start + self.link.transmission_time;
                let done = terminal.busy_until;
                self.schedule(done, side, Event::TransmissionComplete(seq));
                done
            }
            None => terminal.busy_until.max(now),
        };
        let arrival = departure + self.link.propagation_delay;

        match self.loss.fate(side, &frame) {
            Fate::Deliver => self.schedule(arrival, side.other(), Event::Arrival(line)),
            Fate::Corrupt => {
                debug!("{} corrupted {}", side, frame);
                self.schedule(arrival, side.other(), Event::Arrival(format!("X{}", line)));
            }
            Fate::Drop => debug!("{} dropped {}", side, frame),
        }
        self.terminals[side.idx()].report.emitted.push(frame);
    }

    fn start_timer(&mut self, side: Side, kind: TimerKind, restart: bool) {
        if !restart && self.terminals[side.idx()].timer(kind).is_some() {
            self.violation(side, &format!("{:?} timer started while active", kind));
        }

        let delay = match kind {
            TimerKind::Data => self.config.timeout,
            TimerKind::Ack => self.link.ack_delay,
        };
        self.timer_generation += 1;
        let generation = self.timer_generation;
        *self.terminals[side.idx()].timer_mut(kind) = Some(generation);
        self.schedule(self.now + delay, side, Event::Timeout(kind, generation));
    }

    fn cancel_timer(&mut self, side: Side, kind: TimerKind) {
        if self.terminals[side.idx()].timer_mut(kind).take().is_none() {
            self.violation(side, &format!("inactive {:?} timer cancelled", kind));
        }
    }

    /// returns true if the timeout belongs to the running timer, which is then inactive
    fn expire_timer(&mut self, side: Side, kind: TimerKind, generation: u64) -> bool {
        let terminal = &mut self.terminals[side.idx()];
        if terminal.timer(kind) != Some(generation) {
            trace!("{}: ignoring stale {:?} timeout", side, kind);
            return false;
        }
        *terminal.timer_mut(kind) = None;
        match kind {
            TimerKind::Data => terminal.report.data_timeouts += 1,
            TimerKind::Ack => terminal.report.ack_timeouts += 1,
        }
        true
    }
}

/// A terminal's handle on the simulation
pub struct Endpoint {
    side: Side,
    world: Rc<RefCell<World>>,
}

impl Channel for Endpoint {
    fn send_window(&self) -> u32 {
        self.world.borrow().config.send_window
    }

    fn recv_window(&self) -> u32 {
        self.world.borrow().config.recv_window
    }

    fn max_sequence(&self) -> u32 {
        self.world.borrow().config.max_sequence
    }

    fn timeout(&self) -> SimTime {
        self.world.borrow().config.timeout
    }

    fn now(&self) -> SimTime {
        self.world.borrow().now
    }

    fn emit(&mut self, frame: Frame) {
        self.world.borrow_mut().transmit(self.side, frame);
    }

    fn start_data_timer(&mut self) {
        self.world.borrow_mut().start_timer(self.side, TimerKind::Data, false);
    }

    fn restart_data_timer(&mut self) {
        self.world.borrow_mut().start_timer(self.side, TimerKind::Data, true);
    }

    fn cancel_data_timer(&mut self) {
        self.world.borrow_mut().cancel_timer(self.side, TimerKind::Data);
    }

    fn is_data_timer_active(&self) -> bool {
        self.world.borrow().terminals[self.side.idx()].data_timer.is_some()
    }

    fn start_ack_timer(&mut self) {
        self.world.borrow_mut().start_timer(self.side, TimerKind::Ack, false);
    }

    fn cancel_ack_timer(&mut self) {
        self.world.borrow_mut().cancel_timer(self.side, TimerKind::Ack);
    }

    fn is_ack_timer_active(&self) -> bool {
        self.world.borrow().terminals[self.side.idx()].ack_timer.is_some()
    }

    fn deliver_upward(&mut self, payload: String) -> bool {
        self.world.borrow_mut().terminals[self.side.idx()].network.to_network_layer(payload)
    }

    fn fetch_downward(&mut self) -> Option<String> {
        self.world.borrow_mut().terminals[self.side.idx()].network.from_network_layer()
    }

    fn log(&mut self, line: &str) {
        info!("[{}] {}", self.side, line);
        self.world.borrow_mut().terminals[self.side.idx()].report.log_lines.push(line.to_string());
    }
}

pub struct Simulation {
    world: Rc<RefCell<World>>,
    engines: [Box<dyn Protocol>; 2],
}

impl Simulation {
    pub fn new(setup: SimulationSetup, loss: Box<dyn LossModel>) -> anyhow::Result<Simulation> {
        for side in Side::BOTH {
            setup.config.validate_for(setup.protocol_for(side))?;
        }
        setup.link.validate()?;

        let world = Rc::new(RefCell::new(World {
            now: 0,
            next_order: 0,
            timer_generation: 0,
            queue: BinaryHeap::new(),
            config: setup.config.clone(),
            link: setup.link.clone(),
            loss,
            terminals: Side::BOTH.map(|side| Terminal {
                network: NetworkLayer::new(side.name(), setup.packets[side.idx()]),
                ..Default::default()
            }),
            violations: Vec::new(),
        }));

        let engines = Side::BOTH.map(|side| {
            let endpoint = Endpoint { side, world: world.clone() };
            new_protocol(setup.protocol_for(side), endpoint)
        });

        Ok(Simulation { world, engines })
    }

    pub fn run(mut self) -> SimulationReport {
        for side in Side::BOTH {
            self.engines[side.idx()].on_start(0);
        }

        let max_time = self.world.borrow().link.max_time;
        let finished = loop {
            let next = self.world.borrow_mut().queue.pop();
            let Some(Reverse(scheduled)) = next else {
                break true;
            };
            if scheduled.time > max_time {
                warn!("simulation stopped at time limit {}", max_time);
                break false;
            }
            self.world.borrow_mut().now = scheduled.time;
            self.dispatch(scheduled);
        };

        let end_time = self.world.borrow().now;
        for side in Side::BOTH {
            self.engines[side.idx()].on_stop(end_time);
        }

        let mut world = self.world.borrow_mut();
        let terminals = std::mem::take(&mut world.terminals).map(Terminal::into_report);
        let violations = std::mem::take(&mut world.violations);
        SimulationReport {
            end_time,
            finished,
            terminals,
            violations,
        }
    }

    fn dispatch(&mut self, scheduled: Scheduled) {
        let Scheduled { time, side, event, .. } = scheduled;
        let engine = &mut self.engines[side.idx()];

        match event {
            Event::TransmissionComplete(seq) => {
                self.world.borrow_mut().terminals[side.idx()].report.transmissions_completed += 1;
                engine.on_transmission_complete(time, seq);
            }
            Event::Arrival(line) => {
                let frame = match Frame::decode(&line, &mut TracingSink) {
                    Ok(frame) => frame.with_recv_time(time),
                    Err(_) => {
                        self.world.borrow_mut().terminals[side.idx()].report.malformed_received += 1;
                        return;
                    }
                };
                match frame {
                    Ok(frame) => engine.on_frame_received(time, frame),
                    Err(e) => {
                        warn!("{}: discarding frame received at {}: {}", side, time, e);
                        self.world.borrow_mut().terminals[side.idx()].report.malformed_received += 1;
                    }
                }
            }
            Event::Timeout(kind, generation) => {
                let current = self.world.borrow_mut().expire_timer(side, kind, generation);
                if current {
                    match kind {
                        TimerKind::Data => engine.on_data_timeout(time),
                        TimerKind::Ack => engine.on_ack_timeout(time),
                    }
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use crate::test_util::loss_model::{DropFirst, Lossless, RandomLoss};

    fn numbered(n: u32) -> Vec<String> {
        (0..n).map(|i| i.to_string()).collect()
    }

    fn run(setup: SimulationSetup, loss: Box<dyn LossModel>) -> SimulationReport {
        let report = Simulation::new(setup, loss).unwrap().run();
        assert!(report.violations.is_empty(), "{:?}", report.violations);
        report
    }

    #[test]
    fn test_utopian_lossless() {
        let report = run(SimulationSetup::new(ProtocolKind::Utopian, 5, 0), Box::new(Lossless));

        assert!(report.finished);
        assert_eq!(report.terminal(Side::B).delivered, numbered(5));
        assert_eq!(report.terminal(Side::A).transmissions_completed, 5);
        assert_eq!(report.terminal(Side::B).emitted.len(), 0);
    }

    #[test]
    fn test_utopian_does_not_recover_from_loss() {
        let report = run(SimulationSetup::new(ProtocolKind::Utopian, 4, 0), Box::new(DropFirst::data(Side::A, &[1])));
        assert_eq!(report.terminal(Side::B).delivered, numbered(1));
    }

    #[test]
    fn test_simplex_lost_ack() {
        let report = run(SimulationSetup::new(ProtocolKind::SimplexSender, 3, 0), Box::new(DropFirst::acks(Side::B, &[0])));

        assert!(report.finished);
        assert_eq!(report.terminal(Side::B).delivered, numbered(3));
        assert_eq!(report.terminal(Side::B).out_of_order, 0);
        assert_eq!(report.terminal(Side::A).data_timeouts, 1);
        assert_eq!(report.terminal(Side::B).count_emitted(FrameKind::Ack), 4);
        assert_eq!(report.terminal(Side::A).log_lines[0], "Simplex Stop&Wait Protocol - sender");
        assert_eq!(report.terminal(Side::B).log_lines[0], "Simplex Receiver Protocol - Only receive data!");
    }

    #[test]
    fn test_stop_and_wait_lossless() {
        let report = run(SimulationSetup::new(ProtocolKind::StopAndWait, 3, 0), Box::new(Lossless));

        assert!(report.finished);
        assert_eq!(report.terminal(Side::B).delivered, numbered(3));
        assert_eq!(report.terminal(Side::A).transmissions_completed, 3);
        assert_eq!(report.terminal(Side::A).data_timeouts, 0);
    }

    #[test]
    fn test_stop_and_wait_bidirectional() {
        let report = run(SimulationSetup::new(ProtocolKind::StopAndWait, 4, 3), Box::new(Lossless));

        assert!(report.finished);
        assert_eq!(report.terminal(Side::B).delivered, numbered(4));
        assert_eq!(report.terminal(Side::A).delivered, numbered(3));
        assert_eq!(report.terminal(Side::A).data_timeouts, 0);
        assert_eq!(report.terminal(Side::B).data_timeouts, 0);
    }

    #[test]
    fn test_stop_and_wait_lost_data() {
        let report = run(SimulationSetup::new(ProtocolKind::StopAndWait, 3, 3), Box::new(DropFirst::data(Side::A, &[1])));

        assert!(report.finished);
        assert_eq!(report.terminal(Side::B).delivered, numbered(3));
        assert_eq!(report.terminal(Side::A).delivered, numbered(3));
        assert_eq!(report.terminal(Side::A).data_timeouts, 1);
        assert_eq!(report.terminal(Side::B).out_of_order, 0);
    }

    #[rstest]
    #[case(7, 300)]
    #[case(8, 30)]
    #[case(23, 150)]
    fn test_alternating_bit_random_loss(#[case] seed: u64, #[case] timeout: u64) {
        let mut setup = SimulationSetup::new(ProtocolKind::StopAndWait, 12, 10);
        setup.config.max_sequence = 1;
        setup.config.timeout = timeout;

        let report = run(setup, Box::new(RandomLoss::new(seed, 0.2, 0.1).unwrap()));

        assert!(report.finished);
        assert_eq!(report.terminal(Side::B).delivered, numbered(12));
        assert_eq!(report.terminal(Side::A).delivered, numbered(10));
        assert_eq!(report.terminal(Side::A).out_of_order, 0);
        assert_eq!(report.terminal(Side::B).out_of_order, 0);
    }

    #[rstest]
    #[case(7, 300)]
    #[case(8, 30)]
    fn test_simplex_alternating_bit_random_loss(#[case] seed: u64, #[case] timeout: u64) {
        let mut setup = SimulationSetup::new(ProtocolKind::SimplexSender, 12, 0);
        setup.config.max_sequence = 1;
        setup.config.timeout = timeout;

        let report = run(setup, Box::new(RandomLoss::new(seed, 0.2, 0.1).unwrap()));

        assert!(report.finished);
        assert_eq!(report.terminal(Side::B).delivered, numbered(12));
        assert_eq!(report.terminal(Side::B).out_of_order, 0);
    }

    #[test]
    fn test_go_back_n_lossless() {
        let report = run(SimulationSetup::new(ProtocolKind::GoBackN, 20, 0), Box::new(Lossless));

        assert!(report.finished);
        assert_eq!(report.terminal(Side::B).delivered, numbered(20));
        assert_eq!(report.terminal(Side::A).transmissions_completed, 20);
        assert_eq!(report.terminal(Side::B).count_emitted(FrameKind::Nak), 0);
    }

    #[test]
    fn test_go_back_n_single_loss() {
        let report = run(SimulationSetup::new(ProtocolKind::GoBackN, 6, 0), Box::new(DropFirst::data(Side::A, &[2])));

        assert!(report.finished);
        assert_eq!(report.terminal(Side::B).delivered, numbered(6));
        assert_eq!(report.terminal(Side::B).out_of_order, 0);
        assert_eq!(report.terminal(Side::B).count_emitted(FrameKind::Nak), 1);
        assert_eq!(report.terminal(Side::A).data_timeouts, 0);
    }

    #[test]
    fn test_go_back_n_random_loss() {
        let mut setup = SimulationSetup::new(ProtocolKind::GoBackN, 30, 25);
        setup.config.send_window = 7;

        let report = run(setup, Box::new(RandomLoss::new(4711, 0.1, 0.05).unwrap()));

        assert!(report.finished);
        assert_eq!(report.terminal(Side::B).delivered, numbered(30));
        assert_eq!(report.terminal(Side::A).delivered, numbered(25));
        assert!(report.terminal(Side::A).malformed_received + report.terminal(Side::B).malformed_received > 0);
    }

    #[test]
    fn test_time_limit() {
        let mut setup = SimulationSetup::new(ProtocolKind::GoBackN, 3, 0);
        setup.link.max_time = 5_000;

        let report = run(setup, Box::new(RandomLoss::new(1, 1.0, 0.0).unwrap()));

        assert!(!report.finished);
        assert!(report.end_time <= 5_000);
        assert!(report.terminal(Side::B).delivered.is_empty());
        assert!(report.terminal(Side::A).data_timeouts > 0);
        assert_eq!(report.terminal(Side::A).log_lines.last().map(String::as_str), Some("Stopping simulation"));
    }

    #[test]
    fn test_selective_repeat_placeholder() {
        let report = run(SimulationSetup::new(ProtocolKind::SelectiveRepeat, 3, 3), Box::new(Lossless));

        assert!(report.finished);
        assert!(report.terminal(Side::A).emitted.is_empty());
        assert_eq!(report.terminal(Side::A).log_lines, vec!["Selective Repeat Protocol", "Not implemented yet", "Stopping simulation"]);
    }

    #[test]
    fn test_invalid_setup() {
        let mut setup = SimulationSetup::new(ProtocolKind::GoBackN, 3, 0);
        setup.config.send_window = 8;
        assert!(Simulation::new(setup, Box::new(Lossless)).is_err());

        let mut setup = SimulationSetup::new(ProtocolKind::StopAndWait, 3, 0);
        setup.link.propagation_delay = 0;
        assert!(Simulation::new(setup, Box::new(Lossless)).is_err());
    }

    #[test]
    fn test_frames_carry_timestamps() {
        let report = run(SimulationSetup::new(ProtocolKind::StopAndWait, 1, 0), Box::new(Lossless));
        let sent = &report.terminal(Side::A).emitted[0];
        assert_eq!(sent.send_time(), Some(0));
        assert_eq!(report.terminal(Side::B).emitted[0].send_time(), Some(80));
    }
}
