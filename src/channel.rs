//! The capabilities a protocol engine is given: configuration, a way to put frames on the wire,
//!  exactly one data timer and one ack timer, and the upper (network) layer.
//!
//! Starting a timer that is already running, or cancelling one that is not, is a discipline
//!  violation. Engines go through [TimerDiscipline], which checks the timer state first.

#[cfg(test)]
use mockall::automock;
use crate::frame::{Frame, SimTime};

#[cfg_attr(test, automock)]
pub trait Channel {
    fn send_window(&self) -> u32;
    fn recv_window(&self) -> u32;
    fn max_sequence(&self) -> u32;
    fn timeout(&self) -> SimTime;
    fn now(&self) -> SimTime;

    /// Hands a frame to the channel. For data frames, the channel later notifies the engine with
    ///  a transmission-complete event.
    fn emit(&mut self, frame: Frame);

    fn start_data_timer(&mut self);
    /// (re)starts the data timer regardless of its current state
    fn restart_data_timer(&mut self);
    fn cancel_data_timer(&mut self);
    fn is_data_timer_active(&self) -> bool;

    fn start_ack_timer(&mut self);
    fn cancel_ack_timer(&mut self);
    fn is_ack_timer_active(&self) -> bool;

    /// Passes a received payload to the upper layer, returning `false` if the upper layer
    ///  rejected it
    fn deliver_upward(&mut self, payload: String) -> bool;
    /// The next payload to send, if any
    fn fetch_downward(&mut self) -> Option<String>;

    fn log(&mut self, line: &str);
}

pub trait TimerDiscipline: Channel {
    fn ensure_data_timer(&mut self) {
        if !self.is_data_timer_active() {
            self.start_data_timer();
        }
    }

    fn stop_data_timer(&mut self) {
        if self.is_data_timer_active() {
            self.cancel_data_timer();
        }
    }

    fn ensure_ack_timer(&mut self) {
        if !self.is_ack_timer_active() {
            self.start_ack_timer();
        }
    }

    fn stop_ack_timer(&mut self) {
        if self.is_ack_timer_active() {
            self.cancel_ack_timer();
        }
    }

    fn rearm_ack_timer(&mut self) {
        self.stop_ack_timer();
        self.start_ack_timer();
    }
}

impl<C: Channel + ?Sized> TimerDiscipline for C {}
