use crate::channel::Channel;
use crate::config::ProtocolKind;
use crate::frame::{Frame, SimTime};
use crate::protocol::{Protocol, STOP_MESSAGE};
use crate::sequence_space::SeqNo;

/// Placeholder with the shape of a Selective-Repeat engine. Every event is reported as not
///  implemented, and nothing is ever sent.
pub struct SelectiveRepeat<C: Channel> {
    channel: C,
}

impl<C: Channel> SelectiveRepeat<C> {
    pub fn new(channel: C) -> SelectiveRepeat<C> {
        SelectiveRepeat { channel }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }
}

impl<C: Channel> Protocol for SelectiveRepeat<C> {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::SelectiveRepeat
    }

    fn on_start(&mut self, _time: SimTime) {
        self.channel.log("Selective Repeat Protocol");
        self.channel.log("Not implemented yet");
    }

    fn on_transmission_complete(&mut self, _time: SimTime, _seq: SeqNo) {
        self.channel.log("handle_Data_end not implemented");
    }

    fn on_data_timeout(&mut self, _time: SimTime) {
        self.channel.log("handle_Data_Timeout not implemented");
    }

    fn on_ack_timeout(&mut self, _time: SimTime) {
        self.channel.log("handle_ack_Timer not implemented");
    }

    fn on_frame_received(&mut self, _time: SimTime, _frame: Frame) {
        self.channel.log("from_physical_layer not implemented");
    }

    fn on_stop(&mut self, _time: SimTime) {
        self.channel.log(STOP_MESSAGE);
    }
}
