use crate::decoding::{ipfix, netflow1, netflow5, netflow6, netflow7, netflow9};

/// Receiver of decoded messages, one method per protocol version.
///
/// Methods are side-effecting only; a consumer that cannot deliver a message
/// reports the failure itself rather than returning it to the dispatcher.
pub trait Consumer {
    fn netflow_v1(&mut self, packet: netflow1::Packet);
    fn netflow_v5(&mut self, packet: netflow5::Packet);
    fn netflow_v6(&mut self, packet: netflow6::Packet);
    fn netflow_v7(&mut self, packet: netflow7::Packet);
    fn netflow_v9(&mut self, packet: netflow9::Packet);
    fn ipfix(&mut self, message: ipfix::Message);
}

impl<C: Consumer + ?Sized> Consumer for Box<C> {
    fn netflow_v1(&mut self, packet: netflow1::Packet) {
        (**self).netflow_v1(packet)
    }

    fn netflow_v5(&mut self, packet: netflow5::Packet) {
        (**self).netflow_v5(packet)
    }

    fn netflow_v6(&mut self, packet: netflow6::Packet) {
        (**self).netflow_v6(packet)
    }

    fn netflow_v7(&mut self, packet: netflow7::Packet) {
        (**self).netflow_v7(packet)
    }

    fn netflow_v9(&mut self, packet: netflow9::Packet) {
        (**self).netflow_v9(packet)
    }

    fn ipfix(&mut self, message: ipfix::Message) {
        (**self).ipfix(message)
    }
}
