use log::trace;

use super::consumer::Consumer;
use crate::decoding::Message;

/// Hands `message` to the consumer action registered for its variant.
pub fn route<C: Consumer + ?Sized>(message: Message, consumer: &mut C) {
    trace!("Routing version {} message", message.version());
    match message {
        Message::NetflowV1(p) => consumer.netflow_v1(p),
        Message::NetflowV5(p) => consumer.netflow_v5(p),
        Message::NetflowV6(p) => consumer.netflow_v6(p),
        Message::NetflowV7(p) => consumer.netflow_v7(p),
        Message::NetflowV9(p) => consumer.netflow_v9(p),
        Message::Ipfix(m) => consumer.ipfix(m),
    }
}
