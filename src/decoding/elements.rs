//! Information element registry.
//!
//! NetFlow v9 field types 1..=127 share their numbering with the IANA IPFIX
//! information elements, so a single table serves both protocols. Only the
//! elements collectors routinely see are named here; anything else is
//! rendered by number.

/// How the octets of an element are best presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Unsigned,
    Ipv4Address,
    Ipv6Address,
    MacAddress,
}

pub fn element_name(id: u16) -> Option<&'static str> {
    let name = match id {
        1 => "octetDeltaCount",
        2 => "packetDeltaCount",
        3 => "deltaFlowCount",
        4 => "protocolIdentifier",
        5 => "ipClassOfService",
        6 => "tcpControlBits",
        7 => "sourceTransportPort",
        8 => "sourceIPv4Address",
        9 => "sourceIPv4PrefixLength",
        10 => "ingressInterface",
        11 => "destinationTransportPort",
        12 => "destinationIPv4Address",
        13 => "destinationIPv4PrefixLength",
        14 => "egressInterface",
        15 => "ipNextHopIPv4Address",
        16 => "bgpSourceAsNumber",
        17 => "bgpDestinationAsNumber",
        18 => "bgpNextHopIPv4Address",
        21 => "flowEndSysUpTime",
        22 => "flowStartSysUpTime",
        27 => "sourceIPv6Address",
        28 => "destinationIPv6Address",
        29 => "sourceIPv6PrefixLength",
        30 => "destinationIPv6PrefixLength",
        31 => "flowLabelIPv6",
        32 => "icmpTypeCodeIPv4",
        34 => "samplingInterval",
        35 => "samplingAlgorithm",
        56 => "sourceMacAddress",
        57 => "postDestinationMacAddress",
        58 => "vlanId",
        60 => "ipVersion",
        61 => "flowDirection",
        62 => "ipNextHopIPv6Address",
        63 => "bgpNextHopIPv6Address",
        80 => "destinationMacAddress",
        81 => "postSourceMacAddress",
        136 => "flowEndReason",
        148 => "flowId",
        149 => "observationDomainId",
        150 => "flowStartSeconds",
        151 => "flowEndSeconds",
        152 => "flowStartMilliseconds",
        153 => "flowEndMilliseconds",
        225 => "postNATSourceIPv4Address",
        226 => "postNATDestinationIPv4Address",
        227 => "postNAPTSourceTransportPort",
        228 => "postNAPTDestinationTransportPort",
        _ => return None,
    };
    Some(name)
}

pub fn element_kind(id: u16) -> ElementKind {
    match id {
        8 | 12 | 15 | 18 | 225 | 226 => ElementKind::Ipv4Address,
        27 | 28 | 62 | 63 => ElementKind::Ipv6Address,
        56 | 57 | 80 | 81 => ElementKind::MacAddress,
        _ => ElementKind::Unsigned,
    }
}
