//! OSC codec for the alarm parameter namespace.
//!
//! Encoding cannot fail for in-domain values; the `io::Result` only wraps
//! rosc's encoder contract. Decoding flattens bundles and drops anything it
//! does not recognize without disturbing the receive loop.

use std::io;

use log::{trace, warn};
use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};

use oscalarm_types::{DecodeError, Param, ParamUpdate, ParamValue};

/// Immediate timetag: execute as soon as received.
const IMMEDIATE: OscTime = OscTime {
    seconds: 0,
    fractional: 1,
};

fn message_for(param: Param, value: ParamValue) -> OscMessage {
    let arg = match value {
        ParamValue::Float(v) => OscType::Float(v),
        ParamValue::Bool(v) => OscType::Bool(v),
    };
    OscMessage {
        addr: param.address().to_string(),
        args: vec![arg],
    }
}

fn to_wire(packet: &OscPacket) -> io::Result<Vec<u8>> {
    rosc::encoder::encode(packet)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

/// Encode a single parameter write as a UDP-ready OSC message.
pub fn encode_param(param: Param, value: ParamValue) -> io::Result<Vec<u8>> {
    to_wire(&OscPacket::Message(message_for(param, value)))
}

/// Encode several parameter writes as one immediate OSC bundle. Used for
/// the full-state heartbeat.
pub fn encode_bundle(params: &[(Param, ParamValue)]) -> io::Result<Vec<u8>> {
    let content = params
        .iter()
        .map(|&(param, value)| OscPacket::Message(message_for(param, value)))
        .collect();
    to_wire(&OscPacket::Bundle(OscBundle {
        timetag: IMMEDIATE,
        content,
    }))
}

/// Decode one datagram into the parameter updates it carries. Bundles are
/// flattened recursively. Well-formed messages addressed outside the alarm
/// namespace are skipped; only undecodable bytes are an error.
pub fn decode_datagram(buf: &[u8]) -> Result<Vec<ParamUpdate>, DecodeError> {
    let (_rest, packet) =
        rosc::decoder::decode_udp(buf).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let mut updates = Vec::new();
    collect_updates(packet, &mut updates);
    Ok(updates)
}

fn collect_updates(packet: OscPacket, out: &mut Vec<ParamUpdate>) {
    match packet {
        OscPacket::Message(msg) => {
            let Some(param) = Param::from_address(&msg.addr) else {
                trace!("ignoring OSC address {}", msg.addr);
                return;
            };
            if !param.is_inbound() {
                // Our own outbound parameter looped back; not peer input.
                return;
            }
            match msg.args.first() {
                Some(OscType::Float(v)) => out.push(ParamUpdate {
                    param,
                    value: ParamValue::Float(*v),
                }),
                Some(OscType::Bool(v)) => out.push(ParamUpdate {
                    param,
                    value: ParamValue::Bool(*v),
                }),
                other => warn!("unexpected argument for {}: {:?}", msg.addr, other),
            }
        }
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                collect_updates(inner, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_float_param() {
        let buf = encode_param(Param::SetHour, ParamValue::Float(0.75)).unwrap();
        let updates = decode_datagram(&buf).unwrap();
        assert_eq!(
            updates,
            vec![ParamUpdate {
                param: Param::SetHour,
                value: ParamValue::Float(0.75),
            }]
        );
    }

    #[test]
    fn roundtrip_bool_param() {
        let buf = encode_param(Param::IsOn, ParamValue::Bool(true)).unwrap();
        let updates = decode_datagram(&buf).unwrap();
        assert_eq!(
            updates,
            vec![ParamUpdate {
                param: Param::IsOn,
                value: ParamValue::Bool(true),
            }]
        );
    }

    #[test]
    fn bundle_flattens_to_all_updates() {
        let buf = encode_bundle(&[
            (Param::SetHour, ParamValue::Float(0.5)),
            (Param::SetMinute, ParamValue::Float(0.25)),
            (Param::IsOn, ParamValue::Bool(false)),
        ])
        .unwrap();
        let updates = decode_datagram(&buf).unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[2].param, Param::IsOn);
    }

    #[test]
    fn malformed_bytes_are_an_error() {
        assert!(decode_datagram(&[0xff, 0x00, 0x13, 0x37]).is_err());
    }

    #[test]
    fn unknown_address_is_skipped() {
        let msg = OscPacket::Message(OscMessage {
            addr: "/avatar/parameters/GestureLeft".to_string(),
            args: vec![OscType::Int(3)],
        });
        let buf = rosc::encoder::encode(&msg).unwrap();
        assert!(decode_datagram(&buf).unwrap().is_empty());
    }

    #[test]
    fn outbound_only_param_is_not_decoded() {
        let buf = encode_param(Param::ShouldFire, ParamValue::Bool(true)).unwrap();
        assert!(decode_datagram(&buf).unwrap().is_empty());
    }

    #[test]
    fn wrong_argument_type_is_dropped() {
        let msg = OscPacket::Message(OscMessage {
            addr: Param::SetHour.address().to_string(),
            args: vec![OscType::String("seven".to_string())],
        });
        let buf = rosc::encoder::encode(&msg).unwrap();
        assert!(decode_datagram(&buf).unwrap().is_empty());
    }
}
