//! Template-defined records shared by NetFlow v9 and IPFIX.
//!
//! A [`Template`] is learned from a template set and stored in the exporter's
//! session; later data sets are decoded against it into [`DataRecord`]s.

use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Serialize, Serializer};

use super::elements::{element_kind, element_name, ElementKind};
use super::reader::{be_uint, ByteReader};
use crate::error_handling::types::DecodeError;

/// Field length announcing an IPFIX variable-length element.
pub const VARIABLE_LENGTH: u16 = 65535;

/// Lowest set / flowset id that carries data records.
pub const MIN_DATA_SET_ID: u16 = 256;

/// Templates are scoped by (source id / observation domain, template id).
pub type TemplateKey = (u32, u16);

/// Templates learned from one exporter for one protocol.
pub type TemplateCache = HashMap<TemplateKey, Template>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpecifier {
    pub id: u16,
    pub length: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise: Option<u32>,
}

impl FieldSpecifier {
    pub fn new(id: u16, length: u16) -> Self {
        Self {
            id,
            length,
            enterprise: None,
        }
    }

    /// IANA name of the element; enterprise elements are never named.
    pub fn name(&self) -> Option<&'static str> {
        match self.enterprise {
            Some(_) => None,
            None => element_name(self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub id: u16,
    /// Leading fields that are scope fields (options templates only).
    pub scope_field_count: usize,
    pub fields: Vec<FieldSpecifier>,
}

impl Template {
    pub(crate) fn read_fields(
        r: &mut ByteReader<'_>,
        count: usize,
        enterprise_bit: bool,
    ) -> Result<Vec<FieldSpecifier>, DecodeError> {
        let mut fields = Vec::with_capacity(count);
        for _ in 0..count {
            let raw_id = r.u16("field specifier")?;
            let length = r.u16("field specifier")?;
            let (id, enterprise) = if enterprise_bit && raw_id & 0x8000 != 0 {
                (raw_id & 0x7fff, Some(r.u32("enterprise number")?))
            } else {
                (raw_id, None)
            };
            fields.push(FieldSpecifier {
                id,
                length,
                enterprise,
            });
        }
        Ok(fields)
    }

    /// An IPFIX template record with no fields withdraws the template.
    pub fn is_withdrawal(&self) -> bool {
        self.fields.is_empty()
    }

    /// Smallest encoded size of one record; variable-length fields count
    /// for their one-octet length prefix.
    pub fn min_record_length(&self, variable_length: bool) -> usize {
        self.fields
            .iter()
            .map(|f| {
                if variable_length && f.length == VARIABLE_LENGTH {
                    1
                } else {
                    usize::from(f.length)
                }
            })
            .sum()
    }

    fn decode_record(
        &self,
        r: &mut ByteReader<'_>,
        variable_length: bool,
    ) -> Result<DataRecord, DecodeError> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for spec in &self.fields {
            let len = if variable_length && spec.length == VARIABLE_LENGTH {
                match r.u8("variable-length prefix")? {
                    255 => usize::from(r.u16("variable-length prefix")?),
                    short => usize::from(short),
                }
            } else {
                usize::from(spec.length)
            };
            let bytes = r.take(len, "data record field")?;
            fields.push(Field {
                id: spec.id,
                enterprise: spec.enterprise,
                name: spec.name(),
                value: FieldValue::interpret(spec, bytes),
            });
        }
        Ok(DataRecord {
            scope_field_count: self.scope_field_count,
            fields,
        })
    }

    /// Decodes every record in a data set body. Trailing bytes shorter than
    /// one record are set padding and are ignored.
    pub fn decode_records(
        &self,
        mut r: ByteReader<'_>,
        variable_length: bool,
    ) -> Result<Vec<DataRecord>, DecodeError> {
        let min = self.min_record_length(variable_length);
        if min == 0 {
            return Err(DecodeError::InvalidTemplate(format!(
                "template {} describes zero-length records",
                self.id
            )));
        }
        let mut records = Vec::new();
        while r.remaining() >= min {
            records.push(self.decode_record(&mut r, variable_length)?);
        }
        Ok(records)
    }
}

/// A decoded field value, interpreted from its element number and width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Unsigned(u64),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Mac([u8; 6]),
    Octets(Vec<u8>),
}

impl FieldValue {
    pub fn interpret(spec: &FieldSpecifier, bytes: &[u8]) -> Self {
        let kind = match spec.enterprise {
            Some(_) => ElementKind::Unsigned,
            None => element_kind(spec.id),
        };
        match (kind, bytes.len()) {
            (ElementKind::Ipv4Address, 4) => {
                FieldValue::Ipv4(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]))
            }
            (ElementKind::Ipv6Address, 16) => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(bytes);
                FieldValue::Ipv6(Ipv6Addr::from(octets))
            }
            (ElementKind::MacAddress, 6) => {
                let mut mac = [0u8; 6];
                mac.copy_from_slice(bytes);
                FieldValue::Mac(mac)
            }
            _ => match be_uint(bytes) {
                Some(v) => FieldValue::Unsigned(v),
                None => FieldValue::Octets(bytes.to_vec()),
            },
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(v) => write!(f, "{}", v),
            FieldValue::Ipv4(a) => write!(f, "{}", a),
            FieldValue::Ipv6(a) => write!(f, "{}", a),
            FieldValue::Mac(m) => write!(
                f,
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                m[0], m[1], m[2], m[3], m[4], m[5]
            ),
            FieldValue::Octets(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Unsigned(v) => serializer.serialize_u64(*v),
            other => serializer.collect_str(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub id: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataRecord {
    #[serde(skip_serializing_if = "is_zero")]
    pub scope_field_count: usize,
    pub fields: Vec<Field>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl DataRecord {
    /// First value of an IANA element in this record.
    pub fn get(&self, id: u16) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|f| f.id == id && f.enterprise.is_none())
            .map(|f| &f.value)
    }
}

/// One set (IPFIX) or flowset (NetFlow v9) of a template-based message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowSet {
    Templates { templates: Vec<Template> },
    OptionsTemplates { templates: Vec<Template> },
    Data {
        template_id: u16,
        records: Vec<DataRecord>,
    },
}
