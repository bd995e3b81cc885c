//! IPFIX (RFC 7011).
//!
//! Set 2 carries template records, set 3 options template records, and ids
//! from 256 up carry data. Unlike NetFlow v9, field specifiers may carry an
//! enterprise number and fields may be variable-length. Templates are scoped
//! by the observation domain id.

use serde::Serialize;

use super::reader::ByteReader;
use super::template::{FlowSet, Template, TemplateCache, MIN_DATA_SET_ID};
use crate::error_handling::types::DecodeError;

pub const VERSION: u16 = 10;
pub const HEADER_SIZE: usize = 16;
pub const TEMPLATE_SET_ID: u16 = 2;
pub const OPTIONS_TEMPLATE_SET_ID: u16 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version: u16,
    pub length: u16,
    pub export_time: u32,
    pub sequence: u32,
    pub observation_domain_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub header: Header,
    pub sets: Vec<FlowSet>,
}

pub fn decode(data: &[u8], templates: &mut TemplateCache) -> Result<Message, DecodeError> {
    let mut r = ByteReader::new(data);
    let header = Header {
        version: r.u16("ipfix header")?,
        length: r.u16("ipfix header")?,
        export_time: r.u32("ipfix header")?,
        sequence: r.u32("ipfix header")?,
        observation_domain_id: r.u32("ipfix header")?,
    };
    if header.version != VERSION {
        return Err(DecodeError::UnsupportedVersion(header.version));
    }
    let length = usize::from(header.length);
    if length < HEADER_SIZE {
        return Err(DecodeError::InvalidLength(format!(
            "message length {} is shorter than its header",
            length
        )));
    }
    let mut r = r.sub(length - HEADER_SIZE, "ipfix message")?;
    let domain = header.observation_domain_id;

    let mut sets = Vec::new();
    while r.remaining() >= 4 {
        let id = r.u16("set header")?;
        let set_length = usize::from(r.u16("set header")?);
        if set_length < 4 {
            return Err(DecodeError::InvalidLength(format!(
                "set {} declares length {}",
                id, set_length
            )));
        }
        let body = r.sub(set_length - 4, "set body")?;

        match id {
            TEMPLATE_SET_ID => sets.push(FlowSet::Templates {
                templates: read_templates(body, domain, templates, false)?,
            }),
            OPTIONS_TEMPLATE_SET_ID => sets.push(FlowSet::OptionsTemplates {
                templates: read_templates(body, domain, templates, true)?,
            }),
            template_id if template_id >= MIN_DATA_SET_ID => {
                let template = templates
                    .get(&(domain, template_id))
                    .ok_or(DecodeError::UnknownTemplate {
                        domain,
                        template_id,
                    })?;
                sets.push(FlowSet::Data {
                    template_id,
                    records: template.decode_records(body, true)?,
                });
            }
            _ => {}
        }
    }

    Ok(Message { header, sets })
}

/// Reads template or options template records, learning each one and
/// applying withdrawals.
fn read_templates(
    mut body: ByteReader<'_>,
    domain: u32,
    cache: &mut TemplateCache,
    options: bool,
) -> Result<Vec<Template>, DecodeError> {
    let set_id = if options {
        OPTIONS_TEMPLATE_SET_ID
    } else {
        TEMPLATE_SET_ID
    };
    let mut learned = Vec::new();
    while body.remaining() >= 4 {
        let id = body.u16("template record")?;
        let field_count = usize::from(body.u16("template record")?);

        // A withdrawal naming the set id itself drops every template in the domain.
        if id == set_id && field_count == 0 {
            cache.retain(|(d, _), _| *d != domain);
            continue;
        }
        if id < MIN_DATA_SET_ID {
            break;
        }
        if field_count == 0 {
            cache.remove(&(domain, id));
            learned.push(Template {
                id,
                scope_field_count: 0,
                fields: Vec::new(),
            });
            continue;
        }

        let scope_field_count = if options {
            let scope = usize::from(body.u16("options template record")?);
            if scope == 0 || scope > field_count {
                return Err(DecodeError::InvalidTemplate(format!(
                    "options template {} has {} scope fields of {}",
                    id, scope, field_count
                )));
            }
            scope
        } else {
            0
        };

        let template = Template {
            id,
            scope_field_count,
            fields: Template::read_fields(&mut body, field_count, true)?,
        };
        cache.insert((domain, id), template.clone());
        learned.push(template);
    }
    Ok(learned)
}
