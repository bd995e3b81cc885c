//! NetFlow version 9 (RFC 3954).
//!
//! Flowset 0 announces templates, flowset 1 options templates, and ids from
//! 256 up carry data records laid out by a previously announced template.
//! Templates are scoped by the header's source id and persist in the
//! exporter's [`TemplateCache`] across packets.

use serde::Serialize;

use super::reader::ByteReader;
use super::template::{
    FieldSpecifier, FlowSet, Template, TemplateCache, MIN_DATA_SET_ID,
};
use crate::error_handling::types::DecodeError;

pub const VERSION: u16 = 9;
pub const HEADER_SIZE: usize = 20;
pub const TEMPLATE_FLOWSET_ID: u16 = 0;
pub const OPTIONS_TEMPLATE_FLOWSET_ID: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version: u16,
    pub count: u16,
    pub sys_uptime: u32,
    pub unix_secs: u32,
    pub sequence: u32,
    pub source_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Packet {
    pub header: Header,
    pub flow_sets: Vec<FlowSet>,
}

pub fn decode(data: &[u8], templates: &mut TemplateCache) -> Result<Packet, DecodeError> {
    let mut r = ByteReader::new(data);
    let header = Header {
        version: r.u16("netflow v9 header")?,
        count: r.u16("netflow v9 header")?,
        sys_uptime: r.u32("netflow v9 header")?,
        unix_secs: r.u32("netflow v9 header")?,
        sequence: r.u32("netflow v9 header")?,
        source_id: r.u32("netflow v9 header")?,
    };
    if header.version != VERSION {
        return Err(DecodeError::UnsupportedVersion(header.version));
    }

    let mut flow_sets = Vec::new();
    while r.remaining() >= 4 {
        let id = r.u16("flowset header")?;
        let length = usize::from(r.u16("flowset header")?);
        if length < 4 {
            return Err(DecodeError::InvalidLength(format!(
                "flowset {} declares length {}",
                id, length
            )));
        }
        let body = r.sub(length - 4, "flowset body")?;

        match id {
            TEMPLATE_FLOWSET_ID => flow_sets.push(FlowSet::Templates {
                templates: read_templates(body, header.source_id, templates)?,
            }),
            OPTIONS_TEMPLATE_FLOWSET_ID => flow_sets.push(FlowSet::OptionsTemplates {
                templates: read_options_templates(body, header.source_id, templates)?,
            }),
            template_id if template_id >= MIN_DATA_SET_ID => {
                let template = templates.get(&(header.source_id, template_id)).ok_or(
                    DecodeError::UnknownTemplate {
                        domain: header.source_id,
                        template_id,
                    },
                )?;
                flow_sets.push(FlowSet::Data {
                    template_id,
                    records: template.decode_records(body, false)?,
                });
            }
            // 2..=255 are reserved; skip them.
            _ => {}
        }
    }

    Ok(Packet { header, flow_sets })
}

fn read_templates(
    mut body: ByteReader<'_>,
    source_id: u32,
    cache: &mut TemplateCache,
) -> Result<Vec<Template>, DecodeError> {
    let mut learned = Vec::new();
    while body.remaining() >= 4 {
        let id = body.u16("template record")?;
        let field_count = usize::from(body.u16("template record")?);
        if id < MIN_DATA_SET_ID {
            break;
        }
        if field_count == 0 {
            return Err(DecodeError::InvalidTemplate(format!(
                "template {} has no fields",
                id
            )));
        }
        let template = Template {
            id,
            scope_field_count: 0,
            fields: Template::read_fields(&mut body, field_count, false)?,
        };
        cache.insert((source_id, id), template.clone());
        learned.push(template);
    }
    Ok(learned)
}

fn read_options_templates(
    mut body: ByteReader<'_>,
    source_id: u32,
    cache: &mut TemplateCache,
) -> Result<Vec<Template>, DecodeError> {
    let mut learned = Vec::new();
    while body.remaining() >= 6 {
        let id = body.u16("options template record")?;
        let scope_length = usize::from(body.u16("options template record")?);
        let option_length = usize::from(body.u16("options template record")?);
        if id < MIN_DATA_SET_ID {
            break;
        }
        if scope_length % 4 != 0 || option_length % 4 != 0 || scope_length + option_length == 0 {
            return Err(DecodeError::InvalidTemplate(format!(
                "options template {} has scope length {} and option length {}",
                id, scope_length, option_length
            )));
        }
        let mut fields: Vec<FieldSpecifier> =
            Template::read_fields(&mut body, scope_length / 4, false)?;
        fields.extend(Template::read_fields(&mut body, option_length / 4, false)?);
        let template = Template {
            id,
            scope_field_count: scope_length / 4,
            fields,
        };
        cache.insert((source_id, id), template.clone());
        learned.push(template);
    }
    Ok(learned)
}
