use std::path::Path;

use crate::builder::ProviderDraft;
use crate::error::{ProviderError, Result};
use crate::model::Provider;

/// Accept a draft as a [`Provider`] when every mandatory field is present.
///
/// The error lists all missing fields, in declaration order, so one
/// diagnostic covers the whole definition file.
pub fn validate(draft: ProviderDraft, path: &Path) -> Result<Provider> {
    let ProviderDraft {
        key,
        name,
        streamtype,
        protocol,
        bouquettype,
        netid,
        transponder,
        bouquets,
        sections,
        servicehacks,
        swapchannels,
        dependent,
        ignore_visible_service_flag,
    } = draft;

    let mut missing = Vec::new();
    if name.is_none() {
        missing.push("name");
    }
    if protocol.is_none() {
        missing.push("protocol");
    }
    if streamtype.is_none() {
        missing.push("streamtype");
    }
    if sections.is_none() {
        missing.push("sections");
    }
    if transponder.is_none() {
        missing.push("transponder");
    }
    if servicehacks.is_none() {
        missing.push("servicehacks");
    }

    match (name, protocol, streamtype, sections, transponder, servicehacks) {
        (
            Some(name),
            Some(protocol),
            Some(streamtype),
            Some(sections),
            Some(transponder),
            Some(servicehacks),
        ) => Ok(Provider {
            key,
            name,
            streamtype,
            protocol,
            bouquettype,
            netid,
            transponder,
            bouquets,
            sections,
            servicehacks,
            swapchannels,
            dependent,
            ignore_visible_service_flag,
        }),
        _ => Err(ProviderError::Incomplete {
            path: path.to_path_buf(),
            missing,
        }),
    }
}
