//! Source priority selection and fallback routing
//!
//! Pure decision functions over the supplied [`SourceSet`]. The session
//! owns the bookkeeping (failed set, retry counts); this module only
//! answers "which source first" and "which source next".

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::types::{SourceKind, SourceSet};

/// Priority order for generic providers
const PRIORITY: [SourceKind; 3] = [SourceKind::Hls, SourceKind::Embed, SourceKind::Direct];

/// Choose the first source to attempt.
///
/// Provider hard rules override the generic priority:
/// - An embed-mandatory provider (Vimeo) is always started via its embed.
/// - A manifest-only provider (Cloudflare Stream) is always started via
///   the adaptive stream; if none was supplied the selection fails
///   terminally rather than touching the embed.
pub fn select_initial(sources: &SourceSet) -> Result<SourceKind> {
    if sources.is_empty() {
        return Err(Error::NoSource);
    }

    if let Some(embed) = &sources.embed {
        if embed.provider.requires_embed() {
            return Ok(SourceKind::Embed);
        }
        if embed.provider.manifest_only() {
            if sources.supplies(SourceKind::Hls) {
                return Ok(SourceKind::Hls);
            }
            return Err(Error::SourceUnavailable {
                provider: embed.provider.to_string(),
            });
        }
    }

    PRIORITY
        .iter()
        .copied()
        .find(|kind| sources.supplies(*kind))
        .ok_or(Error::NoSource)
}

/// Choose the next source after `from` failed.
///
/// Returns `None` when no viable candidate remains, which the session
/// treats as terminal. The preference graph is bidirectional: from any
/// failed source the other "primary" type is tried first, then the last
/// remaining type.
pub fn next_fallback(
    sources: &SourceSet,
    failed: &HashSet<SourceKind>,
    from: SourceKind,
) -> Option<SourceKind> {
    if let Some(embed) = &sources.embed {
        // Embed-mandatory: the embed is the only playback path, ever.
        if embed.provider.requires_embed() {
            return None;
        }
        // Manifest-only: the adaptive stream is the only playback path;
        // any failure under this regime is terminal.
        if embed.provider.manifest_only() {
            return None;
        }
    }

    let order: [SourceKind; 2] = match from {
        SourceKind::Hls => [SourceKind::Embed, SourceKind::Direct],
        SourceKind::Embed => [SourceKind::Hls, SourceKind::Direct],
        SourceKind::Direct => [SourceKind::Hls, SourceKind::Embed],
    };

    order
        .iter()
        .copied()
        .find(|kind| sources.supplies(*kind) && !failed.contains(kind))
}
