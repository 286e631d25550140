//! Choix d'une ressource compatible avec les capacités sink d'un renderer.
//!
//! Un renderer annonce via ConnectionManager::GetProtocolInfo la liste des
//! chaînes protocolInfo qu'il accepte en entrée (le "Sink"). Avant un
//! SetAVTransportURI, le point de contrôle choisit parmi les ressources d'un
//! item celle que le renderer saura lire.

use heliumav::{DlnaConversion, ProtocolInfo, parse_protocol_info_list};

use crate::{Item, Resource};

/// Capacités sink d'un renderer, décodées depuis la réponse GetProtocolInfo.
#[derive(Debug, Clone, Default)]
pub struct SinkProtocolInfo {
    entries: Vec<ProtocolInfo>,
}

impl SinkProtocolInfo {
    /// Décode la liste sink brute (chaînes protocolInfo séparées par des
    /// virgules). Les entrées illisibles sont ignorées.
    pub fn parse(list: &str) -> Self {
        SinkProtocolInfo {
            entries: parse_protocol_info_list(list),
        }
    }

    pub fn from_entries(entries: Vec<ProtocolInfo>) -> Self {
        SinkProtocolInfo { entries }
    }

    pub fn entries(&self) -> &[ProtocolInfo] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vrai si au moins une entrée sink accepte cette chaîne protocolInfo.
    pub fn accepts(&self, info: &ProtocolInfo) -> bool {
        self.entries.iter().any(|sink| sink.is_compatible(info))
    }
}

/// Sélectionne la ressource à envoyer au renderer.
///
/// Parmi les ressources compatibles avec le sink, la première non transcodée
/// gagne ; à défaut la première compatible ; et si rien n'est compatible, la
/// première ressource tout court quand `lenient` est demandé (certains
/// renderers lisent plus que ce qu'ils annoncent).
pub fn select_resource<'a>(
    resources: &'a [Resource],
    sink: &SinkProtocolInfo,
    lenient: bool,
) -> Option<&'a Resource> {
    let mut first_compatible = None;

    for resource in resources {
        let info = match resource.protocol_info() {
            Ok(info) => info,
            Err(error) => {
                tracing::trace!(
                    protocol_info = %resource.protocol_info,
                    %error,
                    "skipping resource with unparseable protocolInfo"
                );
                continue;
            }
        };

        if !sink.accepts(&info) {
            continue;
        }

        if info.dlna_conversion != DlnaConversion::Transcoded {
            return Some(resource);
        }

        if first_compatible.is_none() {
            first_compatible = Some(resource);
        }
    }

    if first_compatible.is_none() && lenient {
        tracing::debug!("no sink-compatible resource, lenient fallback to the first one");
        return resources.first();
    }

    first_compatible
}

impl Item {
    /// [`select_resource`] appliqué aux ressources de l'item.
    pub fn select_resource(&self, sink: &SinkProtocolInfo, lenient: bool) -> Option<&Resource> {
        select_resource(&self.resources, sink, lenient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(list: &str) -> SinkProtocolInfo {
        SinkProtocolInfo::parse(list)
    }

    fn resources() -> Vec<Resource> {
        vec![
            Resource::new(
                "http-get:*:audio/mpeg:DLNA.ORG_PN=MP3;DLNA.ORG_CI=1",
                "http://server/a.mp3",
            ),
            Resource::new("http-get:*:audio/flac:*", "http://server/a.flac"),
            Resource::new("http-get:*:audio/ogg:*", "http://server/a.ogg"),
        ]
    }

    #[test]
    fn test_prefers_non_transcoded_resource() {
        // Le mp3 transcodé est compatible et vient en premier, mais le flac
        // non transcodé est préféré.
        let resources = resources();
        let sink = sink("http-get:*:audio/mpeg:*,http-get:*:audio/flac:*");
        let chosen = select_resource(&resources, &sink, false).unwrap();
        assert_eq!(chosen.uri, "http://server/a.flac");
    }

    #[test]
    fn test_falls_back_to_transcoded_when_alone() {
        let resources = resources();
        let sink = sink("http-get:*:audio/mpeg:*");
        let chosen = select_resource(&resources, &sink, false).unwrap();
        assert_eq!(chosen.uri, "http://server/a.mp3");
    }

    #[test]
    fn test_no_compatible_resource() {
        let resources = resources();
        let sink = sink("http-get:*:video/mp4:*");
        assert!(select_resource(&resources, &sink, false).is_none());
    }

    #[test]
    fn test_lenient_fallback_to_first_resource() {
        let resources = resources();
        let sink = sink("http-get:*:video/mp4:*");
        let chosen = select_resource(&resources, &sink, true).unwrap();
        assert_eq!(chosen.uri, "http://server/a.mp3");
    }

    #[test]
    fn test_unparseable_resource_is_skipped() {
        let resources = vec![
            Resource::new("garbage", "http://server/broken"),
            Resource::new("http-get:*:audio/flac:*", "http://server/a.flac"),
        ];
        let sink = sink("http-get:*:audio/flac:*");
        let chosen = select_resource(&resources, &sink, false).unwrap();
        assert_eq!(chosen.uri, "http://server/a.flac");
    }

    #[test]
    fn test_empty_resources() {
        let sink = sink("http-get:*:audio/flac:*");
        assert!(select_resource(&[], &sink, true).is_none());
    }
}
