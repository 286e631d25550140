//! # heliumdidl - Modèle DIDL-Lite de Helium
//!
//! Représentation mémoire des documents DIDL-Lite échangés avec les
//! MediaServers et MediaRenderers (Browse/Search, SetAVTransportURI...),
//! parsés et sérialisés avec quick-xml.
//!
//! Les ressources exposent leur attribut `protocolInfo` brut et décodé via
//! [`heliumav::ProtocolInfo`] ; le choix d'une ressource compatible avec les
//! capacités sink d'un renderer vit dans [`selection`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use heliumav::{ProtocolInfo, ProtocolInfoError};

pub mod selection;

pub use selection::{SinkProtocolInfo, select_resource};

/// Namespace racine DIDL-Lite.
pub const DIDL_LITE_NS: &str = "urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/";
/// Namespace des éléments upnp:*.
pub const UPNP_NS: &str = "urn:schemas-upnp-org:metadata-1-0/upnp/";
/// Namespace Dublin Core (dc:*).
pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
/// Namespace des attributs dlna:*.
pub const DLNA_NS: &str = "urn:schemas-dlna-org:metadata-1-0/";

#[derive(Error, Debug)]
pub enum DidlError {
    #[error("Invalid DIDL-Lite document: {0}")]
    InvalidDocument(#[from] quick_xml::de::DeError),
    #[error("Cannot serialize DIDL-Lite document: {0}")]
    Serialization(#[from] quick_xml::se::SeError),
}

/// Racine d'un document DIDL-Lite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "DIDL-Lite")]
pub struct DidlDocument {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,

    #[serde(rename = "@xmlns:dc", skip_serializing_if = "Option::is_none")]
    pub xmlns_dc: Option<String>,

    #[serde(rename = "@xmlns:upnp", skip_serializing_if = "Option::is_none")]
    pub xmlns_upnp: Option<String>,

    #[serde(rename = "@xmlns:dlna", skip_serializing_if = "Option::is_none")]
    pub xmlns_dlna: Option<String>,

    #[serde(rename = "container", default)]
    pub containers: Vec<Container>,

    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

impl Default for DidlDocument {
    fn default() -> Self {
        DidlDocument {
            xmlns: DIDL_LITE_NS.to_string(),
            xmlns_dc: Some(DC_NS.to_string()),
            xmlns_upnp: Some(UPNP_NS.to_string()),
            xmlns_dlna: None,
            containers: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl DidlDocument {
    /// Parse un document DIDL-Lite.
    pub fn parse(xml: &str) -> Result<Self, DidlError> {
        let document: DidlDocument = quick_xml::de::from_str(xml)?;
        tracing::trace!(
            containers = document.containers.len(),
            items = document.items.len(),
            "parsed DIDL-Lite document"
        );
        Ok(document)
    }

    /// Sérialise le document en XML (sans déclaration `<?xml ...?>`).
    pub fn to_xml(&self) -> Result<String, DidlError> {
        Ok(quick_xml::se::to_string(self)?)
    }

    /// Itère sur tous les items, y compris ceux des containers imbriqués.
    pub fn all_items(&self) -> impl Iterator<Item = &Item> {
        let mut pending: Vec<&Container> = self.containers.iter().collect();
        let mut items: Vec<&Item> = self.items.iter().collect();
        while let Some(container) = pending.pop() {
            pending.extend(container.containers.iter());
            items.extend(container.items.iter());
        }
        items.into_iter()
    }

    /// Itère sur tous les containers, y compris les imbriqués.
    pub fn all_containers(&self) -> impl Iterator<Item = &Container> {
        let mut pending: Vec<&Container> = self.containers.iter().collect();
        let mut all: Vec<&Container> = Vec::new();
        while let Some(container) = pending.pop() {
            pending.extend(container.containers.iter());
            all.push(container);
        }
        all.into_iter()
    }

    /// Trouve un objet (item) par son ID.
    pub fn item_by_id(&self, id: &str) -> Option<&Item> {
        self.all_items().find(|item| item.id == id)
    }
}

/// Container DIDL-Lite (album, artiste, dossier...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID")]
    pub parent_id: String,

    #[serde(rename = "@restricted", skip_serializing_if = "Option::is_none")]
    pub restricted: Option<String>,

    #[serde(rename = "@childCount", skip_serializing_if = "Option::is_none")]
    pub child_count: Option<String>,

    #[serde(rename = "@searchable", skip_serializing_if = "Option::is_none")]
    pub searchable: Option<String>,

    #[serde(rename = "dc:title", alias = "title")]
    pub title: String,

    #[serde(rename = "upnp:class", alias = "class")]
    pub class: String,

    #[serde(rename = "container", default)]
    pub containers: Vec<Container>,

    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

/// Item DIDL-Lite (piste, vidéo, photo).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID")]
    pub parent_id: String,

    #[serde(rename = "@restricted", skip_serializing_if = "Option::is_none")]
    pub restricted: Option<String>,

    // Les items de playlist référencent l'objet original.
    #[serde(rename = "@refID", skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,

    #[serde(rename = "dc:title", alias = "title")]
    pub title: String,

    #[serde(rename = "upnp:class", alias = "class")]
    pub class: String,

    #[serde(
        rename = "dc:creator",
        alias = "creator",
        skip_serializing_if = "Option::is_none"
    )]
    pub creator: Option<String>,

    #[serde(
        rename = "upnp:artist",
        alias = "artist",
        skip_serializing_if = "Option::is_none"
    )]
    pub artist: Option<String>,

    #[serde(
        rename = "upnp:album",
        alias = "album",
        skip_serializing_if = "Option::is_none"
    )]
    pub album: Option<String>,

    #[serde(
        rename = "upnp:genre",
        alias = "genre",
        skip_serializing_if = "Option::is_none"
    )]
    pub genre: Option<String>,

    #[serde(
        rename = "upnp:albumArtURI",
        alias = "albumArtURI",
        skip_serializing_if = "Option::is_none"
    )]
    pub album_art: Option<String>,

    #[serde(
        rename = "dc:date",
        alias = "date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,

    #[serde(
        rename = "upnp:originalTrackNumber",
        alias = "originalTrackNumber",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_track_number: Option<String>,

    #[serde(rename = "res", default)]
    pub resources: Vec<Resource>,
}

impl Item {
    /// La première ressource, par convention la représentation principale.
    pub fn primary_resource(&self) -> Option<&Resource> {
        self.resources.first()
    }

    /// Vrai si l'item descend de la classe UPnP donnée
    /// (`object.item.audioItem` couvre `object.item.audioItem.musicTrack`).
    pub fn is_derived_from(&self, class: &str) -> bool {
        self.class == class
            || (self.class.starts_with(class)
                && self.class[class.len()..].starts_with('.'))
    }
}

/// Ressource d'un item : une URI et la description de son transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "@protocolInfo")]
    pub protocol_info: String,

    #[serde(rename = "@size", skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(rename = "@duration", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(rename = "@bitrate", skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,

    #[serde(rename = "@sampleFrequency", skip_serializing_if = "Option::is_none")]
    pub sample_frequency: Option<String>,

    #[serde(rename = "@bitsPerSample", skip_serializing_if = "Option::is_none")]
    pub bits_per_sample: Option<String>,

    #[serde(rename = "@nrAudioChannels", skip_serializing_if = "Option::is_none")]
    pub nr_audio_channels: Option<String>,

    #[serde(rename = "@importUri", skip_serializing_if = "Option::is_none")]
    pub import_uri: Option<String>,

    #[serde(rename = "$text")]
    pub uri: String,
}

impl Resource {
    pub fn new(protocol_info: &str, uri: &str) -> Self {
        Resource {
            protocol_info: protocol_info.to_string(),
            size: None,
            duration: None,
            bitrate: None,
            sample_frequency: None,
            bits_per_sample: None,
            nr_audio_channels: None,
            import_uri: None,
            uri: uri.to_string(),
        }
    }

    /// Décode l'attribut `protocolInfo` de la ressource.
    pub fn protocol_info(&self) -> Result<ProtocolInfo, ProtocolInfoError> {
        ProtocolInfo::parse(&self.protocol_info)
    }
}
