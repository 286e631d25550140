//! Parsing, sérialisation et compatibilité des chaînes `protocolInfo`.
//!
//! Une chaîne protocolInfo UPnP AV comporte quatre champs séparés par `:` :
//! `protocole:réseau:typeMime:infosAdditionnelles`. Le quatrième champ est
//! soit `*`, soit une liste `;`-séparée de paramètres `DLNA.ORG_*` (profil,
//! vitesses de lecture, conversion, opérations de seek, flags).
//!
//! C'est cette chaîne que les ressources DIDL-Lite portent dans leur
//! attribut `protocolInfo`, et que ConnectionManager::GetProtocolInfo
//! retourne en listes Source/Sink séparées par des virgules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolInfoError;

/// Remplissage réservé derrière les 8 chiffres significatifs de
/// DLNA.ORG_FLAGS. Toujours émis tel quel, c'est un contrat du format.
const DLNA_FLAGS_RESERVED: &str = "000000000000000000000000";

/// Conversion annoncée par une ressource (`DLNA.ORG_CI`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DlnaConversion {
    #[default]
    None = 0,
    /// La ressource est une version transcodée du média original.
    Transcoded = 1,
}

impl DlnaConversion {
    fn from_wire(value: &str) -> Option<Self> {
        match value.trim() {
            "0" => Some(DlnaConversion::None),
            "1" => Some(DlnaConversion::Transcoded),
            _ => None,
        }
    }
}

/// Opérations de seek supportées (`DLNA.ORG_OP`), deux chiffres hexadécimaux.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DlnaOperation(u8);

impl DlnaOperation {
    pub const NONE: DlnaOperation = DlnaOperation(0);
    /// Seek par plage d'octets (en-tête HTTP Range).
    pub const RANGE_SEEK: DlnaOperation = DlnaOperation(0x01);
    /// Seek temporel (en-tête TimeSeekRange.dlna.org).
    pub const TIME_SEEK: DlnaOperation = DlnaOperation(0x10);

    pub fn from_bits(bits: u8) -> Self {
        DlnaOperation(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: DlnaOperation) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for DlnaOperation {
    type Output = DlnaOperation;

    fn bitor(self, rhs: DlnaOperation) -> DlnaOperation {
        DlnaOperation(self.0 | rhs.0)
    }
}

/// Flags DLNA (`DLNA.ORG_FLAGS`), 8 chiffres hexadécimaux significatifs
/// suivis de 24 chiffres réservés sur le fil.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DlnaFlags(u32);

impl DlnaFlags {
    pub const NONE: DlnaFlags = DlnaFlags(0);
    pub const SENDER_PACED: DlnaFlags = DlnaFlags(1 << 31);
    pub const TIME_BASED_SEEK: DlnaFlags = DlnaFlags(1 << 30);
    pub const BYTE_BASED_SEEK: DlnaFlags = DlnaFlags(1 << 29);
    pub const PLAY_CONTAINER: DlnaFlags = DlnaFlags(1 << 28);
    pub const S0_INCREASE: DlnaFlags = DlnaFlags(1 << 27);
    pub const SN_INCREASE: DlnaFlags = DlnaFlags(1 << 26);
    pub const RTSP_PAUSE: DlnaFlags = DlnaFlags(1 << 25);
    pub const STREAMING_TRANSFER_MODE: DlnaFlags = DlnaFlags(1 << 24);
    pub const INTERACTIVE_TRANSFER_MODE: DlnaFlags = DlnaFlags(1 << 23);
    pub const BACKGROUND_TRANSFER_MODE: DlnaFlags = DlnaFlags(1 << 22);
    pub const CONNECTION_STALL: DlnaFlags = DlnaFlags(1 << 21);
    pub const DLNA_V15: DlnaFlags = DlnaFlags(1 << 20);

    pub fn from_bits(bits: u32) -> Self {
        DlnaFlags(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: DlnaFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for DlnaFlags {
    type Output = DlnaFlags;

    fn bitor(self, rhs: DlnaFlags) -> DlnaFlags {
        DlnaFlags(self.0 | rhs.0)
    }
}

/// Chaîne `protocolInfo` décodée.
///
/// Après un parse réussi, `protocol` et `mime_type` sont garantis non vides ;
/// les champs DLNA restent à leur valeur par défaut quand le quatrième champ
/// vaut `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolInfo {
    pub protocol: String,
    pub network: String,
    pub mime_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dlna_profile: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub play_speeds: Vec<String>,

    #[serde(default)]
    pub dlna_conversion: DlnaConversion,

    #[serde(default)]
    pub dlna_operation: DlnaOperation,

    #[serde(default)]
    pub dlna_flags: DlnaFlags,
}

impl ProtocolInfo {
    pub fn new(protocol: &str, network: &str, mime_type: &str) -> Self {
        ProtocolInfo {
            protocol: protocol.to_string(),
            network: network.to_string(),
            mime_type: mime_type.to_string(),
            ..ProtocolInfo::default()
        }
    }

    /// Parse une chaîne `protocolInfo` complète.
    ///
    /// Les quatre champs doivent être présents. Le quatrième champ est le
    /// *reste* de la chaîne après le troisième `:`, car les valeurs DLNA
    /// peuvent elles-mêmes contenir des deux-points.
    pub fn parse(text: &str) -> Result<Self, ProtocolInfoError> {
        let mut fields = text.splitn(4, ':');
        let (Some(protocol), Some(network), Some(mime_type), Some(additional)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(ProtocolInfoError::InvalidSyntax(text.to_string()));
        };

        if protocol.is_empty() || mime_type.is_empty() {
            return Err(ProtocolInfoError::InvalidSyntax(text.to_string()));
        }

        let mut info = ProtocolInfo::new(protocol, network, mime_type);
        if additional != "*" {
            info.parse_additional_info(additional);
        }

        Ok(info)
    }

    /// Parse le quatrième champ, liste `;`-séparée de paramètres DLNA.ORG_*.
    ///
    /// L'ordre des paramètres est libre et les paramètres inconnus sont
    /// ignorés silencieusement (extensions DLNA futures).
    fn parse_additional_info(&mut self, additional: &str) {
        for token in additional.split(';') {
            let token = token.trim();

            if let Some(value) = token.strip_prefix("DLNA.ORG_PN=") {
                self.dlna_profile = Some(value.to_string());
            } else if let Some(value) = token.strip_prefix("DLNA.ORG_PS=") {
                self.play_speeds = value.split(',').map(str::to_string).collect();
            } else if let Some(value) = token.strip_prefix("DLNA.ORG_CI=") {
                if let Some(conversion) = DlnaConversion::from_wire(value) {
                    self.dlna_conversion = conversion;
                }
            } else if let Some(value) = token.strip_prefix("DLNA.ORG_OP=") {
                if let Some(hex) = value.get(..2) {
                    if let Ok(bits) = u8::from_str_radix(hex, 16) {
                        self.dlna_operation = DlnaOperation::from_bits(bits);
                    }
                }
            } else if let Some(value) = token.strip_prefix("DLNA.ORG_FLAGS=") {
                // Seuls les 8 premiers chiffres comptent, la suite est le
                // remplissage réservé.
                if let Some(hex) = value.get(..8) {
                    if let Ok(bits) = u32::from_str_radix(hex, 16) {
                        self.dlna_flags = DlnaFlags::from_bits(bits);
                    }
                }
            } else if !token.is_empty() {
                tracing::trace!(token = %token, "ignoring unknown protocolInfo token");
            }
        }
    }

    /// Compatibilité sink/source entre deux chaînes protocolInfo.
    ///
    /// Trois vérifications indépendantes, toutes requises : transport,
    /// format de contenu, profil DLNA. Chaque vérification compare les deux
    /// côtés avec le même prédicat commutatif, la relation est donc
    /// symétrique par construction.
    pub fn is_compatible(&self, other: &ProtocolInfo) -> bool {
        self.is_transport_compatible(other)
            && self.is_content_format_compatible(other)
            && self.is_additional_info_compatible(other)
    }

    fn is_transport_compatible(&self, other: &ProtocolInfo) -> bool {
        let ours = self.protocol.as_str();
        let theirs = other.protocol.as_str();

        if ours != "*" && theirs != "*" && !ours.eq_ignore_ascii_case(theirs) {
            return false;
        }

        // Le transport "internal" ne traverse pas les frontières réseau :
        // les champs réseau doivent correspondre exactement, le joker ne
        // relâche pas cette contrainte.
        if ours.eq_ignore_ascii_case("internal") || theirs.eq_ignore_ascii_case("internal") {
            return self.network == other.network;
        }

        true
    }

    fn is_content_format_compatible(&self, other: &ProtocolInfo) -> bool {
        let ours = self.mime_type.as_str();
        let theirs = other.mime_type.as_str();

        if ours == "*" || theirs == "*" || ours.eq_ignore_ascii_case(theirs) {
            return true;
        }

        // Exception LPCM : "audio/L16" accepte toute variante paramétrée
        // comme "audio/L16;rate=44100;channels=2", et réciproquement.
        (mime_is_lpcm(ours) && mime_has_lpcm_prefix(theirs))
            || (mime_is_lpcm(theirs) && mime_has_lpcm_prefix(ours))
    }

    fn is_additional_info_compatible(&self, other: &ProtocolInfo) -> bool {
        match (&self.dlna_profile, &other.dlna_profile) {
            (Some(ours), Some(theirs)) => {
                ours == "*" || theirs == "*" || ours.eq_ignore_ascii_case(theirs)
            }
            _ => true,
        }
    }
}

fn mime_is_lpcm(mime_type: &str) -> bool {
    mime_type.eq_ignore_ascii_case("audio/L16")
}

fn mime_has_lpcm_prefix(mime_type: &str) -> bool {
    mime_type
        .get(.."audio/L16".len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("audio/L16"))
}

impl fmt::Display for ProtocolInfo {
    /// Sérialise au format du fil. L'ordre des clauses DLNA est un contrat
    /// du format : PN, OP, PS, CI, FLAGS.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let network = if self.network.is_empty() {
            "*"
        } else {
            self.network.as_str()
        };
        write!(f, "{}:{}:{}", self.protocol, network, self.mime_type)?;

        let Some(profile) = &self.dlna_profile else {
            return write!(f, ":*");
        };

        write!(f, ":DLNA.ORG_PN={profile}")?;

        // Le flag d'opération n'a de sens que pour les transports qui
        // définissent un mécanisme de seek.
        if !self.dlna_operation.is_empty()
            && (self.protocol == "http-get" || self.protocol == "rtsp-rtp-udp")
        {
            write!(f, ";DLNA.ORG_OP={:02x}", self.dlna_operation.bits())?;
        }

        if !self.play_speeds.is_empty() {
            write!(f, ";DLNA.ORG_PS={}", self.play_speeds.join(","))?;
        }

        if self.dlna_conversion != DlnaConversion::None {
            write!(f, ";DLNA.ORG_CI={}", self.dlna_conversion as u8)?;
        }

        if !self.dlna_flags.is_empty() {
            write!(
                f,
                ";DLNA.ORG_FLAGS={:08x}{}",
                self.dlna_flags.bits(),
                DLNA_FLAGS_RESERVED
            )?;
        }

        Ok(())
    }
}

impl FromStr for ProtocolInfo {
    type Err = ProtocolInfoError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        ProtocolInfo::parse(text)
    }
}

/// Parse une liste de chaînes protocolInfo séparées par des virgules, telle
/// que retournée par ConnectionManager::GetProtocolInfo (Source ou Sink).
///
/// Lecture laxiste : les entrées vides ou illisibles sont sautées avec un
/// warning, les renderers du commerce glissent volontiers des entrées
/// fantaisistes dans leurs listes sink.
pub fn parse_protocol_info_list(text: &str) -> Vec<ProtocolInfo> {
    text.split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            match ProtocolInfo::parse(entry) {
                Ok(info) => Some(info),
                Err(error) => {
                    tracing::warn!(entry = %entry, %error, "skipping unparseable protocolInfo entry");
                    None
                }
            }
        })
        .collect()
}
