//! # heliumav - Noyau UPnP AV de Helium
//!
//! Deux composants indépendants, purement synchrones :
//!
//! - [`ProtocolInfo`] : parsing, sérialisation et test de compatibilité des
//!   chaînes `protocolInfo` (paramètres DLNA.ORG_* compris) portées par les
//!   ressources DIDL-Lite et les listes Source/Sink de ConnectionManager ;
//! - [`SearchCriteriaParser`] : parser par descente récursive du langage
//!   SearchCriteria de ContentDirectory, qui pousse ses événements vers un
//!   [`SearchCriteriaConsumer`] fourni par l'appelant.
//!
//! Aucun état partagé entre deux appels : chaque parse est indépendant et
//! peut tourner en parallèle d'autres parses sur d'autres entrées.

pub mod errors;
pub mod protocol_info;
pub mod search_criteria;

pub use errors::{ProtocolInfoError, SearchCriteriaError};
pub use protocol_info::{
    DlnaConversion, DlnaFlags, DlnaOperation, ProtocolInfo, parse_protocol_info_list,
};
pub use search_criteria::{SearchCriteriaConsumer, SearchCriteriaParser, SearchOperator};
