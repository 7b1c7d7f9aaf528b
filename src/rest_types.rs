use serde::Serialize;

use crate::serde_utils;

#[derive(Debug, Clone, Serialize)]
pub struct EditEntryRequest<'a> {
    pub filename: &'a str,
    pub note: &'a str,
    #[serde(skip_serializing_if = "serde_utils::is_blank")]
    pub expiration: Option<&'a str>,
}
