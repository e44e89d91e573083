use std::collections::{HashMap, HashSet};
use std::fmt;

use clap::ValueEnum;
use csv::StringRecord;
use lazy_static::lazy_static;

pub(crate) const BOOKING_DATE: &str = "Booking Date";
const BOOKING_DATE_HU: &str = "Könyvelés dátuma";
pub(crate) const AMOUNT: &str = "Amount";
const AMOUNT_HU: &str = "Összeg";
pub(crate) const CURRENCY: &str = "Currency";
const CURRENCY_HU: &str = "Devizanem";
pub(crate) const PARTNER_NAME: &str = "Partner Name";
const PARTNER_NAME_HU: &str = "Partner név";
pub(crate) const SENDER_REFERENCE: &str = "Sender Reference";
const SENDER_REFERENCE_HU: &str = "Megbízás azonosító";
pub(crate) const NARRATIVE: &str = "Narrative";
const NARRATIVE_HU: &str = "Közlemény";
pub(crate) const TRANSACTION_TYPE: &str = "Transaction Type";
const TRANSACTION_TYPE_HU: &str = "Tranzakció típusa";
pub(crate) const TRANSACTION_DATE_TIME: &str = "Transaction Date and Time";
const TRANSACTION_DATE_TIME_HU: &str = "Tranzakció dátuma és ideje";
pub(crate) const BOOKING_INFO: &str = "Booking Info";
const BOOKING_INFO_HU: &str = "Könyvelési információ";

/// Output-only field, synthesized by the transformer; never translated.
pub(crate) const NOTE: &str = "Note";

/// One statement field with its name in every supported language.
pub(crate) struct TranslationEntry {
    en: &'static str,
    hu: &'static str,
}

impl TranslationEntry {
    fn name(&self, language: Language) -> &'static str {
        match language {
            Language::English => self.en,
            Language::Hungarian => self.hu,
        }
    }
}

lazy_static! {
    /// Every field name Erste has ever put in a statement header, across
    /// both schema generations. Built once, read-only afterwards.
    static ref TRANSLATIONS: Vec<TranslationEntry> = vec![
        TranslationEntry { en: BOOKING_DATE, hu: BOOKING_DATE_HU },
        TranslationEntry { en: AMOUNT, hu: AMOUNT_HU },
        TranslationEntry { en: CURRENCY, hu: CURRENCY_HU },
        TranslationEntry { en: PARTNER_NAME, hu: PARTNER_NAME_HU },
        TranslationEntry { en: SENDER_REFERENCE, hu: SENDER_REFERENCE_HU },
        TranslationEntry { en: NARRATIVE, hu: NARRATIVE_HU },
        TranslationEntry { en: TRANSACTION_TYPE, hu: TRANSACTION_TYPE_HU },
        TranslationEntry { en: TRANSACTION_DATE_TIME, hu: TRANSACTION_DATE_TIME_HU },
        TranslationEntry { en: BOOKING_INFO, hu: BOOKING_INFO_HU },
    ];
}

const REQUIRED_FIELDS_LEGACY: [&str; 7] = [
    BOOKING_DATE, AMOUNT, CURRENCY, PARTNER_NAME,
    SENDER_REFERENCE, NARRATIVE, TRANSACTION_TYPE,
];
const REQUIRED_FIELDS_CURRENT: [&str; 8] = [
    BOOKING_DATE, AMOUNT, CURRENCY, PARTNER_NAME,
    NARRATIVE, TRANSACTION_TYPE, TRANSACTION_DATE_TIME, BOOKING_INFO,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Language {
    English,
    Hungarian,
}

impl Language {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hungarian => "hu",
        }
    }
}

/// Erste changed the statement export format at some point: the newer
/// generation adds a transaction timestamp and a "Booking Info" column and
/// drops "Sender Reference". Both generations share one pipeline,
/// parameterized by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SchemaVersion {
    Legacy,
    Current,
}

impl SchemaVersion {
    fn required_fields(&self) -> &'static [&'static str] {
        match self {
            SchemaVersion::Legacy => &REQUIRED_FIELDS_LEGACY,
            SchemaVersion::Current => &REQUIRED_FIELDS_CURRENT,
        }
    }

    pub(crate) fn required_fields_in(&self, language: Language) -> Vec<&'static str> {
        self.required_fields().iter().map(|field| translate(field, language)).collect()
    }
}

fn translate(field: &'static str, language: Language) -> &'static str {
    TRANSLATIONS.iter()
        .find(|entry| entry.en == field)
        .map(|entry| entry.name(language))
        .unwrap()
}

/// Map every target-language field name to its source-language equivalent.
pub(crate) fn create_dictionary(source_lang: Language, target_lang: Language) -> HashMap<&'static str, &'static str> {
    TRANSLATIONS.iter()
        .map(|entry| (entry.name(target_lang), entry.name(source_lang)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SchemaError {
    /// Header matches no known schema's discriminator field. Carries the
    /// actual header columns for the diagnostic.
    UnknownHeader(Vec<String>),
    /// Discriminator matched but one or more required fields are absent.
    MissingFields { language: Language, missing: Vec<String> },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchemaError::UnknownHeader(columns) =>
                write!(f, "unrecognized header, matches no known statement schema: {:?}", columns),
            SchemaError::MissingFields { language, missing } =>
                write!(f, "missing fields for '{}' schema: {:?}", language.code(), missing),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Determine the statement's language and schema generation from its header
/// row. The first required field doubles as a cheap language discriminator;
/// the full required set is validated only after the language is fixed, so
/// "wrong schema entirely" and "right schema, missing columns" produce
/// distinct diagnostics.
pub(crate) fn classify_header(headers: &StringRecord, requested: Option<SchemaVersion>) -> Result<(SchemaVersion, Language), SchemaError> {
    let columns: HashSet<&str> = headers.iter().collect();

    let language = [Language::English, Language::Hungarian]
        .into_iter()
        .find(|lang| columns.contains(translate(BOOKING_DATE, *lang)))
        .ok_or_else(|| SchemaError::UnknownHeader(headers.iter().map(str::to_string).collect()))?;

    let candidates = match requested {
        Some(version) => vec![version],
        None => vec![SchemaVersion::Current, SchemaVersion::Legacy],
    };

    let mut first_missing: Option<Vec<String>> = None;
    for version in candidates {
        let missing: Vec<String> = version.required_fields_in(language)
            .into_iter()
            .filter(|field| !columns.contains(field))
            .map(str::to_string)
            .collect();
        if missing.is_empty() {
            return Ok((version, language));
        }
        // Report against the first candidate tried, i.e. the newest schema
        // unless the caller pinned one explicitly.
        first_missing.get_or_insert(missing);
    }

    Err(SchemaError::MissingFields { language, missing: first_missing.unwrap_or_default() })
}
