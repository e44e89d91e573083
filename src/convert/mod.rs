use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use log::info;
use serde::Serialize;

use crate::encoding;
use crate::schema::{self, classify_header, create_dictionary, Language, SchemaVersion};

const NBSP: char = '\u{a0}';

/// Erste's own transfers carry no partner name; Wallet needs one.
const DEFAULT_PARTNER: &str = "Erste Bank";

const OUTPUT_FIELDS: [&str; 5] = [
    schema::BOOKING_DATE, schema::AMOUNT, schema::CURRENCY,
    schema::PARTNER_NAME, schema::NOTE,
];

/// One normalized statement line, in the column order Wallet imports.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct OutputRow {
    #[serde(rename = "Booking Date")]
    pub(crate) booking_date: String,
    #[serde(rename = "Amount")]
    pub(crate) amount: String,
    #[serde(rename = "Currency")]
    pub(crate) currency: String,
    #[serde(rename = "Partner Name")]
    pub(crate) partner_name: String,
    #[serde(rename = "Note")]
    pub(crate) note: String,
}

/// Resolves canonical (English) field names to column positions in one
/// statement file, via the source-language dictionary.
pub(crate) struct FieldResolver {
    columns: HashMap<&'static str, usize>,
}

impl FieldResolver {
    pub(crate) fn new(headers: &StringRecord, dictionary: &HashMap<&'static str, &'static str>) -> FieldResolver {
        let mut columns: HashMap<&'static str, usize> = HashMap::new();
        for (&field, &source_name) in dictionary {
            if let Some(i) = headers.iter().position(|column| column == source_name) {
                columns.insert(field, i);
            }
        }
        FieldResolver { columns }
    }

    fn get<'r>(&self, row: &'r StringRecord, field: &str) -> Result<&'r str> {
        let index = *self.columns.get(field)
            .ok_or_else(|| anyhow!("no source column for field '{}'", field))?;
        row.get(index)
            .ok_or_else(|| anyhow!("row is missing column {} for field '{}'", index, field))
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

/// Everything Wallet has no column for gets folded into Note. The legacy
/// schema filled the "S.ref." slot from Sender Reference; the current one
/// repurposed it for Booking Info and added the transaction timestamp.
fn synthesize_note(row: &StringRecord, fields: &FieldResolver, version: SchemaVersion) -> Result<String> {
    let narrative = fields.get(row, schema::NARRATIVE)?;
    let trn_type = fields.get(row, schema::TRANSACTION_TYPE)?;
    Ok(match version {
        SchemaVersion::Current => {
            let trn_date = fields.get(row, schema::TRANSACTION_DATE_TIME)?;
            let reference = fields.get(row, schema::BOOKING_INFO)?;
            format!("{} Trn.type: {} Trn.date: {} S.ref.: {}",
                    narrative, or_dash(trn_type), or_dash(trn_date), or_dash(reference))
        }
        SchemaVersion::Legacy => {
            let reference = fields.get(row, schema::SENDER_REFERENCE)?;
            format!("{} Trn.type: {} S.ref.: {}",
                    narrative, or_dash(trn_type), or_dash(reference))
        }
    })
}

pub(crate) fn transform_row(row: &StringRecord, fields: &FieldResolver, version: SchemaVersion) -> Result<OutputRow> {
    let partner_name = fields.get(row, schema::PARTNER_NAME)?;
    let partner_name = if partner_name.is_empty() {
        DEFAULT_PARTNER.to_string()
    } else {
        partner_name.to_string()
    };

    Ok(OutputRow {
        booking_date: fields.get(row, schema::BOOKING_DATE)?.to_string(),
        // The bank groups thousands with non-breaking spaces.
        amount: fields.get(row, schema::AMOUNT)?.replace(NBSP, ""),
        currency: fields.get(row, schema::CURRENCY)?.to_string(),
        partner_name,
        note: synthesize_note(row, fields, version)?,
    })
}

/// Convert one statement file. Schema problems are reported on stdout and
/// end the conversion cleanly before the output file is created; I/O and
/// decoding failures propagate.
pub(crate) fn transform_csv(csv_input_file: &Path, csv_output_file: &Path, requested: Option<SchemaVersion>) -> Result<()> {
    println!("{} -> {}", csv_input_file.display(), csv_output_file.display());

    let decoded = encoding::read_to_utf8(csv_input_file)?;
    let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(decoded.as_bytes());
    let headers = csv_reader.headers().context("reading header row")?.clone();

    let (version, language) = match classify_header(&headers, requested) {
        Ok(detected) => detected,
        Err(e) => {
            println!("ERROR: {}", e);
            return Ok(());
        }
    };
    info!("Detected {:?} schema with '{}' headers", version, language.code());

    let dictionary = create_dictionary(language, Language::English);
    let fields = FieldResolver::new(&headers, &dictionary);

    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_path(csv_output_file)?;
    csv_writer.write_record(OUTPUT_FIELDS)?;
    for record in csv_reader.records() {
        let row = record?;
        csv_writer.serialize(transform_row(&row, &fields, version)?)?;
    }
    csv_writer.flush()?;
    Ok(())
}
