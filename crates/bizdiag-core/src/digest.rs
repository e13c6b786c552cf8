//! Fingerprint of everything a run reads.

use bizdiag_config::VerticalConfig;
use bizdiag_model::CellValue;
use sha2::{Digest, Sha256};

use crate::input::RunInput;

/// SHA-256 (hex) over the playbook, every uploaded cell, confirmed mappings
/// and questionnaire answers. Upload file names are left out, so the same
/// data under another name has the same digest.
pub fn input_digest(config: &VerticalConfig, input: &RunInput) -> String {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, b"config", &serde_json::to_vec(config).unwrap_or_default());

    let mut uploads: Vec<_> = input.uploads.iter().collect();
    uploads.sort_by_key(|upload| upload.pack);
    for upload in uploads {
        update_field(&mut hasher, b"pack", upload.pack.as_str().as_bytes());
        for column in &upload.table.columns {
            update_field(&mut hasher, b"column", column.as_bytes());
        }
        for row in &upload.table.rows {
            hasher.update(b"row");
            for column in &upload.table.columns {
                update_cell(&mut hasher, row.get(column));
            }
        }
        update_field(
            &mut hasher,
            b"confirmed",
            &serde_json::to_vec(&upload.confirmed).unwrap_or_default(),
        );
    }
    update_field(&mut hasher, b"answers", &serde_json::to_vec(&input.answers).unwrap_or_default());
    hex::encode(hasher.finalize())
}

/// Length-prefixed so adjacent fields cannot run together.
fn update_field(hasher: &mut Sha256, tag: &[u8], bytes: &[u8]) {
    hasher.update(tag);
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn update_cell(hasher: &mut Sha256, cell: &CellValue) {
    match cell {
        CellValue::Number(value) => update_field(hasher, b"n", &value.to_bits().to_le_bytes()),
        CellValue::Text(text) => update_field(hasher, b"t", text.as_bytes()),
        CellValue::Date(date) => update_field(hasher, b"d", date.to_string().as_bytes()),
        CellValue::Missing => update_field(hasher, b"m", &[]),
    }
}
