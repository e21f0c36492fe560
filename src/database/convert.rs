// File: src/database/convert.rs

//! Row codec
//!
//! Maps persisted entities to and from tuples of SQLite cells. Column
//! order is fixed per entity and shared by every query that selects it.

use rusqlite::Row;
use rusqlite::types::Value;

use crate::model::{Checkpoint, FoldedInput, Input};

/// Cells for one `inputs` row, in table column order.
pub(crate) fn input_to_row(input: &Input) -> [Value; 10] {
    [
        Value::Blob(input.ext_output_reference.clone()),
        Value::Text(input.address.clone()),
        Value::Blob(input.value.clone()),
        input
            .datum_hash
            .clone()
            .map_or(Value::Null, Value::Blob),
        input
            .script_hash
            .clone()
            .map_or(Value::Null, Value::Blob),
        Value::Text(input.payment_credential.clone()),
        Value::Integer(input.transaction_index as i64),
        Value::Integer(input.output_index as i64),
        Value::Integer(input.created_at as i64),
        input
            .spent_at
            .map_or(Value::Null, |slot| Value::Integer(slot as i64)),
    ]
}

/// Inverse of [`input_to_row`]; expects the ten table columns in order.
pub(crate) fn row_to_input(row: &Row) -> rusqlite::Result<Input> {
    let transaction_index: i64 = row.get(6)?;
    let output_index: i64 = row.get(7)?;
    let created_at: i64 = row.get(8)?;
    let spent_at: Option<i64> = row.get(9)?;

    Ok(Input {
        ext_output_reference: row.get(0)?,
        address: row.get(1)?,
        value: row.get(2)?,
        datum_hash: row.get(3)?,
        script_hash: row.get(4)?,
        payment_credential: row.get(5)?,
        transaction_index: transaction_index as u32,
        output_index: output_index as u32,
        created_at: created_at as u64,
        spent_at: spent_at.map(|slot| slot as u64),
    })
}

pub(crate) fn checkpoint_to_row(point: &Checkpoint) -> [Value; 2] {
    [
        Value::Integer(point.slot_no as i64),
        Value::Blob(point.header_hash.clone()),
    ]
}

/// Expects `slot_no, header_hash`.
pub(crate) fn row_to_checkpoint(row: &Row) -> rusqlite::Result<Checkpoint> {
    let slot_no: i64 = row.get(0)?;
    Ok(Checkpoint {
        slot_no: slot_no as u64,
        header_hash: row.get(1)?,
    })
}

/// Expects the ten input columns followed by the creation header hash and
/// the (nullable) spending header hash.
pub(crate) fn row_to_folded_input(row: &Row) -> rusqlite::Result<FoldedInput> {
    let input = row_to_input(row)?;
    let created_header: Vec<u8> = row.get(10)?;
    let spent_header: Option<Vec<u8>> = row.get(11)?;

    let created_point = Checkpoint {
        slot_no: input.created_at,
        header_hash: created_header,
    };
    let spent_point = match (input.spent_at, spent_header) {
        (Some(slot_no), Some(header_hash)) => Some(Checkpoint {
            slot_no,
            header_hash,
        }),
        _ => None,
    };

    Ok(FoldedInput {
        input,
        created_point,
        spent_point,
    })
}

/// Debug rendering of a row's cells, for `UnexpectedRow` errors.
pub(crate) fn render_row(row: &Row, columns: usize) -> Vec<String> {
    (0..columns)
        .map(|ix| match row.get_ref(ix) {
            Ok(cell) => format!("{:?}", cell),
            Err(e) => e.to_string(),
        })
        .collect()
}
