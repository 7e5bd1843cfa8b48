use crate::schema::ledger_blobs;

use diesel::prelude::*;

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = ledger_blobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LedgerBlobRow {
  pub key: String,
  pub value: String,
  pub revision: i64,
  pub origin: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = ledger_blobs)]
pub struct NewLedgerBlobRow<'a> {
  pub key: &'a str,
  pub value: &'a str,
  pub revision: i64,
  pub origin: &'a str,
}
