//! Plain-text and JSON printing.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use survey_core::{address::Address, case::Case, photo::Photo};
use survey_report::caption::caption;

/// One-line human summary of a record.
pub trait Summary {
  fn summary(&self) -> String;
}

fn local(ts: &DateTime<Utc>) -> String {
  ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

impl Summary for Case {
  fn summary(&self) -> String {
    let mut line = format!("{}  {}", self.case_id, self.case_number);
    if let Some(name) = &self.case_name {
      line.push_str(&format!("  {name}"));
    }
    if let Some(date) = &self.case_date {
      line.push_str(&format!("  ({date})"));
    }
    line.push_str(&format!("  created {}", local(&self.created_at)));
    line
  }
}

impl Summary for Address {
  fn summary(&self) -> String {
    format!("{}  {}  created {}", self.address_id, self.address, local(&self.created_at))
  }
}

impl Summary for Photo {
  fn summary(&self) -> String {
    format!("{}  {}  {}", self.photo_id, caption(self), self.watermarked_path.display())
  }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

pub fn print_one<T: Serialize + Summary>(item: &T, json: bool) -> anyhow::Result<()> {
  if json {
    return print_json(item);
  }
  println!("{}", item.summary());
  Ok(())
}

pub fn print_list<T: Serialize + Summary>(items: &[T], json: bool) -> anyhow::Result<()> {
  if json {
    return print_json(items);
  }
  if items.is_empty() {
    println!("(none)");
  }
  for item in items {
    println!("{}", item.summary());
  }
  Ok(())
}
