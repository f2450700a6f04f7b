//! Command-line arguments.

use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use survey_core::{
  address::{BuildingSurvey, Choice},
  entity::Entity,
  photo::Annotation,
};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "survey", version, about = "Site survey photo store and report generator")]
pub struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, value_name = "FILE", default_value = "survey.toml")]
  pub config: PathBuf,

  /// Print records as JSON.
  #[arg(long, global = true)]
  pub json: bool,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Manage cases.
  #[command(subcommand)]
  Case(CaseCommand),

  /// Manage the addresses of a case.
  #[command(subcommand)]
  Address(AddressCommand),

  /// Manage the photos of an address.
  #[command(subcommand)]
  Photo(PhotoCommand),

  /// Write the photo report of one address as a PDF.
  Export {
    #[arg(long)]
    address: Uuid,
  },

  /// Print a fresh snapshot every time a list changes. Stop with Ctrl-C.
  Watch {
    /// `case`, `address` or `photo`.
    entity: Entity,

    /// The owning case (for addresses) or address (for photos).
    #[arg(long)]
    parent: Option<Uuid>,
  },
}

// ─── Cases ───────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum CaseCommand {
  Add {
    #[arg(long)]
    number: String,
    #[arg(long)]
    name:   Option<String>,
    /// Free text, e.g. 113/05/01.
    #[arg(long)]
    date:   Option<String>,
  },
  List,
  /// Show a case with its address and photo counts.
  Show { id: Uuid },
  /// Change the given fields. An empty value clears an optional field.
  Update {
    id:     Uuid,
    #[arg(long)]
    number: Option<String>,
    #[arg(long)]
    name:   Option<String>,
    #[arg(long)]
    date:   Option<String>,
  },
  /// Delete a case with all of its addresses and photos.
  Delete { id: Uuid },
}

// ─── Addresses ───────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum AddressCommand {
  Add {
    #[arg(long = "case")]
    case_id: Uuid,
    #[arg(long)]
    address: String,
    #[command(flatten)]
    survey:  SurveyArgs,
  },
  List {
    #[arg(long = "case")]
    case_id: Uuid,
  },
  Show { id: Uuid },
  Update {
    id:      Uuid,
    #[arg(long)]
    address: Option<String>,
    #[command(flatten)]
    survey:  SurveyArgs,
  },
  /// Delete an address with all of its photos.
  Delete { id: Uuid },
}

/// Building survey fields. Each `--x-other` sets the free-text detail of
/// `--x`.
#[derive(Args, Debug, Default)]
pub struct SurveyArgs {
  #[arg(long)]
  pub structure:       Option<String>,
  #[arg(long)]
  pub structure_other: Option<String>,
  #[arg(long)]
  pub usage:           Option<String>,
  #[arg(long)]
  pub usage_other:     Option<String>,
  #[arg(long)]
  pub wall:            Option<String>,
  #[arg(long)]
  pub wall_other:      Option<String>,
  #[arg(long)]
  pub ceiling:         Option<String>,
  #[arg(long)]
  pub ceiling_other:   Option<String>,
  #[arg(long)]
  pub floor:           Option<String>,
  #[arg(long)]
  pub floor_other:     Option<String>,
  #[arg(long)]
  pub survey_status:   Option<String>,
}

impl SurveyArgs {
  /// Overlay the given flags onto `survey`.
  pub fn apply(self, survey: &mut BuildingSurvey) -> anyhow::Result<()> {
    merge_choice("structure", &mut survey.structure, self.structure, self.structure_other)?;
    merge_choice("usage", &mut survey.usage, self.usage, self.usage_other)?;
    merge_choice("wall", &mut survey.wall, self.wall, self.wall_other)?;
    merge_choice("ceiling", &mut survey.ceiling, self.ceiling, self.ceiling_other)?;
    merge_choice("floor", &mut survey.floor, self.floor, self.floor_other)?;
    if let Some(status) = self.survey_status {
      survey.survey_status = non_blank(status);
    }
    Ok(())
  }
}

/// A new value replaces the whole choice, an empty one clears it. `other`
/// then attaches to whatever choice is left.
fn merge_choice(
  field: &str,
  slot: &mut Option<Choice>,
  value: Option<String>,
  other: Option<String>,
) -> anyhow::Result<()> {
  if let Some(value) = value {
    *slot = non_blank(value).map(Choice::new);
  }
  if let Some(other) = other {
    let Some(choice) = slot.take() else {
      bail!("--{field}-other needs a --{field} value");
    };
    *slot = Some(match non_blank(other) {
      Some(other) => choice.with_other(other),
      None => Choice { other: None, ..choice },
    });
  }
  Ok(())
}

pub fn non_blank(value: String) -> Option<String> { (!value.trim().is_empty()).then_some(value) }

// ─── Photos ──────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum PhotoCommand {
  /// Register an already-captured photo. It gets the next sequence number.
  Add {
    #[arg(long)]
    address:     Uuid,
    #[arg(long)]
    original:    PathBuf,
    /// Defaults to the original.
    #[arg(long)]
    watermarked: Option<PathBuf>,
    #[arg(long)]
    thumbnail:   Option<PathBuf>,
    #[command(flatten)]
    annotation:  AnnotationArgs,
  },
  /// Photos of an address in sequence order.
  List {
    #[arg(long)]
    address: Uuid,
  },
  Show { id: Uuid },
  Update {
    id:         Uuid,
    #[arg(long)]
    thumbnail:  Option<PathBuf>,
    #[command(flatten)]
    annotation: AnnotationArgs,
  },
  /// Give a photo a different sequence number.
  Resequence { id: Uuid, sequence: u32 },
  Delete { id: Uuid },
}

#[derive(Args, Debug, Default)]
pub struct AnnotationArgs {
  /// 全景, 牆, 平頂, 地坪, 樑, 柱 or 其他.
  #[arg(long)]
  pub position:    Option<String>,
  #[arg(long)]
  pub material:    Option<String>,
  #[arg(long)]
  pub crack_width: Option<String>,
  #[arg(long)]
  pub crack_shape: Option<String>,
  #[arg(long)]
  pub crack_count: Option<String>,
  #[arg(long)]
  pub peeling:     Option<bool>,
  #[arg(long)]
  pub seepage:     Option<bool>,
  #[arg(long)]
  pub remark:      Option<String>,
}

impl AnnotationArgs {
  /// Overlay the given flags onto `annotation`.
  pub fn apply(self, annotation: &mut Annotation) {
    let text = [
      (self.position, &mut annotation.position),
      (self.material, &mut annotation.material),
      (self.crack_width, &mut annotation.crack_width),
      (self.crack_shape, &mut annotation.crack_shape),
      (self.crack_count, &mut annotation.crack_count),
      (self.remark, &mut annotation.remark),
    ];
    for (value, slot) in text {
      if let Some(value) = value {
        *slot = value;
      }
    }
    if let Some(peeling) = self.peeling {
      annotation.peeling = peeling;
    }
    if let Some(seepage) = self.seepage {
      annotation.seepage = seepage;
    }
  }
}
