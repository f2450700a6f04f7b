//! `survey` — command-line front end for the site survey store.
//!
//! # Usage
//!
//! ```
//! survey case add --number 113-001 --name 捷運沿線鑑定
//! survey address add --case <ID> --address 台中市西區民權路1號
//! survey photo add --address <ID> --original a.jpg --watermarked a_wm.jpg --seepage true
//! survey export --address <ID>
//! survey watch photo --parent <ID>
//! ```

mod args;
mod output;
mod settings;

use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow};
use args::{AddressCommand, CaseCommand, Cli, Command, PhotoCommand, non_blank};
use clap::Parser;
use output::{Summary, print_json, print_list, print_one};
use serde::Serialize;
use settings::Settings;
use survey_core::{
  address::{AddressUpdate, BuildingSurvey, NewAddress},
  case::{CaseUpdate, NewCase},
  entity::Entity,
  photo::{Annotation, NewPhoto, PhotoUpdate},
  store::SurveyStore,
};
use survey_report::{ExportOutcome, Exporter};
use survey_store_sqlite::{Snapshot, SqliteStore, Watch};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr so `--json` output stays parseable.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  if let Some(dir) = settings.store_path.parent()
    && !dir.as_os_str().is_empty()
  {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create {}", dir.display()))?;
  }
  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;

  match cli.command {
    Command::Case(cmd) => case(&store, cmd, cli.json).await,
    Command::Address(cmd) => address(&store, cmd, cli.json).await,
    Command::Photo(cmd) => photo(&store, cmd, cli.json).await,
    Command::Export { address } => export(&store, settings, address, cli.json).await,
    Command::Watch { entity, parent } => watch(&store, entity, parent, cli.json).await,
  }
}

fn deleted(what: &str, id: Uuid, addresses: u32, photos: u32) {
  println!("deleted {what} {id} ({addresses} addresses, {photos} photos)");
}

// ─── Cases ───────────────────────────────────────────────────────────────────

async fn case(store: &SqliteStore, cmd: CaseCommand, json: bool) -> Result<()> {
  match cmd {
    CaseCommand::Add { number, name, date } => {
      let case = store
        .add_case(NewCase {
          case_number: number,
          case_name:   name.and_then(non_blank),
          case_date:   date.and_then(non_blank),
        })
        .await
        .context("failed to add case")?;
      print_one(&case, json)
    }

    CaseCommand::List => print_list(&store.list_cases().await?, json),

    CaseCommand::Show { id } => {
      let case = store
        .get_case(id)
        .await?
        .ok_or_else(|| anyhow!("case {id} not found"))?;
      let stats = store.case_stats(id).await?;
      if json {
        #[derive(Serialize)]
        struct Shown<'a> {
          #[serde(flatten)]
          case:  &'a survey_core::case::Case,
          stats: survey_core::case::CaseStats,
        }
        return print_json(&Shown { case: &case, stats });
      }
      println!("{}", case.summary());
      println!("{} addresses, {} photos", stats.addresses, stats.photos);
      Ok(())
    }

    CaseCommand::Update { id, number, name, date } => {
      let current = store
        .get_case(id)
        .await?
        .ok_or_else(|| anyhow!("case {id} not found"))?;
      let mut update = CaseUpdate::from_case(&current);
      if let Some(number) = number {
        update.case_number = number;
      }
      if let Some(name) = name {
        update.case_name = non_blank(name);
      }
      if let Some(date) = date {
        update.case_date = non_blank(date);
      }
      let case = store.update_case(update).await.context("failed to update case")?;
      print_one(&case, json)
    }

    CaseCommand::Delete { id } => {
      let cascade = store.delete_case(id).await?;
      if json {
        return print_json(&cascade);
      }
      deleted("case", id, cascade.addresses, cascade.photos);
      Ok(())
    }
  }
}

// ─── Addresses ───────────────────────────────────────────────────────────────

async fn address(store: &SqliteStore, cmd: AddressCommand, json: bool) -> Result<()> {
  match cmd {
    AddressCommand::Add { case_id, address, survey: flags } => {
      let mut survey = BuildingSurvey::default();
      flags.apply(&mut survey)?;
      let address = store
        .add_address(NewAddress { survey, ..NewAddress::new(case_id, address) })
        .await
        .context("failed to add address")?;
      print_one(&address, json)
    }

    AddressCommand::List { case_id } => print_list(&store.list_addresses(case_id).await?, json),

    AddressCommand::Show { id } => {
      let address = store
        .get_address(id)
        .await?
        .ok_or_else(|| anyhow!("address {id} not found"))?;
      let photos = store.photo_count(id).await?;
      let next = store.next_sequence(id).await?;
      if json {
        #[derive(Serialize)]
        struct Shown<'a> {
          #[serde(flatten)]
          address:       &'a survey_core::address::Address,
          photos:        u32,
          next_sequence: u32,
        }
        return print_json(&Shown { address: &address, photos, next_sequence: next });
      }
      println!("{}", address.summary());
      println!("{photos} photos, next sequence {next:02}");
      Ok(())
    }

    AddressCommand::Update { id, address, survey } => {
      let current = store
        .get_address(id)
        .await?
        .ok_or_else(|| anyhow!("address {id} not found"))?;
      let mut update = AddressUpdate::from_address(&current);
      if let Some(address) = address {
        update.address = address;
      }
      survey.apply(&mut update.survey)?;
      let address = store.update_address(update).await.context("failed to update address")?;
      print_one(&address, json)
    }

    AddressCommand::Delete { id } => {
      let cascade = store.delete_address(id).await?;
      if json {
        return print_json(&cascade);
      }
      deleted("address", id, cascade.addresses, cascade.photos);
      Ok(())
    }
  }
}

// ─── Photos ──────────────────────────────────────────────────────────────────

async fn photo(store: &SqliteStore, cmd: PhotoCommand, json: bool) -> Result<()> {
  match cmd {
    PhotoCommand::Add { address, original, watermarked, thumbnail, annotation: flags } => {
      let mut annotation = Annotation::default();
      flags.apply(&mut annotation);

      let mut input = NewPhoto::new(address, original);
      if let Some(path) = watermarked {
        input = input.watermarked(path);
      }
      input.thumbnail_path = thumbnail;
      input.annotation = annotation;

      let photo = store.add_photo(input).await.context("failed to add photo")?;
      print_one(&photo, json)
    }

    PhotoCommand::List { address } => print_list(&store.list_photos(address).await?, json),

    PhotoCommand::Show { id } => {
      let photo = store
        .get_photo(id)
        .await?
        .ok_or_else(|| anyhow!("photo {id} not found"))?;
      print_one(&photo, json)
    }

    PhotoCommand::Update { id, thumbnail, annotation: flags } => {
      let current = store
        .get_photo(id)
        .await?
        .ok_or_else(|| anyhow!("photo {id} not found"))?;
      let mut annotation = current.annotation;
      flags.apply(&mut annotation);
      let photo = store
        .update_photo(PhotoUpdate {
          photo_id: id,
          annotation,
          thumbnail_path: thumbnail.or(current.thumbnail_path),
        })
        .await
        .context("failed to update photo")?;
      print_one(&photo, json)
    }

    PhotoCommand::Resequence { id, sequence } => {
      let photo = store
        .update_sequence(id, sequence)
        .await
        .context("failed to change sequence")?;
      print_one(&photo, json)
    }

    PhotoCommand::Delete { id } => {
      store.delete_photo(id).await?;
      println!("deleted photo {id}");
      Ok(())
    }
  }
}

// ─── Export ──────────────────────────────────────────────────────────────────

async fn export(store: &SqliteStore, settings: Settings, address_id: Uuid, json: bool) -> Result<()> {
  let exporter = Arc::new(Exporter::new(settings.report).context("invalid report settings")?);

  let address = store
    .get_address(address_id)
    .await?
    .ok_or_else(|| anyhow!("address {address_id} not found"))?;
  let photos = store.list_photos(address_id).await?;

  match exporter.export(address, photos).await.context("export failed")? {
    ExportOutcome::Written(report) if json => print_json(&report),
    ExportOutcome::Written(report) => {
      println!("{}", report.path.display());
      if report.missing_images > 0 {
        println!("{} of {} images could not be read", report.missing_images, report.photos);
      }
      Ok(())
    }
    ExportOutcome::NothingToExport => {
      println!("nothing to export");
      Ok(())
    }
  }
}

// ─── Watch ───────────────────────────────────────────────────────────────────

async fn watch(store: &SqliteStore, entity: Entity, parent: Option<Uuid>, json: bool) -> Result<()> {
  let require_parent =
    |what: &str| parent.ok_or_else(|| anyhow!("watching {what} needs --parent"));
  match entity {
    Entity::Case => follow(store.watch_cases(), json).await,
    Entity::Address => follow(store.watch_addresses(require_parent("addresses")?), json).await,
    Entity::Photo => follow(store.watch_photos(require_parent("photos")?), json).await,
  }
}

/// Print snapshots until interrupted.
async fn follow<T: Snapshot + Serialize + Summary>(mut watch: Watch<T>, json: bool) -> Result<()> {
  loop {
    tokio::select! {
      snapshot = watch.next() => {
        let snapshot = snapshot.context("watch failed")?;
        if !json {
          println!("── {} rows ──", snapshot.len());
        }
        print_list(&snapshot, json)?;
      }
      _ = tokio::signal::ctrl_c() => break,
    }
  }
  tracing::debug!(scope = ?watch.scope(), "watch stopped");
  Ok(())
}
