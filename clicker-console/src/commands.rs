use anyhow::{Context, Result, bail};
use chrono::Local;
use clicker_core::restore::preview;
use clicker_core::{
    LegacyFormat, MiniEventReward, RestoreError, SaveStore, Session, StoreConfig,
};
use colored::Colorize;
use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::report;
use crate::{Command, ResetTarget};

/// Secret achievement earned by using the developer console.
const CONSOLE_ACHIEVEMENT: &str = "console";
const BACKUP_FOLDER: &str = "backups";

/// Resolve the store from `--data-dir`/`--config`, falling back to the
/// environment-derived location.
pub fn open_store(data_dir: Option<&Path>, config: Option<&Path>) -> Result<SaveStore> {
    let config = match config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            StoreConfig::from_json(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => StoreConfig::default(),
    };
    let store = match data_dir {
        Some(dir) => SaveStore::at_with(dir, &config),
        None => SaveStore::from_env_with(&config),
    }
    .context("cannot open the save directory")?;
    debug!("using save directory {}", store.dir().display());
    Ok(store)
}

pub fn run(command: Command, store: SaveStore) -> Result<()> {
    match command {
        Command::Show { json } => show(store, json),
        Command::AddPoints { amount } => adjust(store, amount),
        Command::RemovePoints { amount } => adjust(store, -amount),
        Command::Click { count } => click(store, count),
        Command::Buy { id } => buy(store, &id),
        Command::Reset { target } => reset(store, target),
        Command::MiniEvent { seed } => mini_event(store, seed),
        Command::Restore { yes } => restore(store, yes),
        Command::Backup => backup(&store).map(|path| {
            println!("💾 Backup written to {}", path.display().to_string().green());
        }),
        Command::WriteLegacy { format } => write_legacy(store, format.into()),
    }
}

fn open(store: SaveStore) -> Result<Session<SaveStore>> {
    Session::open(store).context("failed to load the save")
}

fn persist(session: &mut Session<SaveStore>) -> Result<()> {
    session.save().context("failed to write the save")?;
    info!("saved score {}", session.model().score());
    Ok(())
}

/// Run `f` against the model and report any achievements it unlocked.
fn with_unlock_report<T>(
    session: &mut Session<SaveStore>,
    f: impl FnOnce(&mut Session<SaveStore>) -> Result<T>,
) -> Result<T> {
    let before: BTreeSet<String> = session.model().achievements().unlocked().clone();
    let value = f(session)?;
    let model = session.model();
    let gained: Vec<&String> = model.achievements().unlocked().difference(&before).collect();
    report::print_unlocks(model.achievements().registry(), &gained);
    Ok(value)
}

fn show(store: SaveStore, json: bool) -> Result<()> {
    let session = open(store)?;
    if json {
        let document = clicker_core::StateCodec::document(&session.model().snapshot());
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        report::print_state(session.model(), session.origin());
    }
    Ok(())
}

fn adjust(store: SaveStore, delta: i64) -> Result<()> {
    let mut session = open(store)?;
    let score = with_unlock_report(&mut session, |session| {
        let model = session.model_mut();
        model.unlock_secret(CONSOLE_ACHIEVEMENT);
        Ok(model.add_score(delta))
    })?;
    persist(&mut session)?;
    println!("Score: {}", score.to_string().bright_yellow().bold());
    Ok(())
}

fn click(store: SaveStore, count: u64) -> Result<()> {
    let mut session = open(store)?;
    let gained = with_unlock_report(&mut session, |session| {
        let model = session.model_mut();
        Ok((0..count).fold(0u64, |total, _| total.saturating_add(model.click())))
    })?;
    persist(&mut session)?;
    println!(
        "🖱️  {count} clicks earned {} points (score {})",
        gained.to_string().green(),
        session.model().score()
    );
    Ok(())
}

fn buy(store: SaveStore, id: &str) -> Result<()> {
    let mut session = open(store)?;
    let remaining = session
        .model_mut()
        .purchase(id)
        .with_context(|| format!("purchase of `{id}` refused"))?;
    persist(&mut session)?;
    println!(
        "🛒 Bought {} ({} points left)",
        id.bright_cyan(),
        remaining.to_string().bright_yellow()
    );
    Ok(())
}

fn reset(store: SaveStore, target: ResetTarget) -> Result<()> {
    let mut session = open(store)?;
    let model = session.model_mut();
    model.unlock_secret(CONSOLE_ACHIEVEMENT);
    if matches!(target, ResetTarget::Points | ResetTarget::All) {
        model.set_score(0);
    }
    if matches!(target, ResetTarget::Upgrades | ResetTarget::All) {
        model.reset_upgrades();
    }
    persist(&mut session)?;
    println!("🧹 Reset {target:?}; achievements kept");
    Ok(())
}

fn mini_event(store: SaveStore, seed: Option<u64>) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let reward = MiniEventReward::roll(&mut rng);
    let mut session = open(store)?;
    let outcome = with_unlock_report(&mut session, |session| {
        Ok(session.model_mut().record_mini_event(reward))
    })?;
    persist(&mut session)?;
    match (&outcome.upgrade, reward) {
        (Some(id), _) => println!("🎁 Mini event (seed {seed}) granted upgrade {}", id.bright_cyan()),
        (None, MiniEventReward::Upgrade) => {
            println!("🎁 Mini event (seed {seed}) rolled an upgrade, but all are owned");
        }
        (None, MiniEventReward::Points(_)) => println!(
            "✨ Mini event (seed {seed}) granted {} points",
            outcome.points.to_string().green()
        ),
    }
    Ok(())
}

fn restore(store: SaveStore, yes: bool) -> Result<()> {
    if !yes {
        let (format, state) = preview(&store).map_err(describe_restore_error)?;
        report::print_restore_preview(format, &state);
        println!("Run again with {} to apply it.", "--yes".bold());
        return Ok(());
    }
    let mut session = open(store)?;
    session.request_restore()?;
    let report = session.confirm_restore().map_err(describe_restore_error)?;
    report::print_restore_report(&report);
    if !report.persisted {
        bail!("backup was applied but the save could not be written; the backup was kept");
    }
    Ok(())
}

fn describe_restore_error(err: RestoreError) -> anyhow::Error {
    match err {
        RestoreError::Decode { attempts } => {
            let details = attempts
                .iter()
                .map(|(format, reason)| format!("{format}: {reason}"))
                .collect::<Vec<_>>()
                .join("; ");
            anyhow::anyhow!("legacy backup matched none of the known formats ({details})")
        }
        other => other.into(),
    }
}

fn backup(store: &SaveStore) -> Result<PathBuf> {
    if !store.save_path().is_file() {
        bail!("no save at {} to back up", store.save_path().display());
    }
    let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let folder = store.dir().join(BACKUP_FOLDER).join(format!("backup_{stamp}"));
    fs::create_dir_all(&folder)
        .with_context(|| format!("failed to create {}", folder.display()))?;
    let file_name = store
        .save_path()
        .file_name()
        .context("save path has no file name")?;
    let target = folder.join(file_name);
    fs::copy(store.save_path(), &target)
        .with_context(|| format!("failed to copy the save to {}", target.display()))?;
    Ok(target)
}

fn write_legacy(store: SaveStore, format: LegacyFormat) -> Result<()> {
    let key = store.codec().key();
    let session = open(store)?;
    let bytes = format.encode(&session.model().snapshot(), key);
    session
        .storage()
        .write_backup(&bytes)
        .context("failed to write the legacy backup")?;
    println!(
        "📦 Wrote {format} backup to {}",
        session.storage().backup_path().display()
    );
    Ok(())
}
