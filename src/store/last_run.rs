//! Run recorder - what the last run did, and what the documents looked like
//! before it

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::json::{load_json, read_raw, remove_if_exists, save_json, write_raw, StoreError};
use super::StorePaths;
use crate::game::ranking::{check_permutation, RankingError};
use crate::game::{DamageLog, RankingEntry};

/// Errors surfaced by revert
#[derive(Debug, thiserror::Error)]
pub enum RevertError {
    #[error("No last run to revert")]
    NoLastRun,

    #[error("Last run ranking is empty")]
    EmptyRanking,

    #[error("Last run artifact {} is corrupted: {reason}", path.display())]
    Corrupted { path: PathBuf, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RevertError {
    fn corrupted(path: &Path, reason: impl ToString) -> Self {
        Self::Corrupted {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Persists run artifacts and pre-run backups
#[derive(Debug, Clone)]
pub struct RunRecorder {
    paths: StorePaths,
}

impl RunRecorder {
    pub fn new(paths: StorePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Copy the live scoreboard and stats documents verbatim before a run
    /// mutates them. A document that does not exist leaves an `.absent`
    /// marker next to its backup instead. Backups from earlier runs are
    /// dropped first so a partial snapshot never pairs with a stale one.
    pub fn snapshot_state(&self) -> Result<(), StoreError> {
        for backup in [&self.paths.scoreboard_backup, &self.paths.stats_backup] {
            remove_if_exists(backup)?;
            remove_if_exists(&absent_marker(backup))?;
        }

        backup(&self.paths.scoreboard, &self.paths.scoreboard_backup)?;
        backup(&self.paths.stats, &self.paths.stats_backup)?;
        debug!("Captured pre-run backups");
        Ok(())
    }

    /// Persist the finished run's ranking, damage log and the number of the
    /// battle artifact it produced (`None` for quick fights)
    pub fn record(
        &self,
        ranking: &[RankingEntry],
        damage_log: &DamageLog,
        battle_number: Option<u64>,
    ) -> Result<(), StoreError> {
        save_json(&self.paths.last_run_ranking, ranking)?;
        save_json(&self.paths.last_run_damage, damage_log)?;
        save_json(&self.paths.last_run_battle, &battle_number)?;
        info!(participants = ranking.len(), ?battle_number, "Recorded last run");
        Ok(())
    }

    /// Battle artifact number of the last run, if it produced one
    pub fn battle_number(&self) -> Option<u64> {
        load_json::<Option<u64>>(&self.paths.last_run_battle)
    }

    /// Load and validate the last run's ranking
    pub fn load_ranking(&self) -> Result<Vec<RankingEntry>, RevertError> {
        let path = &self.paths.last_run_ranking;
        let bytes = read_raw(path)?.ok_or(RevertError::NoLastRun)?;
        let ranking: Vec<RankingEntry> =
            serde_json::from_slice(&bytes).map_err(|err| RevertError::corrupted(path, err))?;

        match check_permutation(&ranking) {
            Ok(()) => Ok(ranking),
            Err(RankingError::Empty) => Err(RevertError::EmptyRanking),
            Err(err) => Err(RevertError::corrupted(path, err)),
        }
    }

    /// Load the last run's damage log, validated against its ranking.
    /// A missing log reads as empty.
    pub fn load_damage_log(&self, ranking: &[RankingEntry]) -> Result<DamageLog, RevertError> {
        let path = &self.paths.last_run_damage;
        let Some(bytes) = read_raw(path)? else {
            return Ok(DamageLog::new());
        };
        let log: DamageLog =
            serde_json::from_slice(&bytes).map_err(|err| RevertError::corrupted(path, err))?;

        let names: HashSet<&str> = ranking.iter().map(|e| e.username.trim()).collect();
        for (attacker, defender, tally) in log.iter() {
            if !names.contains(attacker) || !names.contains(defender) {
                return Err(RevertError::corrupted(
                    path,
                    format!("{attacker} -> {defender} is not part of the ranking"),
                ));
            }
            if !tally.damage.is_finite() || tally.damage < 0.0 {
                return Err(RevertError::corrupted(
                    path,
                    format!("{attacker} -> {defender} has invalid damage {}", tally.damage),
                ));
            }
        }
        Ok(log)
    }

    /// Put the pre-run scoreboard back; false when no backup exists
    pub fn restore_scoreboard_backup(&self) -> Result<bool, StoreError> {
        restore(&self.paths.scoreboard_backup, &self.paths.scoreboard)
    }

    /// Put the pre-run stats back; false when no backup exists
    pub fn restore_stats_backup(&self) -> Result<bool, StoreError> {
        restore(&self.paths.stats_backup, &self.paths.stats)
    }

    /// Forget which run happened last, keeping the backups. Done before a
    /// new run touches anything, so a run that fails halfway never leaves
    /// the previous run's ranking paired with its own backups.
    pub fn discard_run(&self) -> Result<(), StoreError> {
        for path in [
            &self.paths.last_run_ranking,
            &self.paths.last_run_damage,
            &self.paths.last_run_battle,
        ] {
            remove_if_exists(path)?;
        }
        Ok(())
    }

    /// Drop every run artifact; a later revert reports `NoLastRun`
    pub fn clear(&self) -> Result<(), StoreError> {
        self.discard_run()?;
        for backup in [&self.paths.scoreboard_backup, &self.paths.stats_backup] {
            remove_if_exists(backup)?;
            remove_if_exists(&absent_marker(backup))?;
        }
        Ok(())
    }
}

/// `last_run_stats_backup.json` -> `last_run_stats_backup.absent`
fn absent_marker(backup: &Path) -> PathBuf {
    backup.with_extension("absent")
}

fn backup(live: &Path, backup: &Path) -> Result<(), StoreError> {
    match read_raw(live)? {
        Some(bytes) => write_raw(backup, &bytes),
        None => write_raw(&absent_marker(backup), b""),
    }
}

fn restore(backup: &Path, live: &Path) -> Result<bool, StoreError> {
    if let Some(bytes) = read_raw(backup)? {
        write_raw(live, &bytes)?;
        return Ok(true);
    }
    if absent_marker(backup).exists() {
        remove_if_exists(live)?;
        return Ok(true);
    }
    Ok(false)
}
