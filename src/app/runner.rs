//! Battle runner - runs, quick runs, reverts and the leaderboard

use std::path::PathBuf;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::AppState;
use crate::game::snapshot::FrameSnapshot;
use crate::game::{
    BattleError, BattleMatch, DamageLog, Participant, QuickConfig, QuickFight, RankingEntry,
};
use crate::render::{FrameRenderer, JsonLinesRenderer, RenderError, RenderHeader, RosterCard};
use crate::store::last_run::RevertError;
use crate::store::scoreboard::{leaderboard, LeaderboardRow};
use crate::store::{AvatarStore, StoreError};
use crate::util::time::{playback_seconds, unix_secs, Timer};

/// Errors from a run
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Battle(#[from] BattleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct BattleOutcome {
    pub run_id: Uuid,
    pub ranking: Vec<RankingEntry>,
    pub damage_log: DamageLog,
    /// Empty for quick runs
    pub frames: Vec<FrameSnapshot>,
    pub champion: Option<String>,
    pub battle_number: Option<u64>,
    pub video_path: Option<PathBuf>,
    /// True when the step cap ended the fight with several survivors
    pub capped: bool,
}

/// How one document was walked back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertStrategy {
    /// Pre-run copy restored verbatim
    Snapshot,
    /// Run contribution subtracted
    Analytic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevertReport {
    pub participants: usize,
    pub scoreboard: RevertStrategy,
    pub stats: RevertStrategy,
    pub removed_artifact: Option<PathBuf>,
}

/// Drives runs against one environment's stores
pub struct BattleRunner<R = ChaCha8Rng> {
    state: AppState,
    rng: R,
    renderer: Box<dyn FrameRenderer>,
}

impl BattleRunner<ChaCha8Rng> {
    /// Runner seeded from the configured seed, or from entropy
    pub fn new(state: AppState) -> Self {
        let rng = match state.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(state, rng)
    }
}

impl<R: Rng> BattleRunner<R> {
    pub fn with_rng(state: AppState, rng: R) -> Self {
        Self {
            state,
            rng,
            renderer: Box::new(JsonLinesRenderer),
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn FrameRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Animated battle: simulate, render the artifact, then update the
    /// ledger, stats and last-run documents
    pub fn run(&mut self, participants: &[Participant]) -> Result<BattleOutcome, RunError> {
        let run_id = Uuid::new_v4();
        let timer = Timer::new();
        let config = self.state.config.battle.clone();

        let cosmetics = self.state.cosmetics();
        let battle = BattleMatch::new(config.clone(), participants, &cosmetics, &mut self.rng)?;
        info!(%run_id, fighters = battle.fighters().len(), "Battle starting");

        let cards: Vec<RosterCard> = battle
            .fighters()
            .iter()
            .map(|fighter| RosterCard {
                username: fighter.username.clone(),
                has_avatar: self.state.avatars.has_avatar(&fighter.username),
                effect: fighter.effect.clone(),
            })
            .collect();

        let result = battle.run(&mut self.rng);
        if result.capped {
            warn!(%run_id, steps = result.steps, "Step cap reached, survivors ranked by health");
        }

        let archive = self.state.archive(self.renderer.extension());
        let battle_number = archive.next_battle_number();
        let video_path = archive.path_for(battle_number);
        let header = RenderHeader::new(battle_number, config.fps, config.width, config.height, cards);
        self.renderer.render(&header, &result.frames, &video_path)?;

        self.persist(&result.ranking, &result.damage_log, Some(battle_number))?;

        info!(
            %run_id,
            battle = battle_number,
            winner = result.champion.as_deref().unwrap_or_default(),
            steps = result.steps,
            playback_secs = playback_seconds(result.frames.len(), config.fps),
            elapsed_ms = timer.elapsed_ms(),
            "Battle finished"
        );

        Ok(BattleOutcome {
            run_id,
            ranking: result.ranking,
            damage_log: result.damage_log,
            frames: result.frames,
            champion: result.champion,
            battle_number: Some(battle_number),
            video_path: Some(video_path),
            capped: result.capped,
        })
    }

    /// Non-animated run: random pairings, no artifact, same bookkeeping
    pub fn quick_run(&mut self, participants: &[Participant]) -> Result<BattleOutcome, RunError> {
        let run_id = Uuid::new_v4();
        let config = QuickConfig {
            max_fighters: self.state.config.battle.max_fighters,
            ..QuickConfig::default()
        };
        let fight = QuickFight::new(config, participants)?;
        info!(%run_id, fighters = fight.fighter_count(), "Quick fight starting");

        let outcome = fight.run(&mut self.rng);
        if outcome.capped {
            warn!(%run_id, exchanges = outcome.exchanges, "Exchange cap reached");
        }
        self.persist(&outcome.ranking, &outcome.damage_log, None)?;

        let champion = outcome.ranking.first().map(|entry| entry.username.clone());
        info!(
            %run_id,
            winner = champion.as_deref().unwrap_or_default(),
            exchanges = outcome.exchanges,
            "Quick fight finished"
        );

        Ok(BattleOutcome {
            run_id,
            ranking: outcome.ranking,
            damage_log: outcome.damage_log,
            frames: Vec::new(),
            champion,
            battle_number: None,
            video_path: None,
            capped: outcome.capped,
        })
    }

    /// Snapshot, then write the ledger, stats and last-run documents. The
    /// previous run's record is dropped first; if any write fails the
    /// pre-run documents are put back and nothing is left to revert.
    fn persist(
        &self,
        ranking: &[RankingEntry],
        damage_log: &DamageLog,
        battle_number: Option<u64>,
    ) -> Result<(), StoreError> {
        let recorder = &self.state.recorder;
        recorder.discard_run()?;
        if let Err(err) = recorder.snapshot_state() {
            warn!(error = %err, "Pre-run snapshot failed, revert will subtract instead");
        }

        let written = self
            .state
            .scoreboard
            .record_run(ranking)
            .and_then(|_| self.state.stats.record_battle(ranking, damage_log, unix_secs()))
            .and_then(|_| recorder.record(ranking, damage_log, battle_number));
        if let Err(err) = written {
            warn!(error = %err, "Persisting the run failed, restoring pre-run documents");
            self.roll_back();
            return Err(err);
        }
        Ok(())
    }

    /// Best effort: put back whatever the snapshot captured and forget the run
    fn roll_back(&self) {
        let recorder = &self.state.recorder;
        for (document, restored) in [
            ("scoreboard", recorder.restore_scoreboard_backup()),
            ("stats", recorder.restore_stats_backup()),
        ] {
            match restored {
                Ok(true) => {}
                Ok(false) => warn!(document, "No pre-run backup to restore"),
                Err(err) => warn!(document, error = %err, "Failed to restore pre-run backup"),
            }
        }
        if let Err(err) = recorder.clear() {
            warn!(error = %err, "Failed to clear last-run documents");
        }
    }

    /// Undo the most recent run
    pub fn revert(&mut self) -> Result<RevertReport, RevertError> {
        let recorder = &self.state.recorder;
        let ranking = recorder.load_ranking()?;
        let damage_log = recorder.load_damage_log(&ranking)?;

        let scoreboard = if recorder.restore_scoreboard_backup()? {
            RevertStrategy::Snapshot
        } else {
            self.state.scoreboard.revert_run(&ranking)?;
            RevertStrategy::Analytic
        };
        let stats = if recorder.restore_stats_backup()? {
            RevertStrategy::Snapshot
        } else {
            self.state.stats.revert_battle(&ranking, &damage_log)?;
            RevertStrategy::Analytic
        };

        let removed_artifact = self.remove_run_artifact();
        recorder.clear()?;

        info!(
            participants = ranking.len(),
            scoreboard = ?scoreboard,
            stats = ?stats,
            artifact = ?removed_artifact,
            "Last run reverted"
        );

        Ok(RevertReport {
            participants: ranking.len(),
            scoreboard,
            stats,
            removed_artifact,
        })
    }

    /// Remove the newest battle artifact if the last run is the one that
    /// wrote it
    fn remove_run_artifact(&self) -> Option<PathBuf> {
        let number = self.state.recorder.battle_number()?;
        let archive = self.state.archive(self.renderer.extension());
        let (latest, _) = archive.latest()?;
        if latest != number {
            warn!(recorded = number, latest, "Newest artifact is not from the last run, keeping it");
            return None;
        }
        match archive.remove_latest() {
            Ok(path) => path,
            Err(err) => {
                warn!(error = %err, "Failed to remove battle artifact");
                None
            }
        }
    }

    /// Standings, best first; `limit` of `None` returns everyone
    pub fn leaderboard(&self, limit: Option<usize>) -> Vec<LeaderboardRow> {
        let mut rows = leaderboard(&self.state.scoreboard.load(), &self.state.stats.load());
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        rows
    }
}
