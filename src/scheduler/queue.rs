//! Plan queue persistence (spec.md §4.5, §5, §6.4): a JSON array written
//! atomically (temp file + rename), read-modify-write under a scoped lock.

use std::path::{Path, PathBuf};

use solana_sdk::pubkey::Pubkey;
use tokio::sync::Mutex;

use crate::error::SchedulerError;
use crate::state::plan::{Plan, PLAN_VERSION};

pub struct PlanQueue {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PlanQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_unlocked(path: &Path) -> Result<Vec<Plan>, SchedulerError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| SchedulerError::Io(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(SchedulerError::Io(e.to_string())),
        }
    }

    async fn write_unlocked(path: &Path, plans: &[Plan]) -> Result<(), SchedulerError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SchedulerError::Io(e.to_string()))?;
        }
        let tmp_path = path.with_extension("tmp");
        let bytes =
            serde_json::to_vec_pretty(plans).map_err(|e| SchedulerError::Io(e.to_string()))?;
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| SchedulerError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| SchedulerError::Io(e.to_string()))
    }

    pub async fn load(&self) -> Result<Vec<Plan>, SchedulerError> {
        let _guard = self.lock.lock().await;
        let plans = Self::read_unlocked(&self.path).await?;
        for plan in &plans {
            if !plan.is_supported_version() {
                return Err(SchedulerError::LegacyPlan(plan.version, PLAN_VERSION));
            }
        }
        Ok(plans)
    }

    pub async fn save(&self, plans: &[Plan]) -> Result<(), SchedulerError> {
        let _guard = self.lock.lock().await;
        Self::write_unlocked(&self.path, plans).await
    }

    /// Update a named subset of entries in place without disturbing
    /// untouched ones (spec.md §4.5 `refreshSubset`).
    pub async fn refresh_subset(&self, updates: Vec<Plan>) -> Result<(), SchedulerError> {
        let _guard = self.lock.lock().await;
        let mut plans = Self::read_unlocked(&self.path).await?;
        let mut by_obligation: std::collections::HashMap<Pubkey, Plan> =
            updates.into_iter().map(|p| (p.obligation, p)).collect();

        for plan in &mut plans {
            if let Some(updated) = by_obligation.remove(&plan.obligation) {
                *plan = updated;
            }
        }
        plans.extend(by_obligation.into_values());

        Self::write_unlocked(&self.path, &plans).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan(obligation: Pubkey, amount_ui: f64) -> Plan {
        Plan {
            version: PLAN_VERSION,
            obligation,
            repay_mint: Pubkey::new_unique(),
            seize_mint: Pubkey::new_unique(),
            repay_reserve: Pubkey::new_unique(),
            collateral_reserve: Pubkey::new_unique(),
            amount_ui,
            repay_decimals: 6,
            seize_decimals: 9,
            created_at_unix: 1_700_000_000,
            liquidation_eligible: true,
        }
    }

    #[tokio::test]
    async fn round_trips_through_save_and_load() {
        let dir = std::env::temp_dir().join(format!("plan-queue-test-{}", Pubkey::new_unique()));
        let queue = PlanQueue::new(dir.join("plans.json"));
        let obligation = Pubkey::new_unique();
        queue.save(&[sample_plan(obligation, 12.5)]).await.unwrap();
        let loaded = queue.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].obligation, obligation);
        tokio::fs::remove_file(dir.join("plans.json")).await.ok();
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let dir = std::env::temp_dir().join(format!("plan-queue-missing-{}", Pubkey::new_unique()));
        let queue = PlanQueue::new(dir.join("plans.json"));
        let loaded = queue.load().await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn refresh_subset_leaves_untouched_entries_alone() {
        let dir = std::env::temp_dir().join(format!("plan-queue-refresh-{}", Pubkey::new_unique()));
        let path = dir.join("plans.json");
        let queue = PlanQueue::new(&path);
        let obligation_a = Pubkey::new_unique();
        let obligation_b = Pubkey::new_unique();
        queue
            .save(&[sample_plan(obligation_a, 1.0), sample_plan(obligation_b, 2.0)])
            .await
            .unwrap();

        queue
            .refresh_subset(vec![sample_plan(obligation_a, 99.0)])
            .await
            .unwrap();

        let loaded = queue.load().await.unwrap();
        let a = loaded.iter().find(|p| p.obligation == obligation_a).unwrap();
        let b = loaded.iter().find(|p| p.obligation == obligation_b).unwrap();
        assert_eq!(a.amount_ui, 99.0);
        assert_eq!(b.amount_ui, 2.0);
        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn legacy_plan_version_is_rejected_on_load() {
        let dir = std::env::temp_dir().join(format!("plan-queue-legacy-{}", Pubkey::new_unique()));
        let path = dir.join("plans.json");
        let mut plan = sample_plan(Pubkey::new_unique(), 1.0);
        plan.version = 1;
        let queue = PlanQueue::new(&path);
        queue.save(&[plan]).await.unwrap();
        assert!(matches!(
            queue.load().await,
            Err(SchedulerError::LegacyPlan(1, PLAN_VERSION))
        ));
        tokio::fs::remove_file(&path).await.ok();
    }
}
