// src/collector.rs - One status probe plus the per-field query fan-out
use crate::dispatcher::{DispatchError, QueryDispatcher};
use crate::interpret::{self, CountFieldRule, StrFieldRule};
use crate::snapshot::{AxisPositions, MachineSnapshot, MachineStatus};

/// Status query issued before anything else in a poll cycle.
pub const STATUS_COMMAND: &str = "Q100";

// Macro variable ids for the derived fields.
const AXIS_X_VARIABLE: u32 = 5041;
const AXIS_Y_VARIABLE: u32 = 5042;
const AXIS_Z_VARIABLE: u32 = 5043;
const SPINDLE_SPEED_VARIABLE: u32 = 3027;

/// Assembles telemetry snapshots by dispatching one query per field.
///
/// The collector does not synchronize access to the serial endpoint; run
/// it behind the [`worker`](crate::worker) when more than one caller is
/// involved.
pub struct MachineDataCollector<D> {
    dispatcher: D,
}

impl<D: QueryDispatcher> MachineDataCollector<D> {
    pub fn new(dispatcher: D) -> Self {
        Self { dispatcher }
    }

    /// Probe the controller with the status query alone. Unlike
    /// [`snapshot`](Self::snapshot), a fatal transport failure here is
    /// surfaced to the caller.
    pub async fn query_status(&self) -> Result<MachineStatus, DispatchError> {
        let response = self.dispatcher.query(STATUS_COMMAND).await?;
        Ok(interpret::machine_status(&response))
    }

    /// Read one macro variable, checking the controller's echo of the id.
    pub async fn query_variable(&self, id: u32) -> Result<String, DispatchError> {
        let response = self.dispatcher.query(&format!("Q600 {id}")).await?;
        Ok(interpret::variable(&response, id))
    }

    /// Assemble one full telemetry document.
    ///
    /// Offline machines short-circuit after the status query; nothing else
    /// is dispatched. Any fatal dispatch failure degrades to the default
    /// document instead of propagating, so a bad poll cycle never reaches
    /// the caller as an error.
    pub async fn snapshot(&self) -> MachineSnapshot {
        match self.try_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("snapshot assembly failed, reporting default document: {}", e);
                MachineSnapshot::default()
            }
        }
    }

    async fn try_snapshot(&self) -> Result<MachineSnapshot, DispatchError> {
        let status = self.query_status().await?;
        if status == MachineStatus::Offline {
            tracing::debug!("machine offline, skipping field queries");
            return Ok(MachineSnapshot::offline());
        }

        Ok(MachineSnapshot {
            machine_status: status,
            power_on_time: self.str_field(&interpret::POWER_ON_TIME).await?,
            machine_mode: self.str_field(&interpret::MODE).await?,
            machine_program_status: self.str_field(&interpret::PROGRAM_STATUS).await?,
            total_part_count: self.total_part_count().await?,
            previous_cycle_time: self.str_field(&interpret::PREVIOUS_CYCLE_TIME).await?,
            last_cycle_time: self.str_field(&interpret::LAST_CYCLE_TIME).await?,
            motion_time: self.str_field(&interpret::MOTION_TIME).await?,
            current_tool_number_in_use: self.count_field(&interpret::CURRENT_TOOL).await?,
            total_number_of_tool_changes: self.count_field(&interpret::TOOL_CHANGES).await?,
            spindle_speed: self.spindle_speed().await?,
            axis_actual_positions: self.axis_positions().await?,
        })
    }

    async fn str_field(&self, rule: &StrFieldRule) -> Result<String, DispatchError> {
        let response = self.dispatcher.query(rule.command).await?;
        Ok(rule.apply(&response))
    }

    async fn count_field(&self, rule: &CountFieldRule) -> Result<i64, DispatchError> {
        let response = self.dispatcher.query(rule.command).await?;
        Ok(rule.apply(&response))
    }

    /// Sum of the two M30 counters; either side falling back contributes 0
    /// without aborting the sum.
    async fn total_part_count(&self) -> Result<i64, DispatchError> {
        let first = self.count_field(&interpret::PART_COUNT_M30_1).await?;
        let second = self.count_field(&interpret::PART_COUNT_M30_2).await?;
        Ok(first + second)
    }

    async fn spindle_speed(&self) -> Result<f64, DispatchError> {
        let raw = self.query_variable(SPINDLE_SPEED_VARIABLE).await?;
        Ok(interpret::spindle_speed(&raw))
    }

    /// Each axis is read and parsed independently; one bad axis defaults
    /// only itself to 0.0.
    async fn axis_positions(&self) -> Result<AxisPositions, DispatchError> {
        Ok(AxisPositions {
            x: interpret::axis_position(&self.query_variable(AXIS_X_VARIABLE).await?),
            y: interpret::axis_position(&self.query_variable(AXIS_Y_VARIABLE).await?),
            z: interpret::axis_position(&self.query_variable(AXIS_Z_VARIABLE).await?),
        })
    }
}
