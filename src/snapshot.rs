// src/snapshot.rs - The assembled telemetry document
use serde::{Deserialize, Serialize};

/// Reachability of the machine controller, decided by the status query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineStatus {
    Online,
    #[default]
    Offline,
}

impl std::fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineStatus::Online => write!(f, "Online"),
            MachineStatus::Offline => write!(f, "Offline"),
        }
    }
}

/// Actual axis positions. Always exactly X, Y and Z.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisPositions {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "Z")]
    pub z: f64,
}

/// One consistent telemetry document, assembled from a single poll cycle.
///
/// When `machine_status` is `Offline`, every other field holds its type
/// default; the remaining fields are populated only when the controller is
/// reachable. The document is never mutated after assembly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSnapshot {
    pub machine_status: MachineStatus,
    pub power_on_time: String,
    pub machine_mode: String,
    pub machine_program_status: String,
    pub total_part_count: i64,
    pub previous_cycle_time: String,
    pub last_cycle_time: String,
    pub motion_time: String,
    pub current_tool_number_in_use: i64,
    pub total_number_of_tool_changes: i64,
    pub spindle_speed: f64,
    pub axis_actual_positions: AxisPositions,
}

impl MachineSnapshot {
    /// Document for an unreachable machine: status only, everything else
    /// at its type default.
    pub fn offline() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_snapshot_holds_type_defaults() {
        let snapshot = MachineSnapshot::offline();
        assert_eq!(snapshot.machine_status, MachineStatus::Offline);
        assert_eq!(snapshot.power_on_time, "");
        assert_eq!(snapshot.machine_mode, "");
        assert_eq!(snapshot.machine_program_status, "");
        assert_eq!(snapshot.total_part_count, 0);
        assert_eq!(snapshot.current_tool_number_in_use, 0);
        assert_eq!(snapshot.total_number_of_tool_changes, 0);
        assert_eq!(snapshot.spindle_speed, 0.0);
        assert_eq!(snapshot.axis_actual_positions, AxisPositions::default());
    }

    #[test]
    fn test_document_field_names() {
        let json = serde_json::to_value(MachineSnapshot::default()).unwrap();
        let document = json.as_object().unwrap();

        let expected = [
            "machineStatus",
            "powerOnTime",
            "machineMode",
            "machineProgramStatus",
            "totalPartCount",
            "previousCycleTime",
            "lastCycleTime",
            "motionTime",
            "currentToolNumberInUse",
            "totalNumberOfToolChanges",
            "spindleSpeed",
            "axisActualPositions",
        ];
        assert_eq!(document.len(), expected.len());
        for key in expected {
            assert!(document.contains_key(key), "missing key {key}");
        }

        assert_eq!(json["machineStatus"], "Offline");

        let axes = json["axisActualPositions"].as_object().unwrap();
        assert_eq!(axes.len(), 3);
        for axis in ["X", "Y", "Z"] {
            assert!(axes.contains_key(axis), "missing axis {axis}");
        }
    }

    #[test]
    fn test_status_display() {
        assert_eq!(MachineStatus::Online.to_string(), "Online");
        assert_eq!(MachineStatus::Offline.to_string(), "Offline");
    }
}
