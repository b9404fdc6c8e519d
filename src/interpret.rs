// src/interpret.rs - Pure interpreters for Q-code replies
//
// Every interpreter is total: malformed or missing tokens map to the
// field's documented fallback, never to an error. The per-field
// "validate, extract, fallback" shapes are table entries executed through
// one generic apply routine.
use crate::dispatcher::RawResponse;
use crate::snapshot::MachineStatus;

/// Sentinel for string fields the controller gave no usable reply for.
pub const NO_DATA: &str = "NO_DATA";

/// A string-valued field: one Q-code, one interpretation, one fallback.
pub struct StrFieldRule {
    pub command: &'static str,
    pub fallback: &'static str,
    interpret: fn(&RawResponse) -> Option<String>,
}

impl StrFieldRule {
    pub fn apply(&self, response: &RawResponse) -> String {
        (self.interpret)(response).unwrap_or_else(|| self.fallback.to_string())
    }
}

/// An integer-valued field with a label check on the first token.
pub struct CountFieldRule {
    pub command: &'static str,
    pub label: &'static str,
    pub fallback: i64,
}

impl CountFieldRule {
    pub fn apply(&self, response: &RawResponse) -> i64 {
        labeled_count(response, self.label).unwrap_or(self.fallback)
    }
}

pub const POWER_ON_TIME: StrFieldRule = StrFieldRule {
    command: "Q300",
    fallback: NO_DATA,
    interpret: second_token,
};

pub const MOTION_TIME: StrFieldRule = StrFieldRule {
    command: "Q301",
    fallback: NO_DATA,
    interpret: second_token,
};

pub const LAST_CYCLE_TIME: StrFieldRule = StrFieldRule {
    command: "Q303",
    fallback: NO_DATA,
    interpret: second_token,
};

pub const PREVIOUS_CYCLE_TIME: StrFieldRule = StrFieldRule {
    command: "Q304",
    fallback: NO_DATA,
    interpret: second_token,
};

pub const MODE: StrFieldRule = StrFieldRule {
    command: "Q104",
    fallback: NO_DATA,
    interpret: mode,
};

pub const PROGRAM_STATUS: StrFieldRule = StrFieldRule {
    command: "Q500",
    fallback: NO_DATA,
    interpret: program_status,
};

pub const TOOL_CHANGES: CountFieldRule = CountFieldRule {
    command: "Q200",
    label: "TOOL CHANGES",
    fallback: -1,
};

pub const CURRENT_TOOL: CountFieldRule = CountFieldRule {
    command: "Q201",
    label: "USING TOOL",
    fallback: -1,
};

pub const PART_COUNT_M30_1: CountFieldRule = CountFieldRule {
    command: "Q402",
    label: "M30 #1",
    fallback: 0,
};

pub const PART_COUNT_M30_2: CountFieldRule = CountFieldRule {
    command: "Q403",
    label: "M30 #2",
    fallback: 0,
};

/// Status query (`Q100`): any reply with more than one token means the
/// controller answered; silence or a lone fragment means unreachable.
pub fn machine_status(response: &RawResponse) -> MachineStatus {
    if response.len() > 1 {
        MachineStatus::Online
    } else {
        MachineStatus::Offline
    }
}

/// Macro variable reply (`Q600 <id>`): the controller echoes the variable
/// id as the second token; a mismatched echo means the value belongs to
/// some other query and is discarded.
pub fn variable(response: &RawResponse, id: u32) -> String {
    match (response.token(1), response.token(2)) {
        (Some(echo), Some(value)) if echo == id.to_string() => value.to_string(),
        _ => String::new(),
    }
}

/// Axis position from a raw variable value; each axis defaults to 0.0
/// independently of the others.
pub fn axis_position(raw: &str) -> f64 {
    raw.parse().unwrap_or(0.0)
}

/// Spindle speed from macro variable 3027.
pub fn spindle_speed(raw: &str) -> f64 {
    raw.parse().unwrap_or(-1.0)
}

fn second_token(response: &RawResponse) -> Option<String> {
    response.token(1).map(str::to_string)
}

fn mode(response: &RawResponse) -> Option<String> {
    let mode = response.token(1)?.to_uppercase();
    let mapped = match mode.as_str() {
        "(MDI)" => "MANUAL_DATA_INPUT",
        "(JOG)" => "MANUAL",
        // "(ZERO RET)" and every unrecognized mode read back as automatic
        _ => "AUTOMATIC",
    };
    Some(mapped.to_string())
}

fn program_status(response: &RawResponse) -> Option<String> {
    if response.len() < 2 || response.token(0) != Some("PROGRAM") {
        return None;
    }
    let program = response.token(1)?;
    if program != "MDI" {
        return Some(program.to_string());
    }
    let mdi_state = match response.token(2) {
        Some("IDLE") => "READY",
        Some("FEED HOLD") => "INTERRUPTED",
        Some("ALARM ON") => "STOPPED",
        _ => "ARMED",
    };
    Some(mdi_state.to_string())
}

fn labeled_count(response: &RawResponse, label: &str) -> Option<i64> {
    if response.token(0)? != label {
        return None;
    }
    response.token(1)?.parse().ok()
}
