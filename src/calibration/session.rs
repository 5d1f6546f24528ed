// Interactive trim editor: leg -> joint -> value, one line at a time
//
// Displayed values are absolute servo angles (90 + trim); entered values are
// deltas added to the trim. Nothing is persisted until the operator saves.

use std::io;
use std::sync::Arc;

use tracing::{debug, error, info};

use super::line_io::LineIo;
use super::store::CalibrationStore;
use crate::kinematics::leg::CENTER_OFFSET_DEG;
use crate::kinematics::{Joint, LEG_COUNT};
use crate::state::{CalibrationTable, RobotState};

const BANNER: [&str; 3] = [
    "+------------------------------+",
    "|  hexapod joint calibration   |",
    "+------------------------------+",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LegSelect,
    JointSelect { leg: usize },
    ValueEntry { leg: usize, joint: Joint },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("Invalid leg number {0:?}, expected 1-6")]
    Leg(String),

    #[error("Invalid servo number {0:?}, expected 1-3")]
    Joint(String),

    #[error("Invalid value {0:?}, expected a whole number such as +5 or -3")]
    Value(String),
}

fn parse_leg(input: &str) -> Result<usize, SelectionError> {
    match input.parse::<usize>() {
        Ok(n) if (1..=LEG_COUNT).contains(&n) => Ok(n - 1),
        _ => Err(SelectionError::Leg(input.to_string())),
    }
}

fn parse_joint(input: &str) -> Result<Joint, SelectionError> {
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(Joint::from_index)
        .ok_or_else(|| SelectionError::Joint(input.to_string()))
}

fn parse_delta(input: &str) -> Result<i32, SelectionError> {
    input
        .parse::<i32>()
        .map_err(|_| SelectionError::Value(input.to_string()))
}

/// Servo angle shown to the operator for a trim
fn shown(trim: i32) -> i32 {
    (CENTER_OFFSET_DEG as i32).saturating_add(trim)
}

/// Console sketch of the body with every joint's current value: front pair
/// 1/6 at the top, 2/5 in the middle, 3/4 at the bottom.
pub fn body_diagram(table: &CalibrationTable) -> Vec<String> {
    use Joint::{Coxa, Femur, Tibia};
    let v = |leg: usize, joint: Joint| shown(table.trim(leg, joint));
    vec![
        format!("    {:>3} \\              / {:<3}", v(0, Femur), v(5, Femur)),
        format!("       {:>3} \\          / {:<3}", v(0, Tibia), v(5, Tibia)),
        format!("          {:>3} @ ---- @ {:<3}", v(0, Coxa), v(5, Coxa)),
        "               / 1    6 \\".to_string(),
        format!(
            "{:>3} {:>3} {:>3} @ 2          5 @ {:<3} {:<3} {:<3}",
            v(1, Femur),
            v(1, Tibia),
            v(1, Coxa),
            v(4, Coxa),
            v(4, Tibia),
            v(4, Femur)
        ),
        "               \\ 3    4 /".to_string(),
        format!("          {:>3} @ ---- @ {:<3}", v(2, Coxa), v(3, Coxa)),
        format!("       {:>3} /          \\ {:<3}", v(2, Tibia), v(3, Tibia)),
        format!("    {:>3} /              \\ {:<3}", v(2, Femur), v(3, Femur)),
    ]
}

pub struct CalibrationSession<L: LineIo, S: CalibrationStore> {
    state: Arc<RobotState>,
    io: L,
    store: S,
    stage: Stage,
}

impl<L: LineIo, S: CalibrationStore> CalibrationSession<L, S> {
    pub fn new(state: Arc<RobotState>, io: L, store: S) -> Self {
        Self {
            state,
            io,
            store,
            stage: Stage::LegSelect,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn io(&self) -> &L {
        &self.io
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Serve the console until the operator quits or the input closes
    pub fn run(&mut self) -> io::Result<()> {
        info!("Calibration session started");
        for line in BANNER {
            self.io.write_line(line)?;
        }
        self.prompt()?;
        while let Some(line) = self.io.read_line()? {
            if !self.handle(&line)? {
                break;
            }
        }
        info!("Calibration session ended");
        Ok(())
    }

    /// Feed one input line. Returns false when the operator asked to quit.
    pub fn handle(&mut self, line: &str) -> io::Result<bool> {
        let input = line.trim();
        debug!("Calibration input {:?} at {:?}", input, self.stage);

        match self.stage {
            Stage::LegSelect => match input {
                "q" | "Q" => {
                    self.io.write_line("Leaving calibration")?;
                    return Ok(false);
                }
                "s" | "S" => self.save()?,
                _ => match parse_leg(input) {
                    Ok(leg) => self.stage = Stage::JointSelect { leg },
                    Err(e) => self.io.write_line(&e.to_string())?,
                },
            },
            Stage::JointSelect { leg } => match parse_joint(input) {
                Ok(joint) => self.stage = Stage::ValueEntry { leg, joint },
                Err(e) => {
                    self.io.write_line(&e.to_string())?;
                    self.stage = Stage::LegSelect;
                }
            },
            Stage::ValueEntry { leg, joint } => {
                if input.is_empty() {
                    self.io.write_line("Back to the leg menu")?;
                    self.stage = Stage::JointSelect { leg };
                } else {
                    match parse_delta(input) {
                        Ok(delta) => {
                            let trim = self.state.adjust_trim(leg, joint, delta);
                            info!("Leg {} {} trim now {}", leg + 1, joint, trim);
                            self.io.write_line(&shown(trim).to_string())?;
                            self.stage = Stage::JointSelect { leg };
                        }
                        Err(e) => self.io.write_line(&e.to_string())?,
                    }
                }
            }
        }

        self.prompt()?;
        Ok(true)
    }

    fn save(&mut self) -> io::Result<()> {
        let table = self.state.trims();
        match self.store.save_table(&table) {
            Ok(()) => self.io.write_line("Calibration saved"),
            Err(e) => {
                error!("Failed to save calibration: {}", e);
                self.io.write_line(&format!("Save failed: {}", e))
            }
        }
    }

    fn prompt(&mut self) -> io::Result<()> {
        match self.stage {
            Stage::LegSelect => {
                for line in body_diagram(&self.state.trims()) {
                    self.io.write_line(&line)?;
                }
                self.io
                    .write_line("Enter leg number (1-6), s to save, q to quit:")
            }
            Stage::JointSelect { leg } => {
                let trims = self.state.trims();
                self.io.write_line(&format!("Leg Number: {}", leg + 1))?;
                for joint in Joint::ALL {
                    self.io
                        .write_line(&format!("{}: {}", joint, shown(trims.trim(leg, joint))))?;
                }
                self.io.write_line(
                    "Enter the number of the servo you want to calibrate (1: Coxa, 2: Tibia, 3: Femur):",
                )
            }
            Stage::ValueEntry { leg, joint } => self.io.write_line(&format!(
                "Enter the change for leg {} {} (empty line to go back):",
                leg + 1,
                joint
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::store::{MemoryStore, StorageError};
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedLines {
        input: VecDeque<String>,
        output: Vec<String>,
    }

    impl ScriptedLines {
        fn typed(lines: &[&str]) -> Self {
            Self {
                input: lines.iter().map(|l| l.to_string()).collect(),
                output: Vec::new(),
            }
        }

        fn printed(&self, text: &str) -> bool {
            self.output.iter().any(|line| line.contains(text))
        }
    }

    impl LineIo for ScriptedLines {
        fn read_line(&mut self) -> io::Result<Option<String>> {
            Ok(self.input.pop_front())
        }

        fn write_line(&mut self, line: &str) -> io::Result<()> {
            self.output.push(line.to_string());
            Ok(())
        }
    }

    struct ReadOnlyStore;

    impl CalibrationStore for ReadOnlyStore {
        fn load_table(&self) -> Result<Option<CalibrationTable>, StorageError> {
            Ok(None)
        }

        fn save_table(&mut self, _table: &CalibrationTable) -> Result<(), StorageError> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    fn session() -> CalibrationSession<ScriptedLines, MemoryStore> {
        CalibrationSession::new(
            Arc::new(RobotState::new(CalibrationTable::default())),
            ScriptedLines::default(),
            MemoryStore::new(),
        )
    }

    fn feed<L: LineIo, S: CalibrationStore>(session: &mut CalibrationSession<L, S>, lines: &[&str]) {
        for line in lines {
            assert!(session.handle(line).unwrap(), "{:?} ended the session", line);
        }
    }

    #[test]
    fn test_deltas_accumulate_and_echo_absolute() {
        let mut session = session();
        feed(&mut session, &["1", "1", "+5"]);
        assert!(session.io().output.contains(&"95".to_string()));
        assert_eq!(session.stage(), Stage::JointSelect { leg: 0 });

        feed(&mut session, &["1", "+5"]);
        assert_eq!(session.state.trims().trim(0, Joint::Coxa), 10);
        let echoed = session.io().output.iter().any(|l| l == "100");
        assert!(echoed, "expected 100 in {:?}", session.io().output);
    }

    #[test]
    fn test_negative_delta() {
        let mut session = session();
        feed(&mut session, &["6", "3", "-4"]);
        assert_eq!(session.state.trims().trim(5, Joint::Femur), -4);
        assert!(session.io().printed("86"));
    }

    #[test]
    fn test_empty_value_goes_back_without_change() {
        let mut session = session();
        feed(&mut session, &["2", "3", ""]);
        assert_eq!(session.stage(), Stage::JointSelect { leg: 1 });
        assert_eq!(session.state.trims(), CalibrationTable::default());
    }

    #[test]
    fn test_invalid_joint_returns_to_leg_select() {
        let mut session = session();
        feed(&mut session, &["4", "9"]);
        assert_eq!(session.stage(), Stage::LegSelect);
        assert!(session.io().printed("Invalid servo number"));
    }

    #[test]
    fn test_invalid_leg_reprompts() {
        let mut session = session();
        feed(&mut session, &["7", "zero", "0"]);
        assert_eq!(session.stage(), Stage::LegSelect);
        let complaints = session
            .io()
            .output
            .iter()
            .filter(|l| l.starts_with("Invalid leg number"))
            .count();
        assert_eq!(complaints, 3);
    }

    #[test]
    fn test_non_numeric_value_reprompts() {
        let mut session = session();
        feed(&mut session, &["3", "2", "five"]);
        assert_eq!(session.stage(), Stage::ValueEntry { leg: 2, joint: Joint::Tibia });
        assert!(session.io().printed("Invalid value"));
        assert_eq!(session.state.trims(), CalibrationTable::default());
    }

    #[test]
    fn test_leg_view_shows_current_values() {
        let mut session = session();
        session.state.adjust_trim(3, Joint::Tibia, 2);
        feed(&mut session, &["4"]);
        assert!(session.io().printed("Leg Number: 4"));
        assert!(session.io().printed("Tibia: 92"));
        assert!(session.io().printed("Coxa: 90"));
    }

    #[test]
    fn test_save_writes_current_trims() {
        let mut session = session();
        feed(&mut session, &["5", "2", "+7", "", "s"]);
        assert_eq!(session.store().saves(), 1);
        assert_eq!(
            session.store().load_table().unwrap(),
            Some(session.state.trims())
        );
        assert!(session.io().printed("Calibration saved"));
    }

    #[test]
    fn test_no_save_without_request() {
        let mut session = session();
        feed(&mut session, &["1", "1", "+3"]);
        assert_eq!(session.store().saves(), 0);
    }

    #[test]
    fn test_failed_save_keeps_trims() {
        let mut session = CalibrationSession::new(
            Arc::new(RobotState::new(CalibrationTable::default())),
            ScriptedLines::default(),
            ReadOnlyStore,
        );
        feed(&mut session, &["1", "2", "+1"]);
        // back out of the joint menu with an invalid choice, then save
        feed(&mut session, &["x", "s"]);
        assert!(session.io().printed("Save failed"));
        assert_eq!(session.stage(), Stage::LegSelect);
        assert_eq!(session.state.trims().trim(0, Joint::Tibia), 1);
    }

    #[test]
    fn test_run_until_quit() {
        let state = Arc::new(RobotState::new(CalibrationTable::default()));
        let mut session = CalibrationSession::new(
            Arc::clone(&state),
            ScriptedLines::typed(&["1", "2", "-3", "x", "q", "2"]),
            MemoryStore::new(),
        );
        session.run().unwrap();

        assert_eq!(state.trims().trim(0, Joint::Tibia), -3);
        assert_eq!(session.io().input.len(), 1, "input after q is left unread");
        assert!(session.io().printed("joint calibration"));
        assert!(session.io().printed("Leaving calibration"));
    }

    #[test]
    fn test_run_ends_on_closed_input() {
        let mut session = CalibrationSession::new(
            Arc::new(RobotState::new(CalibrationTable::default())),
            ScriptedLines::typed(&["1"]),
            MemoryStore::new(),
        );
        session.run().unwrap();
        assert_eq!(session.stage(), Stage::JointSelect { leg: 0 });
    }

    #[test]
    fn test_diagram_layout() {
        let mut table = CalibrationTable::default();
        table.adjust(0, Joint::Femur, 11);
        table.adjust(3, Joint::Femur, -11);
        let diagram = body_diagram(&table);
        assert!(diagram[0].trim_start().starts_with("101"), "{}", diagram[0]);
        assert!(diagram[8].trim_end().ends_with("79"), "{}", diagram[8]);
    }
}
